//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `ARCHAEO__*` 覆盖（双下划线表示嵌套，如 `ARCHAEO__AI__MODEL=claude-3-haiku`）。
//! API Key 未写入配置时回退到环境变量 `ANTHROPIC_API_KEY`。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub ai: AiSection,
    #[serde(default)]
    pub memory: MemorySection,
    #[serde(default)]
    pub tools: ToolsSection,
    #[serde(default)]
    pub workflow: WorkflowSection,
}

/// [ai] 段：凭证、模型选择、超时与重试
#[derive(Debug, Clone, Deserialize)]
pub struct AiSection {
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// 单次 Agent 处理超时（秒）
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// 总尝试次数（含首次）
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// 退避基数（秒），第 n 次重试前等待 retry_delay * 2^n
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: f64,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

fn default_model() -> String {
    "claude-3-5-sonnet-20241022".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    4000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_secs() -> f64 {
    1.0
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

impl Default for AiSection {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl AiSection {
    /// 配置中的 api_key 优先，其次 ANTHROPIC_API_KEY
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
    }
}

/// [memory] 段：每个 Agent 私有的有界 TTL 记忆
#[derive(Debug, Clone, Deserialize)]
pub struct MemorySection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_memory_size")]
    pub size: usize,
    #[serde(default = "default_memory_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_memory_size() -> usize {
    1000
}

fn default_memory_ttl_secs() -> u64 {
    86400
}

impl Default for MemorySection {
    fn default() -> Self {
        Self {
            enabled: true,
            size: default_memory_size(),
            ttl_secs: default_memory_ttl_secs(),
        }
    }
}

/// [tools] 段：工具开关、单次处理的调用上限、单次调用超时
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_max_tool_calls")]
    pub max_tool_calls: usize,
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
}

fn default_max_tool_calls() -> usize {
    10
}

fn default_tool_timeout_secs() -> u64 {
    15
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            enabled: true,
            max_tool_calls: default_max_tool_calls(),
            tool_timeout_secs: default_tool_timeout_secs(),
        }
    }
}

/// [workflow] 段：步骤默认超时
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowSection {
    #[serde(default = "default_step_timeout_secs")]
    pub step_timeout_secs: u64,
}

fn default_step_timeout_secs() -> u64 {
    30
}

impl Default for WorkflowSection {
    fn default() -> Self {
        Self {
            step_timeout_secs: default_step_timeout_secs(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 ARCHAEO__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 ARCHAEO__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("ARCHAEO")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
