//! Agent 信封类型：请求、响应、Agent 配置
//!
//! 载荷统一为 serde_json::Value，信封本身与领域无关；各领域 Agent 在边界处反序列化为强类型记录。

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::config::AppConfig;

/// 内置的六类 Agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    ArtifactAnalysis,
    CarbonDating,
    CivilizationResearch,
    ExcavationPlanning,
    ReportGeneration,
    ResearchAssistant,
}

impl AgentType {
    /// 注册表中的类型名
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::ArtifactAnalysis => "artifact_analysis",
            AgentType::CarbonDating => "carbon_dating",
            AgentType::CivilizationResearch => "civilization_research",
            AgentType::ExcavationPlanning => "excavation_planning",
            AgentType::ReportGeneration => "report_generation",
            AgentType::ResearchAssistant => "research_assistant",
        }
    }

    pub fn all() -> [AgentType; 6] {
        [
            AgentType::ArtifactAnalysis,
            AgentType::CarbonDating,
            AgentType::CivilizationResearch,
            AgentType::ExcavationPlanning,
            AgentType::ReportGeneration,
            AgentType::ResearchAssistant,
        ]
    }
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Agent 配置：构造时确定，之后只读
#[derive(Debug, Clone, Serialize)]
pub struct AgentConfig {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,

    pub agent_name: String,
    pub agent_version: String,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub cache_ttl: Duration,

    pub memory_enabled: bool,
    pub memory_size: usize,
    pub memory_ttl: Duration,

    pub tools_enabled: bool,
    pub max_tool_calls: usize,
    pub tool_timeout: Duration,
}

impl AgentConfig {
    pub fn new(agent_name: impl Into<String>) -> Self {
        Self::from_app_config(&AppConfig::default(), agent_name)
    }

    /// 把 [ai] / [memory] / [tools] 段烘焙进单个 Agent 的配置
    pub fn from_app_config(cfg: &AppConfig, agent_name: impl Into<String>) -> Self {
        Self {
            api_key: cfg.ai.resolved_api_key(),
            model: cfg.ai.model.clone(),
            temperature: cfg.ai.temperature,
            max_tokens: cfg.ai.max_tokens,
            timeout: Duration::from_secs(cfg.ai.timeout_secs),
            agent_name: agent_name.into(),
            agent_version: env!("CARGO_PKG_VERSION").to_string(),
            max_retries: cfg.ai.max_retries,
            retry_delay: Duration::from_secs_f64(cfg.ai.retry_delay_secs.max(0.0)),
            cache_ttl: Duration::from_secs(cfg.ai.cache_ttl_secs),
            memory_enabled: cfg.memory.enabled,
            memory_size: cfg.memory.size,
            memory_ttl: Duration::from_secs(cfg.memory.ttl_secs),
            tools_enabled: cfg.tools.enabled,
            max_tool_calls: cfg.tools.max_tool_calls,
            tool_timeout: Duration::from_secs(cfg.tools.tool_timeout_secs),
        }
    }

    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_memory(mut self, enabled: bool, size: usize, ttl: Duration) -> Self {
        self.memory_enabled = enabled;
        self.memory_size = size;
        self.memory_ttl = ttl;
        self
    }

    pub fn with_tools(mut self, enabled: bool, max_tool_calls: usize, tool_timeout: Duration) -> Self {
        self.tools_enabled = enabled;
        self.max_tool_calls = max_tool_calls;
        self.tool_timeout = tool_timeout;
        self
    }
}

/// Agent 请求：创建后不再修改
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRequest {
    pub id: String,
    pub agent_type: String,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    /// 领域载荷（如 {"artifact_data": {...}}）
    pub payload: Value,
    /// 辅助上下文（如工作流上游步骤输出）
    #[serde(default)]
    pub context: HashMap<String, Value>,
    pub timestamp: DateTime<Utc>,
    /// 排序提示，当前不强制
    #[serde(default)]
    pub priority: i32,
    /// 覆盖 AgentConfig::timeout
    pub timeout: Option<Duration>,
    pub use_cache: bool,
    pub use_memory: bool,
    pub use_tools: bool,
}

impl AgentRequest {
    pub fn new(agent_type: impl Into<String>, payload: Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            agent_type: agent_type.into(),
            user_id: None,
            session_id: None,
            payload,
            context: HashMap::new(),
            timestamp: Utc::now(),
            priority: 0,
            timeout: None,
            use_cache: true,
            use_memory: true,
            use_tools: true,
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>, session_id: Option<String>) -> Self {
        self.user_id = Some(user_id.into());
        self.session_id = session_id;
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    pub fn with_memory(mut self, use_memory: bool) -> Self {
        self.use_memory = use_memory;
        self
    }

    pub fn with_tools(mut self, use_tools: bool) -> Self {
        self.use_tools = use_tools;
        self
    }
}

/// 领域逻辑的产出：数据与三项评分，其余字段由 BaseAgent 填充
#[derive(Debug, Clone)]
pub struct AgentOutput {
    pub data: Value,
    pub confidence: f64,
    pub quality_score: f64,
    pub completeness_score: f64,
    pub tokens_used: u64,
}

impl AgentOutput {
    pub fn new(data: Value, confidence: f64, quality_score: f64, completeness_score: f64) -> Self {
        Self {
            data,
            confidence,
            quality_score,
            completeness_score,
            tokens_used: 0,
        }
    }
}

/// Agent 响应：每个被处理的请求恰好生成一次
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    pub id: String,
    pub request_id: String,
    pub agent_type: String,
    pub agent_version: String,
    pub data: Value,
    pub confidence: f64,
    /// 秒
    pub processing_time: f64,
    pub tokens_used: u64,
    pub model_used: String,
    pub quality_score: f64,
    pub completeness_score: f64,
    pub timestamp: DateTime<Utc>,
    pub cached: bool,
    pub error: Option<String>,
    pub tools_used: Vec<String>,
    pub tool_calls: usize,
}

impl AgentResponse {
    pub fn success(request: &AgentRequest, config: &AgentConfig, output: AgentOutput) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            request_id: request.id.clone(),
            agent_type: request.agent_type.clone(),
            agent_version: config.agent_version.clone(),
            data: output.data,
            confidence: clamp_unit(output.confidence),
            processing_time: 0.0,
            tokens_used: output.tokens_used,
            model_used: config.model.clone(),
            quality_score: clamp_unit(output.quality_score),
            completeness_score: clamp_unit(output.completeness_score),
            timestamp: Utc::now(),
            cached: false,
            error: None,
            tools_used: Vec::new(),
            tool_calls: 0,
        }
    }

    /// 错误响应：三项评分为 0，data 中带 error 字段
    pub fn failure(request: &AgentRequest, config: &AgentConfig, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            id: Uuid::new_v4().to_string(),
            request_id: request.id.clone(),
            agent_type: request.agent_type.clone(),
            agent_version: config.agent_version.clone(),
            data: serde_json::json!({ "error": message }),
            confidence: 0.0,
            processing_time: 0.0,
            tokens_used: 0,
            model_used: config.model.clone(),
            quality_score: 0.0,
            completeness_score: 0.0,
            timestamp: Utc::now(),
            cached: false,
            error: Some(message),
            tools_used: Vec::new(),
            tool_calls: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// 将评分压入 [0, 1]；NaN 视为 0
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// 算术平均；空输入定义为 0.0
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
