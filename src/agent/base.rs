//! Agent 信封运行时
//!
//! BaseAgent 把领域逻辑（DomainAgent）包进统一流程：可用性检查 -> 缓存 -> 带重试与超时的领域运行
//! -> 写缓存 / 记忆 -> 响应。process 从不向调用方返回 Err，所有错误都折叠为错误响应。

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::agent::{AgentConfig, AgentOutput, AgentRequest, AgentResponse};
use crate::cache::{content_key, Cache};
use crate::core::{AgentError, RetryPolicy};
use crate::memory::{AgentMemory, MemoryEntry, MemorySummary};
use crate::tools::{Tool, ToolExecutor, ToolInvoker, ToolRegistry, ToolSchema};

/// 领域逻辑：声明工具，并在一次尝试内通过 ToolInvoker 调用它们
#[async_trait]
pub trait DomainAgent: Send + Sync {
    /// 注册表中的类型名，如 "carbon_dating"
    fn agent_type(&self) -> &str;

    /// 展示名，如 "CarbonDatingAgent"
    fn name(&self) -> &str;

    fn tools(&self) -> Vec<Arc<dyn Tool>>;

    /// 能力描述，供编排器汇总
    fn capabilities(&self) -> Vec<String> {
        Vec::new()
    }

    /// 缓存键；默认按载荷内容寻址
    fn cache_key(&self, request: &AgentRequest) -> String {
        content_key(self.agent_type(), &request.payload)
    }

    async fn run(
        &self,
        invoker: &mut ToolInvoker,
        request: &AgentRequest,
    ) -> Result<AgentOutput, AgentError>;
}

#[derive(Debug, Default)]
struct AgentMetrics {
    current_requests: AtomicUsize,
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
    cache_hits: AtomicU64,
    total_processing_micros: AtomicU64,
}

/// 进入 process 时计数，离开（含被取消）时归还 current_requests 并累计耗时
struct InFlight<'a> {
    metrics: &'a AgentMetrics,
    started: Instant,
}

impl<'a> InFlight<'a> {
    fn enter(metrics: &'a AgentMetrics) -> Self {
        metrics.current_requests.fetch_add(1, Ordering::SeqCst);
        metrics.total_requests.fetch_add(1, Ordering::SeqCst);
        Self {
            metrics,
            started: Instant::now(),
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.metrics.current_requests.fetch_sub(1, Ordering::SeqCst);
        self.metrics
            .total_processing_micros
            .fetch_add(self.started.elapsed().as_micros() as u64, Ordering::SeqCst);
    }
}

/// 单个 Agent 的状态快照
#[derive(Debug, Clone, Serialize)]
pub struct AgentStatus {
    pub agent_name: String,
    pub agent_type: String,
    pub agent_version: String,
    pub is_available: bool,
    pub current_requests: usize,
    pub total_requests: u64,
    /// 秒
    pub average_processing_time: f64,
    pub tools_count: usize,
    pub memory_enabled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PerformanceMetrics {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub cache_hits: u64,
    pub success_rate: f64,
    pub average_processing_time: f64,
    pub current_requests: usize,
}

pub struct BaseAgent {
    config: AgentConfig,
    domain: Arc<dyn DomainAgent>,
    executor: Arc<ToolExecutor>,
    tool_schemas: Vec<ToolSchema>,
    cache: Option<Arc<dyn Cache>>,
    memory: Option<Mutex<AgentMemory>>,
    retry: RetryPolicy,
    available: AtomicBool,
    metrics: AgentMetrics,
}

impl BaseAgent {
    pub fn new(config: AgentConfig, domain: impl DomainAgent + 'static) -> Self {
        Self::from_arc(config, Arc::new(domain))
    }

    pub fn from_arc(config: AgentConfig, domain: Arc<dyn DomainAgent>) -> Self {
        let mut registry = ToolRegistry::new();
        for tool in domain.tools() {
            registry.register_arc(tool);
        }
        let tool_schemas = registry.schemas();
        let memory = config
            .memory_enabled
            .then(|| Mutex::new(AgentMemory::new(config.memory_size, config.memory_ttl)));
        tracing::debug!(
            agent = domain.name(),
            tools = tool_schemas.len(),
            "Agent initialised"
        );
        Self {
            executor: Arc::new(ToolExecutor::new(registry, config.tool_timeout)),
            retry: RetryPolicy::new(config.max_retries, config.retry_delay),
            tool_schemas,
            memory,
            cache: None,
            available: AtomicBool::new(true),
            metrics: AgentMetrics::default(),
            domain,
            config,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn agent_type(&self) -> &str {
        self.domain.agent_type()
    }

    pub fn name(&self) -> &str {
        self.domain.name()
    }

    /// 领域未声明能力时退回工具名列表
    pub fn capabilities(&self) -> Vec<String> {
        let declared = self.domain.capabilities();
        if declared.is_empty() {
            self.tool_schemas.iter().map(|s| s.name.clone()).collect()
        } else {
            declared
        }
    }

    /// 处理请求；永不返回 Err
    pub async fn process(&self, request: &AgentRequest) -> AgentResponse {
        let _in_flight = InFlight::enter(&self.metrics);
        let started = Instant::now();

        let mut response = if !self.is_available() {
            tracing::warn!(agent = self.name(), request_id = %request.id, "Agent is disabled");
            AgentResponse::failure(request, &self.config, AgentError::Unavailable.to_string())
        } else {
            match self.process_inner(request).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::error!(
                        agent = self.name(),
                        request_id = %request.id,
                        "Request failed: {}",
                        e
                    );
                    AgentResponse::failure(request, &self.config, e.to_string())
                }
            }
        };
        response.processing_time = started.elapsed().as_secs_f64();

        if response.is_success() {
            self.metrics.successful_requests.fetch_add(1, Ordering::SeqCst);
            tracing::info!(
                agent = self.name(),
                request_id = %request.id,
                cached = response.cached,
                confidence = response.confidence,
                tool_calls = response.tool_calls,
                processing_time = response.processing_time,
                "Request processed"
            );
        } else {
            self.metrics.failed_requests.fetch_add(1, Ordering::SeqCst);
        }
        response
    }

    async fn process_inner(&self, request: &AgentRequest) -> Result<AgentResponse, AgentError> {
        if request.use_cache {
            if let Some(hit) = self.cached_response(request).await {
                return Ok(hit);
            }
        }

        let timeout = request.timeout.unwrap_or(self.config.timeout);
        let (output, tools_used, tool_calls) =
            tokio::time::timeout(timeout, self.run_with_retry(request))
                .await
                .map_err(|_| AgentError::Timeout(timeout.as_secs_f64()))??;

        let mut response = AgentResponse::success(request, &self.config, output);
        response.tools_used = tools_used;
        response.tool_calls = tool_calls;

        if request.use_cache {
            if let Some(cache) = &self.cache {
                let key = self.domain.cache_key(request);
                cache
                    .set(&key, serde_json::to_value(&response)?, self.config.cache_ttl)
                    .await;
            }
        }
        if request.use_memory {
            if let Some(memory) = &self.memory {
                memory.lock().await.store(self.agent_type(), request, &response);
            }
        }
        Ok(response)
    }

    /// 每次尝试新建 ToolInvoker；返回成功那次尝试的工具用量
    async fn run_with_retry(
        &self,
        request: &AgentRequest,
    ) -> Result<(AgentOutput, Vec<String>, usize), AgentError> {
        let tools_enabled = self.config.tools_enabled && request.use_tools;
        self.retry
            .run(|_attempt| async move {
                let mut invoker = ToolInvoker::new(
                    self.executor.clone(),
                    tools_enabled,
                    self.config.max_tool_calls,
                );
                let output = self.domain.run(&mut invoker, request).await?;
                let (tools_used, calls) = invoker.into_usage();
                Ok((output, tools_used, calls))
            })
            .await
    }

    async fn cached_response(&self, request: &AgentRequest) -> Option<AgentResponse> {
        let cache = self.cache.as_ref()?;
        let key = self.domain.cache_key(request);
        let value = cache.get(&key).await?;
        match serde_json::from_value::<AgentResponse>(value) {
            Ok(mut response) => {
                tracing::debug!(agent = self.name(), key = %key, "Cache hit");
                self.metrics.cache_hits.fetch_add(1, Ordering::SeqCst);
                response.id = Uuid::new_v4().to_string();
                response.request_id = request.id.clone();
                response.timestamp = chrono::Utc::now();
                response.cached = true;
                Some(response)
            }
            Err(e) => {
                tracing::warn!(key = %key, "Ignoring undecodable cache entry: {}", e);
                None
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    pub fn set_availability(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
        tracing::info!(agent = self.name(), available, "Availability changed");
    }

    pub fn available_tools(&self) -> &[ToolSchema] {
        &self.tool_schemas
    }

    /// 按请求 id 查记忆；记忆关闭或已过期时为 None
    pub async fn recall(&self, request_id: &str) -> Option<MemoryEntry> {
        let memory = self.memory.as_ref()?;
        let key = AgentMemory::key(self.agent_type(), request_id);
        memory.lock().await.retrieve(&key).cloned()
    }

    pub async fn clear_memory(&self) {
        if let Some(memory) = &self.memory {
            memory.lock().await.clear();
        }
    }

    pub async fn memory_summary(&self) -> MemorySummary {
        match &self.memory {
            Some(memory) => memory.lock().await.summary(),
            None => MemorySummary {
                enabled: false,
                size: 0,
                max_size: self.config.memory_size,
                ttl_secs: self.config.memory_ttl.as_secs(),
            },
        }
    }

    pub fn reset_metrics(&self) {
        let m = &self.metrics;
        m.total_requests.store(0, Ordering::SeqCst);
        m.successful_requests.store(0, Ordering::SeqCst);
        m.failed_requests.store(0, Ordering::SeqCst);
        m.cache_hits.store(0, Ordering::SeqCst);
        m.total_processing_micros.store(0, Ordering::SeqCst);
    }

    fn average_processing_time(&self) -> f64 {
        let total = self.metrics.total_requests.load(Ordering::SeqCst);
        if total == 0 {
            return 0.0;
        }
        let micros = self.metrics.total_processing_micros.load(Ordering::SeqCst);
        Duration::from_micros(micros).as_secs_f64() / total as f64
    }

    pub fn performance_metrics(&self) -> PerformanceMetrics {
        let m = &self.metrics;
        let total = m.total_requests.load(Ordering::SeqCst);
        let successful = m.successful_requests.load(Ordering::SeqCst);
        PerformanceMetrics {
            total_requests: total,
            successful_requests: successful,
            failed_requests: m.failed_requests.load(Ordering::SeqCst),
            cache_hits: m.cache_hits.load(Ordering::SeqCst),
            success_rate: if total == 0 {
                0.0
            } else {
                successful as f64 / total as f64
            },
            average_processing_time: self.average_processing_time(),
            current_requests: m.current_requests.load(Ordering::SeqCst),
        }
    }

    pub fn status(&self) -> AgentStatus {
        AgentStatus {
            agent_name: self.name().to_string(),
            agent_type: self.agent_type().to_string(),
            agent_version: self.config.agent_version.clone(),
            is_available: self.is_available(),
            current_requests: self.metrics.current_requests.load(Ordering::SeqCst),
            total_requests: self.metrics.total_requests.load(Ordering::SeqCst),
            average_processing_time: self.average_processing_time(),
            tools_count: self.tool_schemas.len(),
            memory_enabled: self.memory.is_some(),
        }
    }
}
