//! Agent 编排器
//!
//! 按类型名持有 Agent 注册表，提供两个入口：单 Agent 请求与多步骤工作流，以及状态/健康查询。
//! 注册表在构造后只读；工作流由 WorkflowEngine 顺序执行。

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::agent::{AgentRequest, AgentResponse, AgentStatus, AgentType, BaseAgent};
use crate::agents::build_agent;
use crate::cache::Cache;
use crate::config::AppConfig;
use crate::core::OrchestratorError;
use crate::workflow::{
    AgentLookup, Workflow, WorkflowBuilder, WorkflowEngine, WorkflowProgress, WorkflowReport,
    WorkflowStep,
};

/// 类型名 -> Agent
#[derive(Default)]
pub struct AgentRegistry {
    agents: HashMap<String, Arc<BaseAgent>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 同名注册会替换旧 Agent
    pub fn register(&mut self, agent_type: impl Into<String>, agent: Arc<BaseAgent>) {
        let agent_type = agent_type.into();
        if self.agents.insert(agent_type.clone(), agent).is_some() {
            tracing::warn!(agent_type = %agent_type, "Agent replaced in registry");
        }
    }

    pub fn get(&self, agent_type: &str) -> Option<&Arc<BaseAgent>> {
        self.agents.get(agent_type)
    }

    /// 按类型名排序
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.agents.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    fn iter(&self) -> impl Iterator<Item = (&String, &Arc<BaseAgent>)> {
        self.agents.iter()
    }
}

impl AgentLookup for AgentRegistry {
    fn agent(&self, agent_type: &str) -> Option<Arc<BaseAgent>> {
        self.agents.get(agent_type).cloned()
    }
}

/// 整体健康度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// 所有 Agent 可用
    Healthy,
    /// 部分 Agent 可用
    Degraded,
    /// 没有可用的 Agent
    Unhealthy,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub available_agents: usize,
    pub total_agents: usize,
    pub agents: BTreeMap<String, bool>,
    pub active_workflows: usize,
    pub timestamp: DateTime<Utc>,
}

/// 编排器
pub struct Orchestrator {
    agents: AgentRegistry,
    engine: WorkflowEngine,
}

impl Orchestrator {
    /// 注册六个内置 Agent；传入缓存时所有 Agent 共享它
    pub fn new(cfg: &AppConfig, cache: Option<Arc<dyn Cache>>) -> Self {
        let mut orchestrator = Self::empty(Duration::from_secs(cfg.workflow.step_timeout_secs));
        for agent_type in AgentType::all() {
            let mut agent = build_agent(agent_type, cfg);
            if let Some(cache) = &cache {
                agent = agent.with_cache(Arc::clone(cache));
            }
            orchestrator.register(agent_type.as_str(), Arc::new(agent));
        }
        tracing::info!(
            agents = orchestrator.agents.len(),
            cache = cache.is_some(),
            "Orchestrator initialised"
        );
        orchestrator
    }

    /// 无 Agent 的编排器，用于注册自定义 Agent
    pub fn empty(step_timeout: Duration) -> Self {
        Self {
            agents: AgentRegistry::new(),
            engine: WorkflowEngine::new(step_timeout),
        }
    }

    pub fn register(&mut self, agent_type: impl Into<String>, agent: Arc<BaseAgent>) {
        self.agents.register(agent_type, agent);
    }

    pub fn agent(&self, agent_type: &str) -> Option<&Arc<BaseAgent>> {
        self.agents.get(agent_type)
    }

    /// 单 Agent 请求；未知类型直接返回错误，不构造请求
    pub async fn process_simple_request(
        &self,
        agent_type: &str,
        payload: Value,
    ) -> Result<AgentResponse, OrchestratorError> {
        let agent = self
            .agents
            .get(agent_type)
            .ok_or_else(|| OrchestratorError::UnknownAgent(agent_type.to_string()))?;
        Ok(agent.process(&AgentRequest::new(agent_type, payload)).await)
    }

    /// 处理调用方自行构造的请求（可设置缓存/记忆/工具开关、超时与上下文）
    pub async fn process_request(
        &self,
        request: &AgentRequest,
    ) -> Result<AgentResponse, OrchestratorError> {
        let agent = self
            .agents
            .get(&request.agent_type)
            .ok_or_else(|| OrchestratorError::UnknownAgent(request.agent_type.clone()))?;
        Ok(agent.process(request).await)
    }

    /// 多步骤请求：按声明顺序执行，总是返回汇总
    ///
    /// 不预先校验步骤定义：同类型的多个步骤自动编号（`carbon_dating#2`），
    /// 未满足或指向后续步骤的依赖在执行时记为失败步骤，空列表得到 0 步的汇总。
    pub async fn process_complex_request(&self, steps: Vec<WorkflowStep>) -> WorkflowReport {
        let workflow = WorkflowBuilder::new("complex_request")
            .steps(steps)
            .build_lenient();
        self.run_workflow(&workflow).await
    }

    /// 执行已构建的工作流
    pub async fn run_workflow(&self, workflow: &Workflow) -> WorkflowReport {
        self.engine.execute(workflow, &self.agents).await
    }

    /// 每个 Agent 的状态，按类型名排序
    pub fn agent_status(&self) -> BTreeMap<String, AgentStatus> {
        self.agents
            .iter()
            .map(|(name, agent)| (name.clone(), agent.status()))
            .collect()
    }

    /// 正在执行的工作流
    pub fn workflow_status(&self) -> Vec<WorkflowProgress> {
        self.engine.workflow_status()
    }

    /// 至少一个 Agent 可用即为 true
    pub fn is_available(&self) -> bool {
        self.agents.iter().any(|(_, agent)| agent.is_available())
    }

    /// 当前可用的 Agent，按类型名排序
    pub fn available_agents(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .agents
            .iter()
            .filter(|(_, agent)| agent.is_available())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn agent_capabilities(&self) -> BTreeMap<String, Vec<String>> {
        self.agents
            .iter()
            .map(|(name, agent)| (name.clone(), agent.capabilities()))
            .collect()
    }

    pub fn health_check(&self) -> HealthReport {
        let agents: BTreeMap<String, bool> = self
            .agents
            .iter()
            .map(|(name, agent)| (name.clone(), agent.is_available()))
            .collect();
        let available = agents.values().filter(|up| **up).count();
        let status = if available == 0 {
            HealthStatus::Unhealthy
        } else if available < agents.len() {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };
        if status != HealthStatus::Healthy {
            tracing::warn!(available, total = agents.len(), ?status, "Orchestrator health check");
        }
        HealthReport {
            status,
            available_agents: available,
            total_agents: agents.len(),
            agents,
            active_workflows: self.engine.workflow_status().len(),
            timestamp: Utc::now(),
        }
    }
}
