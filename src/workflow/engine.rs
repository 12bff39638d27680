//! 工作流引擎
//!
//! 严格按声明顺序逐步执行：先检查依赖，再在步骤超时内调用 Agent。任何步骤的失败都只记录为失败结果，
//! 不会中断后续步骤；依赖失败步骤的下游步骤被跳过且不调用其 Agent。

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use tracing::{error, info, warn};

use crate::agent::{AgentRequest, BaseAgent};
use crate::workflow::types::*;

/// 按类型名查找 Agent；编排器的注册表实现它
pub trait AgentLookup: Send + Sync {
    fn agent(&self, agent_type: &str) -> Option<Arc<BaseAgent>>;
}

/// 工作流引擎
pub struct WorkflowEngine {
    step_timeout: Duration,
    active: Mutex<HashMap<WorkflowId, WorkflowProgress>>,
}

/// 工作流结束（含被取消）时移除其进度记录
struct ActiveGuard<'a> {
    engine: &'a WorkflowEngine,
    workflow_id: WorkflowId,
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.engine.active().remove(&self.workflow_id);
    }
}

impl WorkflowEngine {
    pub fn new(step_timeout: Duration) -> Self {
        Self {
            step_timeout,
            active: Mutex::new(HashMap::new()),
        }
    }

    pub fn step_timeout(&self) -> Duration {
        self.step_timeout
    }

    fn active(&self) -> MutexGuard<'_, HashMap<WorkflowId, WorkflowProgress>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 正在执行的工作流进度快照
    pub fn workflow_status(&self) -> Vec<WorkflowProgress> {
        let mut progress: Vec<WorkflowProgress> = self.active().values().cloned().collect();
        progress.sort_by_key(|p| p.started_at);
        progress
    }

    /// 执行工作流；总是返回汇总报告，即使全部步骤失败
    pub async fn execute(&self, workflow: &Workflow, agents: &dyn AgentLookup) -> WorkflowReport {
        self.active().insert(
            workflow.id.clone(),
            WorkflowProgress {
                workflow_id: workflow.id.clone(),
                name: workflow.name.clone(),
                total_steps: workflow.steps.len(),
                completed_steps: 0,
                successful_steps: 0,
                started_at: chrono::Utc::now(),
            },
        );
        let _guard = ActiveGuard {
            engine: self,
            workflow_id: workflow.id.clone(),
        };
        info!(
            workflow_id = %workflow.id,
            name = %workflow.name,
            steps = workflow.steps.len(),
            "Workflow started"
        );

        let mut results: Vec<WorkflowResult> = Vec::with_capacity(workflow.steps.len());
        for step in &workflow.steps {
            let result = self.execute_step(step, &results, agents).await;
            if let Some(progress) = self.active().get_mut(&workflow.id) {
                progress.completed_steps += 1;
                if result.success {
                    progress.successful_steps += 1;
                }
            }
            results.push(result);
        }

        let report = WorkflowReport::combine(workflow, &results);
        info!(
            workflow_id = %workflow.id,
            successful = report.workflow_summary.successful_steps,
            failed = report.workflow_summary.failed_steps,
            total_time = report.workflow_summary.total_execution_time,
            "Workflow finished"
        );
        report
    }

    async fn execute_step(
        &self,
        step: &WorkflowStep,
        previous: &[WorkflowResult],
        agents: &dyn AgentLookup,
    ) -> WorkflowResult {
        let started = Instant::now();

        let unmet: Vec<&str> = step
            .depends_on
            .iter()
            .filter(|dep| !previous.iter().any(|r| &r.step_id == *dep && r.success))
            .map(String::as_str)
            .collect();
        if !unmet.is_empty() {
            warn!(step = %step.id, unmet = ?unmet, "Step skipped: dependencies not met");
            return WorkflowResult::failed(
                step,
                format!("Dependencies not met for step {}: {}", step.id, unmet.join(", ")),
                started.elapsed().as_secs_f64(),
                0,
            );
        }

        let Some(agent) = agents.agent(&step.agent_type) else {
            error!(step = %step.id, agent_type = %step.agent_type, "Unknown agent type");
            return WorkflowResult::failed(
                step,
                format!("Unknown agent type: {}", step.agent_type),
                started.elapsed().as_secs_f64(),
                0,
            );
        };

        let request = AgentRequest::new(step.agent_type.clone(), step.payload.clone())
            .with_context("workflow_step", Value::String(step.id.clone()))
            .with_context("dependency_outputs", Value::Object(dependency_outputs(step, previous)));
        let limit = step.timeout.unwrap_or(self.step_timeout);

        let mut attempts = 0;
        while attempts < step.max_attempts {
            attempts += 1;
            match tokio::time::timeout(limit, agent.process(&request)).await {
                Ok(response) => {
                    let result = WorkflowResult::from_response(
                        step,
                        response,
                        started.elapsed().as_secs_f64(),
                        attempts,
                    );
                    if let Some(err) = &result.error {
                        error!(step = %step.id, error = %err, "Workflow step failed");
                    }
                    return result;
                }
                Err(_) => {
                    warn!(
                        step = %step.id,
                        attempt = attempts,
                        max_attempts = step.max_attempts,
                        timeout_secs = limit.as_secs_f64(),
                        "Workflow step timed out"
                    );
                }
            }
        }
        error!(step = %step.id, attempts, "Workflow step failed: Timeout");
        WorkflowResult::failed(step, "Timeout", started.elapsed().as_secs_f64(), attempts)
    }
}

/// 依赖步骤 id -> 其响应数据
fn dependency_outputs(step: &WorkflowStep, previous: &[WorkflowResult]) -> Map<String, Value> {
    step.depends_on
        .iter()
        .filter_map(|dep| {
            previous
                .iter()
                .find(|r| &r.step_id == dep)
                .and_then(|r| r.response.as_ref())
                .map(|response| (dep.clone(), response.data.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentConfig, AgentOutput, DomainAgent};
    use crate::core::AgentError;
    use crate::tools::{Tool, ToolInvoker};
    use crate::workflow::WorkflowBuilder;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 回显上游输出；可配置为先睡眠或直接失败
    struct Echo {
        kind: &'static str,
        delay: Duration,
        fail: bool,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl DomainAgent for Echo {
        fn agent_type(&self) -> &str {
            self.kind
        }

        fn name(&self) -> &str {
            "Echo"
        }

        fn tools(&self) -> Vec<Arc<dyn Tool>> {
            Vec::new()
        }

        async fn run(
            &self,
            _invoker: &mut ToolInvoker,
            request: &AgentRequest,
        ) -> Result<AgentOutput, AgentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(AgentError::validation("echo refused"));
            }
            Ok(AgentOutput::new(
                json!({
                    "kind": self.kind,
                    "upstream": request.context.get("dependency_outputs").cloned(),
                }),
                0.9,
                0.9,
                1.0,
            ))
        }
    }

    struct Agents(HashMap<String, Arc<BaseAgent>>);

    impl AgentLookup for Agents {
        fn agent(&self, agent_type: &str) -> Option<Arc<BaseAgent>> {
            self.0.get(agent_type).cloned()
        }
    }

    fn agent(kind: &'static str, delay: Duration, fail: bool) -> (Arc<BaseAgent>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let domain = Echo {
            kind,
            delay,
            fail,
            calls: calls.clone(),
        };
        let config = AgentConfig::new("Echo").with_memory(false, 0, Duration::ZERO);
        (Arc::new(BaseAgent::new(config, domain)), calls)
    }

    #[tokio::test]
    async fn test_dependency_outputs_passed_downstream() {
        let (a, _) = agent("a", Duration::ZERO, false);
        let (b, _) = agent("b", Duration::ZERO, false);
        let agents = Agents(HashMap::from([("a".to_string(), a), ("b".to_string(), b)]));
        let workflow = WorkflowBuilder::new("chain")
            .step(WorkflowStep::new("a", "run", json!({})))
            .step(WorkflowStep::new("b", "run", json!({})).depends_on("a"))
            .build()
            .unwrap();

        let report = WorkflowEngine::new(Duration::from_secs(5))
            .execute(&workflow, &agents)
            .await;
        assert_eq!(report.status, WorkflowStatus::Completed);
        assert_eq!(report.combined_data["b"]["upstream"]["a"]["kind"], "a");
    }

    #[tokio::test]
    async fn test_failed_dependency_skips_agent() {
        let (a, _) = agent("a", Duration::ZERO, true);
        let (b, b_calls) = agent("b", Duration::ZERO, false);
        let agents = Agents(HashMap::from([("a".to_string(), a), ("b".to_string(), b)]));
        let workflow = WorkflowBuilder::new("chain")
            .step(WorkflowStep::new("a", "run", json!({})))
            .step(WorkflowStep::new("b", "run", json!({})).depends_on("a"))
            .build()
            .unwrap();

        let report = WorkflowEngine::new(Duration::from_secs(5))
            .execute(&workflow, &agents)
            .await;
        assert_eq!(report.workflow_summary.failed_steps, 2);
        assert!(report.errors[1].error.contains("Dependencies not met"));
        assert_eq!(b_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_timeout_retried_up_to_max_attempts() {
        let (slow, calls) = agent("slow", Duration::from_millis(200), false);
        let agents = Agents(HashMap::from([("slow".to_string(), slow)]));
        let workflow = WorkflowBuilder::new("slow")
            .step(
                WorkflowStep::new("slow", "run", json!({}))
                    .with_timeout(Duration::from_millis(20))
                    .with_max_attempts(2),
            )
            .build()
            .unwrap();

        let engine = WorkflowEngine::new(Duration::from_secs(5));
        let report = engine.execute(&workflow, &agents).await;
        assert_eq!(report.errors[0].error, "Timeout");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(engine.workflow_status().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_agent_recorded() {
        let agents = Agents(HashMap::new());
        let workflow = WorkflowBuilder::new("missing")
            .step(WorkflowStep::new("ghost", "run", json!({})))
            .build()
            .unwrap();
        let report = WorkflowEngine::new(Duration::from_secs(1))
            .execute(&workflow, &agents)
            .await;
        assert_eq!(report.errors[0].error, "Unknown agent type: ghost");
    }
}
