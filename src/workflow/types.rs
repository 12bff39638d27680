//! 工作流类型定义
//!
//! 工作流是按声明顺序执行的步骤列表；步骤通过 id 声明依赖，结果按提交顺序累积、从不重排。

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::agent::AgentResponse;

pub type WorkflowId = String;
pub type StepId = String;

/// 工作流状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    /// 正在执行
    Running,
    /// 全部步骤成功
    Completed,
    /// 至少一个步骤失败
    Failed,
}

/// 工作流中的一个步骤：绑定一个 Agent 与一份输入载荷
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// 依赖引用用的标识；缺省为 agent_type
    pub id: StepId,
    pub agent_type: String,
    /// 动作标签，仅用于展示与日志
    pub action: String,
    pub payload: Value,
    #[serde(default)]
    pub depends_on: Vec<StepId>,
    /// 覆盖编排器的默认步骤超时
    #[serde(default)]
    pub timeout: Option<Duration>,
    /// 超时后的总尝试次数（含首次），至少为 1
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_max_attempts() -> u32 {
    1
}

impl WorkflowStep {
    pub fn new(agent_type: impl Into<String>, action: impl Into<String>, payload: Value) -> Self {
        let agent_type = agent_type.into();
        Self {
            id: agent_type.clone(),
            agent_type,
            action: action.into(),
            payload,
            depends_on: Vec::new(),
            timeout: None,
            max_attempts: default_max_attempts(),
        }
    }

    pub fn with_id(mut self, id: impl Into<StepId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn depends_on(mut self, step_id: impl Into<StepId>) -> Self {
        self.depends_on.push(step_id.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }
}

/// 已校验的工作流
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: WorkflowId,
    pub name: String,
    pub steps: Vec<WorkflowStep>,
}

/// 单个步骤的执行结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub step_id: StepId,
    pub agent_type: String,
    pub action: String,
    pub success: bool,
    /// Agent 返回的响应（含错误响应）；未调用 Agent 或超时时为 None
    pub response: Option<AgentResponse>,
    pub error: Option<String>,
    /// 秒
    pub execution_time: f64,
    pub attempts: u32,
}

impl WorkflowResult {
    /// 未调用 Agent 的失败结果
    pub fn failed(step: &WorkflowStep, error: impl Into<String>, execution_time: f64, attempts: u32) -> Self {
        Self {
            step_id: step.id.clone(),
            agent_type: step.agent_type.clone(),
            action: step.action.clone(),
            success: false,
            response: None,
            error: Some(error.into()),
            execution_time,
            attempts,
        }
    }

    /// 由 Agent 响应构建；响应无 error 即成功
    pub fn from_response(step: &WorkflowStep, response: AgentResponse, execution_time: f64, attempts: u32) -> Self {
        Self {
            step_id: step.id.clone(),
            agent_type: step.agent_type.clone(),
            action: step.action.clone(),
            success: response.is_success(),
            error: response.error.clone(),
            response: Some(response),
            execution_time,
            attempts,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSummary {
    pub total_steps: usize,
    pub successful_steps: usize,
    pub failed_steps: usize,
    /// 各步骤耗时之和（秒）
    pub total_execution_time: f64,
}

/// 报告中的单步摘要
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    pub step_id: StepId,
    pub agent_type: String,
    pub success: bool,
    pub execution_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepError {
    pub step_id: StepId,
    pub agent_type: String,
    pub error: String,
}

/// 工作流汇总；即使所有步骤都失败也会返回
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowReport {
    pub workflow_id: WorkflowId,
    pub workflow_name: String,
    pub status: WorkflowStatus,
    pub workflow_summary: WorkflowSummary,
    pub step_results: Vec<StepReport>,
    /// agent_type -> 成功步骤的数据；同类型多步时后者覆盖前者
    pub combined_data: BTreeMap<String, Value>,
    pub errors: Vec<StepError>,
}

impl WorkflowReport {
    pub fn combine(workflow: &Workflow, results: &[WorkflowResult]) -> Self {
        let successful_steps = results.iter().filter(|r| r.success).count();
        let mut report = Self {
            workflow_id: workflow.id.clone(),
            workflow_name: workflow.name.clone(),
            status: if successful_steps == results.len() {
                WorkflowStatus::Completed
            } else {
                WorkflowStatus::Failed
            },
            workflow_summary: WorkflowSummary {
                total_steps: results.len(),
                successful_steps,
                failed_steps: results.len() - successful_steps,
                total_execution_time: results.iter().map(|r| r.execution_time).sum(),
            },
            step_results: Vec::with_capacity(results.len()),
            combined_data: BTreeMap::new(),
            errors: Vec::new(),
        };

        for result in results {
            let mut step = StepReport {
                step_id: result.step_id.clone(),
                agent_type: result.agent_type.clone(),
                success: result.success,
                execution_time: result.execution_time,
                data: None,
                confidence: None,
                error: None,
            };
            match (&result.response, result.success) {
                (Some(response), true) => {
                    step.data = Some(response.data.clone());
                    step.confidence = Some(response.confidence);
                    report
                        .combined_data
                        .insert(result.agent_type.clone(), response.data.clone());
                }
                _ => {
                    let error = result.error.clone().unwrap_or_else(|| "unknown error".to_string());
                    step.error = Some(error.clone());
                    report.errors.push(StepError {
                        step_id: result.step_id.clone(),
                        agent_type: result.agent_type.clone(),
                        error,
                    });
                }
            }
            report.step_results.push(step);
        }
        report
    }
}

/// 运行中工作流的进度
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowProgress {
    pub workflow_id: WorkflowId,
    pub name: String,
    pub total_steps: usize,
    pub completed_steps: usize,
    pub successful_steps: usize,
    pub started_at: DateTime<Utc>,
}

/// 工作流定义错误
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Workflow has no steps")]
    EmptyWorkflow,
    #[error("Duplicate step id: {0}")]
    DuplicateStep(StepId),
    #[error("Step {step} depends on {dependency}, which is not declared before it")]
    UnknownDependency { step: StepId, dependency: StepId },
    #[error("Invalid workflow configuration: {0}")]
    InvalidConfiguration(String),
}
