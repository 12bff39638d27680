//! Agent 与编排器错误类型
//!
//! AgentError 只在 Agent 内部流转：BaseAgent 在 process 顶层将其转为错误响应，绝不向调用方抛出。
//! OrchestratorError 面向编排器调用方（未知 Agent 类型）；工作流内的失败只记录在汇总里。

use thiserror::Error;

/// Agent 处理过程中可能出现的错误（校验、工具、超时等）
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Agent is not available")]
    Unavailable,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Tool {0} not found")]
    UnknownTool(String),

    #[error("Tools are disabled for this request (tool: {0})")]
    ToolsDisabled(String),

    #[error("Tool {tool} failed: {message}")]
    ToolExecutionFailed { tool: String, message: String },

    #[error("Tool timeout: {0}")]
    ToolTimeout(String),

    #[error("Tool call budget of {0} exceeded")]
    ToolBudgetExceeded(usize),

    #[error("Tool {tool} returned malformed output: {message}")]
    InvalidToolOutput { tool: String, message: String },

    #[error("Processing timed out after {0:.1}s")]
    Timeout(f64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AgentError {
    /// 仅瞬时的工具失败值得重试；校验与编程错误重试也不会变好
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AgentError::ToolExecutionFailed { .. } | AgentError::ToolTimeout(_)
        )
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AgentError::Validation(msg.into())
    }
}

/// 编排器层错误：直接返回给调用方（此时尚无请求/响应信封可承载）
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Unknown agent type: {0}")]
    UnknownAgent(String),
}
