//! Agent 信封：请求/响应类型与 BaseAgent 运行时

mod base;
mod types;

pub use base::{AgentStatus, BaseAgent, DomainAgent, PerformanceMetrics};
pub use types::{
    clamp_unit, mean, AgentConfig, AgentOutput, AgentRequest, AgentResponse, AgentType,
};
