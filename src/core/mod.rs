//! 核心编排层：错误类型、重试策略、编排器

pub mod error;
pub mod orchestrator;
pub mod retry;

pub use error::{AgentError, OrchestratorError};
pub use orchestrator::{AgentRegistry, HealthReport, HealthStatus, Orchestrator};
pub use retry::RetryPolicy;
