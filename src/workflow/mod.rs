//! 工作流：步骤类型、构建与校验、顺序执行引擎

pub mod builder;
pub mod engine;
pub mod types;

pub use builder::{
    artifact_analysis_workflow, excavation_planning_workflow, research_workflow, validate,
    WorkflowBuilder,
};
pub use engine::{AgentLookup, WorkflowEngine};
pub use types::*;
