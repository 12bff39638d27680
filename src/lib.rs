//! ArchaeoVault - 考古研究多智能体编排核心
//!
//! 模块划分：
//! - **agent**: Agent 信封（请求/响应/配置）与 BaseAgent（缓存、记忆、重试、超时、指标）
//! - **agents**: 六个领域 Agent（文物分析、碳测年、文明研究、发掘计划、报告生成、研究助手）
//! - **cache**: 缓存协作者接口、内容寻址键与内存实现
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、重试策略、编排器
//! - **memory**: 每个 Agent 私有的有界 TTL 记忆
//! - **models**: 各领域的类型化载荷与结果
//! - **observability**: 日志订阅器初始化
//! - **tools**: Tool trait、注册表、执行器与各领域工具
//! - **workflow**: 工作流步骤、构建校验与顺序执行引擎

pub mod agent;
pub mod agents;
pub mod cache;
pub mod config;
pub mod core;
pub mod memory;
pub mod models;
pub mod observability;
pub mod tools;
pub mod workflow;

pub use crate::core::{Orchestrator, OrchestratorError};
