//! 记忆层：每个 Agent 私有的有界 TTL 记忆（请求/响应快照）

pub mod agent_memory;

pub use agent_memory::{AgentMemory, MemoryEntry, MemorySummary};
