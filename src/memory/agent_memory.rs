//! Agent 私有记忆：有界、按 TTL 过期的请求/响应快照
//!
//! 键为 `{agent_type}:{request_id}`；超过 ttl 的条目对读取不可见，并在写入/读取时顺带清理；
//! 条目数超过 max_size 时按存入时间淘汰最旧的。

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::agent::{AgentRequest, AgentResponse};

/// 单条记忆
#[derive(Debug, Clone, Serialize)]
pub struct MemoryEntry {
    pub request: AgentRequest,
    pub response: AgentResponse,
    pub stored_at: DateTime<Utc>,
}

/// 记忆用量摘要
#[derive(Debug, Clone, Serialize)]
pub struct MemorySummary {
    pub enabled: bool,
    pub size: usize,
    pub max_size: usize,
    pub ttl_secs: u64,
}

#[derive(Debug)]
pub struct AgentMemory {
    entries: HashMap<String, MemoryEntry>,
    max_size: usize,
    ttl: chrono::Duration,
    ttl_std: Duration,
}

impl AgentMemory {
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            max_size,
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
            ttl_std: ttl,
        }
    }

    pub fn key(agent_type: &str, request_id: &str) -> String {
        format!("{}:{}", agent_type, request_id)
    }

    /// agent_type 取 Agent 自身的类型名，与读取时的键一致
    pub fn store(&mut self, agent_type: &str, request: &AgentRequest, response: &AgentResponse) {
        self.store_at(agent_type, request, response, Utc::now());
    }

    /// 以指定时间写入（测试与回放用）
    pub fn store_at(
        &mut self,
        agent_type: &str,
        request: &AgentRequest,
        response: &AgentResponse,
        now: DateTime<Utc>,
    ) {
        let key = Self::key(agent_type, &request.id);
        self.entries.insert(
            key,
            MemoryEntry {
                request: request.clone(),
                response: response.clone(),
                stored_at: now,
            },
        );
        self.cleanup(now);
    }

    pub fn retrieve(&mut self, key: &str) -> Option<&MemoryEntry> {
        self.retrieve_at(key, Utc::now())
    }

    /// 读取；已过期的条目视为不存在并被删除
    pub fn retrieve_at(&mut self, key: &str, now: DateTime<Utc>) -> Option<&MemoryEntry> {
        let expired = self
            .entries
            .get(key)
            .map(|e| self.is_expired(e, now))?;
        if expired {
            self.entries.remove(key);
            return None;
        }
        self.entries.get(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// 物理条目数（可能包含尚未清理的过期条目）
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn summary(&self) -> MemorySummary {
        MemorySummary {
            enabled: true,
            size: self.entries.len(),
            max_size: self.max_size,
            ttl_secs: self.ttl_std.as_secs(),
        }
    }

    fn is_expired(&self, entry: &MemoryEntry, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(entry.stored_at) > self.ttl
    }

    /// 先清过期条目，再按存入时间淘汰到 max_size
    fn cleanup(&mut self, now: DateTime<Utc>) {
        let ttl = self.ttl;
        self.entries
            .retain(|_, e| now.signed_duration_since(e.stored_at) <= ttl);

        if self.entries.len() > self.max_size {
            let mut by_age: Vec<(DateTime<Utc>, String)> = self
                .entries
                .iter()
                .map(|(k, e)| (e.stored_at, k.clone()))
                .collect();
            by_age.sort();
            let excess = self.entries.len() - self.max_size;
            for (_, key) in by_age.into_iter().take(excess) {
                self.entries.remove(&key);
            }
        }
    }
}
