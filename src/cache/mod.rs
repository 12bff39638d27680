//! 响应缓存
//!
//! Cache 是外部协作者（可接 Redis 等），核心只依赖 get / set / exists 三个操作。
//! 缓存键按内容寻址：`{agent_type}:{sha256(规范化 JSON 载荷)}`，同一分析的重复请求落到同一键上。
//! 并发的相同请求可能各自计算一次后覆盖写入（不做单飞锁）。

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

/// 缓存协作者接口
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Option<Value>;

    async fn set(&self, key: &str, value: Value, ttl: Duration);

    async fn exists(&self, key: &str) -> bool;
}

/// 计算内容寻址缓存键；serde_json 的对象键有序，序列化结果即规范形式
pub fn content_key(agent_type: &str, payload: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.to_string().as_bytes());
    format!("{}:{}", agent_type, hex::encode(hasher.finalize()))
}

/// 过期时刻；None 表示 ttl 超出 Instant 可表示范围，视为永不过期
type Expiry = Option<Instant>;

fn is_live(expires_at: &Expiry, now: Instant) -> bool {
    expires_at.map_or(true, |at| at > now)
}

/// 进程内缓存：读取时过滤过期条目
#[derive(Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, (Value, Expiry)>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|(_, expires_at)| is_live(expires_at, now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// 删除所有过期条目，返回删除数量
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, (_, expires_at)| is_live(expires_at, now));
        before - entries.len()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> Option<Value> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|(_, expires_at)| is_live(expires_at, Instant::now()))
            .map(|(value, _)| value.clone())
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) {
        let expires_at = Instant::now().checked_add(ttl);
        self.entries
            .write()
            .await
            .insert(key.to_string(), (value, expires_at));
    }

    async fn exists(&self, key: &str) -> bool {
        self.get(key).await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_key_ignores_field_order() {
        let a = json!({"sample_data": {"c14_ratio": 0.5, "sample_type": "charcoal"}});
        let b: Value =
            serde_json::from_str(r#"{"sample_data": {"sample_type": "charcoal", "c14_ratio": 0.5}}"#)
                .unwrap();
        assert_eq!(content_key("carbon_dating", &a), content_key("carbon_dating", &b));
        assert!(content_key("carbon_dating", &a).starts_with("carbon_dating:"));
    }

    #[test]
    fn test_content_key_differs_by_agent_and_payload() {
        let payload = json!({"x": 1});
        assert_ne!(content_key("a", &payload), content_key("b", &payload));
        assert_ne!(content_key("a", &payload), content_key("a", &json!({"x": 2})));
    }

    #[tokio::test]
    async fn test_set_get_exists() {
        let cache = InMemoryCache::new();
        assert!(!cache.exists("k").await);
        cache.set("k", json!({"v": 1}), Duration::from_secs(60)).await;
        assert!(cache.exists("k").await);
        assert_eq!(cache.get("k").await, Some(json!({"v": 1})));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_expired_entries_invisible() {
        let cache = InMemoryCache::new();
        cache.set("k", json!(1), Duration::from_millis(10)).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(cache.get("k").await.is_none());
        assert_eq!(cache.purge_expired().await, 1);
    }

    #[tokio::test]
    async fn test_huge_ttl_never_expires() {
        let cache = InMemoryCache::new();
        cache.set("k", json!(1), Duration::from_secs(u64::MAX)).await;
        assert!(cache.exists("k").await);
        assert_eq!(cache.purge_expired().await, 0);
    }
}
