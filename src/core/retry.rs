//! 重试策略
//!
//! 根据 AgentError 类型决定是否重试：瞬时工具失败按指数退避（retry_delay * 2^attempt）重试，
//! 其余错误立即返回。尝试次数用尽后把最后一次错误交给调用方。

use std::future::Future;
use std::time::Duration;

use crate::core::AgentError;

/// 指数退避重试策略
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// 总尝试次数（含首次），至少为 1
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_retries.max(1),
            base_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// 第 attempt 次失败（从 0 计）之后、下一次尝试之前的等待时间
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    /// 运行 op，直到成功、遇到不可重试错误或尝试次数用尽；op 收到当前尝试序号（从 0 计）
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, AgentError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, AgentError>>,
    {
        let mut attempt = 0;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt + 1 < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Attempt failed, retrying: {}",
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_retryable() {
                        tracing::error!(attempts = attempt + 1, "All attempts failed: {}", e);
                    }
                    return Err(e);
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}
