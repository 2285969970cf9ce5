//! 重试驱动
//!
//! 第 n 次尝试（从 1 开始）失败后等待 min(base * 2^(n-1), max)；最多 max_attempts 次；
//! 不可重试的错误立即返回。submit 本身从不自动重试，由调用方显式使用本驱动。

use std::time::Duration;

use crate::core::{ChatError, ChatOrchestrator};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY_MS: u64 = 1000;
pub const DEFAULT_MAX_DELAY_MS: u64 = 30_000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
        }
    }
}

impl RetryPolicy {
    /// 第 attempt 次失败后的等待时间；attempt 为 0 时按 1 处理
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.max(1) - 1;
        let factor = 1u64.checked_shl(exponent).unwrap_or(u64::MAX);
        let ms = self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(ms)
    }

    /// 是否应在第 attempt 次失败后再试
    pub fn should_retry(&self, err: &ChatError, attempt: u32) -> bool {
        err.is_retryable() && attempt < self.max_attempts
    }
}

/// 带重试的 submit；返回成功回复或最后一次的错误
pub async fn submit_with_retry(
    orchestrator: &ChatOrchestrator,
    user_text: &str,
    credential: Option<&str>,
    policy: &RetryPolicy,
) -> Result<String, ChatError> {
    let mut attempt = 1;
    loop {
        match orchestrator.submit(user_text, credential).await {
            Ok(reply) => return Ok(reply),
            Err(err) if policy.should_retry(&err, attempt) => {
                let delay = policy.delay_for_attempt(attempt);
                tracing::warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Retryable failure ({}), backing off",
                    err
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
