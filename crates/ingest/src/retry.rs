use kura_core::config::{BackoffKind, RetryConfig};
use std::time::Duration;

/// 两次重试之间的等待方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// 每次等待相同时长
    Fixed(Duration),
    /// 从 `base` 开始每次翻倍，不超过 `max`
    Exponential { base: Duration, max: Duration },
}

/// # Summary
/// 瞬时故障的重试策略。
///
/// # Invariants
/// - `max_attempts` 为 None 时无限重试；`Some(n)` 表示总共最多尝试 n 次 (`Some(0)` 视同 `Some(1)`)。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    backoff: Backoff,
    max_attempts: Option<u32>,
}

impl RetryPolicy {
    /// 固定间隔、无限重试。
    pub fn fixed(delay: Duration) -> Self {
        Self {
            backoff: Backoff::Fixed(delay),
            max_attempts: None,
        }
    }

    pub fn exponential(base: Duration, max: Duration) -> Self {
        Self {
            backoff: Backoff::Exponential { base, max },
            max_attempts: None,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        let base = Duration::from_millis(config.base_delay_ms);
        let policy = match config.backoff {
            BackoffKind::Fixed => Self::fixed(base),
            BackoffKind::Exponential => {
                Self::exponential(base, Duration::from_millis(config.max_delay_ms))
            }
        };
        Self {
            max_attempts: config.max_attempts,
            ..policy
        }
    }

    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    /// # Summary
    /// 计算第 `failures` 次失败之后的等待时长。
    ///
    /// # Arguments
    /// * `failures`: 已失败的次数 (从 1 开始)。
    ///
    /// # Returns
    /// 应等待的时长；已达到最大尝试次数时返回 None。
    pub fn delay_after(&self, failures: u32) -> Option<Duration> {
        if let Some(max) = self.max_attempts
            && failures >= max.max(1)
        {
            return None;
        }
        Some(match self.backoff {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential { base, max } => {
                let factor = 2u32
                    .checked_pow(failures.saturating_sub(1))
                    .unwrap_or(u32::MAX);
                base.saturating_mul(factor).min(max)
            }
        })
    }
}
