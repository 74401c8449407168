use chrono::{DateTime, Utc};
use std::sync::RwLock;

/// # Summary
/// 时间供给器接口，隔离物理系统时钟。
/// 摄取流程通过它计算每个交易对的下载终点 (当前时间 + 缓冲)。
pub trait TimeProvider: Send + Sync {
    /// 获取当前时间
    fn now(&self) -> DateTime<Utc>;
}

/// 直接返回操作系统当前时间的真实时钟。
pub struct RealTimeProvider;

impl TimeProvider for RealTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// # Summary
/// 测试用固定时钟，可手动拨动时间。
///
/// # Invariants
/// - 内部使用 `RwLock`，可跨线程读写。
pub struct FakeClockProvider {
    current_time: RwLock<DateTime<Utc>>,
}

impl FakeClockProvider {
    pub fn new(initial_time: DateTime<Utc>) -> Self {
        Self {
            current_time: RwLock::new(initial_time),
        }
    }

    /// 从 unix 秒构造，超出 chrono 可表示范围时退化为 epoch。
    pub fn at_timestamp(secs: i64) -> Self {
        Self::new(DateTime::from_timestamp(secs, 0).unwrap_or_default())
    }

    pub fn set_time(&self, new_time: DateTime<Utc>) {
        let mut time = self.current_time.write().unwrap_or_else(|e| e.into_inner());
        *time = new_time;
    }
}

impl TimeProvider for FakeClockProvider {
    fn now(&self) -> DateTime<Utc> {
        *self.current_time.read().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fake_clock_set_time() {
        let clock = FakeClockProvider::at_timestamp(1_500_000_000);
        assert_eq!(clock.now().timestamp(), 1_500_000_000);
        clock.set_time(DateTime::from_timestamp(1_600_000_000, 0).unwrap());
        assert_eq!(clock.now().timestamp(), 1_600_000_000);
    }
}
