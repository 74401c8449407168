use kura_core::market::error::MarketError;
use kura_core::store::error::StoreError;
use thiserror::Error;

/// 调度参数或初始区间非法。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("record cap must be at least 1")]
    ZeroCap,
    #[error("window permille must be within 1..=1000, got {0}")]
    WindowPermille(u32),
    #[error("window span must be at least 1 second, got {0}")]
    EmptyWindow(i64),
    #[error("history start {start} is not before end {end}")]
    EmptyRange { start: i64, end: i64 },
}

/// # Summary
/// 单个交易对摄取过程中的错误，任何一种都只终止当前交易对。
#[derive(Error, Debug)]
pub enum IngestError {
    #[error(transparent)]
    Market(#[from] MarketError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error("ingestion cancelled")]
    Cancelled,
}
