use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// # Summary
/// 单笔成交记录，由行情源产出，之后不再修改。
///
/// # Invariants
/// - `id` 为交易所分配，在同一交易对内全局唯一。
/// - `time` 精度为秒。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    // 交易所分配的成交编号
    pub id: i64,
    // 成交时间 (UTC，秒精度)
    pub time: DateTime<Utc>,
    // 成交价
    pub rate: Decimal,
}

impl Trade {
    /// 成交时间的 unix 秒。
    pub fn timestamp(&self) -> i64 {
        self.time.timestamp()
    }
}

/// # Summary
/// 单次历史查询的时间窗口，闭区间 `[start, end]`，单位为 unix 秒。
///
/// # Invariants
/// - 交易所要求 `end - start` 不超过约一年，超出的窗口会被拒绝。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DownloadWindow {
    pub start: i64,
    pub end: i64,
}

impl DownloadWindow {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// 窗口跨度 (秒)。
    pub fn span_secs(&self) -> i64 {
        self.end - self.start
    }

    /// 时间戳是否落在窗口内 (含两端)。
    pub fn contains(&self, ts: i64) -> bool {
        ts >= self.start && ts <= self.end
    }
}

impl fmt::Display for DownloadWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// # Summary
/// 一次抓取结果的摘要，供窗口调度器判断是否被截断。
///
/// # Invariants
/// - `count > 0` 时 `earliest` 必为 `Some`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    // 本批成交笔数
    pub count: usize,
    // 本批中最早一笔成交的 unix 秒
    pub earliest: Option<i64>,
}

impl BatchSummary {
    pub fn of(trades: &[Trade]) -> Self {
        Self {
            count: trades.len(),
            earliest: trades.iter().map(Trade::timestamp).min(),
        }
    }

    pub fn empty() -> Self {
        Self {
            count: 0,
            earliest: None,
        }
    }
}
