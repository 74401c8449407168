use crate::common::Pair;
use serde::{Deserialize, Serialize};

/// 1 年的秒数 (按 365.2422 天计)
pub const SECONDS_IN_A_YEAR: i64 = 31_556_926;

/// 2010-01-01T00:00:00Z，早于所有可能存在的成交历史
pub const DEFAULT_HISTORY_START: i64 = 1_262_304_000;

/// 交易所单次返回记录数上限
pub const DEFAULT_RECORD_CAP: usize = 50_000;

/// 全局应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub feed: FeedConfig,
    pub ingest: IngestConfig,
    pub retry: RetryConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub data_dir: String,
    pub file_name: String,
}

/// 行情源配置。`pairs` 非空时直接使用该列表，不再请求币种列表接口。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub base_url: String,
    pub quote_currency: String,
    pub request_timeout_secs: u64,
    pub pairs: Vec<Pair>,
}

/// # Summary
/// 摄取流程参数，默认值即交易所的隐含约定。
///
/// # Invariants
/// - `record_cap >= 1`。
/// - `window_permille` 在 (0, 1000] 之间，实际窗口跨度为 `max_window_secs * window_permille / 1000`。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    // 历史起点 (unix 秒)
    pub history_start: i64,
    // 下载终点 = 摄取开始时间 + 该缓冲 (秒)
    pub end_padding_secs: i64,
    // 两次请求之间的固定间隔 (毫秒)
    pub request_delay_ms: u64,
    // 交易所单次返回记录数上限，达到即视为截断
    pub record_cap: usize,
    // 交易所允许的最大窗口跨度 (秒)
    pub max_window_secs: i64,
    // 实际使用的窗口跨度占最大跨度的千分比
    pub window_permille: u32,
    // 存储层去重键
    pub dedup_key: DedupKey,
}

/// # Summary
/// 存储层唯一键的选择。
///
/// # Invariants
/// - `Timestamp`：同一秒内的多笔成交只保留最先写入的一笔 (沿用既有行为)。
/// - `TradeId`：仅以交易所成交编号去重。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupKey {
    #[default]
    Timestamp,
    TradeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffKind {
    #[default]
    Fixed,
    Exponential,
}

/// 瞬时故障重试策略。`max_attempts` 为空表示无限重试。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub backoff: BackoffKind,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_attempts: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    // 默认日志级别，可被 RUST_LOG 覆盖
    pub level: String,
    // 非空时额外按天滚动写入该目录
    pub dir: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            file_name: "trades.db".to_string(),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: "https://poloniex.com/public".to_string(),
            quote_currency: "BTC".to_string(),
            request_timeout_secs: 60,
            pairs: Vec::new(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            history_start: DEFAULT_HISTORY_START,
            end_padding_secs: 86_400,
            request_delay_ms: 10_254,
            record_cap: DEFAULT_RECORD_CAP,
            max_window_secs: SECONDS_IN_A_YEAR,
            window_permille: 990,
            dedup_key: DedupKey::Timestamp,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            backoff: BackoffKind::Fixed,
            base_delay_ms: 10_169,
            max_delay_ms: 300_000,
            max_attempts: None,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.database.data_dir, "data");
        assert_eq!(config.feed.quote_currency, "BTC");
        assert!(config.feed.pairs.is_empty());
        assert_eq!(config.ingest.history_start, 1_262_304_000);
        assert_eq!(config.ingest.record_cap, 50_000);
        assert_eq!(config.ingest.dedup_key, DedupKey::Timestamp);
        assert_eq!(config.retry.backoff, BackoffKind::Fixed);
        assert_eq!(config.retry.max_attempts, None);
    }
}
