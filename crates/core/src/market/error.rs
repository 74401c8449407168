use thiserror::Error;

/// # Summary
/// 行情源错误枚举，区分可重试的瞬时故障与交易对级别的终止错误。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
/// - 只有 `Network` 与 `Parse` 属于瞬时故障。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarketError {
    // 网络层错误，包含底层 HTTP 客户端错误信息
    #[error("Network error: {0}")]
    Network(String),
    // 响应体解析错误，如 JSON 格式不匹配或字段非法
    #[error("Parse error: {0}")]
    Parse(String),
    // 交易所报告该交易对没有任何历史
    #[error("No data for pair {0}")]
    NoDataForPair(String),
    // 交易所报告的其他语义错误
    #[error("API error: {0}")]
    Api(String),
    // 重试次数耗尽，`last` 为最后一次瞬时错误
    #[error("Gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },
}

impl MarketError {
    /// 是否为可按相同参数重试的瞬时故障。
    pub fn is_transient(&self) -> bool {
        matches!(self, MarketError::Network(_) | MarketError::Parse(_))
    }
}
