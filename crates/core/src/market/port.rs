use crate::common::Pair;
use crate::market::entity::{DownloadWindow, Trade};
use crate::market::error::MarketError;
use async_trait::async_trait;

/// # Summary
/// 历史成交数据源接口 (单次请求，不含重试)。
///
/// # Invariants
/// - 单次返回的记录数受交易所上限约束，超出时只返回窗口内最新的那部分。
/// - 返回顺序以交易所为准 (通常为时间倒序)，调用方不得依赖。
#[async_trait]
pub trait TradeHistoryProvider: Send + Sync {
    /// # Summary
    /// 查询交易对在指定窗口内的成交记录。
    ///
    /// # Logic
    /// 1. 以窗口起止 unix 秒构造请求。
    /// 2. 执行网络请求并解析响应。
    /// 3. 将交易所报告的错误映射为 `NoDataForPair` 或 `Api`。
    ///
    /// # Arguments
    /// * `pair`: 交易对。
    /// * `window`: 查询窗口 (闭区间)。
    ///
    /// # Returns
    /// 成功返回成交列表；传输或解析失败返回瞬时错误 (`Network` / `Parse`)。
    async fn fetch_trades(
        &self,
        pair: &Pair,
        window: DownloadWindow,
    ) -> Result<Vec<Trade>, MarketError>;
}

/// # Summary
/// 交易对枚举器，在启动时提供有序的交易对序列。
#[async_trait]
pub trait PairSource: Send + Sync {
    /// 返回需要摄取的交易对，顺序即摄取顺序。
    async fn list_pairs(&self) -> Result<Vec<Pair>, MarketError>;
}
