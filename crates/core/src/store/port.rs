use super::error::StoreError;
use crate::common::Pair;
use crate::market::entity::Trade;
use async_trait::async_trait;

/// # Summary
/// 成交数据存储接口，每个交易对对应一个独立的存储单元 (表)。
///
/// # Invariants
/// - 写入为 "插入或忽略"：与已有记录的唯一键冲突时静默丢弃，不报错。
/// - 存储单元及其索引在首次使用时幂等创建。
#[async_trait]
pub trait TradeStore: Send + Sync {
    /// # Summary
    /// 批量保存成交记录。
    ///
    /// # Logic
    /// 1. 确保交易对的表与唯一约束存在。
    /// 2. 逐条执行 `INSERT OR IGNORE`。
    ///
    /// # Arguments
    /// * `pair`: 目标交易对。
    /// * `trades`: 待保存的成交列表。
    ///
    /// # Returns
    /// 实际新插入的行数 (被去重丢弃的不计入)。
    async fn save_trades(&self, pair: &Pair, trades: &[Trade]) -> Result<u64, StoreError>;

    /// 按成交编号升序加载交易对的全部成交。表不存在时返回空列表。
    async fn load_trades(&self, pair: &Pair) -> Result<Vec<Trade>, StoreError>;

    /// 交易对已持久化的成交笔数。表不存在时返回 0。
    async fn count_trades(&self, pair: &Pair) -> Result<u64, StoreError>;
}
