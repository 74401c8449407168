use kura_core::common::Pair;
use kura_core::market::entity::Trade;
use kura_core::store::error::StoreError;
use kura_core::store::port::TradeStore;
use std::sync::Arc;

/// # Summary
/// 去重写入器：按成交编号排序后交给存储层执行 "插入或忽略"。
///
/// # Invariants
/// - 同一批数据写入多次与写入一次的结果相同。
/// - 排序只为稳定写入顺序，便于排查；去重完全依赖存储层唯一约束。
pub struct DeduplicatingWriter {
    store: Arc<dyn TradeStore>,
}

impl DeduplicatingWriter {
    pub fn new(store: Arc<dyn TradeStore>) -> Self {
        Self { store }
    }

    /// 写入一批成交，返回实际新增行数。空批次不触达存储。
    pub async fn persist(&self, pair: &Pair, mut trades: Vec<Trade>) -> Result<u64, StoreError> {
        if trades.is_empty() {
            return Ok(0);
        }
        trades.sort_by_key(|t| t.id);
        self.store.save_trades(pair, &trades).await
    }
}
