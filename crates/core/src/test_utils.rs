//! 供其他 crate 测试使用的内存替身 (需开启 `test-utils` feature)。

use crate::common::Pair;
use crate::config::DedupKey;
use crate::market::entity::{DownloadWindow, Trade};
use crate::market::error::MarketError;
use crate::market::port::TradeHistoryProvider;
use crate::store::error::StoreError;
use crate::store::port::TradeStore;
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

/// # Summary
/// 模拟交易所：持有每个交易对的完整成交历史，按真实接口的截断规则应答。
///
/// # Invariants
/// - 只返回窗口内最新的 `cap` 笔成交，按时间倒序。
/// - 未登记的交易对返回 `NoDataForPair`。
pub struct SimulatedExchange {
    history: HashMap<Pair, Vec<Trade>>,
    cap: usize,
    // 在正常应答前先返回的网络错误次数
    pending_failures: AtomicU32,
    requests: Mutex<Vec<(Pair, DownloadWindow)>>,
}

impl SimulatedExchange {
    pub fn new(cap: usize) -> Self {
        Self {
            history: HashMap::new(),
            cap,
            pending_failures: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_trades(mut self, pair: Pair, trades: Vec<Trade>) -> Self {
        self.history.insert(pair, trades);
        self
    }

    /// 接下来的 `n` 次请求以网络错误失败。
    pub fn fail_next(&self, n: u32) {
        self.pending_failures.store(n, Ordering::SeqCst);
    }

    /// 已收到的全部请求 (含失败的)。
    pub fn requests(&self) -> Vec<(Pair, DownloadWindow)> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl TradeHistoryProvider for SimulatedExchange {
    async fn fetch_trades(
        &self,
        pair: &Pair,
        window: DownloadWindow,
    ) -> Result<Vec<Trade>, MarketError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((pair.clone(), window));

        let failing = self
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(MarketError::Network("simulated connection reset".into()));
        }

        let trades = self
            .history
            .get(pair)
            .ok_or_else(|| MarketError::NoDataForPair(pair.to_string()))?;

        let mut hits: Vec<Trade> = trades
            .iter()
            .filter(|t| window.contains(t.timestamp()))
            .cloned()
            .collect();
        hits.sort_by(|a, b| (b.time, b.id).cmp(&(a.time, a.id)));
        hits.truncate(self.cap);
        Ok(hits)
    }
}

/// # Summary
/// 按脚本依次应答的行情源，脚本耗尽后返回空结果。
pub struct ScriptedProvider {
    script: Mutex<HashMap<Pair, VecDeque<Result<Vec<Trade>, MarketError>>>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn push(&self, pair: &Pair, response: Result<Vec<Trade>, MarketError>) {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(pair.clone())
            .or_default()
            .push_back(response);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TradeHistoryProvider for ScriptedProvider {
    async fn fetch_trades(
        &self,
        pair: &Pair,
        _window: DownloadWindow,
    ) -> Result<Vec<Trade>, MarketError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get_mut(pair)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// # Summary
/// 基于内存的成交存储，去重规则与 SQLite 实现一致 (主键 id + 可选的时间唯一约束)。
pub struct MemTradeStore {
    dedup_key: DedupKey,
    db: DashMap<Pair, Vec<Trade>>,
}

impl MemTradeStore {
    pub fn new(dedup_key: DedupKey) -> Self {
        Self {
            dedup_key,
            db: DashMap::new(),
        }
    }
}

#[async_trait]
impl TradeStore for MemTradeStore {
    async fn save_trades(&self, pair: &Pair, trades: &[Trade]) -> Result<u64, StoreError> {
        let mut entry = self.db.entry(pair.clone()).or_default();
        let mut inserted = 0;
        for trade in trades {
            let conflict = entry.iter().any(|t| {
                t.id == trade.id
                    || (self.dedup_key == DedupKey::Timestamp && t.timestamp() == trade.timestamp())
            });
            if !conflict {
                entry.push(trade.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn load_trades(&self, pair: &Pair) -> Result<Vec<Trade>, StoreError> {
        let mut trades = self.db.get(pair).map(|v| v.clone()).unwrap_or_default();
        trades.sort_by_key(|t| t.id);
        Ok(trades)
    }

    async fn count_trades(&self, pair: &Pair) -> Result<u64, StoreError> {
        Ok(self
            .db
            .get(pair)
            .map_or(0, |v| u64::try_from(v.len()).unwrap_or(u64::MAX)))
    }
}
