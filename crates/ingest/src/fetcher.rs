use crate::error::IngestError;
use crate::retry::RetryPolicy;
use kura_core::common::Pair;
use kura_core::market::entity::{DownloadWindow, Trade};
use kura_core::market::error::MarketError;
use kura_core::market::port::TradeHistoryProvider;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// # Summary
/// 带重试的成交查询器，包装一个单次请求的 `TradeHistoryProvider`。
///
/// # Invariants
/// - 只重试瞬时错误 (`Network` / `Parse`)，且每次重试的参数完全相同。
/// - 重试串行执行，同一时刻最多一个在途请求。
/// - 等待期间可被取消。
pub struct TradeFetcher {
    provider: Arc<dyn TradeHistoryProvider>,
    policy: RetryPolicy,
    cancel: CancellationToken,
}

impl TradeFetcher {
    pub fn new(
        provider: Arc<dyn TradeHistoryProvider>,
        policy: RetryPolicy,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            provider,
            policy,
            cancel,
        }
    }

    /// # Summary
    /// 查询窗口内的成交，瞬时失败时按策略重试。
    ///
    /// # Logic
    /// 1. 调用 provider。
    /// 2. 成功或非瞬时错误直接返回。
    /// 3. 瞬时错误：向策略询问等待时长；策略放弃则返回 `RetriesExhausted`，否则等待后重试。
    ///
    /// # Arguments
    /// * `pair`: 交易对。
    /// * `window`: 查询窗口。
    ///
    /// # Returns
    /// 交易所返回的成交 (顺序不做保证)。
    pub async fn fetch(
        &self,
        pair: &Pair,
        window: DownloadWindow,
    ) -> Result<Vec<Trade>, IngestError> {
        let mut failures = 0u32;
        loop {
            let err = match self.provider.fetch_trades(pair, window).await {
                Ok(trades) => return Ok(trades),
                Err(e) if e.is_transient() => e,
                Err(e) => return Err(e.into()),
            };

            failures = failures.saturating_add(1);
            let Some(delay) = self.policy.delay_after(failures) else {
                return Err(MarketError::RetriesExhausted {
                    attempts: failures,
                    last: err.to_string(),
                }
                .into());
            };

            warn!(
                "Error fetching {} {} (attempt {}): {}; retrying in {:?}",
                pair, window, failures, err, delay
            );
            tokio::select! {
                _ = self.cancel.cancelled() => return Err(IngestError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kura_core::test_utils::ScriptedProvider;
    use std::time::Duration;

    fn pair() -> Pair {
        Pair::new("BTC_XMR").unwrap()
    }

    fn window() -> DownloadWindow {
        DownloadWindow::new(0, 100)
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.push(&pair(), Err(MarketError::Network("reset".into())));
        provider.push(&pair(), Err(MarketError::Parse("eof".into())));
        provider.push(&pair(), Ok(vec![]));

        let fetcher = TradeFetcher::new(
            provider.clone(),
            RetryPolicy::fixed(Duration::from_millis(1)),
            CancellationToken::new(),
        );
        let trades = fetcher.fetch(&pair(), window()).await.unwrap();
        assert!(trades.is_empty());
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn test_semantic_errors_are_not_retried() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.push(&pair(), Err(MarketError::NoDataForPair("BTC_XMR".into())));

        let fetcher = TradeFetcher::new(
            provider.clone(),
            RetryPolicy::fixed(Duration::from_millis(1)),
            CancellationToken::new(),
        );
        let result = fetcher.fetch(&pair(), window()).await;
        assert!(matches!(
            result,
            Err(IngestError::Market(MarketError::NoDataForPair(_)))
        ));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let provider = Arc::new(ScriptedProvider::new());
        for _ in 0..5 {
            provider.push(&pair(), Err(MarketError::Network("down".into())));
        }

        let fetcher = TradeFetcher::new(
            provider.clone(),
            RetryPolicy::fixed(Duration::from_millis(1)).with_max_attempts(2),
            CancellationToken::new(),
        );
        let result = fetcher.fetch(&pair(), window()).await;
        assert!(matches!(
            result,
            Err(IngestError::Market(MarketError::RetriesExhausted { attempts: 2, .. }))
        ));
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_retry_delay() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.push(&pair(), Err(MarketError::Network("down".into())));

        let cancel = CancellationToken::new();
        let fetcher = TradeFetcher::new(
            provider,
            RetryPolicy::fixed(Duration::from_secs(3600)),
            cancel.clone(),
        );
        cancel.cancel();
        let result = fetcher.fetch(&pair(), window()).await;
        assert!(matches!(result, Err(IngestError::Cancelled)));
    }
}
