use async_trait::async_trait;
use kura_core::common::Pair;
use kura_core::market::error::MarketError;
use kura_core::market::port::PairSource;

/// # Summary
/// 固定列表的交易对来源，配置中显式给出 `feed.pairs` 时使用。
///
/// # Invariants
/// - 按给定顺序原样返回。
pub struct StaticPairSource {
    pairs: Vec<Pair>,
}

impl StaticPairSource {
    pub fn new(pairs: Vec<Pair>) -> Self {
        Self { pairs }
    }
}

#[async_trait]
impl PairSource for StaticPairSource {
    async fn list_pairs(&self) -> Result<Vec<Pair>, MarketError> {
        Ok(self.pairs.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_pairs_keep_order() {
        let pairs = vec![Pair::new("BTC_ZEC").unwrap(), Pair::new("BTC_ETH").unwrap()];
        let source = StaticPairSource::new(pairs.clone());
        assert_eq!(source.list_pairs().await.unwrap(), pairs);
    }
}
