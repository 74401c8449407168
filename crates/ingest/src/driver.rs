use crate::ingestor::{PairIngestor, PairOutcome, PairReport};
use kura_core::common::Pair;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// 一次完整运行的汇总。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestionSummary {
    pub reports: Vec<PairReport>,
}

impl IngestionSummary {
    fn count(&self, pred: impl Fn(&PairOutcome) -> bool) -> usize {
        self.reports.iter().filter(|r| pred(&r.outcome)).count()
    }

    pub fn completed(&self) -> usize {
        self.count(|o| *o == PairOutcome::Completed)
    }

    pub fn no_data(&self) -> usize {
        self.count(|o| *o == PairOutcome::NoData)
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, PairOutcome::Failed(_)))
    }

    pub fn trades_inserted(&self) -> u64 {
        self.reports.iter().map(|r| r.trades_inserted).sum()
    }
}

/// # Summary
/// 摄取驱动器：按给定顺序逐个处理交易对。
///
/// # Invariants
/// - 严格串行，上一个交易对完成或放弃后才开始下一个。
/// - 单个交易对的失败不影响后续交易对；只有取消会提前结束整个运行。
pub struct IngestionDriver {
    ingestor: PairIngestor,
    cancel: CancellationToken,
}

impl IngestionDriver {
    pub fn new(ingestor: PairIngestor, cancel: CancellationToken) -> Self {
        Self { ingestor, cancel }
    }

    /// # Summary
    /// 依次下载所有交易对。
    ///
    /// # Logic
    /// 1. 每个交易对开始前检查取消令牌。
    /// 2. 调用 `PairIngestor::ingest` 并记录报告。
    /// 3. 交易对被取消时停止，不再开始后续交易对。
    /// 4. 结束时输出汇总日志。
    ///
    /// # Arguments
    /// * `pairs`: 有序的交易对序列。
    ///
    /// # Returns
    /// 每个已尝试交易对的报告。
    pub async fn run(&self, pairs: &[Pair]) -> IngestionSummary {
        let mut summary = IngestionSummary::default();

        for (i, pair) in pairs.iter().enumerate() {
            if self.cancel.is_cancelled() {
                break;
            }
            info!("Starting download for pair {} ({}/{})", pair, i + 1, pairs.len());
            let report = self.ingestor.ingest(pair).await;
            let cancelled = report.outcome == PairOutcome::Cancelled;
            summary.reports.push(report);
            if cancelled {
                break;
            }
        }

        info!(
            "Ingestion finished: {} completed, {} without data, {} failed, {} trades inserted",
            summary.completed(),
            summary.no_data(),
            summary.failed(),
            summary.trades_inserted()
        );
        summary
    }
}
