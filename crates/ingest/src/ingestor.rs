use crate::error::{IngestError, ScheduleError};
use crate::fetcher::TradeFetcher;
use crate::scheduler::{IngestionState, ScheduleLimits, Transition};
use crate::writer::DeduplicatingWriter;
use kura_core::common::Pair;
use kura_core::common::time::TimeProvider;
use kura_core::config::IngestConfig;
use kura_core::market::entity::BatchSummary;
use kura_core::market::error::MarketError;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// # Summary
/// 单个交易对摄取所需的参数。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestSettings {
    // 历史起点 (unix 秒)
    pub history_start: i64,
    // 下载终点 = 当前时间 + 该缓冲 (秒)
    pub end_padding_secs: i64,
    // 两次请求之间的固定间隔
    pub request_delay: Duration,
    pub limits: ScheduleLimits,
}

impl IngestSettings {
    pub fn from_config(config: &IngestConfig) -> Result<Self, ScheduleError> {
        Ok(Self {
            history_start: config.history_start,
            end_padding_secs: config.end_padding_secs,
            request_delay: Duration::from_millis(config.request_delay_ms),
            limits: ScheduleLimits::from_config(config)?,
        })
    }
}

/// 交易对摄取的最终结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairOutcome {
    /// 窗口已推进到下载终点
    Completed,
    /// 交易所报告该交易对没有历史
    NoData,
    /// 因错误放弃，附错误描述
    Failed(String),
    /// 被外部取消
    Cancelled,
}

/// 单个交易对的摄取报告。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairReport {
    pub pair: Pair,
    pub outcome: PairOutcome,
    // 成功完成的请求数 (不含重试)
    pub requests: u64,
    pub trades_fetched: u64,
    pub trades_inserted: u64,
}

impl PairReport {
    fn new(pair: &Pair) -> Self {
        Self {
            pair: pair.clone(),
            outcome: PairOutcome::Completed,
            requests: 0,
            trades_fetched: 0,
            trades_inserted: 0,
        }
    }
}

/// # Summary
/// 交易对摄取器：循环 "调度 -> 抓取 -> 写入 -> 更新状态"，直到窗口越过下载终点。
///
/// # Invariants
/// - 同一时刻只处理一个窗口，请求之间固定等待 `request_delay`。
/// - 每轮开始前及等待期间检查取消令牌。
/// - 任何错误只终止当前交易对，不向上传播。
pub struct PairIngestor {
    fetcher: TradeFetcher,
    writer: DeduplicatingWriter,
    clock: Arc<dyn TimeProvider>,
    settings: IngestSettings,
    cancel: CancellationToken,
}

impl PairIngestor {
    pub fn new(
        fetcher: TradeFetcher,
        writer: DeduplicatingWriter,
        clock: Arc<dyn TimeProvider>,
        settings: IngestSettings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            fetcher,
            writer,
            clock,
            settings,
            cancel,
        }
    }

    /// # Summary
    /// 下载一个交易对的完整历史。
    ///
    /// # Logic
    /// 1. 执行主循环并收集统计。
    /// 2. 将循环结果映射为 `PairOutcome`：`NoDataForPair` 视为正常结束 (不记 error)，
    ///    取消单独标记，其余错误记录后放弃该交易对。
    ///
    /// # Arguments
    /// * `pair`: 交易对。
    ///
    /// # Returns
    /// 该交易对的摄取报告。
    pub async fn ingest(&self, pair: &Pair) -> PairReport {
        let mut report = PairReport::new(pair);
        report.outcome = match self.run(pair, &mut report).await {
            Ok(()) => {
                info!(
                    "Download complete for {}: {} requests, {} trades inserted",
                    pair, report.requests, report.trades_inserted
                );
                PairOutcome::Completed
            }
            Err(IngestError::Market(MarketError::NoDataForPair(_))) => {
                info!("No data available for {}, skipping", pair);
                PairOutcome::NoData
            }
            Err(IngestError::Cancelled) => {
                warn!("Download for {} cancelled", pair);
                PairOutcome::Cancelled
            }
            Err(e) => {
                error!("Abandoning {}: {}", pair, e);
                PairOutcome::Failed(e.to_string())
            }
        };
        report
    }

    async fn run(&self, pair: &Pair, report: &mut PairReport) -> Result<(), IngestError> {
        let limits = self.settings.limits;
        let end_timestamp = self
            .clock
            .now()
            .timestamp()
            .saturating_add(self.settings.end_padding_secs);
        let mut state = IngestionState::new(self.settings.history_start, end_timestamp, &limits)?;

        loop {
            if self.cancel.is_cancelled() {
                return Err(IngestError::Cancelled);
            }

            let window = state.window();
            debug!("Downloading {} chunk {}", pair, window);
            let trades = self.fetcher.fetch(pair, window).await?;
            let summary = BatchSummary::of(&trades);
            report.requests += 1;
            report.trades_fetched += u64::try_from(summary.count).unwrap_or(u64::MAX);
            report.trades_inserted += self.writer.persist(pair, trades).await?;

            let step = state.advance(&limits, summary);
            match step.transition {
                Transition::Backtracked if !state.is_backtracking() => info!(
                    "{}: {} returned a full batch of {}, backtracking",
                    pair, window, summary.count
                ),
                Transition::Backtracked => debug!("{}: still backtracking", pair),
                Transition::Resumed => info!(
                    "{}: backtracking finished with {} trades, resuming after {}",
                    pair,
                    summary.count,
                    state.max_end_seen().max(window.end)
                ),
                Transition::ForcedResume => warn!(
                    "{}: {} is truncated within its first second, moving on",
                    pair, window
                ),
                Transition::Advanced => {}
            }

            state = match step.next {
                Some(next) => next,
                None => return Ok(()),
            };

            tokio::select! {
                _ = self.cancel.cancelled() => return Err(IngestError::Cancelled),
                _ = tokio::time::sleep(self.settings.request_delay) => {}
            }
        }
    }
}
