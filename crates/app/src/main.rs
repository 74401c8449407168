mod settings;
mod telemetry;

use std::sync::Arc;

use kura_core::common::time::RealTimeProvider;
use kura_core::market::port::PairSource;
use kura_feed::fixed::StaticPairSource;
use kura_feed::poloniex::PoloniexProvider;
use kura_ingest::driver::IngestionDriver;
use kura_ingest::fetcher::TradeFetcher;
use kura_ingest::ingestor::{IngestSettings, PairIngestor};
use kura_ingest::retry::RetryPolicy;
use kura_ingest::writer::DeduplicatingWriter;
use kura_store::trade::SqliteTradeStore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// # Summary
/// 应用启动入口，纯粹的 DI 容器。
/// 负责实例化行情源、存储与摄取流水线，并依次下载全部交易对的成交历史。
///
/// # Logic
/// 1. 加载配置并初始化全局日志。
/// 2. 实例化基础设施层（Feed、Store）。
/// 3. 确定交易对列表：配置优先，否则向交易所查询。
/// 4. 组装摄取流水线（Fetcher、Writer、Ingestor、Driver）。
/// 5. 监听 Ctrl-C，收到信号后取消令牌，当前请求结束即退出。
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. 配置与日志
    let config = settings::load()?;
    let _log_guard = telemetry::init(&config.log)?;
    info!("Kura prefiller starting...");

    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }

    // 2. 基础设施层
    let ingest_settings = IngestSettings::from_config(&config.ingest)?;
    let store = Arc::new(SqliteTradeStore::open(&config.database, config.ingest.dedup_key).await?);
    let feed = Arc::new(PoloniexProvider::new(&config.feed)?);

    // 3. 交易对列表
    let pair_source: Arc<dyn PairSource> = if config.feed.pairs.is_empty() {
        feed.clone()
    } else {
        Arc::new(StaticPairSource::new(config.feed.pairs.clone()))
    };
    let pairs = pair_source.list_pairs().await?;
    info!("{} pairs to download", pairs.len());

    // 4. 摄取流水线
    let cancel = CancellationToken::new();
    let fetcher = TradeFetcher::new(
        feed,
        RetryPolicy::from_config(&config.retry),
        cancel.clone(),
    );
    let ingestor = PairIngestor::new(
        fetcher,
        DeduplicatingWriter::new(store),
        Arc::new(RealTimeProvider),
        ingest_settings,
        cancel.clone(),
    );
    let driver = IngestionDriver::new(ingestor, cancel.clone());

    // 5. 外部退出信号
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Shutdown signal received, stopping after the current request...");
            signal_token.cancel();
        }
    });

    let summary = driver.run(&pairs).await;
    if cancel.is_cancelled() {
        info!("Stopped early after {} pairs", summary.reports.len());
    }
    info!("Kura prefiller exiting.");

    Ok(())
}
