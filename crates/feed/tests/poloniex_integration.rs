use axum::Router;
use axum::extract::Query;
use axum::http::StatusCode;
use axum::routing::get;
use kura_core::common::Pair;
use kura_core::config::FeedConfig;
use kura_core::market::entity::DownloadWindow;
use kura_core::market::error::MarketError;
use kura_core::market::port::{PairSource, TradeHistoryProvider};
use kura_feed::poloniex::PoloniexProvider;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use tokio::net::TcpListener;

/// 模拟 Poloniex `/public` 接口的处理函数。
async fn public(Query(params): Query<HashMap<String, String>>) -> (StatusCode, String) {
    let get = |k: &str| params.get(k).map(String::as_str).unwrap_or_default();
    match get("command") {
        "returnCurrencies" => (
            StatusCode::OK,
            r#"{"BTC": {"id": 28}, "XMR": {"id": 171}, "ETH": {"id": 267}}"#.to_string(),
        ),
        "returnTradeHistory" => match (get("currencyPair"), get("start"), get("end")) {
            ("BTC_XMR", "1262304000", "1293840000") => (
                StatusCode::OK,
                r#"[
                  {"globalTradeID": 20, "tradeID": 2, "date": "2010-06-01 00:00:10", "type": "buy",  "rate": "0.0042", "amount": "1", "total": "0.0042"},
                  {"globalTradeID": 19, "tradeID": 1, "date": "2010-06-01 00:00:05", "type": "sell", "rate": "0.0041", "amount": "1", "total": "0.0041"}
                ]"#
                .to_string(),
            ),
            ("BTC_XMR", _, _) => (StatusCode::OK, "[]".to_string()),
            ("BTC_DOWN", _, _) => (StatusCode::BAD_GATEWAY, "upstream down".to_string()),
            ("BTC_GONE", _, _) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                r#"{"error":"Invalid currency pair."}"#.to_string(),
            ),
            ("BTC_BUSY", _, _) => (
                StatusCode::TOO_MANY_REQUESTS,
                r#"{"error":"Please do not make more than 6 calls per second."}"#.to_string(),
            ),
            _ => (
                StatusCode::OK,
                r#"{"error":"Invalid currency pair."}"#.to_string(),
            ),
        },
        _ => (StatusCode::OK, r#"{"error":"Invalid command."}"#.to_string()),
    }
}

/// 在随机端口启动模拟服务器，返回指向它的 provider。
async fn spawn_fake_exchange() -> PoloniexProvider {
    let _ = rustls::crypto::ring::default_provider().install_default();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().route("/public", get(public));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let config = FeedConfig {
        base_url: format!("http://{}/public", addr),
        request_timeout_secs: 5,
        ..FeedConfig::default()
    };
    PoloniexProvider::new(&config).unwrap()
}

#[tokio::test]
async fn test_fetch_trades_passes_window_as_unix_seconds() -> anyhow::Result<()> {
    let provider = spawn_fake_exchange().await;
    let pair = Pair::new("BTC_XMR")?;

    let trades = provider
        .fetch_trades(&pair, DownloadWindow::new(1262304000, 1293840000))
        .await?;
    assert_eq!(trades.len(), 2);
    assert_eq!(trades[0].id, 20);
    assert_eq!(trades[1].rate, dec!(0.0041));

    let empty = provider
        .fetch_trades(&pair, DownloadWindow::new(1293840001, 1325376000))
        .await?;
    assert!(empty.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_fetch_trades_error_mapping() -> anyhow::Result<()> {
    let provider = spawn_fake_exchange().await;
    let window = DownloadWindow::new(0, 10);

    let unknown = provider.fetch_trades(&Pair::new("BTC_NOPE")?, window).await;
    assert_eq!(unknown, Err(MarketError::NoDataForPair("BTC_NOPE".into())));

    let down = provider.fetch_trades(&Pair::new("BTC_DOWN")?, window).await;
    assert!(matches!(down, Err(MarketError::Network(_))));
    Ok(())
}

#[tokio::test]
async fn test_error_body_wins_over_http_status() -> anyhow::Result<()> {
    let provider = spawn_fake_exchange().await;
    let window = DownloadWindow::new(0, 10);

    let gone = provider.fetch_trades(&Pair::new("BTC_GONE")?, window).await;
    assert_eq!(gone, Err(MarketError::NoDataForPair("BTC_GONE".into())));
    assert!(!gone.unwrap_err().is_transient());

    let busy = provider.fetch_trades(&Pair::new("BTC_BUSY")?, window).await;
    assert!(matches!(busy, Err(MarketError::Api(_))));
    Ok(())
}

#[tokio::test]
async fn test_list_pairs_keeps_exchange_order() -> anyhow::Result<()> {
    let provider = spawn_fake_exchange().await;
    let pairs = provider.list_pairs().await?;
    let names: Vec<&str> = pairs.iter().map(Pair::as_str).collect();
    assert_eq!(names, vec!["BTC_XMR", "BTC_ETH"]);
    Ok(())
}
