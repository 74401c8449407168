use async_trait::async_trait;
use chrono::NaiveDateTime;
use kura_core::common::Pair;
use kura_core::config::FeedConfig;
use kura_core::market::entity::{DownloadWindow, Trade};
use kura_core::market::error::MarketError;
use kura_core::market::port::{PairSource, TradeHistoryProvider};
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

/// 交易所对不存在的交易对返回的错误文本
const INVALID_PAIR_ERROR: &str = "Invalid currency pair.";

/// 成交时间字段格式 (UTC)
const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// # Summary
/// Poloniex 公共接口的行情提供者，同时实现成交历史查询与交易对枚举。
///
/// # Invariants
/// - 使用 `reqwest` 异步客户端，单次请求不做重试 (重试由摄取层的 fetcher 负责)。
/// - 传输失败与响应解析失败分别映射为 `Network` 与 `Parse`，均为瞬时错误。
#[derive(Clone)]
pub struct PoloniexProvider {
    /// 内部使用的 HTTP 客户端
    client: Client,
    /// 公共接口地址，例如 `https://poloniex.com/public`
    base_url: String,
    /// 枚举交易对时使用的计价币种
    quote_currency: String,
}

impl PoloniexProvider {
    /// # Summary
    /// 创建一个新的 PoloniexProvider 实例。
    ///
    /// # Logic
    /// 1. 按配置设置请求超时。
    /// 2. 初始化 reqwest 客户端。
    ///
    /// # Arguments
    /// * `config`: 行情源配置。
    ///
    /// # Returns
    /// 成功返回 provider；客户端构造失败返回 `MarketError::Network`。
    pub fn new(config: &FeedConfig) -> Result<Self, MarketError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("kura/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MarketError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            quote_currency: config.quote_currency.clone(),
        })
    }

    /// 发起一次 GET 请求，返回状态码与完整响应体。状态码由调用方结合响应体判断。
    async fn get_text(&self, query: &[(&str, &str)]) -> Result<(StatusCode, String), MarketError> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(query)
            .send()
            .await
            .map_err(|e| MarketError::Network(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| MarketError::Network(e.to_string()))?;
        Ok((status, body))
    }
}

/// # Summary
/// 结合 HTTP 状态码确定最终结果。
///
/// # Logic
/// 1. 响应体能解析 (包括 `{"error": ...}` 错误对象) 时以响应体为准，与状态码无关。
/// 2. 非 2xx 且响应体无法解析时，视为传输层故障 `Network`。
fn with_status<T>(
    status: StatusCode,
    parsed: Result<T, MarketError>,
) -> Result<T, MarketError> {
    match parsed {
        Err(MarketError::Parse(_)) if !status.is_success() => {
            Err(MarketError::Network(format!("HTTP {}", status)))
        }
        other => other,
    }
}

/// `returnTradeHistory` 的响应：成交数组或错误对象。
#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum HistoryResponse {
    Trades(Vec<RawTrade>),
    Error { error: String },
}

/// 交易所原始成交记录 (只取需要的字段)。
#[derive(Deserialize, Debug)]
struct RawTrade {
    #[serde(rename = "globalTradeID")]
    global_trade_id: i64,
    date: String,
    rate: String,
}

/// `returnCurrencies` 的响应：错误对象或以币种为键的对象 (保留交易所给出的键顺序)。
#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum CurrenciesResponse {
    Error { error: String },
    Currencies(serde_json::Map<String, serde_json::Value>),
}

impl RawTrade {
    fn into_trade(self) -> Result<Trade, MarketError> {
        let time = NaiveDateTime::parse_from_str(&self.date, DATE_FORMAT)
            .map_err(|e| MarketError::Parse(format!("date {:?}: {}", self.date, e)))?
            .and_utc();
        let rate = Decimal::from_str(&self.rate)
            .map_err(|e| MarketError::Parse(format!("rate {:?}: {}", self.rate, e)))?;
        Ok(Trade {
            id: self.global_trade_id,
            time,
            rate,
        })
    }
}

/// # Summary
/// 解析成交历史响应体。
///
/// # Logic
/// 1. 反序列化为成交数组或错误对象。
/// 2. 错误对象中的 "Invalid currency pair." 映射为 `NoDataForPair`，其余为 `Api`。
/// 3. 逐条转换为领域实体，任一字段非法则整体视为解析失败。
pub(crate) fn parse_history(pair: &Pair, body: &str) -> Result<Vec<Trade>, MarketError> {
    let parsed: HistoryResponse =
        serde_json::from_str(body).map_err(|e| MarketError::Parse(e.to_string()))?;

    match parsed {
        HistoryResponse::Error { error } if error == INVALID_PAIR_ERROR => {
            Err(MarketError::NoDataForPair(pair.to_string()))
        }
        HistoryResponse::Error { error } => Err(MarketError::Api(error)),
        HistoryResponse::Trades(raw) => raw.into_iter().map(RawTrade::into_trade).collect(),
    }
}

/// # Summary
/// 解析币种列表并拼出 `{quote}_{currency}` 交易对。
///
/// # Logic
/// 1. 跳过计价币种自身。
/// 2. 跳过无法作为交易对标识的键 (记录 warn)。
/// 3. 结果保持交易所返回的币种顺序，即摄取顺序。
pub(crate) fn parse_currencies(quote: &str, body: &str) -> Result<Vec<Pair>, MarketError> {
    let parsed: CurrenciesResponse =
        serde_json::from_str(body).map_err(|e| MarketError::Parse(e.to_string()))?;

    let currencies = match parsed {
        CurrenciesResponse::Error { error } => return Err(MarketError::Api(error)),
        CurrenciesResponse::Currencies(map) => map,
    };

    Ok(currencies
        .into_iter()
        .map(|(c, _)| c)
        .filter(|c| c != quote)
        .filter_map(|c| match Pair::from_currencies(quote, &c) {
            Ok(pair) => Some(pair),
            Err(e) => {
                warn!("Skipping currency {:?}: {}", c, e);
                None
            }
        })
        .collect())
}

#[async_trait]
impl TradeHistoryProvider for PoloniexProvider {
    /// # Summary
    /// 调用 `returnTradeHistory` 查询窗口内的成交。
    ///
    /// # Logic
    /// 1. 以 unix 秒构造 start / end 参数。
    /// 2. 读取响应体并交给 `parse_history`。
    ///
    /// # Arguments
    /// * `pair`: 交易对。
    /// * `window`: 查询窗口。
    ///
    /// # Returns
    /// 交易所按时间倒序返回的成交列表。
    async fn fetch_trades(
        &self,
        pair: &Pair,
        window: DownloadWindow,
    ) -> Result<Vec<Trade>, MarketError> {
        debug!("GET returnTradeHistory {} {}", pair, window);
        let start = window.start.to_string();
        let end = window.end.to_string();
        let (status, body) = self
            .get_text(&[
                ("command", "returnTradeHistory"),
                ("currencyPair", pair.as_str()),
                ("start", start.as_str()),
                ("end", end.as_str()),
            ])
            .await?;
        with_status(status, parse_history(pair, &body))
    }
}

#[async_trait]
impl PairSource for PoloniexProvider {
    async fn list_pairs(&self) -> Result<Vec<Pair>, MarketError> {
        let (status, body) = self.get_text(&[("command", "returnCurrencies")]).await?;
        with_status(status, parse_currencies(&self.quote_currency, &body))
    }
}
