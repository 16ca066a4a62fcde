use crate::api::{ExchangeCommand, ExchangeQuery};
use crate::config::{BotConfig, BybitEnvironment};
use crate::models::{
    Candle, ClosedPosition, MarketDataWindow, OpenOrder, OrderRequest, OrderResult, OrderSide,
    Position,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use governor::{Quota, RateLimiter};
use hmac::{Hmac, Mac};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

// Bybit v5 unified API
// Docs: https://bybit-exchange.github.io/docs/v5/intro
const MAINNET_URL: &str = "https://api.bybit.com";
const TESTNET_URL: &str = "https://api-testnet.bybit.com";
const DEMO_URL: &str = "https://api-demo.bybit.com";
const CATEGORY: &str = "linear";
const RECV_WINDOW: &str = "5000";
const REQUESTS_PER_SECOND: NonZeroU32 = NonZeroU32::MIN.saturating_add(9);
const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const RET_OK: i64 = 0;
const RET_LEVERAGE_NOT_MODIFIED: i64 = 110043;

type HmacSha256 = Hmac<Sha256>;

type BybitRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Connection settings for [`BybitClient`]
#[derive(Clone)]
pub struct BybitConfig {
    pub api_key: String,
    pub api_secret: String,
    pub environment: BybitEnvironment,
    /// Overrides the environment URL (used by tests)
    pub base_url: Option<String>,
}

impl BybitConfig {
    pub fn from_bot_config(config: &BotConfig) -> Self {
        Self {
            api_key: config.credentials.api_key.clone(),
            api_secret: config.credentials.api_secret.clone(),
            environment: config.environment,
            base_url: None,
        }
    }
}

/// Bybit REST client for linear perpetuals
///
/// Cloneable; clones share one rate limiter. Read-only queries are retried
/// on 429/5xx/network errors. Order creation is sent exactly once.
#[derive(Clone)]
pub struct BybitClient {
    client: Client,
    api_key: String,
    api_secret: String,
    base_url: String,
    rate_limiter: Arc<BybitRateLimiter>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse<T> {
    ret_code: i64,
    ret_msg: String,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ListResult<T> {
    #[serde(default = "Vec::new")]
    list: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PositionItem {
    symbol: String,
    side: String,
    size: String,
    created_time: String,
    updated_time: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClosedPnlItem {
    symbol: String,
    updated_time: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderItem {
    order_id: String,
    symbol: String,
    order_status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateOrderResult {
    #[serde(default)]
    order_id: String,
    #[serde(default)]
    order_link_id: String,
}

impl BybitClient {
    pub fn new(config: BybitConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        let base_url = config
            .base_url
            .unwrap_or_else(|| base_url_for(config.environment).to_string());

        Ok(Self {
            client,
            api_key: config.api_key,
            api_secret: config.api_secret,
            base_url,
            rate_limiter: Arc::new(RateLimiter::direct(Quota::per_second(REQUESTS_PER_SECOND))),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// HMAC-SHA256 over `timestamp + api_key + recv_window + payload`
    fn sign(&self, timestamp: i64, payload: &str) -> Result<String> {
        let sign_str = format!("{}{}{}{}", timestamp, self.api_key, RECV_WINDOW, payload);

        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .context("Invalid API secret")?;
        mac.update(sign_str.as_bytes());

        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Rate-limited GET with retry, returning the `result` payload
    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
        signed: bool,
    ) -> Result<T> {
        let query = params
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join("&");
        let url = format!("{}{}?{}", self.base_url, path, query);

        for attempt in 1..=MAX_RETRIES {
            self.rate_limiter.until_ready().await;

            let mut request = self.client.get(&url);
            if signed {
                let timestamp = Utc::now().timestamp_millis();
                let signature = self.sign(timestamp, &query)?;
                request = request
                    .header("X-BAPI-API-KEY", &self.api_key)
                    .header("X-BAPI-TIMESTAMP", timestamp.to_string())
                    .header("X-BAPI-SIGN", signature)
                    .header("X-BAPI-RECV-WINDOW", RECV_WINDOW);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let body: ApiResponse<T> = response
                            .json()
                            .await
                            .with_context(|| format!("Failed to parse response from {}", path))?;
                        return unwrap_result(body, path);
                    }

                    if (status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error())
                        && attempt < MAX_RETRIES
                    {
                        let backoff = backoff_for(attempt);
                        tracing::warn!(
                            "Bybit returned {} for {}, retrying in {:?} (attempt {}/{})",
                            status,
                            path,
                            backoff,
                            attempt,
                            MAX_RETRIES
                        );
                        tokio::time::sleep(backoff).await;
                        continue;
                    }

                    let error_text = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    anyhow::bail!("Bybit HTTP error ({}) for {}: {}", status, path, error_text);
                }
                Err(e) if attempt < MAX_RETRIES => {
                    let backoff = backoff_for(attempt);
                    tracing::warn!(
                        "Network error on {}: {}, retrying in {:?} (attempt {}/{})",
                        path,
                        e,
                        backoff,
                        attempt,
                        MAX_RETRIES
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("Network error on {} after {} attempts", path, MAX_RETRIES)
                    })
                }
            }
        }

        anyhow::bail!("Request to {} failed after {} attempts", path, MAX_RETRIES)
    }

    /// Signed POST, sent once. Returns the raw envelope so callers can inspect `retCode`.
    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<ApiResponse<T>> {
        self.rate_limiter.until_ready().await;

        let body = serde_json::to_string(body)?;
        let timestamp = Utc::now().timestamp_millis();
        let signature = self.sign(timestamp, &body)?;

        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header("X-BAPI-API-KEY", &self.api_key)
            .header("X-BAPI-TIMESTAMP", timestamp.to_string())
            .header("X-BAPI-SIGN", signature)
            .header("X-BAPI-RECV-WINDOW", RECV_WINDOW)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .with_context(|| format!("Failed to send POST {}", path))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            anyhow::bail!("Bybit HTTP error ({}) for {}: {}", status, path, error_text);
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {}", path))
    }

    pub async fn fetch_open_positions(&self, symbol: &str) -> Result<Vec<Position>> {
        let result: ListResult<PositionItem> = self
            .get(
                "/v5/position/list",
                &[("category", CATEGORY.to_string()), ("symbol", symbol.to_string())],
                true,
            )
            .await?;

        let mut positions = Vec::new();
        for item in result.list {
            let size: f64 = item
                .size
                .parse()
                .with_context(|| format!("Invalid position size '{}'", item.size))?;

            // One-way mode reports an empty slot with size 0
            if size <= 0.0 {
                continue;
            }

            let side = match item.side.as_str() {
                "Buy" => OrderSide::Buy,
                "Sell" => OrderSide::Sell,
                other => anyhow::bail!("Unexpected position side '{}'", other),
            };

            positions.push(Position {
                symbol: item.symbol,
                side,
                size,
                opened_at: parse_millis(&item.created_time)?,
                updated_at: parse_millis(&item.updated_time)?,
            });
        }

        tracing::debug!("{} open position(s) for {}", positions.len(), symbol);
        Ok(positions)
    }

    pub async fn fetch_last_closed_position(&self, symbol: &str) -> Result<Option<ClosedPosition>> {
        let result: ListResult<ClosedPnlItem> = self
            .get(
                "/v5/position/closed-pnl",
                &[
                    ("category", CATEGORY.to_string()),
                    ("symbol", symbol.to_string()),
                    ("limit", "1".to_string()),
                ],
                true,
            )
            .await?;

        result
            .list
            .into_iter()
            .next()
            .map(|item| {
                Ok(ClosedPosition {
                    closed_at: parse_millis(&item.updated_time)?,
                    symbol: item.symbol,
                })
            })
            .transpose()
    }

    pub async fn fetch_open_orders(&self, symbol: &str) -> Result<Vec<OpenOrder>> {
        let result: ListResult<OrderItem> = self
            .get(
                "/v5/order/realtime",
                &[("category", CATEGORY.to_string()), ("symbol", symbol.to_string())],
                true,
            )
            .await?;

        Ok(result
            .list
            .into_iter()
            .map(|item| OpenOrder {
                id: item.order_id,
                symbol: item.symbol,
                status: item.order_status,
            })
            .collect())
    }

    pub async fn fetch_klines(&self, symbol: &str, interval: &str, limit: usize) -> Result<Vec<Candle>> {
        let result: ListResult<Vec<String>> = self
            .get(
                "/v5/market/kline",
                &[
                    ("category", CATEGORY.to_string()),
                    ("symbol", symbol.to_string()),
                    ("interval", interval.to_string()),
                    ("limit", limit.to_string()),
                ],
                false,
            )
            .await?;

        // Rows are [startTime, open, high, low, close, volume, turnover], newest first
        result
            .list
            .iter()
            .rev()
            .map(|row| parse_kline_row(symbol, row))
            .collect()
    }

    async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<Option<String>> {
        let body = json!({
            "category": CATEGORY,
            "symbol": symbol,
            "buyLeverage": leverage.to_string(),
            "sellLeverage": leverage.to_string(),
        });

        let response: ApiResponse<serde_json::Value> =
            self.post("/v5/position/set-leverage", &body).await?;

        match response.ret_code {
            RET_OK | RET_LEVERAGE_NOT_MODIFIED => Ok(None),
            code => Ok(Some(format!(
                "set leverage {}x rejected ({}): {}",
                leverage, code, response.ret_msg
            ))),
        }
    }

    pub async fn submit_order(&self, request: &OrderRequest) -> Result<OrderResult> {
        if let Some(rejection) = self.set_leverage(&request.symbol, request.leverage).await? {
            tracing::warn!("{}", rejection);
            return Ok(OrderResult::rejected(rejection));
        }

        let body = json!({
            "category": CATEGORY,
            "symbol": request.symbol,
            "side": request.side.to_string(),
            "orderType": "Market",
            "qty": format_number(request.quantity),
            "stopLoss": format_number(request.stop_loss),
            "takeProfit": format_number(request.take_profit),
            "tpslMode": "Full",
            "orderLinkId": request.client_order_id.to_string(),
        });

        tracing::debug!("POST /v5/order/create {}", body);

        let response: ApiResponse<CreateOrderResult> =
            self.post("/v5/order/create", &body).await?;

        if response.ret_code != RET_OK {
            return Ok(OrderResult::rejected(format!(
                "order rejected ({}): {}",
                response.ret_code, response.ret_msg
            )));
        }

        let created = response
            .result
            .context("Order accepted without a result payload")?;

        Ok(OrderResult::accepted(
            Some(created.order_id.clone()),
            format!("orderId={} orderLinkId={}", created.order_id, created.order_link_id),
        ))
    }
}

#[async_trait]
impl ExchangeQuery for BybitClient {
    async fn get_open_positions(&self, symbol: &str) -> crate::Result<Vec<Position>> {
        Ok(self.fetch_open_positions(symbol).await?)
    }

    async fn get_last_closed_position(&self, symbol: &str) -> crate::Result<Option<ClosedPosition>> {
        Ok(self.fetch_last_closed_position(symbol).await?)
    }

    async fn get_open_orders(&self, symbol: &str) -> crate::Result<Vec<OpenOrder>> {
        Ok(self.fetch_open_orders(symbol).await?)
    }

    async fn get_historical_data(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> crate::Result<Option<MarketDataWindow>> {
        let candles = self.fetch_klines(symbol, interval, limit).await?;
        if candles.is_empty() {
            return Ok(None);
        }
        Ok(Some(MarketDataWindow::new(symbol, interval, candles, limit)))
    }
}

#[async_trait]
impl ExchangeCommand for BybitClient {
    async fn place_order(&self, request: &OrderRequest) -> crate::Result<OrderResult> {
        Ok(self.submit_order(request).await?)
    }
}

fn unwrap_result<T>(body: ApiResponse<T>, path: &str) -> Result<T> {
    if body.ret_code != RET_OK {
        anyhow::bail!("Bybit API error on {} ({}): {}", path, body.ret_code, body.ret_msg);
    }
    body.result
        .with_context(|| format!("Bybit response from {} has no result", path))
}

fn base_url_for(environment: BybitEnvironment) -> &'static str {
    match environment {
        BybitEnvironment::Demo => DEMO_URL,
        BybitEnvironment::Testnet => TESTNET_URL,
        BybitEnvironment::Mainnet => MAINNET_URL,
    }
}

fn backoff_for(attempt: u32) -> Duration {
    Duration::from_millis(200 * 2u64.pow(attempt - 1))
}

fn parse_millis(value: &str) -> Result<DateTime<Utc>> {
    let millis: i64 = value
        .parse()
        .with_context(|| format!("Invalid millisecond timestamp '{}'", value))?;
    DateTime::from_timestamp_millis(millis)
        .with_context(|| format!("Timestamp {} out of range", millis))
}

fn parse_kline_row(symbol: &str, row: &[String]) -> Result<Candle> {
    if row.len() < 6 {
        anyhow::bail!("Kline row has {} fields, expected at least 6", row.len());
    }

    let field = |i: usize| -> Result<f64> {
        row[i]
            .parse::<f64>()
            .with_context(|| format!("Invalid kline field '{}'", row[i]))
    };

    Ok(Candle {
        symbol: symbol.to_string(),
        timestamp: parse_millis(&row[0])?,
        open: field(1)?,
        high: field(2)?,
        low: field(3)?,
        close: field(4)?,
        volume: field(5)?,
    })
}

/// Decimal string without float noise or trailing zeros
pub(crate) fn format_number(value: f64) -> String {
    let formatted = format!("{:.8}", value);
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}
