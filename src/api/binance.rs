use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use governor::{Quota, RateLimiter};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use super::signer::{ApiCredentials, RequestSigner};
use super::{MarketDataSource, OrderExecutor};
use crate::error::ExchangeError;
use crate::models::{Kline, OrderRecord, OrderSide};

const PRODUCTION_BASE_URL: &str = "https://dapi.binance.com";
const TESTNET_BASE_URL: &str = "https://testnet.binancefuture.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_RECV_WINDOW_MS: u64 = 5000;

type BinanceRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Binance COIN-M futures environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BinanceEnvironment {
    #[default]
    Production,
    Testnet,
}

impl BinanceEnvironment {
    pub fn from_testnet_flag(testnet: bool) -> Self {
        if testnet {
            Self::Testnet
        } else {
            Self::Production
        }
    }

    pub fn rest_base_url(&self) -> &'static str {
        match self {
            Self::Production => PRODUCTION_BASE_URL,
            Self::Testnet => TESTNET_BASE_URL,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerTimeResponse {
    server_time: i64,
}

#[derive(Debug, Deserialize)]
struct TickerPrice {
    #[allow(dead_code)]
    symbol: String,
    price: String,
}

/// The ticker endpoint answers with an array when filtering by pair and a
/// single object when filtering by symbol on some deployments
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TickerResponse {
    Many(Vec<TickerPrice>),
    One(TickerPrice),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewOrderResponse {
    order_id: i64,
    client_order_id: String,
    symbol: String,
    orig_qty: String,
    #[serde(default)]
    avg_price: Option<String>,
    status: String,
    update_time: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LeverageResponse {
    leverage: u32,
    symbol: String,
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    assets: Vec<AccountAsset>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountAsset {
    asset: String,
    available_balance: String,
}

/// REST client for Binance COIN-M futures
///
/// Cloneable; clones share the HTTP connection pool and the rate limiter.
#[derive(Clone)]
pub struct BinanceClient {
    client: Client,
    base_url: String,
    credentials: Option<ApiCredentials>,
    recv_window_ms: u64,
    rate_limiter: Arc<BinanceRateLimiter>,
}

impl BinanceClient {
    pub fn new(
        credentials: Option<ApiCredentials>,
        environment: BinanceEnvironment,
        requests_per_minute: u32,
    ) -> Result<Self, ExchangeError> {
        Self::with_base_url(
            environment.rest_base_url(),
            credentials,
            requests_per_minute,
        )
    }

    /// Point the client at an arbitrary host (used against mock servers)
    pub fn with_base_url(
        base_url: &str,
        credentials: Option<ApiCredentials>,
        requests_per_minute: u32,
    ) -> Result<Self, ExchangeError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ExchangeError::Connectivity(format!("Failed to build HTTP client: {}", e)))?;

        let quota = Quota::per_minute(NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN));

        tracing::info!(
            base_url = %base_url,
            authenticated = credentials.is_some(),
            "Binance COIN-M futures client initialized"
        );

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            recv_window_ms: DEFAULT_RECV_WINDOW_MS,
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        })
    }

    pub fn with_recv_window(mut self, recv_window_ms: u64) -> Self {
        self.recv_window_ms = recv_window_ms;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ========================================================================
    // Public endpoints
    // ========================================================================

    /// GET /dapi/v1/time
    pub async fn server_time(&self) -> Result<DateTime<Utc>, ExchangeError> {
        let response: ServerTimeResponse = self.get_public("/dapi/v1/time", "").await?;
        tracing::info!(server_time = response.server_time, "Fetched Binance server time");
        millis_to_datetime(response.server_time)
    }

    /// GET /dapi/v1/ticker/price
    pub async fn ticker_price(&self, symbol: &str) -> Result<f64, ExchangeError> {
        let query = format!("symbol={}", symbol);
        let response: TickerResponse = self.get_public("/dapi/v1/ticker/price", &query).await?;

        let ticker = match response {
            TickerResponse::One(ticker) => ticker,
            TickerResponse::Many(tickers) => tickers
                .into_iter()
                .next()
                .ok_or_else(|| ExchangeError::Parse(format!("Empty ticker response for {}", symbol)))?,
        };

        let price = parse_decimal(&ticker.price, "price")?;
        tracing::debug!(symbol = %symbol, price, "Fetched ticker");
        Ok(price)
    }

    /// GET /dapi/v1/klines
    pub async fn klines(
        &self,
        symbol: &str,
        interval: &str,
        limit: u32,
    ) -> Result<Vec<Kline>, ExchangeError> {
        tracing::info!(symbol = %symbol, interval = %interval, limit, "Fetching historical klines");

        let query = format!("symbol={}&interval={}&limit={}", symbol, interval, limit);
        let rows: Vec<Vec<serde_json::Value>> = self.get_public("/dapi/v1/klines", &query).await?;

        let klines = rows
            .iter()
            .map(|row| parse_kline(row))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!(count = klines.len(), "Fetched historical klines");
        Ok(klines)
    }

    // ========================================================================
    // Signed endpoints
    // ========================================================================

    /// POST /dapi/v1/leverage
    pub async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<u32, ExchangeError> {
        let params = [("symbol", symbol.to_string()), ("leverage", leverage.to_string())];
        let response: LeverageResponse = self
            .send_signed(Method::POST, "/dapi/v1/leverage", &params)
            .await?;

        tracing::info!(symbol = %response.symbol, leverage = response.leverage, "Leverage set");
        Ok(response.leverage)
    }

    /// GET /dapi/v1/account, available balance of one asset
    pub async fn available_balance(&self, asset: &str) -> Result<f64, ExchangeError> {
        let response: AccountResponse = self
            .send_signed(Method::GET, "/dapi/v1/account", &[])
            .await?;

        let balance = match response.assets.iter().find(|a| a.asset == asset) {
            Some(entry) => parse_decimal(&entry.available_balance, "availableBalance")?,
            None => 0.0,
        };

        tracing::info!(asset = %asset, balance, "Fetched futures wallet balance");
        Ok(balance)
    }

    /// DELETE /dapi/v1/order
    ///
    /// Operator utility; the trade loop only sends market orders, which fill
    /// immediately and have nothing left to cancel.
    pub async fn cancel_order(&self, symbol: &str, order_id: &str) -> Result<(), ExchangeError> {
        let params = [("symbol", symbol.to_string()), ("orderId", order_id.to_string())];
        let _: serde_json::Value = self
            .send_signed(Method::DELETE, "/dapi/v1/order", &params)
            .await?;

        tracing::info!(symbol = %symbol, order_id = %order_id, "Order canceled");
        Ok(())
    }

    /// POST /dapi/v1/order with type MARKET
    pub async fn new_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: f64,
    ) -> Result<OrderRecord, ExchangeError> {
        let client_order_id = new_client_order_id();
        let params = [
            ("symbol", symbol.to_string()),
            ("side", side.as_str().to_string()),
            ("type", "MARKET".to_string()),
            ("quantity", format_quantity(quantity)),
            ("newClientOrderId", client_order_id),
        ];

        let response: NewOrderResponse = self
            .send_signed(Method::POST, "/dapi/v1/order", &params)
            .await?;

        let avg_price = response
            .avg_price
            .as_deref()
            .map(|p| parse_decimal(p, "avgPrice"))
            .transpose()?
            .filter(|p| *p > 0.0);

        let record = OrderRecord {
            order_id: response.order_id.to_string(),
            client_order_id: response.client_order_id,
            symbol: response.symbol,
            side,
            quantity: parse_decimal(&response.orig_qty, "origQty")?,
            avg_price,
            status: response.status,
            timestamp: millis_to_datetime(response.update_time)?,
        };

        tracing::info!(
            order_id = %record.order_id,
            symbol = %record.symbol,
            side = %record.side,
            quantity = record.quantity,
            status = %record.status,
            "Order placed"
        );

        Ok(record)
    }

    // ========================================================================
    // Transport
    // ========================================================================

    async fn get_public<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &str,
    ) -> Result<T, ExchangeError> {
        let url = if query.is_empty() {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}{}?{}", self.base_url, path, query)
        };

        self.rate_limiter.until_ready().await;
        let response = self.client.get(&url).send().await?;
        Self::decode(response).await
    }

    async fn send_signed<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ExchangeError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(ExchangeError::MissingCredentials)?;

        let mut all_params = params.to_vec();
        all_params.push(("recvWindow", self.recv_window_ms.to_string()));
        let query = RequestSigner::new(credentials).sign_params(&all_params, Utc::now().timestamp_millis());
        let url = format!("{}{}?{}", self.base_url, path, query);

        self.rate_limiter.until_ready().await;
        let response = self
            .client
            .request(method, &url)
            .header("X-MBX-APIKEY", credentials.api_key())
            .send()
            .await?;

        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ExchangeError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let err = ExchangeError::from_api_response(status.as_u16(), &body);
            tracing::error!(status = %status, error = %err, "Binance request failed");
            return Err(err);
        }

        serde_json::from_str(&body)
            .map_err(|e| ExchangeError::Parse(format!("{}: {}", e, body)))
    }
}

#[async_trait]
impl MarketDataSource for BinanceClient {
    async fn get_historical_prices(
        &self,
        symbol: &str,
        interval: &str,
        limit: u32,
    ) -> Result<Vec<Kline>, ExchangeError> {
        self.klines(symbol, interval, limit).await
    }

    async fn get_current_price(&self, symbol: &str) -> Result<f64, ExchangeError> {
        self.ticker_price(symbol).await
    }
}

#[async_trait]
impl OrderExecutor for BinanceClient {
    async fn submit_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: f64,
    ) -> Result<OrderRecord, ExchangeError> {
        self.new_market_order(symbol, side, quantity).await
    }
}

fn new_client_order_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("emabot-{}", &id[..20])
}

/// Render a quantity without float noise or trailing zeros
fn format_quantity(quantity: f64) -> String {
    let fixed = format!("{:.8}", quantity);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

fn parse_decimal(value: &str, field: &str) -> Result<f64, ExchangeError> {
    value
        .parse::<f64>()
        .map_err(|e| ExchangeError::Parse(format!("Invalid {} '{}': {}", field, value, e)))
}

fn millis_to_datetime(millis: i64) -> Result<DateTime<Utc>, ExchangeError> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| ExchangeError::Parse(format!("Invalid timestamp {}", millis)))
}

/// Kline rows are `[openTime, open, high, low, close, volume, closeTime, ...]`
/// with prices encoded as strings
fn parse_kline(row: &[serde_json::Value]) -> Result<Kline, ExchangeError> {
    if row.len() < 6 {
        return Err(ExchangeError::Parse(format!(
            "Kline row has {} fields, expected at least 6",
            row.len()
        )));
    }

    let open_time = row[0]
        .as_i64()
        .ok_or_else(|| ExchangeError::Parse("Kline open time is not an integer".to_string()))?;

    let number = |index: usize, field: &str| -> Result<f64, ExchangeError> {
        match &row[index] {
            serde_json::Value::String(s) => parse_decimal(s, field),
            serde_json::Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| ExchangeError::Parse(format!("Invalid {}", field))),
            other => Err(ExchangeError::Parse(format!("Invalid {}: {}", field, other))),
        }
    };

    Ok(Kline {
        open_time: millis_to_datetime(open_time)?,
        open: number(1, "open")?,
        high: number(2, "high")?,
        low: number(3, "low")?,
        close: number(4, "close")?,
        volume: number(5, "volume")?,
    })
}
