pub mod binance;
pub mod paper;
pub mod signer;

use async_trait::async_trait;

use crate::error::ExchangeError;
use crate::models::{Kline, OrderRecord, OrderSide};

pub use binance::{BinanceClient, BinanceEnvironment};
pub use paper::PaperExecutor;
pub use signer::{ApiCredentials, RequestSigner};

/// Source of historical candles and live prices
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Candles for `symbol`, oldest first
    async fn get_historical_prices(
        &self,
        symbol: &str,
        interval: &str,
        limit: u32,
    ) -> Result<Vec<Kline>, ExchangeError>;

    async fn get_current_price(&self, symbol: &str) -> Result<f64, ExchangeError>;
}

/// Places market orders and waits for the exchange acknowledgement
#[async_trait]
pub trait OrderExecutor: Send + Sync {
    async fn submit_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: f64,
    ) -> Result<OrderRecord, ExchangeError>;
}

#[async_trait]
impl<T: MarketDataSource + ?Sized> MarketDataSource for std::sync::Arc<T> {
    async fn get_historical_prices(
        &self,
        symbol: &str,
        interval: &str,
        limit: u32,
    ) -> Result<Vec<Kline>, ExchangeError> {
        (**self).get_historical_prices(symbol, interval, limit).await
    }

    async fn get_current_price(&self, symbol: &str) -> Result<f64, ExchangeError> {
        (**self).get_current_price(symbol).await
    }
}

#[async_trait]
impl<T: OrderExecutor + ?Sized> OrderExecutor for std::sync::Arc<T> {
    async fn submit_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: f64,
    ) -> Result<OrderRecord, ExchangeError> {
        (**self).submit_market_order(symbol, side, quantity).await
    }
}
