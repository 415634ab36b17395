use chrono::Utc;

use super::RetryPolicy;
use crate::api::MarketDataSource;
use crate::error::ExchangeError;
use crate::models::PricePoint;

/// Fetches history and live prices for one symbol, retrying transient failures
pub struct PriceFeed<M> {
    market: M,
    symbol: String,
    retry: RetryPolicy,
}

impl<M: MarketDataSource> PriceFeed<M> {
    pub fn new(market: M, symbol: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            market,
            symbol: symbol.into(),
            retry,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Closing prices of the last `limit` candles, oldest first
    pub async fn fetch_history(
        &self,
        interval: &str,
        limit: u32,
    ) -> Result<Vec<PricePoint>, ExchangeError> {
        let klines = self
            .retry
            .run("historical_prices", || {
                self.market
                    .get_historical_prices(&self.symbol, interval, limit)
            })
            .await?;

        let mut points: Vec<PricePoint> = klines.iter().map(PricePoint::from).collect();
        points.sort_by_key(|p| p.timestamp);

        tracing::info!(
            symbol = %self.symbol,
            interval = %interval,
            points = points.len(),
            "Fetched price history"
        );

        Ok(points)
    }

    /// Latest price, stamped with the local clock
    pub async fn fetch_current(&self) -> Result<PricePoint, ExchangeError> {
        let price = self
            .retry
            .run("current_price", || self.market.get_current_price(&self.symbol))
            .await?;

        if !price.is_finite() || price <= 0.0 {
            return Err(ExchangeError::Parse(format!(
                "Invalid price {} for {}",
                price, self.symbol
            )));
        }

        tracing::debug!(symbol = %self.symbol, price, "Fetched price snapshot");

        Ok(PricePoint::new(Utc::now(), price))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Kline;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyMarket {
        failures_left: AtomicU32,
        price: f64,
    }

    #[async_trait]
    impl MarketDataSource for FlakyMarket {
        async fn get_historical_prices(
            &self,
            _symbol: &str,
            _interval: &str,
            limit: u32,
        ) -> Result<Vec<Kline>, ExchangeError> {
            let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
            // Deliberately newest first
            Ok((0..limit)
                .rev()
                .map(|i| {
                    let close = 100.0 + i as f64;
                    Kline {
                        open_time: start + Duration::minutes(i as i64),
                        open: close,
                        high: close,
                        low: close,
                        close,
                        volume: 1.0,
                    }
                })
                .collect())
        }

        async fn get_current_price(&self, _symbol: &str) -> Result<f64, ExchangeError> {
            let remaining = self.failures_left.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures_left.store(remaining - 1, Ordering::SeqCst);
                return Err(ExchangeError::Connectivity("timeout".into()));
            }
            Ok(self.price)
        }
    }

    fn instant_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
            jitter_factor: 0.0,
        }
    }

    #[tokio::test]
    async fn test_history_sorted_oldest_first() {
        let market = FlakyMarket {
            failures_left: AtomicU32::new(0),
            price: 1.0,
        };
        let feed = PriceFeed::new(market, "BTCUSD_PERP", instant_retry(1));

        let history = feed.fetch_history("1m", 5).await.unwrap();
        assert_eq!(history.len(), 5);
        assert_eq!(history[0].close, 100.0);
        assert_eq!(history[4].close, 104.0);
        assert!(history.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[tokio::test]
    async fn test_current_price_retries() {
        let market = FlakyMarket {
            failures_left: AtomicU32::new(2),
            price: 42_000.0,
        };
        let feed = PriceFeed::new(market, "BTCUSD_PERP", instant_retry(3));

        let point = feed.fetch_current().await.unwrap();
        assert_eq!(point.close, 42_000.0);
    }

    #[tokio::test]
    async fn test_current_price_fails_fast() {
        let market = FlakyMarket {
            failures_left: AtomicU32::new(1),
            price: 42_000.0,
        };
        let feed = PriceFeed::new(market, "BTCUSD_PERP", instant_retry(1));

        assert!(feed.fetch_current().await.is_err());
    }

    #[tokio::test]
    async fn test_rejects_non_positive_price() {
        let market = FlakyMarket {
            failures_left: AtomicU32::new(0),
            price: 0.0,
        };
        let feed = PriceFeed::new(market, "BTCUSD_PERP", instant_retry(1));

        assert!(matches!(
            feed.fetch_current().await,
            Err(ExchangeError::Parse(_))
        ));
    }
}
