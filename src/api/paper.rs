use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::{MarketDataSource, OrderExecutor};
use crate::error::ExchangeError;
use crate::models::{OrderRecord, OrderSide};

/// Simulated order execution that fills immediately at the current price
///
/// Used for dry runs: market data still comes from the real source, nothing
/// is sent to the exchange's order endpoints.
pub struct PaperExecutor<M> {
    market: Arc<M>,
    next_order_id: AtomicU64,
}

impl<M: MarketDataSource> PaperExecutor<M> {
    pub fn new(market: Arc<M>) -> Self {
        Self {
            market,
            next_order_id: AtomicU64::new(1),
        }
    }
}

#[async_trait]
impl<M: MarketDataSource> OrderExecutor for PaperExecutor<M> {
    async fn submit_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: f64,
    ) -> Result<OrderRecord, ExchangeError> {
        if !(quantity > 0.0) {
            return Err(ExchangeError::OrderRejected {
                reason: format!("Quantity must be positive, got {}", quantity),
            });
        }

        let fill_price = self.market.get_current_price(symbol).await?;
        let order_id = self.next_order_id.fetch_add(1, Ordering::Relaxed);

        tracing::info!(
            symbol = %symbol,
            side = %side,
            quantity,
            fill_price,
            "Paper order filled (dry run)"
        );

        Ok(OrderRecord {
            order_id: format!("paper-{}", order_id),
            client_order_id: uuid::Uuid::new_v4().to_string(),
            symbol: symbol.to_string(),
            side,
            quantity,
            avg_price: Some(fill_price),
            status: "FILLED".to_string(),
            timestamp: Utc::now(),
        })
    }
}
