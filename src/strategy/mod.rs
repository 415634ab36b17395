// Trading strategy module
pub mod ema_crossover;
pub mod position;
pub mod signals;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::indicators::IndicatorPoint;
use crate::models::{PositionSide, PricePoint, Signal};

pub use ema_crossover::EmaCrossoverStrategy;
pub use position::PositionState;
pub use signals::{evaluate_signal, StrategyConfig};

/// Read-only view of a strategy's position and latest indicator values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategySnapshot {
    pub position: Option<PositionSide>,
    pub entry_price: Option<f64>,
    pub fast: Option<f64>,
    pub slow: Option<f64>,
    pub observed_points: usize,
}

/// Base trait for live trading strategies
///
/// Implementations own all of their state; the trade loop drives them one
/// price at a time.
pub trait Strategy: Send {
    /// Get strategy name
    fn name(&self) -> &str;

    /// Observed points needed before signals other than Hold are possible
    fn min_points_required(&self) -> usize;

    /// Warm up from historical prices without emitting signals
    fn prefill(&mut self, history: &[PricePoint]);

    /// Feed the latest price and get this cycle's signal
    fn on_price(&mut self, price: f64, timestamp: DateTime<Utc>) -> Signal;

    fn current_state(&self) -> StrategySnapshot;

    /// Every processed price with its indicator values, oldest first
    fn indicator_series(&self) -> &[IndicatorPoint];
}
