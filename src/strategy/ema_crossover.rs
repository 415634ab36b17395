use chrono::{DateTime, Utc};

use super::{
    position::PositionState,
    signals::{evaluate_signal, StrategyConfig},
    Strategy, StrategySnapshot,
};
use crate::indicators::{IndicatorEngine, IndicatorPoint};
use crate::models::{PricePoint, Signal};

/// Trend-following strategy on a fast/slow EMA crossover
///
/// - Enters long when the fast EMA is above the slow EMA, short when below
/// - Exits on a fixed stop-loss or profit target measured from entry
/// - Will not re-enter the same trend until that side's position has closed
#[derive(Debug, Clone)]
pub struct EmaCrossoverStrategy {
    config: StrategyConfig,
    indicators: IndicatorEngine,
    position: PositionState,
}

impl EmaCrossoverStrategy {
    pub fn new(config: StrategyConfig) -> Self {
        let indicators = IndicatorEngine::new(config.fast_window, config.slow_window);

        tracing::info!(
            fast_window = config.fast_window,
            slow_window = config.slow_window,
            stop_loss = config.stop_loss,
            profit_target = config.profit_target,
            longing = config.enable_longing,
            shorting = config.enable_shorting,
            "EMA crossover strategy initialized"
        );

        Self {
            config,
            indicators,
            position: PositionState::default(),
        }
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn indicators(&self) -> &IndicatorEngine {
        &self.indicators
    }

    pub fn position(&self) -> &PositionState {
        &self.position
    }
}

impl Default for EmaCrossoverStrategy {
    fn default() -> Self {
        Self::new(StrategyConfig::default())
    }
}

impl Strategy for EmaCrossoverStrategy {
    fn name(&self) -> &str {
        "EmaCrossoverStrategy"
    }

    fn min_points_required(&self) -> usize {
        self.config.min_points_required()
    }

    fn prefill(&mut self, history: &[PricePoint]) {
        tracing::info!(points = history.len(), "Prefilling strategy with historical data");
        self.indicators.prefill(history);
    }

    fn on_price(&mut self, price: f64, timestamp: DateTime<Utc>) -> Signal {
        let point = self.indicators.update(price, timestamp);
        evaluate_signal(
            &point,
            self.indicators.len(),
            &mut self.position,
            &self.config,
        )
    }

    fn current_state(&self) -> StrategySnapshot {
        let latest = self.indicators.latest();
        StrategySnapshot {
            position: self.position.side(),
            entry_price: self.position.entry_price(),
            fast: latest.map(|p| p.fast),
            slow: latest.map(|p| p.slow),
            observed_points: self.indicators.len(),
        }
    }

    fn indicator_series(&self) -> &[IndicatorPoint] {
        self.indicators.series()
    }
}
