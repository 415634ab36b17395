use serde::{Deserialize, Serialize};

use super::position::PositionState;
use crate::indicators::IndicatorPoint;
use crate::models::{PositionSide, Signal};

/// Parameters of the EMA crossover rule set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Fractional loss from entry that forces an exit (0.02 = 2%)
    pub stop_loss: f64,
    /// Fractional gain from entry that takes profit (0.05 = 5%)
    pub profit_target: f64,
    pub fast_window: usize,
    pub slow_window: usize,
    pub enable_longing: bool,
    pub enable_shorting: bool,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            stop_loss: 0.02,
            profit_target: 0.05,
            fast_window: 100,
            slow_window: 400,
            enable_longing: true,
            enable_shorting: true,
        }
    }
}

impl StrategyConfig {
    /// Reject parameter combinations the state machine cannot work with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.fast_window == 0 || self.slow_window == 0 {
            anyhow::bail!("EMA windows must be at least 1");
        }
        if self.fast_window >= self.slow_window {
            anyhow::bail!(
                "fast_window ({}) must be shorter than slow_window ({})",
                self.fast_window,
                self.slow_window
            );
        }
        for (name, value) in [
            ("stop_loss", self.stop_loss),
            ("profit_target", self.profit_target),
        ] {
            if !(value > 0.0 && value < 1.0) {
                anyhow::bail!("{} must be within (0, 1), got {}", name, value);
            }
        }
        if !self.enable_longing && !self.enable_shorting {
            tracing::warn!("Both longing and shorting are disabled, strategy will only hold");
        }
        Ok(())
    }

    /// Points needed before the evaluator will consult the indicators
    pub fn min_points_required(&self) -> usize {
        self.slow_window
    }
}

/// Decide the signal for the current cycle and apply its state transition
///
/// Rules are checked in priority order, first match wins: stop-loss exits,
/// profit-target exits, then trend entries guarded by the trigger flags.
/// Returns `Hold` without looking at the indicators while fewer than
/// `slow_window` points have been observed.
pub fn evaluate_signal(
    indicators: &IndicatorPoint,
    observed_points: usize,
    position: &mut PositionState,
    config: &StrategyConfig,
) -> Signal {
    if observed_points < config.min_points_required() {
        tracing::warn!(
            observed = observed_points,
            required = config.min_points_required(),
            "Not enough data for strategy evaluation"
        );
        return Signal::Hold;
    }

    let price = indicators.close;
    let (fast, slow) = (indicators.fast, indicators.slow);

    tracing::debug!(
        price = price,
        fast = fast,
        slow = slow,
        position = ?position.side(),
        "Evaluating signal"
    );

    if let (Some(side), Some(entry)) = (position.side(), position.entry_price()) {
        let exit = match side {
            PositionSide::Long if price <= entry * (1.0 - config.stop_loss) => {
                Some(Signal::StopLossLong)
            }
            PositionSide::Short if price >= entry * (1.0 + config.stop_loss) => {
                Some(Signal::StopLossShort)
            }
            PositionSide::Long if price >= entry * (1.0 + config.profit_target) => {
                Some(Signal::ExitLong)
            }
            PositionSide::Short if price <= entry * (1.0 - config.profit_target) => {
                Some(Signal::ExitShort)
            }
            _ => None,
        };

        if let Some(signal) = exit {
            position.exit();
            match signal {
                Signal::StopLossLong | Signal::StopLossShort => {
                    tracing::warn!(%signal, entry, price, "Stop-loss triggered");
                }
                _ => tracing::info!(%signal, entry, price, "Profit target hit"),
            }
            return signal;
        }

        return Signal::Hold;
    }

    if config.enable_longing && fast > slow && !position.uptrend_fired() {
        position.enter(PositionSide::Long, price);
        tracing::info!(price, "Long entry signal detected");
        return Signal::EnterLong;
    }

    if config.enable_shorting && fast < slow && !position.downtrend_fired() {
        position.enter(PositionSide::Short, price);
        tracing::info!(price, "Short entry signal detected");
        return Signal::EnterShort;
    }

    Signal::Hold
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn point(close: f64, fast: f64, slow: f64) -> IndicatorPoint {
        IndicatorPoint {
            timestamp: Utc::now(),
            close,
            fast,
            slow,
        }
    }

    fn test_config() -> StrategyConfig {
        StrategyConfig {
            stop_loss: 0.1,
            profit_target: 0.1,
            fast_window: 2,
            slow_window: 3,
            enable_longing: true,
            enable_shorting: true,
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(StrategyConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_windows() {
        let config = StrategyConfig {
            fast_window: 400,
            slow_window: 100,
            ..StrategyConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_fractions() {
        let config = StrategyConfig {
            stop_loss: 0.0,
            ..StrategyConfig::default()
        };
        assert!(config.validate().is_err());

        let config = StrategyConfig {
            profit_target: 1.5,
            ..StrategyConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_insufficient_history_holds() {
        let mut position = PositionState::default();
        let signal = evaluate_signal(&point(100.0, 110.0, 90.0), 2, &mut position, &test_config());

        assert_eq!(signal, Signal::Hold);
        assert_eq!(position.side(), None);
    }

    #[test]
    fn test_enter_long_on_uptrend() {
        let mut position = PositionState::default();
        let signal = evaluate_signal(&point(100.0, 101.0, 99.0), 3, &mut position, &test_config());

        assert_eq!(signal, Signal::EnterLong);
        assert_eq!(position.side(), Some(PositionSide::Long));
        assert_eq!(position.entry_price(), Some(100.0));
        assert!(position.uptrend_fired());
    }

    #[test]
    fn test_enter_short_on_downtrend() {
        let mut position = PositionState::default();
        let signal = evaluate_signal(&point(100.0, 99.0, 101.0), 3, &mut position, &test_config());

        assert_eq!(signal, Signal::EnterShort);
        assert_eq!(position.side(), Some(PositionSide::Short));
        assert!(position.downtrend_fired());
    }

    #[test]
    fn test_disabled_shorting_holds_on_downtrend() {
        let config = StrategyConfig {
            enable_shorting: false,
            ..test_config()
        };
        let mut position = PositionState::default();
        let signal = evaluate_signal(&point(100.0, 99.0, 101.0), 3, &mut position, &config);

        assert_eq!(signal, Signal::Hold);
    }

    #[test]
    fn test_equal_averages_hold() {
        let mut position = PositionState::default();
        let signal = evaluate_signal(&point(100.0, 100.0, 100.0), 3, &mut position, &test_config());
        assert_eq!(signal, Signal::Hold);
    }

    #[test]
    fn test_short_exits() {
        let config = test_config();

        let mut position = PositionState::default();
        position.enter(PositionSide::Short, 100.0);
        let signal = evaluate_signal(&point(111.0, 99.0, 101.0), 3, &mut position, &config);
        assert_eq!(signal, Signal::StopLossShort);
        assert!(!position.downtrend_fired());

        let mut position = PositionState::default();
        position.enter(PositionSide::Short, 100.0);
        let signal = evaluate_signal(&point(89.0, 99.0, 101.0), 3, &mut position, &config);
        assert_eq!(signal, Signal::ExitShort);
        assert_eq!(position.side(), None);
    }

    #[test]
    fn test_open_position_holds_between_thresholds() {
        let mut position = PositionState::default();
        position.enter(PositionSide::Long, 100.0);

        // Downtrend while long does not flip into a short
        let signal = evaluate_signal(&point(95.0, 90.0, 100.0), 3, &mut position, &test_config());
        assert_eq!(signal, Signal::Hold);
        assert_eq!(position.side(), Some(PositionSide::Long));
    }

    #[test]
    fn test_stop_loss_outranks_profit_target() {
        // Negative profit target makes both long exits fire at 85
        let config = StrategyConfig {
            profit_target: -0.2,
            ..test_config()
        };
        let mut position = PositionState::default();
        position.enter(PositionSide::Long, 100.0);

        let signal = evaluate_signal(&point(85.0, 90.0, 95.0), 3, &mut position, &config);
        assert_eq!(signal, Signal::StopLossLong);

        let mut position = PositionState::default();
        position.enter(PositionSide::Short, 100.0);
        let signal = evaluate_signal(&point(115.0, 90.0, 95.0), 3, &mut position, &config);
        assert_eq!(signal, Signal::StopLossShort);
    }

    #[test]
    fn test_opposite_entry_rearms_trend() {
        let config = test_config();
        let mut position = PositionState::default();

        assert_eq!(
            evaluate_signal(&point(100.0, 101.0, 99.0), 3, &mut position, &config),
            Signal::EnterLong
        );
        assert_eq!(
            evaluate_signal(&point(111.0, 101.0, 99.0), 3, &mut position, &config),
            Signal::ExitLong
        );
        // Trend flips down while flat
        assert_eq!(
            evaluate_signal(&point(112.0, 99.0, 101.0), 3, &mut position, &config),
            Signal::EnterShort
        );
        assert!(!position.uptrend_fired());
        assert!(position.downtrend_fired());
    }
}
