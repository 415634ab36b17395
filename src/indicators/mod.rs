// Technical indicators module
// Fast/slow exponential moving averages over the live price series

pub mod engine;
pub mod moving_average;

pub use engine::{IndicatorEngine, IndicatorPoint};
pub use moving_average::{calculate_adjusted_ema, span_alpha, AdjustedEma};
