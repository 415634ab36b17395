use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::moving_average::AdjustedEma;
use crate::models::PricePoint;

/// Close price together with both averages at that point
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct IndicatorPoint {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    pub fast: f64,
    pub slow: f64,
}

/// Keeps the price history and the fast/slow EMA series derived from it
///
/// One `IndicatorPoint` is appended per processed price, prefill included.
#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    fast: AdjustedEma,
    slow: AdjustedEma,
    series: Vec<IndicatorPoint>,
}

impl IndicatorEngine {
    pub fn new(fast_window: usize, slow_window: usize) -> Self {
        Self {
            fast: AdjustedEma::new(fast_window),
            slow: AdjustedEma::new(slow_window),
            series: Vec::new(),
        }
    }

    /// Seed the series from historical prices (oldest first)
    pub fn prefill(&mut self, history: &[PricePoint]) {
        self.series.reserve(history.len());
        for point in history {
            self.update(point.close, point.timestamp);
        }

        tracing::debug!(
            points = history.len(),
            total = self.series.len(),
            "Indicator series prefilled"
        );
    }

    /// Append one price and advance both averages
    pub fn update(&mut self, price: f64, timestamp: DateTime<Utc>) -> IndicatorPoint {
        let point = IndicatorPoint {
            timestamp,
            close: price,
            fast: self.fast.update(price),
            slow: self.slow.update(price),
        };
        self.series.push(point);
        point
    }

    pub fn latest(&self) -> Option<&IndicatorPoint> {
        self.series.last()
    }

    pub fn series(&self) -> &[IndicatorPoint] {
        &self.series
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn fast_window(&self) -> usize {
        self.fast.span()
    }

    pub fn slow_window(&self) -> usize {
        self.slow.span()
    }
}
