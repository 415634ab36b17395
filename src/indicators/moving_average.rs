/// Smoothing factor for a span-style EMA
pub fn span_alpha(span: usize) -> f64 {
    2.0 / (span as f64 + 1.0)
}

/// Incremental span EMA with bias adjustment (min periods = 1)
///
/// Carries the decayed numerator and the decayed weight sum so that each
/// update is O(1) while matching the weighted-average definition
/// `sum((1-a)^i * x[t-i]) / sum((1-a)^i)` exactly for every point.
#[derive(Debug, Clone)]
pub struct AdjustedEma {
    span: usize,
    decay: f64,
    weighted_sum: f64,
    weight_total: f64,
    value: Option<f64>,
}

impl AdjustedEma {
    pub fn new(span: usize) -> Self {
        assert!(span >= 1, "EMA span must be at least 1");
        Self {
            span,
            decay: 1.0 - span_alpha(span),
            weighted_sum: 0.0,
            weight_total: 0.0,
            value: None,
        }
    }

    /// Push one observation and return the new average
    pub fn update(&mut self, price: f64) -> f64 {
        self.weighted_sum = price + self.decay * self.weighted_sum;
        self.weight_total = 1.0 + self.decay * self.weight_total;
        let ema = self.weighted_sum / self.weight_total;
        self.value = Some(ema);
        ema
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn span(&self) -> usize {
        self.span
    }
}

/// Compute the adjusted span EMA for every point of `prices`
///
/// Direct evaluation of the weighted average at each index. O(n^2), used as
/// the reference that the incremental form is checked against.
pub fn calculate_adjusted_ema(prices: &[f64], span: usize) -> Vec<f64> {
    let decay = 1.0 - span_alpha(span);

    (0..prices.len())
        .map(|t| {
            let mut numerator = 0.0;
            let mut denominator = 0.0;
            let mut weight = 1.0;
            for price in prices[..=t].iter().rev() {
                numerator += weight * price;
                denominator += weight;
                weight *= decay;
            }
            numerator / denominator
        })
        .collect()
}
