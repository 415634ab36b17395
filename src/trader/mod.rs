//! Live trade loop
//!
//! Warm up the strategy from history, then once per poll interval: fetch the
//! price, evaluate the strategy, place the order it asks for, record the cycle
//! and redraw the chart. Any market data or order failure ends the run.

use chrono::Utc;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use crate::api::{MarketDataSource, OrderExecutor};
use crate::config::AppConfig;
use crate::execution::{ExecutionAction, Executor, PositionManager, PriceFeed};
use crate::models::{position_label, PricePoint, Signal, TradeRecord};
use crate::persistence::TradeRecorder;
use crate::strategy::Strategy;
use crate::visualization::Visualizer;

#[derive(Debug, Clone, PartialEq)]
pub enum StopReason {
    /// Interrupted by the operator
    ManualStop,
    /// Requested number of cycles completed
    Completed,
    Error(String),
}

impl StopReason {
    /// Value written to the `stop_reason` column
    pub fn label(&self) -> &'static str {
        match self {
            StopReason::ManualStop => "Manual Stop",
            StopReason::Completed => "Completed",
            StopReason::Error(_) => "Error",
        }
    }

    pub fn error_message(&self) -> &str {
        match self {
            StopReason::Error(message) => message,
            _ => "",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Error(message) => write!(f, "Error: {}", message),
            other => f.write_str(other.label()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TraderState {
    Warming,
    Running,
    Stopped(StopReason),
}

#[derive(Debug, Clone)]
pub struct TraderSettings {
    pub history_interval: String,
    pub history_limit: u32,
    pub poll_interval: Duration,
}

impl TraderSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            history_interval: config.trading.history_interval.clone(),
            history_limit: config.trading.history_limit,
            poll_interval: Duration::from_secs(config.trading.poll_interval_secs),
        }
    }
}

pub struct LiveTrader<M, O, S> {
    feed: PriceFeed<M>,
    orders: O,
    strategy: S,
    sizing: Executor,
    positions: PositionManager,
    recorder: Box<dyn TradeRecorder>,
    chart: Option<(Box<dyn Visualizer>, PathBuf)>,
    settings: TraderSettings,
    state: TraderState,
    last_price: Option<PricePoint>,
}

impl<M, O, S> LiveTrader<M, O, S>
where
    M: MarketDataSource,
    O: OrderExecutor,
    S: Strategy,
{
    pub fn new(
        feed: PriceFeed<M>,
        orders: O,
        strategy: S,
        sizing: Executor,
        recorder: Box<dyn TradeRecorder>,
        settings: TraderSettings,
    ) -> Self {
        Self {
            feed,
            orders,
            strategy,
            sizing,
            positions: PositionManager::new(),
            recorder,
            chart: None,
            settings,
            state: TraderState::Warming,
            last_price: None,
        }
    }

    /// Redraw the chart at `path` after every cycle and at shutdown
    pub fn with_chart(mut self, visualizer: Box<dyn Visualizer>, path: impl Into<PathBuf>) -> Self {
        self.chart = Some((visualizer, path.into()));
        self
    }

    pub fn state(&self) -> &TraderState {
        &self.state
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn positions(&self) -> &PositionManager {
        &self.positions
    }

    pub fn records(&self) -> &[TradeRecord] {
        self.recorder.records()
    }

    /// Fetch history, warm up the strategy and record it as PREFILL rows
    pub async fn start(&mut self) -> anyhow::Result<()> {
        if self.state != TraderState::Warming {
            anyhow::bail!("Trader already started ({:?})", self.state);
        }

        let history = self
            .feed
            .fetch_history(&self.settings.history_interval, self.settings.history_limit)
            .await?;

        if history.is_empty() {
            tracing::warn!(symbol = %self.feed.symbol(), "No price history available");
        }

        self.strategy.prefill(&history);
        self.last_price = history.last().copied();

        let series = self.strategy.indicator_series();
        let prefilled = &series[series.len().saturating_sub(history.len())..];
        let records: Vec<TradeRecord> = prefilled
            .iter()
            .map(|point| TradeRecord {
                timestamp: point.timestamp,
                close: point.close,
                fast: Some(point.fast),
                slow: Some(point.slow),
                action: TradeRecord::ACTION_PREFILL.to_string(),
                position: position_label(None).to_string(),
                stop_reason: String::new(),
                error_message: String::new(),
            })
            .collect();

        if let Err(e) = self.recorder.append_batch(&records) {
            tracing::error!(error = %e, "Failed to record price history");
        }

        let state = self.strategy.current_state();
        tracing::info!(
            strategy = self.strategy.name(),
            points = history.len(),
            required = self.strategy.min_points_required(),
            fast = ?state.fast,
            slow = ?state.slow,
            "Strategy warmed up"
        );

        self.state = TraderState::Running;
        Ok(())
    }

    /// One fetch / evaluate / execute / record pass
    pub async fn run_cycle(&mut self) -> anyhow::Result<Signal> {
        if self.state != TraderState::Running {
            anyhow::bail!("Trader is not running ({:?})", self.state);
        }

        let point = self.feed.fetch_current().await?;
        self.last_price = Some(point);

        let signal = self.strategy.on_price(point.close, point.timestamp);
        let snapshot = self.strategy.current_state();

        tracing::info!(
            price = point.close,
            fast = ?snapshot.fast,
            slow = ?snapshot.slow,
            signal = %signal,
            position = position_label(snapshot.position),
            "Cycle evaluated"
        );

        if signal != Signal::Hold {
            self.execute(signal, &point).await?;
        }

        let record = TradeRecord {
            timestamp: point.timestamp,
            close: point.close,
            fast: snapshot.fast,
            slow: snapshot.slow,
            action: signal.action_label().to_string(),
            position: position_label(snapshot.position).to_string(),
            stop_reason: String::new(),
            error_message: String::new(),
        };
        if let Err(e) = self.recorder.append(&record) {
            tracing::error!(error = %e, "Failed to record cycle");
        }
        self.render_chart();

        Ok(signal)
    }

    async fn execute(&mut self, signal: Signal, point: &PricePoint) -> anyhow::Result<()> {
        let decision = self
            .sizing
            .process_signal(signal, point.close, &self.positions)?;
        tracing::debug!(reason = %decision.reason, "Execution decision");

        let symbol = self.feed.symbol().to_string();
        match decision.action {
            ExecutionAction::Open {
                side,
                order_side,
                quantity,
            } => {
                let order = self
                    .orders
                    .submit_market_order(&symbol, order_side, quantity)
                    .await?;
                let fill_price = order.avg_price.unwrap_or(point.close);
                self.positions.open(
                    &symbol,
                    side,
                    fill_price,
                    quantity,
                    &order.order_id,
                    point.timestamp,
                )?;
            }
            ExecutionAction::Close {
                order_side,
                quantity,
                exit_reason,
            } => {
                let order = self
                    .orders
                    .submit_market_order(&symbol, order_side, quantity)
                    .await?;
                let fill_price = order.avg_price.unwrap_or(point.close);
                self.positions.close(fill_price, exit_reason, point.timestamp)?;
            }
            ExecutionAction::Skip => {}
        }

        Ok(())
    }

    /// Run until `shutdown` resolves, a collaborator fails, or `max_cycles` pass
    ///
    /// The final record and chart are always written before returning.
    pub async fn run<F>(&mut self, shutdown: F, max_cycles: Option<u64>) -> StopReason
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let started = tokio::select! {
            _ = &mut shutdown => Err(StopReason::ManualStop),
            result = self.start() => result.map_err(|e| StopReason::Error(format!("{:#}", e))),
        };

        let reason = match started {
            Err(reason) => reason,
            Ok(()) => {
                let mut cycles: u64 = 0;
                loop {
                    if let Err(e) = self.run_cycle().await {
                        break StopReason::Error(format!("{:#}", e));
                    }
                    cycles += 1;
                    if max_cycles.is_some_and(|max| cycles >= max) {
                        break StopReason::Completed;
                    }

                    tokio::select! {
                        _ = &mut shutdown => break StopReason::ManualStop,
                        _ = tokio::time::sleep(self.settings.poll_interval) => {}
                    }
                }
            }
        };

        self.stop(reason.clone());
        reason
    }

    /// Record the stop reason and draw the final chart
    ///
    /// The STOP row carries the position held on the exchange, not the
    /// strategy's view of it.
    fn stop(&mut self, reason: StopReason) {
        match &reason {
            StopReason::Error(message) => tracing::error!(error = %message, "Trading stopped"),
            other => tracing::info!(reason = %other, "Trading stopped"),
        }

        // A rejected order leaves the strategy ahead of the exchange
        let snapshot = self.strategy.current_state();
        let held = self.positions.open_position().map(|p| p.side);
        if snapshot.position != held {
            tracing::warn!(
                strategy = position_label(snapshot.position),
                held = position_label(held),
                "Strategy position differs from the filled position"
            );
        }
        if let Some(open) = self.positions.open_position() {
            tracing::warn!(
                side = %open.side,
                quantity = open.quantity,
                entry_price = open.entry_price,
                "Position left open on the exchange"
            );
        }

        let record = TradeRecord {
            timestamp: Utc::now(),
            close: self.last_price.map(|p| p.close).unwrap_or(f64::NAN),
            fast: snapshot.fast,
            slow: snapshot.slow,
            action: TradeRecord::ACTION_STOP.to_string(),
            position: position_label(held).to_string(),
            stop_reason: reason.label().to_string(),
            error_message: reason.error_message().to_string(),
        };
        if let Err(e) = self.recorder.append(&record) {
            tracing::error!(error = %e, "Failed to record stop");
        }
        self.render_chart();

        tracing::info!(
            total_pnl = self.positions.total_pnl(),
            trades = self.positions.all_positions().len(),
            "Run summary"
        );

        self.state = TraderState::Stopped(reason);
    }

    fn render_chart(&self) {
        if let Some((visualizer, path)) = &self.chart {
            if let Err(e) = visualizer.render(self.recorder.records(), path) {
                tracing::warn!(error = %e, path = %path.display(), "Failed to render chart");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_reason_labels() {
        assert_eq!(StopReason::ManualStop.label(), "Manual Stop");
        assert_eq!(StopReason::Error("boom".into()).label(), "Error");
        assert_eq!(StopReason::Error("boom".into()).error_message(), "boom");
        assert_eq!(StopReason::ManualStop.error_message(), "");
        assert_eq!(StopReason::Error("boom".into()).to_string(), "Error: boom");
    }

    #[test]
    fn test_settings_from_config() {
        let settings = TraderSettings::from_config(&AppConfig::default());
        assert_eq!(settings.history_interval, "1m");
        assert_eq!(settings.history_limit, 1000);
        assert_eq!(settings.poll_interval, Duration::from_secs(60));
    }
}
