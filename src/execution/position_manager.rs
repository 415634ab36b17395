use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{PositionSide, Signal};

#[derive(Debug, Clone, PartialEq)]
pub enum PositionStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    StopLoss,
    ProfitTarget,
}

impl ExitReason {
    /// Exit reason carried by an exit signal (None for entries and Hold)
    pub fn from_signal(signal: Signal) -> Option<Self> {
        match signal {
            Signal::StopLossLong | Signal::StopLossShort => Some(ExitReason::StopLoss),
            Signal::ExitLong | Signal::ExitShort => Some(ExitReason::ProfitTarget),
            _ => None,
        }
    }
}

/// An exchange-side position opened by one of our market orders
#[derive(Debug, Clone)]
pub struct Position {
    pub id: Uuid,
    pub symbol: String,
    pub side: PositionSide,
    pub entry_price: f64,
    pub quantity: f64,
    pub entry_time: DateTime<Utc>,
    pub entry_order_id: String,
    pub status: PositionStatus,
    pub realized_pnl: Option<f64>,
    pub exit_price: Option<f64>,
    pub exit_time: Option<DateTime<Utc>>,
    pub exit_reason: Option<ExitReason>,
}

impl Position {
    /// Profit or loss at `price`, in quote units per contract quantity
    pub fn pnl_at(&self, price: f64) -> f64 {
        match self.side {
            PositionSide::Long => (price - self.entry_price) * self.quantity,
            PositionSide::Short => (self.entry_price - price) * self.quantity,
        }
    }
}

/// Book of positions opened during one run
///
/// At most one position is open at a time. The open position's quantity is
/// what gets sent back to the exchange when it is closed.
#[derive(Debug, Default)]
pub struct PositionManager {
    positions: Vec<Position>,
    total_pnl: f64,
}

impl PositionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all positions (both open and closed)
    pub fn all_positions(&self) -> &[Position] {
        &self.positions
    }

    /// Get total realized P&L
    pub fn total_pnl(&self) -> f64 {
        self.total_pnl
    }

    pub fn has_open_position(&self) -> bool {
        self.open_position().is_some()
    }

    pub fn open_position(&self) -> Option<&Position> {
        self.positions
            .iter()
            .find(|p| p.status == PositionStatus::Open)
    }

    /// Record a filled entry order
    pub fn open(
        &mut self,
        symbol: &str,
        side: PositionSide,
        entry_price: f64,
        quantity: f64,
        entry_order_id: &str,
        timestamp: DateTime<Utc>,
    ) -> anyhow::Result<Uuid> {
        if let Some(existing) = self.open_position() {
            anyhow::bail!(
                "Already have open {} position for {}",
                existing.side,
                existing.symbol
            );
        }
        if quantity <= 0.0 {
            anyhow::bail!("Position quantity must be positive, got {}", quantity);
        }

        let id = Uuid::new_v4();
        self.positions.push(Position {
            id,
            symbol: symbol.to_string(),
            side,
            entry_price,
            quantity,
            entry_time: timestamp,
            entry_order_id: entry_order_id.to_string(),
            status: PositionStatus::Open,
            realized_pnl: None,
            exit_price: None,
            exit_time: None,
            exit_reason: None,
        });

        tracing::info!(
            symbol = %symbol,
            side = %side,
            entry_price,
            quantity,
            order_id = %entry_order_id,
            "Position opened"
        );

        Ok(id)
    }

    /// Close the open position and book its realized P&L
    pub fn close(
        &mut self,
        exit_price: f64,
        reason: ExitReason,
        timestamp: DateTime<Utc>,
    ) -> anyhow::Result<&Position> {
        let index = self
            .positions
            .iter()
            .position(|p| p.status == PositionStatus::Open)
            .ok_or_else(|| anyhow::anyhow!("No open position to close"))?;

        let position = &mut self.positions[index];
        let pnl = position.pnl_at(exit_price);

        position.status = PositionStatus::Closed;
        position.realized_pnl = Some(pnl);
        position.exit_price = Some(exit_price);
        position.exit_time = Some(timestamp);
        position.exit_reason = Some(reason);
        self.total_pnl += pnl;

        tracing::info!(
            symbol = %position.symbol,
            side = %position.side,
            exit_price,
            reason = ?reason,
            pnl,
            total_pnl = self.total_pnl,
            "Position closed"
        );

        Ok(&self.positions[index])
    }
}
