use crate::execution::{ExitReason, PositionManager};
use crate::models::{OrderSide, PositionSide, Signal};

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionAction {
    Open {
        side: PositionSide,
        order_side: OrderSide,
        quantity: f64,
    },
    Close {
        order_side: OrderSide,
        quantity: f64,
        exit_reason: ExitReason,
    },
    Skip,
}

#[derive(Debug, Clone)]
pub struct ExecutionDecision {
    pub action: ExecutionAction,
    pub reason: String,
}

/// Turns strategy signals into sized market orders
///
/// Entries are sized as `trade_notional / price`, rounded down to the
/// instrument's quantity precision. Exits send back the quantity that was
/// filled on entry.
#[derive(Debug, Clone)]
pub struct Executor {
    trade_notional: f64,
    quantity_precision: u32,
}

impl Executor {
    pub fn new(trade_notional: f64, quantity_precision: u32) -> Self {
        Self {
            trade_notional,
            quantity_precision,
        }
    }

    /// Process a signal and decide what to do
    pub fn process_signal(
        &self,
        signal: Signal,
        current_price: f64,
        positions: &PositionManager,
    ) -> anyhow::Result<ExecutionDecision> {
        if signal == Signal::Hold {
            return Ok(ExecutionDecision {
                action: ExecutionAction::Skip,
                reason: "Hold signal".to_string(),
            });
        }

        let side = signal
            .position_side()
            .ok_or_else(|| anyhow::anyhow!("Signal {} has no position side", signal))?;

        if signal.is_entry() {
            if let Some(open) = positions.open_position() {
                anyhow::bail!(
                    "{} while a {} position is still open",
                    signal,
                    open.side
                );
            }

            let quantity = self.calculate_position_size(current_price)?;
            return Ok(ExecutionDecision {
                action: ExecutionAction::Open {
                    side,
                    order_side: side.entry_order_side(),
                    quantity,
                },
                reason: format!(
                    "{} sized {} at {:.2} for notional {:.2}",
                    signal, quantity, current_price, self.trade_notional
                ),
            });
        }

        let exit_reason = ExitReason::from_signal(signal)
            .ok_or_else(|| anyhow::anyhow!("Signal {} is neither entry nor exit", signal))?;

        let position = positions
            .open_position()
            .ok_or_else(|| anyhow::anyhow!("{} without an open position", signal))?;

        if position.side != side {
            anyhow::bail!("{} does not match open {} position", signal, position.side);
        }

        Ok(ExecutionDecision {
            action: ExecutionAction::Close {
                order_side: side.exit_order_side(),
                quantity: position.quantity,
                exit_reason,
            },
            reason: format!(
                "{} closing {} entered at {:.2}",
                signal, position.quantity, position.entry_price
            ),
        })
    }

    /// Quantity for a fresh entry at `current_price`
    pub fn calculate_position_size(&self, current_price: f64) -> anyhow::Result<f64> {
        if !(current_price > 0.0) {
            anyhow::bail!("Cannot size an order at price {}", current_price);
        }

        let raw = self.trade_notional / current_price;
        let scale = 10f64.powi(self.quantity_precision as i32);
        let quantity = (raw * scale).floor() / scale;

        if quantity <= 0.0 {
            anyhow::bail!(
                "Trade notional {:.2} is too small for price {:.2} at precision {}",
                self.trade_notional,
                current_price,
                self.quantity_precision
            );
        }

        Ok(quantity)
    }
}
