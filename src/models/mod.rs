use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single observed close price
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
}

impl PricePoint {
    pub fn new(timestamp: DateTime<Utc>, close: f64) -> Self {
        Self { timestamp, close }
    }
}

/// OHLCV candlestick as returned by the exchange history endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Kline {
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl From<&Kline> for PricePoint {
    fn from(kline: &Kline) -> Self {
        PricePoint::new(kline.open_time, kline.close)
    }
}

/// Direction of an open position
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionSide::Long => "LONG",
            PositionSide::Short => "SHORT",
        }
    }

    /// Order side that opens a position in this direction
    pub fn entry_order_side(&self) -> OrderSide {
        match self {
            PositionSide::Long => OrderSide::Buy,
            PositionSide::Short => OrderSide::Sell,
        }
    }

    /// Order side that closes a position in this direction
    pub fn exit_order_side(&self) -> OrderSide {
        self.entry_order_side().opposite()
    }
}

impl fmt::Display for PositionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label used in trade records for an optional position
pub fn position_label(side: Option<PositionSide>) -> &'static str {
    side.map(|s| s.as_str()).unwrap_or("NONE")
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }

    pub fn opposite(&self) -> OrderSide {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trading signal produced once per evaluation cycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Signal {
    EnterLong,
    ExitLong,
    EnterShort,
    ExitShort,
    StopLossLong,
    StopLossShort,
    Hold,
}

impl Signal {
    pub fn is_entry(&self) -> bool {
        matches!(self, Signal::EnterLong | Signal::EnterShort)
    }

    pub fn is_exit(&self) -> bool {
        matches!(
            self,
            Signal::ExitLong | Signal::ExitShort | Signal::StopLossLong | Signal::StopLossShort
        )
    }

    /// The position side this signal opens or closes (None for Hold)
    pub fn position_side(&self) -> Option<PositionSide> {
        match self {
            Signal::EnterLong | Signal::ExitLong | Signal::StopLossLong => {
                Some(PositionSide::Long)
            }
            Signal::EnterShort | Signal::ExitShort | Signal::StopLossShort => {
                Some(PositionSide::Short)
            }
            Signal::Hold => None,
        }
    }

    /// Market order side needed to act on this signal
    pub fn order_side(&self) -> Option<OrderSide> {
        let side = self.position_side()?;
        if self.is_entry() {
            Some(side.entry_order_side())
        } else {
            Some(side.exit_order_side())
        }
    }

    /// Action label written to the trade history
    pub fn action_label(&self) -> &'static str {
        match self {
            Signal::StopLossLong | Signal::StopLossShort => "STOP_LOSS",
            Signal::Hold => "HOLD",
            other => other
                .order_side()
                .map(|side| side.as_str())
                .unwrap_or("HOLD"),
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Signal::EnterLong => "ENTER_LONG",
            Signal::ExitLong => "EXIT_LONG",
            Signal::EnterShort => "ENTER_SHORT",
            Signal::ExitShort => "EXIT_SHORT",
            Signal::StopLossLong => "STOP_LOSS_LONG",
            Signal::StopLossShort => "STOP_LOSS_SHORT",
            Signal::Hold => "HOLD",
        };
        f.write_str(name)
    }
}

/// Exchange acknowledgement of a submitted order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderRecord {
    pub order_id: String,
    pub client_order_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: f64,
    pub avg_price: Option<f64>,
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

/// One row of the per-run trade history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeRecord {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    #[serde(rename = "FAST_IND")]
    pub fast: Option<f64>,
    #[serde(rename = "SLOW_IND")]
    pub slow: Option<f64>,
    pub action: String,
    pub position: String,
    pub stop_reason: String,
    pub error_message: String,
}

impl TradeRecord {
    pub const ACTION_PREFILL: &'static str = "PREFILL";
    pub const ACTION_STOP: &'static str = "STOP";
}
