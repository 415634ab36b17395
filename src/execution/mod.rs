// Order sizing, position bookkeeping and market data collection
pub mod executor;
pub mod position_manager;
pub mod price_feed;
pub mod retry;

pub use executor::{ExecutionAction, ExecutionDecision, Executor};
pub use position_manager::{ExitReason, Position, PositionManager, PositionStatus};
pub use price_feed::PriceFeed;
pub use retry::{ExponentialBackoff, RetryPolicy};
