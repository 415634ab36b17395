// Core modules
pub mod api;
pub mod config;
pub mod error;
pub mod execution;
pub mod indicators;
pub mod logging;
pub mod models;
pub mod persistence;
pub mod strategy;
pub mod trader;
pub mod visualization;

// Re-export commonly used types
pub use api::{MarketDataSource, OrderExecutor};
pub use config::AppConfig;
pub use error::{ExchangeError, PersistenceError, VisualizationError};
pub use models::*;
pub use strategy::Strategy;
pub use trader::{LiveTrader, StopReason, TraderState};
