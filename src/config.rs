//! Runtime configuration
//!
//! Layers, lowest priority first: built-in defaults, an optional TOML file,
//! then `EMABOT__SECTION__KEY` environment variables.

use anyhow::Context;
use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::api::ApiCredentials;
use crate::execution::RetryPolicy;
use crate::strategy::StrategyConfig;

pub const DEFAULT_CONFIG_FILE: &str = "emabot.toml";
pub const ENV_PREFIX: &str = "EMABOT";

const REDACTED: &str = "<redacted>";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub exchange: ExchangeSettings,
    pub strategy: StrategyConfig,
    pub trading: TradingSettings,
    pub retry: RetryPolicy,
    pub output: OutputSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeSettings {
    pub api_key: Option<String>,
    pub secret_key: Option<String>,
    pub testnet: bool,
    pub symbol: String,
    pub leverage: u32,
    pub recv_window_ms: u64,
    pub requests_per_minute: u32,
}

impl Default for ExchangeSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            secret_key: None,
            testnet: true,
            symbol: "BTCUSD_PERP".to_string(),
            leverage: 5,
            recv_window_ms: 5000,
            requests_per_minute: 1200,
        }
    }
}

impl ExchangeSettings {
    pub fn credentials(&self) -> Option<ApiCredentials> {
        ApiCredentials::from_parts(self.api_key.as_deref(), self.secret_key.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingSettings {
    /// Quote value of every entry order; quantity is `trade_notional / price`
    pub trade_notional: f64,
    /// Decimal places kept when rounding order quantities down
    pub quantity_precision: u32,
    pub poll_interval_secs: u64,
    pub history_interval: String,
    pub history_limit: u32,
    /// Fill orders locally instead of sending them to the exchange
    pub dry_run: bool,
}

impl Default for TradingSettings {
    fn default() -> Self {
        Self {
            trade_notional: 800.0,
            quantity_precision: 3,
            poll_interval_secs: 60,
            history_interval: "1m".to_string(),
            history_limit: 1000,
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub runs_dir: PathBuf,
    pub log_dir: PathBuf,
    pub log_level: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            runs_dir: PathBuf::from("./data/live_runs"),
            log_dir: PathBuf::from("./logs"),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `path` (or `emabot.toml` if present) and the environment
    ///
    /// An explicitly given file must exist; the default one is optional.
    /// `force_dry_run` overrides every other source.
    pub fn load(path: Option<&Path>, force_dry_run: bool) -> anyhow::Result<Self> {
        let (file, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        let builder = config::Config::builder()
            .add_source(File::from(file.as_path()).required(required))
            .add_source(Self::environment())
            .set_override_option("trading.dry_run", force_dry_run.then_some(true))?;

        Self::from_builder(builder)
            .with_context(|| format!("Failed to load configuration ({})", file.display()))
    }

    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> anyhow::Result<Self> {
        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.strategy.validate()?;

        if self.exchange.symbol.trim().is_empty() {
            anyhow::bail!("exchange.symbol must not be empty");
        }
        if self.exchange.leverage == 0 {
            anyhow::bail!("exchange.leverage must be at least 1");
        }
        if !(self.trading.trade_notional > 0.0) {
            anyhow::bail!(
                "trading.trade_notional must be positive, got {}",
                self.trading.trade_notional
            );
        }
        if self.trading.poll_interval_secs == 0 {
            anyhow::bail!("trading.poll_interval_secs must be at least 1");
        }
        if (self.trading.history_limit as usize) < self.strategy.min_points_required() {
            tracing::warn!(
                history_limit = self.trading.history_limit,
                slow_window = self.strategy.slow_window,
                "History shorter than the slow window; strategy will hold until enough prices arrive"
            );
        }
        if self.retry.max_attempts == 0 {
            anyhow::bail!("retry.max_attempts must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.retry.jitter_factor) {
            anyhow::bail!(
                "retry.jitter_factor must be between 0 and 1, got {}",
                self.retry.jitter_factor
            );
        }
        if !self.trading.dry_run && self.exchange.credentials().is_none() {
            anyhow::bail!(
                "exchange.api_key and exchange.secret_key are required unless trading.dry_run is set"
            );
        }

        Ok(())
    }

    /// Copy safe to write to disk: credentials replaced by a marker
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        let redact = |value: &mut Option<String>| {
            if value.is_some() {
                *value = Some(REDACTED.to_string());
            }
        };
        redact(&mut copy.exchange.api_key);
        redact(&mut copy.exchange.secret_key);
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;
    use std::collections::HashMap;

    fn env_source(vars: &[(&str, &str)]) -> Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::environment().source(Some(map))
    }

    fn dry_run_toml() -> File<config::FileSourceString, FileFormat> {
        File::from_str("[trading]\ndry_run = true\n", FileFormat::Toml)
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.exchange.symbol, "BTCUSD_PERP");
        assert_eq!(config.exchange.leverage, 5);
        assert_eq!(config.strategy.fast_window, 100);
        assert_eq!(config.strategy.slow_window, 400);
        assert_eq!(config.trading.trade_notional, 800.0);
        assert_eq!(config.trading.quantity_precision, 3);
        assert_eq!(config.trading.poll_interval_secs, 60);
        assert_eq!(config.trading.history_limit, 1000);
        assert_eq!(config.output.runs_dir, PathBuf::from("./data/live_runs"));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let toml = r#"
            [exchange]
            symbol = "ETHUSD_PERP"
            leverage = 3

            [strategy]
            stop_loss = 0.03
            fast_window = 10
            slow_window = 40

            [trading]
            dry_run = true
            quantity_precision = 2
        "#;
        let builder = config::Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .add_source(env_source(&[]));

        let config = AppConfig::from_builder(builder).unwrap();
        assert_eq!(config.exchange.symbol, "ETHUSD_PERP");
        assert_eq!(config.exchange.leverage, 3);
        assert_eq!(config.strategy.stop_loss, 0.03);
        assert_eq!(config.strategy.profit_target, 0.05);
        assert_eq!(config.strategy.slow_window, 40);
        assert_eq!(config.trading.quantity_precision, 2);
        assert_eq!(config.trading.poll_interval_secs, 60);
    }

    #[test]
    fn test_environment_overrides_file() {
        let builder = config::Config::builder()
            .add_source(dry_run_toml())
            .add_source(env_source(&[
                ("EMABOT__STRATEGY__STOP_LOSS", "0.01"),
                ("EMABOT__STRATEGY__ENABLE_SHORTING", "false"),
                ("EMABOT__TRADING__POLL_INTERVAL_SECS", "5"),
            ]));

        let config = AppConfig::from_builder(builder).unwrap();
        assert_eq!(config.strategy.stop_loss, 0.01);
        assert!(!config.strategy.enable_shorting);
        assert_eq!(config.trading.poll_interval_secs, 5);
        assert!(config.trading.dry_run);
    }

    #[test]
    fn test_live_trading_requires_credentials() {
        let builder = config::Config::builder().add_source(env_source(&[]));
        let err = AppConfig::from_builder(builder).unwrap_err();
        assert!(err.to_string().contains("api_key"));
    }

    #[test]
    fn test_invalid_windows_rejected() {
        let builder = config::Config::builder()
            .add_source(dry_run_toml())
            .add_source(env_source(&[
                ("EMABOT__STRATEGY__FAST_WINDOW", "50"),
                ("EMABOT__STRATEGY__SLOW_WINDOW", "20"),
            ]));
        assert!(AppConfig::from_builder(builder).is_err());
    }

    #[test]
    fn test_jitter_factor_out_of_range_rejected() {
        for jitter in ["1e300", "-0.5", "NaN"] {
            let builder = config::Config::builder()
                .add_source(dry_run_toml())
                .add_source(env_source(&[("EMABOT__RETRY__JITTER_FACTOR", jitter)]));
            let err = AppConfig::from_builder(builder).unwrap_err();
            assert!(err.to_string().contains("jitter_factor"), "{}: {}", jitter, err);
        }
    }

    #[test]
    fn test_redacted_hides_secrets() {
        let mut config = AppConfig::default();
        config.exchange.api_key = Some("my-key".into());
        config.exchange.secret_key = Some("my-secret".into());

        let json = serde_json::to_string(&config.redacted()).unwrap();
        assert!(!json.contains("my-key"));
        assert!(!json.contains("my-secret"));
        assert!(json.contains(REDACTED));
        assert_eq!(config.exchange.api_key.as_deref(), Some("my-key"));
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let result = AppConfig::load(Some(Path::new("/nonexistent/emabot.toml")), true);
        assert!(result.is_err());
    }
}
