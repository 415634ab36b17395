use anyhow::Context;
use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::OutputSettings;

pub const LOG_FILE: &str = "trading_bot.log";

/// Filter used when RUST_LOG is not set: our crate at `level`, dependencies at warn
fn default_filter(level: &str) -> anyhow::Result<EnvFilter> {
    EnvFilter::try_new(format!("warn,emabot={}", level))
        .with_context(|| format!("Invalid log level '{}'", level))
}

/// Install console and file logging
///
/// The log file is truncated at every start. Returns its path.
pub fn init(settings: &OutputSettings) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(&settings.log_dir).with_context(|| {
        format!("Failed to create log directory {}", settings.log_dir.display())
    })?;

    let path = settings.log_dir.join(LOG_FILE);
    let file = File::create(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => default_filter(&settings.log_level)?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .try_init()
        .context("Logging already initialized")?;

    Ok(path)
}
