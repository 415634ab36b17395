use anyhow::Context;
use clap::Parser;
use emabot::api::{BinanceClient, BinanceEnvironment, OrderExecutor, PaperExecutor};
use emabot::config::AppConfig;
use emabot::execution::{Executor, PriceFeed};
use emabot::persistence::{CsvTradeRecorder, RunDirectory};
use emabot::strategy::EmaCrossoverStrategy;
use emabot::trader::{LiveTrader, StopReason, TraderSettings};
use emabot::visualization::SvgChartRenderer;
use std::path::PathBuf;
use std::sync::Arc;

/// EMA crossover trading bot for Binance COIN-M futures
#[derive(Debug, Parser)]
#[command(name = "emabot", version, about)]
struct Cli {
    /// Configuration file (defaults to ./emabot.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fill orders locally instead of sending them to the exchange
    #[arg(long)]
    dry_run: bool,

    /// Stop after a single trading cycle
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref(), cli.dry_run)?;
    let log_path = emabot::logging::init(&config.output)?;

    tracing::info!(
        symbol = %config.exchange.symbol,
        testnet = config.exchange.testnet,
        dry_run = config.trading.dry_run,
        log_file = %log_path.display(),
        "EMA crossover bot starting"
    );

    let run = RunDirectory::create_next(&config.output.runs_dir)
        .context("Failed to create run folder")?;
    if let Err(e) = run.write_config_backup(&config.redacted()) {
        tracing::warn!(error = %e, "Failed to back up configuration");
    }

    let client = Arc::new(
        BinanceClient::new(
            config.exchange.credentials(),
            BinanceEnvironment::from_testnet_flag(config.exchange.testnet),
            config.exchange.requests_per_minute,
        )?
        .with_recv_window(config.exchange.recv_window_ms),
    );

    configure_leverage(&client, &config).await?;

    let orders: Arc<dyn OrderExecutor> = if config.trading.dry_run {
        Arc::new(PaperExecutor::new(client.clone()))
    } else {
        client.clone()
    };

    let strategy = EmaCrossoverStrategy::new(config.strategy.clone());
    let chart_title = format!(
        "{} EMA {}/{}",
        config.exchange.symbol, config.strategy.fast_window, config.strategy.slow_window
    );

    let mut trader = LiveTrader::new(
        PriceFeed::new(client, config.exchange.symbol.clone(), config.retry.clone()),
        orders,
        strategy,
        Executor::new(config.trading.trade_notional, config.trading.quantity_precision),
        Box::new(CsvTradeRecorder::create(run.trade_log_path())?),
        TraderSettings::from_config(&config),
    )
    .with_chart(
        Box::new(SvgChartRenderer::new().with_title(chart_title)),
        run.chart_path(),
    );

    tracing::info!(run = %run.path().display(), "Press Ctrl+C to stop");

    let reason = trader.run(shutdown_signal(), cli.once.then_some(1)).await;

    tracing::info!(run = %run.path().display(), "Trade history saved");

    match reason {
        StopReason::Error(message) => anyhow::bail!("Trading stopped on error: {}", message),
        _ => Ok(()),
    }
}

/// Set leverage once; a failure only matters when real orders will be sent
async fn configure_leverage(client: &BinanceClient, config: &AppConfig) -> anyhow::Result<()> {
    if config.exchange.credentials().is_none() {
        tracing::info!("No API credentials, leaving leverage unchanged");
        return Ok(());
    }

    match client
        .set_leverage(&config.exchange.symbol, config.exchange.leverage)
        .await
    {
        Ok(_) => Ok(()),
        Err(e) if config.trading.dry_run => {
            tracing::warn!(error = %e, "Failed to set leverage (dry run, continuing)");
            Ok(())
        }
        Err(e) => Err(e).context("Failed to set leverage"),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Received Ctrl+C, shutting down...");
}
