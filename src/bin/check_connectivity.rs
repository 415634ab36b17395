//! Probe the configured Binance endpoint: server time, wallet balance, ticker.
//!
//! Uses the same configuration sources as the bot. Nothing is traded.

use emabot::api::{BinanceClient, BinanceEnvironment};
use emabot::config::AppConfig;

const BALANCE_ASSET: &str = "BTC";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter("emabot=info")
        .init();

    // Balance needs credentials, the rest works without them
    let config = AppConfig::load(None, true)?;
    let environment = BinanceEnvironment::from_testnet_flag(config.exchange.testnet);
    let client = BinanceClient::new(
        config.exchange.credentials(),
        environment,
        config.exchange.requests_per_minute,
    )?
    .with_recv_window(config.exchange.recv_window_ms);

    println!("Endpoint: {}", client.base_url());

    let server_time = client.server_time().await?;
    println!("Server time: {}", server_time);

    if config.exchange.credentials().is_some() {
        let balance = client.available_balance(BALANCE_ASSET).await?;
        println!("Available {} balance: {}", BALANCE_ASSET, balance);
    } else {
        println!("No API credentials configured, skipping balance check");
    }

    let price = client.ticker_price(&config.exchange.symbol).await?;
    println!("{} price: {}", config.exchange.symbol, price);

    Ok(())
}
