use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use common::{Config, ExchangeClient, TradingMode};
use engine::{CoinbaseClient, Engine, RequestSigner};
use paper::PaperClient;
use strategy::StrategyFileConfig;

#[tokio::main]
async fn main() {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env().unwrap_or_else(|e| panic!("{e}"));
    info!(mode = %cfg.trading_mode, api = %cfg.api_base_url, "CrossBot starting");

    let strategy_cfg = match &cfg.strategy_config_path {
        Some(path) => StrategyFileConfig::load(path).unwrap_or_else(|e| panic!("{e}")),
        None => {
            info!("STRATEGY_CONFIG_PATH not set, using built-in strategy defaults");
            StrategyFileConfig::default()
        }
    };
    info!(
        product = %strategy_cfg.product_id,
        short_window = strategy_cfg.short.window,
        long_window = strategy_cfg.long.window,
        quote = %strategy_cfg.quote_amount,
        fee_buffer = %strategy_cfg.fee_buffer_ratio,
        "Strategy loaded"
    );

    // ── Venue client (injected based on TRADING_MODE) ────────────────────────
    let signer = RequestSigner::new(&cfg.key_name, &cfg.private_key_pem)
        .unwrap_or_else(|e| panic!("Cannot load Coinbase private key: {e}"));
    let coinbase: Arc<dyn ExchangeClient> = Arc::new(
        CoinbaseClient::new(signer, &cfg.api_base_url).unwrap_or_else(|e| panic!("{e}")),
    );

    let exchange_client: Arc<dyn ExchangeClient> = match cfg.trading_mode {
        TradingMode::Live => {
            info!("Live trading mode — orders go to Coinbase");
            coinbase
        }
        TradingMode::Paper => {
            info!("Paper trading mode — live candles, simulated orders");
            Arc::new(PaperClient::new(coinbase))
        }
    };

    // ── Engine ────────────────────────────────────────────────────────────────
    let engine = Engine::new(exchange_client, strategy_cfg);

    tokio::select! {
        _ = engine.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting.");
        }
    }
}
