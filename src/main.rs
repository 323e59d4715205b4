mod bot;

use anyhow::Result;
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::{fmt, EnvFilter};

use cpr_signal_bot::config::Config;
use cpr_signal_bot::engine::SignalEngine;
use cpr_signal_bot::exchange::KrakenClient;
use cpr_signal_bot::notify::TelegramNotifier;
use cpr_signal_bot::storage::JsonFileStore;
use cpr_signal_bot::trading::TradeLedger;

use crate::bot::SignalBot;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .init();

    if cfg.telegram_bot_token.is_empty() {
        // Keep running so the failure shows up in logs, but alerts will not
        // be delivered until the token is configured.
        warn!("TELEGRAM_BOT_TOKEN is missing from the environment");
    }

    let market = Arc::new(KrakenClient::new(cfg.retry_policy()));
    let notifier = Arc::new(TelegramNotifier::new(
        &cfg.telegram_bot_token,
        cfg.telegram_chat_id,
    ));
    let store = Arc::new(JsonFileStore::new(cfg.trades_file()));
    let ledger = TradeLedger::load(store).await?;

    let engine = Arc::new(SignalEngine::new(&cfg, market, notifier, ledger));

    let mut bot = SignalBot::new(cfg, engine);
    bot.run().await
}
