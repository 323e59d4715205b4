use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::exchange::RetryPolicy;
use crate::models::Timeframe;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Assets to monitor
    pub symbols: Vec<String>,

    // Telegram
    pub telegram_bot_token: String,
    pub telegram_chat_id: i64,

    // Timeframes: major trend vs entry precision
    pub major_timeframe: Timeframe,
    pub entry_timeframe: Timeframe,
    pub fetch_limit: usize,

    // Price feed retry policy
    pub max_retries: u32,
    pub retry_backoff_secs: u64,

    // Cadences
    pub analysis_interval_secs: u64,
    pub sweep_interval_secs: u64,
    pub report_interval_secs: u64,

    // Storage & logging
    pub data_dir: String,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let env = |key: &str, default: &str| -> String {
            std::env::var(key).unwrap_or_else(|_| default.to_string())
        };

        let symbols: Vec<String> = env("CRYPTOS", "BTC/USDT,ETH/USDT,SOL/USDT")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Config {
            symbols,
            telegram_bot_token: env("TELEGRAM_BOT_TOKEN", ""),
            telegram_chat_id: env("TELEGRAM_CHAT_ID", "0").parse().unwrap_or(0),
            major_timeframe: Timeframe::from_str_loose(&env("TIMEFRAME_MAIN", "4h"))
                .unwrap_or(Timeframe::H4),
            entry_timeframe: Timeframe::from_str_loose(&env("TIMEFRAME_ENTRY", "1h"))
                .unwrap_or(Timeframe::H1),
            fetch_limit: env("FETCH_LIMIT", "100").parse().unwrap_or(100),
            max_retries: env("FETCH_MAX_RETRIES", "3").parse().unwrap_or(3),
            retry_backoff_secs: env("FETCH_RETRY_BACKOFF", "5").parse().unwrap_or(5),
            analysis_interval_secs: env("ANALYSIS_INTERVAL", "1800").parse().unwrap_or(1800),
            sweep_interval_secs: env("SWEEP_INTERVAL", "1800").parse().unwrap_or(1800),
            report_interval_secs: env("REPORT_INTERVAL", "86400").parse().unwrap_or(86400),
            data_dir: env("DATA_DIR", "data"),
            log_level: env("LOG_LEVEL", "INFO"),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries.max(1),
            backoff: Duration::from_secs(self.retry_backoff_secs),
        }
    }

    pub fn trades_file(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("trades.json")
    }
}
