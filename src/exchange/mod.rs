pub mod kraken;

pub use kraken::KrakenClient;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::models::{CandleSeries, Timeframe};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("exchange error: {0}")]
    Exchange(String),
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("giving up after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: Box<FetchError>,
    },
}

impl FetchError {
    /// Whether another attempt could plausibly succeed. Symbol resolution
    /// failures are permanent; everything else is retried, matching the
    /// original feed's blanket retry.
    pub fn is_transient(&self) -> bool {
        !matches!(self, FetchError::UnknownSymbol(_) | FetchError::Exhausted { .. })
    }
}

/// Bounded retry with a fixed backoff delay between attempts.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(5),
        }
    }
}

/// Price-feed boundary. Implementations retry transient failures internally
/// per their `RetryPolicy`; an `Exhausted` error means all attempts were
/// spent and callers should treat the data as unavailable for this cycle.
#[async_trait]
pub trait MarketData: Send + Sync {
    async fn fetch_ohlcv(
        &self,
        symbol: &str,
        tf: Timeframe,
        limit: usize,
    ) -> Result<CandleSeries, FetchError>;

    /// Latest traded price for the symbol.
    async fn latest_price(&self, symbol: &str) -> Result<f64, FetchError>;
}
