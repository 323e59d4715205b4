use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::exchange::{FetchError, MarketData, RetryPolicy};
use crate::models::{Candle, CandleSeries, Timeframe};

const BASE_URL: &str = "https://api.kraken.com";
const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(2000);

#[derive(Debug, Deserialize)]
struct Envelope {
    error: Vec<String>,
    #[serde(default)]
    result: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct AssetPair {
    altname: String,
    #[serde(default)]
    wsname: Option<String>,
}

/// One OHLC row: [time, open, high, low, close, vwap, volume, count].
/// Prices arrive as strings, the timestamp as epoch seconds.
#[derive(Debug, Deserialize)]
struct OhlcRow(
    i64,
    String,
    String,
    String,
    String,
    #[allow(dead_code)] String,
    String,
    #[allow(dead_code)] u64,
);

#[derive(Debug, Deserialize)]
struct TickerInfo {
    /// Last trade closed: [price, lot volume].
    c: Vec<String>,
}

pub struct KrakenClient {
    client: Client,
    retry: RetryPolicy,
    last_request: Mutex<Option<Instant>>,
    /// symbol/altname/wsname → canonical pair key, loaded once from AssetPairs.
    markets: Mutex<Option<HashMap<String, String>>>,
}

impl KrakenClient {
    pub fn new(retry: RetryPolicy) -> Self {
        Self {
            client: Client::new(),
            retry,
            last_request: Mutex::new(None),
            markets: Mutex::new(None),
        }
    }

    /// Serialize requests and keep the exchange's pacing. The lock is held
    /// across the sleep so concurrent analyses queue instead of bursting.
    async fn rate_limit(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < MIN_REQUEST_INTERVAL {
                tokio::time::sleep(MIN_REQUEST_INTERVAL - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<serde_json::Value, FetchError> {
        self.rate_limit().await;

        let resp = self
            .client
            .get(format!("{}{}", BASE_URL, path))
            .query(query)
            .send()
            .await?;

        let envelope: Envelope = resp.json().await?;
        if !envelope.error.is_empty() {
            return Err(FetchError::Exchange(envelope.error.join("; ")));
        }
        envelope
            .result
            .ok_or_else(|| FetchError::Decode("missing result field".to_string()))
    }

    async fn load_markets(&self) -> Result<(), FetchError> {
        {
            let markets = self.markets.lock().await;
            if markets.is_some() {
                return Ok(());
            }
        }

        let result = self.get("/0/public/AssetPairs", &[]).await?;
        let pairs: HashMap<String, AssetPair> = serde_json::from_value(result)
            .map_err(|e| FetchError::Decode(format!("asset pairs: {e}")))?;

        let mut index = HashMap::new();
        for (key, pair) in pairs {
            index.insert(pair.altname.clone(), key.clone());
            if let Some(ws) = pair.wsname {
                index.insert(ws, key.clone());
            }
        }
        debug!("loaded {} kraken pairs", index.len());

        *self.markets.lock().await = Some(index);
        Ok(())
    }

    /// Resolve a configured symbol like "BTC/USDT" to Kraken's pair key.
    async fn resolve_market(&self, symbol: &str) -> Result<String, FetchError> {
        self.load_markets().await?;
        let markets = self.markets.lock().await;
        let index = markets
            .as_ref()
            .ok_or_else(|| FetchError::Decode("market index not loaded".to_string()))?;

        // Kraken lists bitcoin as XBT; try the symbol as given, compacted,
        // and with the XBT alias.
        let aliased = symbol.replace("BTC", "XBT");
        let candidates = [
            symbol.to_string(),
            symbol.replace('/', ""),
            aliased.clone(),
            aliased.replace('/', ""),
        ];
        for candidate in &candidates {
            if let Some(key) = index.get(candidate) {
                return Ok(key.clone());
            }
        }
        Err(FetchError::UnknownSymbol(symbol.to_string()))
    }

    async fn request_ohlcv(
        &self,
        symbol: &str,
        tf: Timeframe,
        limit: usize,
    ) -> Result<CandleSeries, FetchError> {
        let pair = self.resolve_market(symbol).await?;
        let window = tf.as_duration().as_secs() as i64 * limit as i64;
        let since = Utc::now().timestamp() - window;
        let result = self
            .get(
                "/0/public/OHLC",
                &[
                    ("pair", pair.clone()),
                    ("interval", tf.kraken_interval().to_string()),
                    ("since", since.to_string()),
                ],
            )
            .await?;

        // Result holds the rows under the canonical pair key plus a "last"
        // cursor; fall back to the first array-valued entry if the key the
        // exchange echoes differs from the one requested.
        let rows_value = result
            .get(&pair)
            .cloned()
            .or_else(|| {
                result
                    .as_object()
                    .and_then(|obj| obj.values().find(|v| v.is_array()).cloned())
            })
            .ok_or_else(|| FetchError::Decode(format!("no OHLC rows for {pair}")))?;

        let rows: Vec<OhlcRow> = serde_json::from_value(rows_value)
            .map_err(|e| FetchError::Decode(format!("OHLC rows: {e}")))?;

        let mut candles: Vec<Candle> = rows
            .into_iter()
            .filter_map(|row| {
                let timestamp = DateTime::from_timestamp(row.0, 0)?;
                Some(Candle {
                    timestamp,
                    open: row.1.parse().ok()?,
                    high: row.2.parse().ok()?,
                    low: row.3.parse().ok()?,
                    close: row.4.parse().ok()?,
                    volume: row.6.parse().ok()?,
                })
            })
            .collect();

        candles.sort_by_key(|c| c.timestamp);
        candles.dedup_by_key(|c| c.timestamp);
        if candles.len() > limit {
            candles.drain(..candles.len() - limit);
        }

        Ok(CandleSeries::new(candles))
    }

    async fn request_latest_price(&self, symbol: &str) -> Result<f64, FetchError> {
        let pair = self.resolve_market(symbol).await?;
        let result = self
            .get("/0/public/Ticker", &[("pair", pair.clone())])
            .await?;

        let tickers: HashMap<String, TickerInfo> = serde_json::from_value(result)
            .map_err(|e| FetchError::Decode(format!("ticker: {e}")))?;

        let info = tickers
            .get(&pair)
            .or_else(|| tickers.values().next())
            .ok_or_else(|| FetchError::Decode(format!("no ticker for {pair}")))?;

        info.c
            .first()
            .and_then(|p| p.parse::<f64>().ok())
            .ok_or_else(|| FetchError::Decode(format!("no last price for {pair}")))
    }
}

#[async_trait]
impl MarketData for KrakenClient {
    async fn fetch_ohlcv(
        &self,
        symbol: &str,
        tf: Timeframe,
        limit: usize,
    ) -> Result<CandleSeries, FetchError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.request_ohlcv(symbol, tf, limit).await {
                Ok(series) => return Ok(series),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) if attempt >= self.retry.max_attempts => {
                    return Err(FetchError::Exhausted {
                        attempts: attempt,
                        source: Box::new(e),
                    })
                }
                Err(e) => {
                    warn!("fetch {symbol} {tf} attempt {attempt} failed: {e}");
                    tokio::time::sleep(self.retry.backoff).await;
                }
            }
        }
    }

    async fn latest_price(&self, symbol: &str) -> Result<f64, FetchError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.request_latest_price(symbol).await {
                Ok(price) => return Ok(price),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) if attempt >= self.retry.max_attempts => {
                    return Err(FetchError::Exhausted {
                        attempts: attempt,
                        source: Box::new(e),
                    })
                }
                Err(e) => {
                    warn!("ticker {symbol} attempt {attempt} failed: {e}");
                    tokio::time::sleep(self.retry.backoff).await;
                }
            }
        }
    }
}
