use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};

use crate::trading::Trade;

/// Durable home for the trade list. The ledger saves whole snapshots after
/// every mutation and reloads them at startup; implementations must make each
/// save all-or-nothing.
#[async_trait]
pub trait TradeStore: Send + Sync {
    async fn load_all(&self) -> Result<Vec<Trade>>;
    async fn save_all(&self, trades: &[Trade]) -> Result<()>;
}

/// Pretty-printed JSON snapshot on disk. Written to a sidecar file and
/// renamed into place so a crash mid-write leaves the previous snapshot
/// intact.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TradeStore for JsonFileStore {
    async fn load_all(&self) -> Result<Vec<Trade>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("parsing {}", self.path.display()))
    }

    async fn save_all(&self, trades: &[Trade]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(trades).context("serializing trades")?;
        let tmp = sidecar(&self.path);
        fs::write(&tmp, json).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("renaming into {}", self.path.display()))?;
        Ok(())
    }
}

fn sidecar(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

/// Volatile store for tests and dry runs.
#[derive(Default)]
pub struct MemoryStore {
    trades: tokio::sync::Mutex<Vec<Trade>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trades(trades: Vec<Trade>) -> Self {
        Self {
            trades: tokio::sync::Mutex::new(trades),
        }
    }
}

#[async_trait]
impl TradeStore for MemoryStore {
    async fn load_all(&self) -> Result<Vec<Trade>> {
        Ok(self.trades.lock().await.clone())
    }

    async fn save_all(&self, trades: &[Trade]) -> Result<()> {
        *self.trades.lock().await = trades.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TradeSetup;
    use crate::models::Side;
    use chrono::Utc;

    fn sample_trade(id: u64) -> Trade {
        Trade::new(
            id,
            "BTC/USDT",
            &TradeSetup {
                side: Side::Buy,
                take_profit_1: 110.0,
                take_profit_2: 120.0,
                stop_loss: 100.0,
            },
            105.0,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn json_store_round_trip() {
        let dir = std::env::temp_dir().join(format!("cpr_store_test_{}", std::process::id()));
        let store = JsonFileStore::new(dir.join("trades.json"));

        assert!(store.load_all().await.unwrap().is_empty());

        let trades = vec![sample_trade(1), sample_trade(2)];
        store.save_all(&trades).await.unwrap();

        let loaded = store.load_all().await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, 1);
        assert_eq!(loaded[1].id, 2);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemoryStore::new();
        store.save_all(&[sample_trade(7)]).await.unwrap();
        let loaded = store.load_all().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, 7);
    }
}
