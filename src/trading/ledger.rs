use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::core::TradeSetup;
use crate::exchange::MarketData;
use crate::models::{TradeOutcome, TradeStatus};
use crate::storage::TradeStore;
use crate::trading::Trade;

/// Counts by status and outcome for the status surface.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LedgerStats {
    pub total: usize,
    pub active: usize,
    pub target_one_hit: usize,
    pub target_two_hit: usize,
    pub stop_hit: usize,
    pub wins: usize,
    pub partial_wins: usize,
    pub losses: usize,
    pub win_rate: f64,
}

struct Inner {
    trades: Vec<Trade>,
    next_id: u64,
}

/// Owner of every emitted trade. An append-and-update log: trades enter as
/// Active, transition at most once, and are never removed. All mutation goes
/// through one mutex around read-modify-persist of the whole snapshot, since
/// concurrent per-symbol analyses and the outcome sweep share this state.
pub struct TradeLedger {
    inner: Mutex<Inner>,
    store: Arc<dyn TradeStore>,
}

impl TradeLedger {
    /// Restore the ledger from the store. The id counter resumes past the
    /// highest persisted id.
    pub async fn load(store: Arc<dyn TradeStore>) -> Result<Self> {
        let trades = store.load_all().await.context("loading trade ledger")?;
        let next_id = trades.iter().map(|t| t.id).max().unwrap_or(0) + 1;
        if !trades.is_empty() {
            info!("restored {} trades from store", trades.len());
        }
        Ok(Self {
            inner: Mutex::new(Inner { trades, next_id }),
            store,
        })
    }

    /// Record a new trade for an actionable signal. Assigns the next sequence
    /// id, persists the full snapshot, and returns the stored trade.
    pub async fn append(
        &self,
        symbol: &str,
        setup: &TradeSetup,
        entry: f64,
        created_at: DateTime<Utc>,
    ) -> Trade {
        let mut inner = self.inner.lock().await;
        let id = inner.next_id;
        inner.next_id += 1;

        let trade = Trade::new(id, symbol, setup, entry, created_at);
        inner.trades.push(trade.clone());

        self.persist(&inner.trades).await;
        trade
    }

    /// Re-evaluate every open trade against its symbol's latest price.
    /// A failed fetch skips that trade and the sweep moves on; the price per
    /// symbol is fetched once per sweep. Persists only if something changed.
    /// Re-running with unchanged prices is a no-op: closed trades are not
    /// scanned. Returns the number of transitions.
    pub async fn reevaluate_open_trades(&self, market: &dyn MarketData) -> usize {
        let mut inner = self.inner.lock().await;
        let mut prices: HashMap<String, Option<f64>> = HashMap::new();
        let mut transitions = 0;

        for idx in 0..inner.trades.len() {
            if !inner.trades[idx].is_open() {
                continue;
            }
            let symbol = inner.trades[idx].symbol.clone();

            let price = match prices.get(&symbol) {
                Some(cached) => *cached,
                None => {
                    let fetched = match market.latest_price(&symbol).await {
                        Ok(p) => Some(p),
                        Err(e) => {
                            warn!("sweep: price for {symbol} unavailable: {e}");
                            None
                        }
                    };
                    prices.insert(symbol.clone(), fetched);
                    fetched
                }
            };

            let Some(price) = price else { continue };

            let trade = &mut inner.trades[idx];
            if trade.apply_price(price) {
                info!(
                    "trade #{} {} {} -> {} (pnl {:+.2}%)",
                    trade.id, trade.symbol, trade.side, trade.status, trade.pnl_pct
                );
                transitions += 1;
            }
        }

        if transitions > 0 {
            self.persist(&inner.trades).await;
        } else {
            debug!("sweep: no transitions");
        }
        transitions
    }

    /// Read-only copy of all trades, in creation order.
    pub async fn snapshot(&self) -> Vec<Trade> {
        self.inner.lock().await.trades.clone()
    }

    pub async fn stats(&self) -> LedgerStats {
        let inner = self.inner.lock().await;
        let mut stats = LedgerStats {
            total: inner.trades.len(),
            ..Default::default()
        };
        for trade in &inner.trades {
            match trade.status {
                TradeStatus::Active => stats.active += 1,
                TradeStatus::TargetOneHit => stats.target_one_hit += 1,
                TradeStatus::TargetTwoHit => stats.target_two_hit += 1,
                TradeStatus::StopHit => stats.stop_hit += 1,
            }
            match trade.outcome {
                Some(TradeOutcome::Win) => stats.wins += 1,
                Some(TradeOutcome::PartialWin) => stats.partial_wins += 1,
                Some(TradeOutcome::Loss) => stats.losses += 1,
                None => {}
            }
        }
        stats.win_rate = win_rate(stats.wins, stats.partial_wins, stats.losses);
        stats
    }

    /// Save failure degrades durability, not correctness: the in-memory list
    /// stays authoritative until the next successful save.
    async fn persist(&self, trades: &[Trade]) {
        if let Err(e) = self.store.save_all(trades).await {
            warn!("persisting ledger failed: {e:#}");
        }
    }
}

pub fn win_rate(wins: usize, partial_wins: usize, losses: usize) -> f64 {
    let closed = wins + partial_wins + losses;
    if closed == 0 {
        return 0.0;
    }
    (wins + partial_wins) as f64 / closed as f64 * 100.0
}
