use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::TradeSetup;
use crate::models::{Side, TradeOutcome, TradeStatus};

/// A recorded signal and its lifecycle. Created only for actionable verdicts
/// and owned by the ledger. Never deleted: closing a trade is a status
/// transition, not a removal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: u64,
    pub symbol: String,
    pub side: Side,
    pub entry: f64,
    pub take_profit_1: f64,
    pub take_profit_2: f64,
    pub stop_loss: f64,
    pub created_at: DateTime<Utc>,
    pub status: TradeStatus,
    #[serde(default)]
    pub outcome: Option<TradeOutcome>,
    /// Realized profit/loss percent of entry; 0 until the trade closes.
    #[serde(default)]
    pub pnl_pct: f64,
}

impl Trade {
    pub fn new(
        id: u64,
        symbol: &str,
        setup: &TradeSetup,
        entry: f64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            symbol: symbol.to_string(),
            side: setup.side,
            entry,
            take_profit_1: setup.take_profit_1,
            take_profit_2: setup.take_profit_2,
            stop_loss: setup.stop_loss,
            created_at,
            status: TradeStatus::Active,
            outcome: None,
            pnl_pct: 0.0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == TradeStatus::Active
    }

    /// Evaluate the trade against a fresh price and transition if a level was
    /// reached. The farther target is checked first so a gapped move straight
    /// through both targets books TP2, not TP1. Closed trades never
    /// transition again. Returns whether a transition happened.
    pub fn apply_price(&mut self, price: f64) -> bool {
        if !self.is_open() {
            return false;
        }

        match self.side {
            Side::Buy => {
                if price >= self.take_profit_2 {
                    self.close(
                        TradeStatus::TargetTwoHit,
                        TradeOutcome::Win,
                        (self.take_profit_2 - self.entry) / self.entry * 100.0,
                    )
                } else if price >= self.take_profit_1 {
                    self.close(
                        TradeStatus::TargetOneHit,
                        TradeOutcome::PartialWin,
                        (self.take_profit_1 - self.entry) / self.entry * 100.0,
                    )
                } else if price <= self.stop_loss {
                    self.close(
                        TradeStatus::StopHit,
                        TradeOutcome::Loss,
                        (self.stop_loss - self.entry) / self.entry * 100.0,
                    )
                } else {
                    false
                }
            }
            Side::Sell => {
                if price <= self.take_profit_2 {
                    self.close(
                        TradeStatus::TargetTwoHit,
                        TradeOutcome::Win,
                        (self.entry - self.take_profit_2) / self.entry * 100.0,
                    )
                } else if price <= self.take_profit_1 {
                    self.close(
                        TradeStatus::TargetOneHit,
                        TradeOutcome::PartialWin,
                        (self.entry - self.take_profit_1) / self.entry * 100.0,
                    )
                } else if price >= self.stop_loss {
                    self.close(
                        TradeStatus::StopHit,
                        TradeOutcome::Loss,
                        (self.entry - self.stop_loss) / self.entry * 100.0,
                    )
                } else {
                    false
                }
            }
        }
    }

    fn close(&mut self, status: TradeStatus, outcome: TradeOutcome, pnl_pct: f64) -> bool {
        self.status = status;
        self.outcome = Some(outcome);
        self.pnl_pct = pnl_pct;
        true
    }
}
