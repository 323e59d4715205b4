use chrono::{DateTime, Utc};

use crate::models::TradeOutcome;
use crate::trading::{ledger::win_rate, Trade};

const TOP_TRADES: usize = 3;
const OPEN_TRADES_LISTED: usize = 3;

/// Aggregated view of one reporting window, ready to format.
#[derive(Debug, Clone)]
pub struct PerformanceReport {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub total_signals: usize,
    pub wins: usize,
    pub partial_wins: usize,
    pub losses: usize,
    pub still_active: usize,
    pub win_rate: f64,
    pub total_profit: f64,
    pub total_loss: f64,
    pub net_pnl: f64,
    pub top_trades: Vec<Trade>,
    pub open_trades: Vec<Trade>,
}

impl PerformanceReport {
    /// Aggregate the trades created in `[start, end)`. The boundary is
    /// half-open: a trade created exactly at `start` belongs to the window,
    /// one created at `end` does not.
    pub fn over_window(trades: &[Trade], start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        let windowed: Vec<&Trade> = trades
            .iter()
            .filter(|t| t.created_at >= start && t.created_at < end)
            .collect();

        let mut wins = 0;
        let mut partial_wins = 0;
        let mut losses = 0;
        let mut still_active = 0;
        let mut total_profit = 0.0;
        let mut total_loss = 0.0;

        for trade in &windowed {
            match trade.outcome {
                Some(TradeOutcome::Win) => {
                    wins += 1;
                    total_profit += trade.pnl_pct.max(0.0);
                }
                Some(TradeOutcome::PartialWin) => {
                    partial_wins += 1;
                    total_profit += trade.pnl_pct.max(0.0);
                }
                Some(TradeOutcome::Loss) => {
                    losses += 1;
                    total_loss += trade.pnl_pct.abs();
                }
                None => still_active += 1,
            }
        }

        let mut closed: Vec<Trade> = windowed
            .iter()
            .filter(|t| t.outcome.is_some())
            .map(|t| (*t).clone())
            .collect();
        closed.sort_by(|a, b| b.pnl_pct.total_cmp(&a.pnl_pct));
        closed.truncate(TOP_TRADES);

        let open_trades: Vec<Trade> = windowed
            .iter()
            .filter(|t| t.is_open())
            .take(OPEN_TRADES_LISTED)
            .map(|t| (*t).clone())
            .collect();

        PerformanceReport {
            start,
            end,
            total_signals: windowed.len(),
            wins,
            partial_wins,
            losses,
            still_active,
            win_rate: win_rate(wins, partial_wins, losses),
            total_profit,
            total_loss,
            net_pnl: total_profit - total_loss,
            top_trades: closed,
            open_trades,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_signals == 0
    }

    /// Telegram digest, HTML parse mode.
    pub fn to_html(&self) -> String {
        let mut msg = String::new();
        msg.push_str("📅 <b>DAILY PERFORMANCE REPORT</b>\n");
        msg.push_str(&format!(
            "<i>{} → {}</i>\n\n",
            self.start.format("%Y-%m-%d %H:%M UTC"),
            self.end.format("%Y-%m-%d %H:%M UTC"),
        ));

        if self.is_empty() {
            msg.push_str("No signals in this window.\n");
            return msg;
        }

        msg.push_str(&format!("<b>Signals:</b> {}\n", self.total_signals));
        msg.push_str(&format!(
            "✅ Wins: {} | 🎯 Partial: {} | ❌ Losses: {} | ⏳ Open: {}\n",
            self.wins, self.partial_wins, self.losses, self.still_active
        ));
        msg.push_str(&format!("<b>Win Rate:</b> {:.1}%\n\n", self.win_rate));
        msg.push_str(&format!(
            "<b>Profit:</b> +{:.2}% | <b>Loss:</b> -{:.2}% | <b>Net:</b> {:+.2}%\n",
            self.total_profit, self.total_loss, self.net_pnl
        ));

        if !self.top_trades.is_empty() {
            msg.push_str("\n<b>🏆 TOP TRADES</b>\n");
            for (rank, trade) in self.top_trades.iter().enumerate() {
                msg.push_str(&format!(
                    "{}. {} {} {:+.2}% ({})\n",
                    rank + 1,
                    trade.symbol,
                    trade.side,
                    trade.pnl_pct,
                    trade.status,
                ));
            }
        }

        if !self.open_trades.is_empty() {
            msg.push_str("\n<b>⏳ STILL OPEN</b>\n");
            for trade in &self.open_trades {
                msg.push_str(&format!(
                    "• {} {} @ <code>{:.2}</code>\n",
                    trade.symbol, trade.side, trade.entry
                ));
            }
        }

        msg
    }
}
