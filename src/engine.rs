use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::core::{confluence, pivots::PivotLevels, trend, SignalDecision};
use crate::exchange::MarketData;
use crate::models::Timeframe;
use crate::notify::Notifier;
use crate::reporting::PerformanceReport;
use crate::trading::{LedgerStats, Trade, TradeLedger};

const DAILY_FETCH_LIMIT: usize = 5;
const REPORT_WINDOW_HOURS: i64 = 24;

/// Result of one analysis cycle for one symbol.
#[derive(Debug)]
pub enum AnalysisOutcome {
    /// Not enough data this cycle; nothing recorded, nothing sent.
    DataUnavailable(&'static str),
    /// Confluence evaluated. A trade exists only for actionable verdicts.
    Evaluated {
        decision: SignalDecision,
        trade: Option<Trade>,
    },
}

#[derive(Debug, Clone)]
pub struct EngineStats {
    pub symbols: Vec<String>,
    pub total_analyses: u64,
    pub last_analysis: Option<DateTime<Utc>>,
    pub uptime_start: DateTime<Utc>,
    pub ledger: LedgerStats,
}

/// Ties the pure signal core to the external collaborators. One instance is
/// shared across all per-symbol tasks and the sweep/report cadences.
pub struct SignalEngine {
    market: Arc<dyn MarketData>,
    notifier: Arc<dyn Notifier>,
    ledger: TradeLedger,
    symbols: Vec<String>,
    major_tf: Timeframe,
    entry_tf: Timeframe,
    fetch_limit: usize,
    total_analyses: AtomicU64,
    last_analysis: Mutex<Option<DateTime<Utc>>>,
    uptime_start: DateTime<Utc>,
}

impl SignalEngine {
    pub fn new(
        cfg: &Config,
        market: Arc<dyn MarketData>,
        notifier: Arc<dyn Notifier>,
        ledger: TradeLedger,
    ) -> Self {
        Self {
            market,
            notifier,
            ledger,
            symbols: cfg.symbols.clone(),
            major_tf: cfg.major_timeframe,
            entry_tf: cfg.entry_timeframe,
            fetch_limit: cfg.fetch_limit,
            total_analyses: AtomicU64::new(0),
            last_analysis: Mutex::new(None),
            uptime_start: Utc::now(),
        }
    }

    /// One full analysis cycle for a symbol: fetch both trend timeframes and
    /// the daily series, derive pivots and trends, evaluate confluence, and
    /// for an actionable verdict record the trade and send the alert. Any
    /// missing data abandons the cycle for this symbol without touching
    /// state; other symbols are unaffected.
    pub async fn analyze_symbol(&self, symbol: &str) -> AnalysisOutcome {
        let major = match self
            .market
            .fetch_ohlcv(symbol, self.major_tf, self.fetch_limit)
            .await
        {
            Ok(series) => series,
            Err(e) => {
                debug!("{symbol}: {} data unavailable: {e}", self.major_tf);
                return AnalysisOutcome::DataUnavailable("major timeframe candles");
            }
        };
        let entry = match self
            .market
            .fetch_ohlcv(symbol, self.entry_tf, self.fetch_limit)
            .await
        {
            Ok(series) => series,
            Err(e) => {
                debug!("{symbol}: {} data unavailable: {e}", self.entry_tf);
                return AnalysisOutcome::DataUnavailable("entry timeframe candles");
            }
        };
        let daily = match self
            .market
            .fetch_ohlcv(symbol, Timeframe::D1, DAILY_FETCH_LIMIT)
            .await
        {
            Ok(series) => series,
            Err(e) => {
                debug!("{symbol}: daily data unavailable: {e}");
                return AnalysisOutcome::DataUnavailable("daily candles");
            }
        };

        let Some(pivot_levels) = PivotLevels::from_daily(&daily) else {
            debug!("{symbol}: fewer than two daily candles, no pivots");
            return AnalysisOutcome::DataUnavailable("daily pivots");
        };
        let Some(major_trend) = trend::classify(&major) else {
            debug!("{symbol}: {} series too short for trend", self.major_tf);
            return AnalysisOutcome::DataUnavailable("major trend");
        };
        let Some(entry_trend) = trend::classify(&entry) else {
            debug!("{symbol}: {} series too short for trend", self.entry_tf);
            return AnalysisOutcome::DataUnavailable("entry trend");
        };
        let Some(price) = major.last_close() else {
            return AnalysisOutcome::DataUnavailable("reference price");
        };

        let decision = confluence::evaluate(major_trend, entry_trend, price, &pivot_levels);

        let trade = match decision.setup {
            Some(setup) => {
                let trade = self.ledger.append(symbol, &setup, price, Utc::now()).await;
                info!(
                    "{symbol}: {} @ {:.2} (tp1 {:.2} tp2 {:.2} sl {:.2})",
                    decision.signal,
                    price,
                    setup.take_profit_1,
                    setup.take_profit_2,
                    setup.stop_loss
                );

                // The trade is already recorded; a failed alert must not
                // undo or retry it.
                let text = signal_alert(symbol, &decision, &pivot_levels);
                if let Err(e) = self.notifier.send(&text).await {
                    warn!("{symbol}: alert not delivered: {e:#}");
                }
                Some(trade)
            }
            None => {
                debug!(
                    "{symbol}: no confluence ({} {} / {} {}, price {:.2} vs pivot {:.2})",
                    self.major_tf,
                    decision.major_trend,
                    self.entry_tf,
                    decision.entry_trend,
                    price,
                    pivot_levels.pivot
                );
                None
            }
        };

        self.total_analyses.fetch_add(1, Ordering::Relaxed);
        *self.last_analysis.lock().await = Some(Utc::now());

        AnalysisOutcome::Evaluated { decision, trade }
    }

    /// Re-evaluate all open trades against fresh prices.
    pub async fn run_outcome_sweep(&self) -> usize {
        self.ledger.reevaluate_open_trades(self.market.as_ref()).await
    }

    /// Sweep, aggregate the trailing 24h window, send the digest, and return
    /// the text.
    pub async fn generate_report(&self) -> String {
        self.run_outcome_sweep().await;

        let end = Utc::now();
        let start = end - Duration::hours(REPORT_WINDOW_HOURS);
        let trades = self.ledger.snapshot().await;
        let report = PerformanceReport::over_window(&trades, start, end);

        let text = report.to_html();
        if let Err(e) = self.notifier.send(&text).await {
            warn!("report not delivered: {e:#}");
        }
        text
    }

    /// Read-only status for a dashboard surface.
    pub async fn stats(&self) -> EngineStats {
        EngineStats {
            symbols: self.symbols.clone(),
            total_analyses: self.total_analyses.load(Ordering::Relaxed),
            last_analysis: *self.last_analysis.lock().await,
            uptime_start: self.uptime_start,
            ledger: self.ledger.stats().await,
        }
    }
}

fn signal_alert(symbol: &str, decision: &SignalDecision, pivot_levels: &PivotLevels) -> String {
    let Some(setup) = decision.setup else {
        return String::new();
    };
    let emoji = match setup.side {
        crate::models::Side::Buy => "🚀",
        crate::models::Side::Sell => "🔻",
    };
    let pivot_side = if decision.price > pivot_levels.pivot {
        "Above"
    } else {
        "Below"
    };

    format!(
        "🏆 <b>CPR CONFLUENCE SIGNAL</b>\n\n\
         <b>Asset:</b> {symbol}\n\
         <b>Price:</b> <code>{price:.2}</code>\n\n\
         --- 🚨 {emoji} <b>SIGNAL: {signal}</b> 🚨 ---\n\n\
         <b>📈 CONFLUENCE ANALYSIS:</b>\n\
         • Major Trend: <code>{major}</code>\n\
         • Entry Trend: <code>{entry}</code>\n\
         • Pivot: {pivot_side} PP\n\n\
         <b>🎯 TRADE TARGETS:</b>\n\
         ✅ <b>Take Profit 1:</b> <code>{tp1:.2}</code>\n\
         🔥 <b>Take Profit 2:</b> <code>{tp2:.2}</code>\n\
         🛑 <b>Stop Loss:</b> <code>{sl:.2}</code>",
        symbol = symbol,
        price = decision.price,
        emoji = emoji,
        signal = decision.signal,
        major = decision.major_trend,
        entry = decision.entry_trend,
        pivot_side = pivot_side,
        tp1 = setup.take_profit_1,
        tp2 = setup.take_profit_2,
        sl = setup.stop_loss,
    )
}
