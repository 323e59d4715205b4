use serde::{Deserialize, Serialize};

use crate::core::pivots::PivotLevels;
use crate::models::{Side, Trend};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    NoSignal,
    StrongBuy,
    StrongSell,
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Signal::NoSignal => write!(f, "WAIT (Neutral)"),
            Signal::StrongBuy => write!(f, "STRONG BUY"),
            Signal::StrongSell => write!(f, "STRONG SELL"),
        }
    }
}

/// Entry, targets and stop for an actionable signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeSetup {
    pub side: Side,
    pub take_profit_1: f64,
    pub take_profit_2: f64,
    pub stop_loss: f64,
}

/// Outcome of one confluence evaluation. Immutable once computed; carries the
/// inputs that produced the verdict so the alert can show its reasoning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalDecision {
    pub signal: Signal,
    pub major_trend: Trend,
    pub entry_trend: Trend,
    pub price: f64,
    pub setup: Option<TradeSetup>,
}

/// Confluence rule: both timeframes must agree AND price must sit on the
/// matching side of the pivot. Anything less is NoSignal, no partial credit.
pub fn evaluate(
    major_trend: Trend,
    entry_trend: Trend,
    price: f64,
    pivots: &PivotLevels,
) -> SignalDecision {
    let signal = match (major_trend, entry_trend) {
        (Trend::Bullish, Trend::Bullish) if price > pivots.pivot => Signal::StrongBuy,
        (Trend::Bearish, Trend::Bearish) if price < pivots.pivot => Signal::StrongSell,
        _ => Signal::NoSignal,
    };

    let setup = match signal {
        Signal::StrongBuy => Some(TradeSetup {
            side: Side::Buy,
            take_profit_1: pivots.resistance_1,
            take_profit_2: pivots.resistance_2,
            stop_loss: pivots.top_central.min(pivots.bottom_central),
        }),
        Signal::StrongSell => Some(TradeSetup {
            side: Side::Sell,
            take_profit_1: pivots.support_1,
            take_profit_2: pivots.support_2,
            stop_loss: pivots.top_central.max(pivots.bottom_central),
        }),
        Signal::NoSignal => None,
    };

    SignalDecision {
        signal,
        major_trend,
        entry_trend,
        price,
        setup,
    }
}
