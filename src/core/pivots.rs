use serde::{Deserialize, Serialize};

use crate::models::CandleSeries;

/// Classic floor-trader pivot levels plus the central pivot range, derived
/// from a single prior-day candle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PivotLevels {
    pub pivot: f64,
    pub top_central: f64,
    pub bottom_central: f64,
    pub resistance_1: f64,
    pub support_1: f64,
    pub resistance_2: f64,
    pub support_2: f64,
}

impl PivotLevels {
    /// Levels for the current day, computed from the most recently completed
    /// daily candle. The last element of a fetched daily series may still be
    /// in progress, so the second-to-last is used. `None` with fewer than two
    /// daily candles.
    pub fn from_daily(daily: &CandleSeries) -> Option<PivotLevels> {
        let prev_day = daily.second_to_last()?;
        Some(Self::from_hlc(prev_day.high, prev_day.low, prev_day.close))
    }

    pub fn from_hlc(high: f64, low: f64, close: f64) -> PivotLevels {
        let pivot = (high + low + close) / 3.0;
        let bottom_central = (high + low) / 2.0;
        let top_central = 2.0 * pivot - bottom_central;
        PivotLevels {
            pivot,
            top_central,
            bottom_central,
            resistance_1: 2.0 * pivot - low,
            support_1: 2.0 * pivot - high,
            resistance_2: pivot + (high - low),
            support_2: pivot - (high - low),
        }
    }
}
