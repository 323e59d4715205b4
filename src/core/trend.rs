use crate::models::{CandleSeries, Trend};

pub const SMA_FAST: usize = 9;
pub const SMA_SLOW: usize = 20;

/// Classify the trend at the latest candle from the SMA9/SMA20 relationship.
/// Strictly greater-than: an exact tie is `Bearish`. `None` until the slow
/// window has enough data.
pub fn classify(series: &CandleSeries) -> Option<Trend> {
    let fast = series.sma(SMA_FAST)?;
    let slow = series.sma(SMA_SLOW)?;
    if fast > slow {
        Some(Trend::Bullish)
    } else {
        Some(Trend::Bearish)
    }
}
