use chrono::{DateTime, Duration, Utc};

use crate::models::{Candle, CandleSeries};

fn base_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-05-01T00:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// Candles from (open, high, low, close) tuples at 1h spacing.
pub fn make_candles(data: &[(f64, f64, f64, f64)]) -> CandleSeries {
    let base = base_time();
    let candles: Vec<Candle> = data
        .iter()
        .enumerate()
        .map(|(i, &(o, h, l, c))| Candle {
            timestamp: base + Duration::hours(i as i64),
            open: o,
            high: h,
            low: l,
            close: c,
            volume: 100.0,
        })
        .collect();
    CandleSeries::new(candles)
}

/// `n` identical candles closing at `price`.
pub fn flat_series(n: usize, price: f64) -> CandleSeries {
    let data: Vec<(f64, f64, f64, f64)> = (0..n)
        .map(|_| (price, price + 0.5, price - 0.5, price))
        .collect();
    make_candles(&data)
}

/// `n` candles with closes stepping from `start` by `step` (negative for a
/// downtrend).
pub fn trending_series(n: usize, start: f64, step: f64) -> CandleSeries {
    let data: Vec<(f64, f64, f64, f64)> = (0..n)
        .map(|i| {
            let close = start + i as f64 * step;
            (close - step, close + step.abs(), close - step.abs(), close)
        })
        .collect();
    make_candles(&data)
}

/// Two daily candles where the completed one is the worked pivot example
/// (H=110, L=90, C=100 → PP=100, R1=110, R2=120, S1=90, S2=80, TC=BC=100).
/// The last candle is the in-progress day and must be ignored by the pivot
/// calculation.
pub fn daily_with_pivot_example() -> CandleSeries {
    let base = base_time();
    CandleSeries::new(vec![
        Candle {
            timestamp: base,
            open: 95.0,
            high: 110.0,
            low: 90.0,
            close: 100.0,
            volume: 1000.0,
        },
        Candle {
            timestamp: base + Duration::days(1),
            open: 100.0,
            high: 160.0,
            low: 40.0,
            close: 130.0,
            volume: 500.0,
        },
    ])
}
