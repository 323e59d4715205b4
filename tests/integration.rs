use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use cpr_signal_bot::config::Config;
use cpr_signal_bot::engine::{AnalysisOutcome, SignalEngine};
use cpr_signal_bot::exchange::{FetchError, MarketData};
use cpr_signal_bot::models::{Candle, CandleSeries, Timeframe, TradeStatus};
use cpr_signal_bot::notify::Notifier;
use cpr_signal_bot::storage::{MemoryStore, TradeStore};
use cpr_signal_bot::trading::TradeLedger;

/// A mock feed serving canned candles and an adjustable ticker price.
struct MockMarket {
    data: HashMap<Timeframe, CandleSeries>,
    ticker: Mutex<f64>,
}

impl MockMarket {
    /// Bullish data on both trend timeframes; daily candles put the pivot at
    /// 100 with R1=110, R2=120 and a central range collapsed onto 100.
    fn bullish() -> Self {
        let base = DateTime::parse_from_rfc3339("2024-05-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        let h4 = Self::rising(base, 30, Duration::hours(4), 76.0, 1.0);
        let h1 = Self::rising(base, 30, Duration::hours(1), 90.0, 0.5);
        let daily = CandleSeries::new(vec![
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
                high: 107.0,
                low: 99.0,
                close: 105.0,
                volume: 400.0,
            },
        ]);

        let price = h4.last_close().unwrap();

        let mut data = HashMap::new();
        data.insert(Timeframe::H4, h4);
        data.insert(Timeframe::H1, h1);
        data.insert(Timeframe::D1, daily);

        Self {
            data,
            ticker: Mutex::new(price),
        }
    }

    fn rising(
        base: DateTime<Utc>,
        count: usize,
        interval: Duration,
        start: f64,
        step: f64,
    ) -> CandleSeries {
        let candles: Vec<Candle> = (0..count)
            .map(|i| {
                let close = start + i as f64 * step;
                Candle {
                    timestamp: base + interval * i as i32,
                    open: close - step,
                    high: close + step,
                    low: close - step * 1.5,
                    close,
                    volume: 100.0,
                }
            })
            .collect();
        CandleSeries::new(candles)
    }

    async fn set_ticker(&self, price: f64) {
        *self.ticker.lock().await = price;
    }
}

#[async_trait]
impl MarketData for MockMarket {
    async fn fetch_ohlcv(
        &self,
        _symbol: &str,
        tf: Timeframe,
        _limit: usize,
    ) -> Result<CandleSeries, FetchError> {
        self.data
            .get(&tf)
            .cloned()
            .ok_or_else(|| FetchError::Exchange("no data for timeframe".to_string()))
    }

    async fn latest_price(&self, _symbol: &str) -> Result<f64, FetchError> {
        Ok(*self.ticker.lock().await)
    }
}

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<String>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        self.sent.lock().await.push(text.to_string());
        Ok(())
    }
}

fn test_config() -> Config {
    Config {
        symbols: vec!["BTC/USDT".to_string()],
        telegram_bot_token: String::new(),
        telegram_chat_id: 0,
        major_timeframe: Timeframe::H4,
        entry_timeframe: Timeframe::H1,
        fetch_limit: 100,
        max_retries: 1,
        retry_backoff_secs: 0,
        analysis_interval_secs: 1800,
        sweep_interval_secs: 1800,
        report_interval_secs: 86400,
        data_dir: String::new(),
        log_level: "ERROR".to_string(),
    }
}

#[tokio::test]
async fn analyze_sweep_report_pipeline() {
    let market = Arc::new(MockMarket::bullish());
    let notifier = Arc::new(RecordingNotifier::default());
    let store = Arc::new(MemoryStore::new());

    let ledger = TradeLedger::load(store.clone()).await.unwrap();
    let engine = SignalEngine::new(&test_config(), market.clone(), notifier.clone(), ledger);

    // 1. Analysis: full bullish confluence above the pivot -> StrongBuy.
    let outcome = engine.analyze_symbol("BTC/USDT").await;
    let AnalysisOutcome::Evaluated { trade, .. } = outcome else {
        panic!("expected an evaluation, got {outcome:?}");
    };
    let trade = trade.expect("confluence should produce a trade");
    assert_eq!(trade.status, TradeStatus::Active);
    assert!((trade.entry - 105.0).abs() < 1e-9);
    assert!((trade.take_profit_1 - 110.0).abs() < 1e-9);
    assert!((trade.take_profit_2 - 120.0).abs() < 1e-9);
    assert!((trade.stop_loss - 100.0).abs() < 1e-9);

    // The alert went to the channel and the snapshot hit the store.
    assert_eq!(notifier.sent.lock().await.len(), 1);
    assert_eq!(store.load_all().await.unwrap().len(), 1);

    // 2. Sweep below TP1: nothing changes.
    market.set_ticker(106.0).await;
    assert_eq!(engine.run_outcome_sweep().await, 0);

    // 3. Gap through both targets: TP2 wins, pnl booked from the level.
    market.set_ticker(121.0).await;
    assert_eq!(engine.run_outcome_sweep().await, 1);

    let stats = engine.stats().await;
    assert_eq!(stats.ledger.target_two_hit, 1);
    assert_eq!(stats.ledger.wins, 1);
    assert!((stats.ledger.win_rate - 100.0).abs() < 1e-9);

    // Sweeping again is a no-op.
    assert_eq!(engine.run_outcome_sweep().await, 0);

    // 4. Report covers the closed trade.
    let text = engine.generate_report().await;
    assert!(text.contains("DAILY PERFORMANCE REPORT"));
    assert!(text.contains("BTC/USDT"));
    let expected_pnl = (120.0 - 105.0) / 105.0 * 100.0;
    assert!(text.contains(&format!("{expected_pnl:+.2}%")));

    // Alert + report.
    assert_eq!(notifier.sent.lock().await.len(), 2);
}

#[tokio::test]
async fn ledger_survives_restart_via_store() {
    let market = Arc::new(MockMarket::bullish());
    let notifier = Arc::new(RecordingNotifier::default());
    let store = Arc::new(MemoryStore::new());

    {
        let ledger = TradeLedger::load(store.clone()).await.unwrap();
        let engine =
            SignalEngine::new(&test_config(), market.clone(), notifier.clone(), ledger);
        engine.analyze_symbol("BTC/USDT").await;
    }

    // "Restart": a fresh ledger over the same store sees the trade and keeps
    // the id sequence moving.
    let ledger = TradeLedger::load(store.clone()).await.unwrap();
    let engine = SignalEngine::new(&test_config(), market.clone(), notifier, ledger);

    let trades = {
        let stats = engine.stats().await;
        assert_eq!(stats.ledger.total, 1);
        engine.analyze_symbol("BTC/USDT").await;
        store.load_all().await.unwrap()
    };
    assert_eq!(trades.len(), 2);
    assert_eq!(trades[0].id, 1);
    assert_eq!(trades[1].id, 2);
}

#[tokio::test]
async fn dead_feed_skips_cycle_and_sweep_continues() {
    // A market with no data at all: analysis abandons the cycle cleanly.
    struct DeadMarket;

    #[async_trait]
    impl MarketData for DeadMarket {
        async fn fetch_ohlcv(
            &self,
            _symbol: &str,
            _tf: Timeframe,
            _limit: usize,
        ) -> Result<CandleSeries, FetchError> {
            Err(FetchError::Exchange("offline".to_string()))
        }

        async fn latest_price(&self, _symbol: &str) -> Result<f64, FetchError> {
            Err(FetchError::Exchange("offline".to_string()))
        }
    }

    let notifier = Arc::new(RecordingNotifier::default());
    let ledger = TradeLedger::load(Arc::new(MemoryStore::new())).await.unwrap();
    let engine = SignalEngine::new(&test_config(), Arc::new(DeadMarket), notifier.clone(), ledger);

    let outcome = engine.analyze_symbol("BTC/USDT").await;
    assert!(matches!(outcome, AnalysisOutcome::DataUnavailable(_)));
    assert!(notifier.sent.lock().await.is_empty());

    // Sweep over an empty ledger with a dead feed: no panic, no transitions.
    assert_eq!(engine.run_outcome_sweep().await, 0);

    let stats = engine.stats().await;
    assert_eq!(stats.ledger.total, 0);
    assert_eq!(stats.total_analyses, 0);
}

#[tokio::test]
async fn bearish_confluence_emits_sell_with_mirrored_levels() {
    let mut market = MockMarket::bullish();
    let base = DateTime::parse_from_rfc3339("2024-05-01T00:00:00Z")
        .unwrap()
        .with_timezone(&Utc);

    // Falling closes ending at 95, below the 100 pivot.
    market.data.insert(
        Timeframe::H4,
        MockMarket::rising(base, 30, Duration::hours(4), 124.0, -1.0),
    );
    market.data.insert(
        Timeframe::H1,
        MockMarket::rising(base, 30, Duration::hours(1), 109.5, -0.5),
    );

    let notifier = Arc::new(RecordingNotifier::default());
    let ledger = TradeLedger::load(Arc::new(MemoryStore::new())).await.unwrap();
    let engine = SignalEngine::new(&test_config(), Arc::new(market), notifier.clone(), ledger);

    let outcome = engine.analyze_symbol("BTC/USDT").await;
    let AnalysisOutcome::Evaluated { trade, .. } = outcome else {
        panic!("expected an evaluation");
    };
    let trade = trade.expect("bearish confluence should produce a trade");
    assert!((trade.entry - 95.0).abs() < 1e-9);
    assert!((trade.take_profit_1 - 90.0).abs() < 1e-9);
    assert!((trade.take_profit_2 - 80.0).abs() < 1e-9);
    assert!((trade.stop_loss - 100.0).abs() < 1e-9);

    let sent = notifier.sent.lock().await;
    assert!(sent[0].contains("STRONG SELL"));
}

#[tokio::test]
async fn stop_hit_books_loss_in_report() {
    let market = Arc::new(MockMarket::bullish());
    let notifier = Arc::new(RecordingNotifier::default());
    let ledger = TradeLedger::load(Arc::new(MemoryStore::new())).await.unwrap();
    let engine = SignalEngine::new(&test_config(), market.clone(), notifier, ledger);

    engine.analyze_symbol("BTC/USDT").await;

    market.set_ticker(99.0).await;
    assert_eq!(engine.run_outcome_sweep().await, 1);

    let stats = engine.stats().await;
    assert_eq!(stats.ledger.stop_hit, 1);
    assert_eq!(stats.ledger.losses, 1);
    assert!((stats.ledger.win_rate - 0.0).abs() < 1e-9);

    let text = engine.generate_report().await;
    assert!(text.contains("Losses: 1"));
    assert!(text.contains("stop_hit"));
}
