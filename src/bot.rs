use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use cpr_signal_bot::config::Config;
use cpr_signal_bot::engine::SignalEngine;

pub struct SignalBot {
    cfg: Config,
    engine: Arc<SignalEngine>,

    last_analysis: Instant,
    last_sweep: Instant,
    last_report: Instant,
}

impl SignalBot {
    pub fn new(cfg: Config, engine: Arc<SignalEngine>) -> Self {
        info!("{}", "=".repeat(60));
        info!("CPR confluence signal bot starting up");
        info!("Symbols: {}", cfg.symbols.join(", "));
        info!(
            "Timeframes: major={} entry={}",
            cfg.major_timeframe, cfg.entry_timeframe
        );
        info!(
            "Cadences: analysis={}s sweep={}s report={}s",
            cfg.analysis_interval_secs, cfg.sweep_interval_secs, cfg.report_interval_secs
        );
        info!("{}", "=".repeat(60));

        let now = Instant::now();
        Self {
            cfg,
            engine,
            last_analysis: now,
            last_sweep: now,
            last_report: now,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        info!("Bot is now running. Press Ctrl+C to stop.");

        // Analyze everything once at boot rather than waiting out the first
        // interval.
        self.spawn_analyses();

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    self.shutdown().await;
                    return Ok(());
                }
                _ = self.tick() => {}
            }
        }
    }

    async fn tick(&mut self) {
        if self.last_analysis.elapsed().as_secs() >= self.cfg.analysis_interval_secs {
            self.spawn_analyses();
            self.last_analysis = Instant::now();
        }

        if self.last_sweep.elapsed().as_secs() >= self.cfg.sweep_interval_secs {
            let engine = Arc::clone(&self.engine);
            tokio::spawn(async move {
                let transitions = engine.run_outcome_sweep().await;
                if transitions > 0 {
                    info!("outcome sweep: {transitions} trades transitioned");
                }
            });
            self.last_sweep = Instant::now();
        }

        if self.last_report.elapsed().as_secs() >= self.cfg.report_interval_secs {
            let engine = Arc::clone(&self.engine);
            tokio::spawn(async move {
                engine.generate_report().await;
            });
            self.last_report = Instant::now();
        }

        tokio::time::sleep(tokio::time::Duration::from_secs(1)).await;
    }

    /// One task per symbol so a slow or failing fetch never holds up the
    /// other analyses.
    fn spawn_analyses(&self) {
        for symbol in &self.cfg.symbols {
            let engine = Arc::clone(&self.engine);
            let symbol = symbol.clone();
            tokio::spawn(async move {
                engine.analyze_symbol(&symbol).await;
            });
        }
    }

    async fn shutdown(&self) {
        info!("Shutting down...");
        let stats = self.engine.stats().await;
        info!(
            "Analyses: {} | Trades: {} (active {})",
            stats.total_analyses, stats.ledger.total, stats.ledger.active
        );
        info!(
            "Outcomes: {} wins / {} partial / {} losses | Win rate: {:.1}%",
            stats.ledger.wins,
            stats.ledger.partial_wins,
            stats.ledger.losses,
            stats.ledger.win_rate
        );
        info!("Bot stopped.");
    }
}
