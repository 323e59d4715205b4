pub mod confluence;
pub mod pivots;
pub mod trend;

pub use confluence::{Signal, SignalDecision, TradeSetup};
pub use pivots::PivotLevels;
