pub mod ledger;
pub mod trade;

pub use ledger::{LedgerStats, TradeLedger};
pub use trade::Trade;
