//! Quest Statistics Module
//!
//! Lifecycle event ledger and its persistence seam.

pub mod ledger;
pub mod store;

pub use ledger::{PlayerStatTotals, QuestStatSummary, StatEvent, StatKind, StatsLedger};
pub use store::{JsonFileStatsStore, MemoryStatsStore, StatsStore};
