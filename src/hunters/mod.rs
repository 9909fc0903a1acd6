//! Hunter pool: durable wallet records with scoring metadata, owned
//! exclusively by Discovery/Maintenance. Monitor reads addresses and writes
//! `last_active` through the store's internal lock (§3 Ownership).

pub mod store;
pub mod types;

pub use store::{HunterStore, WalletLineList};
pub use types::{Hunter, HunterMetrics, HunterPool, HunterSource, InsertOutcome, ScoreDetail};
