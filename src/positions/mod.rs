//! Position state: the Trader's exclusively-owned map of mint → Position
//! (§3 Ownership), its pure FSM transitions, and durable persistence.

pub mod store;
pub mod transitions;
pub mod types;

pub use store::PositionStore;
pub use transitions::{apply_add, apply_emergency_close, apply_entry, apply_follow_sell, apply_stop_loss, apply_take_profit, rebalance_shares, Effect};
pub use types::{Position, TradeRecord, TradeType, VirtualShare};
