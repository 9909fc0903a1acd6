//! Position data model (§3 Data Model): one Position per token mint, with an
//! append-only trade log and a per-hunter virtual-share breakdown.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A hunter's claim on a Position's tokens, used to apportion follow-sells.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct VirtualShare {
    pub score: f64,
    pub token_amount: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeType {
    Buy,
    Sell,
}

/// Append-only; never mutated after insertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub ts: i64,
    #[serde(rename = "type")]
    pub trade_type: TradeType,
    pub sol_spent: f64,
    pub sol_received: f64,
    pub token_amount: f64,
    pub note: String,
    pub pnl_sol: Option<f64>,
}

/// A live position in a single token mint. Identity is the mint address
/// (held by the caller as the map key, not duplicated here).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub average_price: f64,
    pub decimals: u8,
    pub total_tokens: f64,
    pub total_cost_sol: f64,
    pub lead_hunter_score: f64,
    pub tp_hit_levels: Vec<usize>,
    pub entry_time: i64,
    pub trade_records: Vec<TradeRecord>,
    pub shares: HashMap<String, VirtualShare>,
}

impl Position {
    pub fn open(lead_hunter: &str, score: f64, entry_sol: f64, tokens_received_ui: f64, decimals: u8, now: i64) -> Self {
        let average_price = if tokens_received_ui > 0.0 { entry_sol / tokens_received_ui } else { 0.0 };
        let mut shares = HashMap::new();
        shares.insert(
            lead_hunter.to_string(),
            VirtualShare {
                score,
                token_amount: tokens_received_ui,
            },
        );
        Position {
            average_price,
            decimals,
            total_tokens: tokens_received_ui,
            total_cost_sol: entry_sol,
            lead_hunter_score: score,
            tp_hit_levels: Vec::new(),
            entry_time: now,
            trade_records: vec![TradeRecord {
                ts: now,
                trade_type: TradeType::Buy,
                sol_spent: entry_sol,
                sol_received: 0.0,
                token_amount: tokens_received_ui,
                note: "entry".to_string(),
                pnl_sol: None,
            }],
            shares,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.total_tokens <= 0.0
    }

    pub fn shares_sum(&self) -> f64 {
        self.shares.values().map(|s| s.token_amount).sum()
    }

    /// `Σ sold − Σ spent` over the full trade log, for the closure snapshot.
    pub fn total_pnl_sol(&self) -> f64 {
        let spent: f64 = self.trade_records.iter().map(|r| r.sol_spent).sum();
        let received: f64 = self.trade_records.iter().map(|r| r.sol_received).sum();
        received - spent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_computes_average_price_and_full_lead_share() {
        let pos = Position::open("H", 85.0, 0.04, 20.0, 6, 1_000);
        assert_eq!(pos.average_price, 0.002);
        assert_eq!(pos.total_tokens, 20.0);
        assert_eq!(pos.shares.get("H").unwrap().token_amount, 20.0);
        assert_eq!(pos.trade_records.len(), 1);
        assert!(!pos.is_closed());
    }
}
