//! Pure Position state transitions (§4.8, §9 Design Notes: "the FSM
//! transitions are functions `(Position, Trigger) -> (Position, Vec<Effect>)`
//! to enable unit testing"). Swap execution and RiskGate calls live in
//! `trader::mod`; these functions only fold an already-executed swap's result
//! into the Position and report what happened.

use super::types::{Position, TradeRecord, TradeType, VirtualShare};
use std::collections::HashMap;

/// What a transition produced besides the mutated Position, for the caller
/// (Trader) to act on: persistence, closure notification, trade history.
#[derive(Debug, Clone)]
pub enum Effect {
    Closed {
        entry_time: i64,
        trade_records: Vec<TradeRecord>,
        total_pnl_sol: f64,
    },
}

/// One hunter gets the whole position; two split proportional to score
/// (equal if both scores are zero); three or more split evenly among the
/// top three scores (§4.8 "Share rebalance rule").
pub fn rebalance_shares(shares: &mut HashMap<String, VirtualShare>, total_tokens: f64) {
    let mut entries: Vec<(String, f64)> = shares.iter().map(|(h, s)| (h.clone(), s.score)).collect();
    entries.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    match entries.len() {
        0 => {}
        1 => {
            let (hunter, score) = entries.into_iter().next().unwrap();
            shares.clear();
            shares.insert(hunter, VirtualShare { score, token_amount: total_tokens });
        }
        2 => {
            let total_score: f64 = entries.iter().map(|(_, s)| s).sum();
            let total_score = if total_score <= 0.0 { 1.0 } else { total_score };
            let scores: HashMap<String, f64> = entries.into_iter().collect();
            shares.clear();
            for (hunter, score) in &scores {
                let weight = if *score > 0.0 { score / total_score } else { 1.0 / scores.len() as f64 };
                shares.insert(
                    hunter.clone(),
                    VirtualShare {
                        score: *score,
                        token_amount: total_tokens * weight,
                    },
                );
            }
        }
        _ => {
            let top3: Vec<(String, f64)> = entries.into_iter().take(3).collect();
            let per_hunter = total_tokens / 3.0;
            shares.clear();
            for (hunter, score) in top3 {
                shares.insert(hunter, VirtualShare { score, token_amount: per_hunter });
            }
        }
    }
}

/// `ENTRY`: build a fresh Position. Caller has already verified no position
/// exists, passed RiskGate, and executed the WSOL→mint swap.
pub fn apply_entry(
    lead_hunter: &str,
    score: f64,
    entry_sol: f64,
    tokens_received_ui: f64,
    decimals: u8,
    now: i64,
) -> Position {
    Position::open(lead_hunter, score, entry_sol, tokens_received_ui, decimals, now)
}

/// `ADD`: fold a successful add-swap into the position and rebalance shares.
pub fn apply_add(position: &mut Position, hunter: &str, hunter_score: f64, add_sol: f64, tokens_received_ui: f64, now: i64) {
    let new_tokens = position.total_tokens + tokens_received_ui;
    if new_tokens > 0.0 {
        position.average_price = (position.total_tokens * position.average_price + add_sol) / new_tokens;
    }
    position.total_tokens = new_tokens;
    position.total_cost_sol += add_sol;
    position.trade_records.push(TradeRecord {
        ts: now,
        trade_type: TradeType::Buy,
        sol_spent: add_sol,
        sol_received: 0.0,
        token_amount: tokens_received_ui,
        note: "add".to_string(),
        pnl_sol: None,
    });

    position.shares.entry(hunter.to_string()).or_insert(VirtualShare { score: hunter_score, token_amount: 0.0 });
    if let Some(share) = position.shares.get_mut(hunter) {
        share.score = hunter_score;
    }
    rebalance_shares(&mut position.shares, position.total_tokens);
}

/// `FOLLOW_SELL`: decrement the selling hunter's share and the position
/// total by an already-executed sell. Returns `Effect::Closed` if this sell
/// zeroed the position.
pub fn apply_follow_sell(
    position: &mut Position,
    hunter: &str,
    sell_amount_ui: f64,
    sol_received: f64,
    now: i64,
) -> Option<Effect> {
    let pnl = sol_received - sell_amount_ui * position.average_price;
    position.trade_records.push(TradeRecord {
        ts: now,
        trade_type: TradeType::Sell,
        sol_spent: 0.0,
        sol_received,
        token_amount: sell_amount_ui,
        note: "follow_sell".to_string(),
        pnl_sol: Some(pnl),
    });

    position.total_tokens = (position.total_tokens - sell_amount_ui).max(0.0);
    if let Some(share) = position.shares.get_mut(hunter) {
        share.token_amount = (share.token_amount - sell_amount_ui).max(0.0);
        if share.token_amount <= 1e-9 {
            position.shares.remove(hunter);
        }
    }

    close_if_empty(position)
}

/// `PNL_CHECK` take-profit ladder: a single fired level.
pub fn apply_take_profit(
    position: &mut Position,
    level_idx: usize,
    sell_amount_ui: f64,
    sol_received: f64,
    now: i64,
) -> Option<Effect> {
    let pnl = sol_received - sell_amount_ui * position.average_price;
    position.trade_records.push(TradeRecord {
        ts: now,
        trade_type: TradeType::Sell,
        sol_spent: 0.0,
        sol_received,
        token_amount: sell_amount_ui,
        note: format!("take_profit_level_{}", level_idx),
        pnl_sol: Some(pnl),
    });

    let actual_pct = if position.total_tokens > 0.0 { (sell_amount_ui / position.total_tokens).min(1.0) } else { 1.0 };
    position.total_tokens = (position.total_tokens - sell_amount_ui).max(0.0);
    for share in position.shares.values_mut() {
        share.token_amount *= 1.0 - actual_pct;
    }
    position.shares.retain(|_, s| s.token_amount > 1e-9);
    position.tp_hit_levels.push(level_idx);

    close_if_empty(position)
}

/// `PNL_CHECK` stop-loss: sell the full on-chain balance.
pub fn apply_stop_loss(position: &mut Position, sell_amount_ui: f64, sol_received: f64, now: i64) -> Option<Effect> {
    apply_full_close(position, sell_amount_ui, sol_received, now, "stop_loss")
}

/// `EMERGENCY_CLOSE_ALL`: sell the full balance on the credit-exhausted path.
pub fn apply_emergency_close(position: &mut Position, sell_amount_ui: f64, sol_received: f64, now: i64) -> Option<Effect> {
    apply_full_close(position, sell_amount_ui, sol_received, now, "emergency (credit exhausted)")
}

fn apply_full_close(position: &mut Position, sell_amount_ui: f64, sol_received: f64, now: i64, note: &str) -> Option<Effect> {
    let pnl = sol_received - sell_amount_ui * position.average_price;
    position.trade_records.push(TradeRecord {
        ts: now,
        trade_type: TradeType::Sell,
        sol_spent: 0.0,
        sol_received,
        token_amount: sell_amount_ui,
        note: note.to_string(),
        pnl_sol: Some(pnl),
    });
    position.total_tokens = 0.0;
    position.shares.clear();
    close_if_empty(position)
}

fn close_if_empty(position: &Position) -> Option<Effect> {
    if position.is_closed() {
        Some(Effect::Closed {
            entry_time: position.entry_time,
            trade_records: position.trade_records.clone(),
            total_pnl_sol: position.total_pnl_sol(),
        })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_then_add_recomputes_weighted_average() {
        let mut pos = apply_entry("H", 85.0, 0.04, 20.0, 6, 1_000);
        apply_add(&mut pos, "H", 85.0, 0.04, 20.0, 1_060);
        assert_eq!(pos.total_tokens, 40.0);
        assert_eq!(pos.total_cost_sol, 0.08);
        assert_eq!(pos.average_price, 0.002);
    }

    #[test]
    fn two_hunter_add_splits_proportional_to_score() {
        let mut pos = apply_entry("H1", 60.0, 0.04, 20.0, 6, 1_000);
        apply_add(&mut pos, "H2", 20.0, 0.04, 20.0, 1_060);
        let h1 = pos.shares.get("H1").unwrap().token_amount;
        let h2 = pos.shares.get("H2").unwrap().token_amount;
        assert!((h1 - 30.0).abs() < 1e-6);
        assert!((h2 - 10.0).abs() < 1e-6);
    }

    #[test]
    fn follow_sell_removes_dust_share_and_closes_when_zeroed() {
        let mut pos = apply_entry("H", 85.0, 0.04, 20.0, 6, 1_000);
        let effect = apply_follow_sell(&mut pos, "H", 20.0, 0.05, 1_100);
        assert_eq!(pos.total_tokens, 0.0);
        assert!(pos.shares.is_empty());
        assert!(matches!(effect, Some(Effect::Closed { .. })));
    }

    #[test]
    fn take_profit_scales_shares_and_marks_level_fired() {
        let mut pos = apply_entry("H", 85.0, 0.04, 20.0, 6, 1_000);
        let effect = apply_take_profit(&mut pos, 0, 10.0, 0.08, 1_100);
        assert_eq!(pos.total_tokens, 10.0);
        assert_eq!(pos.tp_hit_levels, vec![0]);
        assert_eq!(pos.shares.get("H").unwrap().token_amount, 10.0);
        assert!(effect.is_none());
    }

    #[test]
    fn emergency_close_zeros_position_and_tags_note() {
        let mut pos = apply_entry("H", 85.0, 0.04, 20.0, 6, 1_000);
        let effect = apply_emergency_close(&mut pos, 20.0, 0.01, 2_000);
        assert!(pos.is_closed());
        let last = pos.trade_records.last().unwrap();
        assert_eq!(last.note, "emergency (credit exhausted)");
        assert!(matches!(effect, Some(Effect::Closed { .. })));
    }
}
