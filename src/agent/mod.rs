//! Agent (§4.7): per-mission hunter balance tracking for mints the Trader
//! already holds a position in. Consumes the transactions Monitor forwards
//! (only for tracked mints) plus a periodic on-chain reconciliation pass,
//! and raises `AgentSignal::{HunterBuy,HunterSell}` for the Trader.

use crate::events::{AgentSignal, HunterMintDelta};
use crate::logger::{self, LogTag};
use crate::rpc::Chain;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration};

fn now_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[derive(Debug, Clone, Copy)]
struct MissionState {
    balance_ui: f64,
    first_seen_ts: i64,
}

pub struct AgentConfig {
    pub sync_interval_secs: u64,
    pub sync_protection_secs: i64,
    pub sync_min_delta_ratio_pct: f64,
}

pub struct Agent {
    chain: Arc<dyn Chain>,
    cfg: AgentConfig,
    missions: Mutex<HashMap<(String, String), MissionState>>,
    agent_signal_tx: mpsc::Sender<AgentSignal>,
}

impl Agent {
    pub fn new(chain: Arc<dyn Chain>, cfg: AgentConfig, agent_signal_tx: mpsc::Sender<AgentSignal>) -> Self {
        Self { chain, cfg, missions: Mutex::new(HashMap::new()), agent_signal_tx }
    }

    /// Consumer loop over Monitor's forwarded deltas (§4.7 steps 1-3).
    pub async fn run_delta_consumer(&self, mut hunter_delta_rx: mpsc::Receiver<HunterMintDelta>) {
        while let Some(delta) = hunter_delta_rx.recv().await {
            self.apply_delta(&delta).await;
        }
    }

    async fn apply_delta(&self, delta: &HunterMintDelta) {
        let key = (delta.mint.clone(), delta.hunter.clone());
        let old_balance = {
            let mut missions = self.missions.lock();
            let entry = missions.entry(key.clone()).or_insert(MissionState { balance_ui: 0.0, first_seen_ts: delta.ts });
            let old = entry.balance_ui;
            entry.balance_ui = (old + delta.delta_ui).max(0.0);
            old
        };
        let new_balance = (old_balance + delta.delta_ui).max(0.0);

        if delta.delta_ui < 0.0 {
            let ratio = if old_balance > f64::EPSILON { delta.delta_ui.abs() / old_balance } else { 1.0 };
            let _ = self
                .agent_signal_tx
                .send(AgentSignal::HunterSell {
                    mint: delta.mint.clone(),
                    hunter: delta.hunter.clone(),
                    ratio,
                    remaining_ui: new_balance,
                    note: "delta".to_string(),
                })
                .await;
        } else if delta.delta_ui > 0.0 {
            let _ = self
                .agent_signal_tx
                .send(AgentSignal::HunterBuy { mint: delta.mint.clone(), hunter: delta.hunter.clone(), delta_ui: delta.delta_ui, new_balance_ui: new_balance })
                .await;
        }
    }

    /// Reconciliation loop (§4.7 step 4): on-chain truth overrides the
    /// forwarded-delta running balance for missions old enough to trust.
    pub async fn run_reconciliation(&self) {
        let mut ticker = interval(Duration::from_secs(self.cfg.sync_interval_secs));
        loop {
            ticker.tick().await;
            let now = now_secs();
            let snapshot: Vec<((String, String), MissionState)> = self.missions.lock().iter().map(|(k, v)| (k.clone(), *v)).collect();

            for ((mint, hunter), state) in snapshot {
                if now - state.first_seen_ts < self.cfg.sync_protection_secs {
                    continue;
                }
                let chain_balance = match self.chain.token_balance(&hunter, &mint).await {
                    Ok(b) => b,
                    Err(e) => {
                        logger::debug(LogTag::Agent, &format!("reconciliation balance read failed for {}/{}: {}", hunter, mint, e));
                        continue;
                    }
                };

                let divergence_pct = if state.balance_ui > f64::EPSILON { (state.balance_ui - chain_balance) / state.balance_ui * 100.0 } else { 0.0 };

                if divergence_pct > self.cfg.sync_min_delta_ratio_pct {
                    let ratio = (state.balance_ui - chain_balance) / state.balance_ui;
                    logger::info(LogTag::Agent, &format!("reconciliation: {} balance for {} diverged {:.2}%, synthesizing sell", hunter, mint, divergence_pct));
                    let _ = self
                        .agent_signal_tx
                        .send(AgentSignal::HunterSell {
                            mint: mint.clone(),
                            hunter: hunter.clone(),
                            ratio,
                            remaining_ui: chain_balance,
                            note: "reconciliation".to_string(),
                        })
                        .await;
                }

                self.missions.lock().insert((mint, hunter), MissionState { balance_ui: chain_balance, first_seen_ts: state.first_seen_ts });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mission_state_survives_copy_without_cloning_map() {
        let state = MissionState { balance_ui: 10.0, first_seen_ts: 100 };
        let copy = state;
        assert_eq!(copy.balance_ui, 10.0);
    }
}
