//! Trader (§4.8): the only mutator of `Position` state (§3 Ownership).
//! Orchestrates RiskGate, SwapExecutor and the pure `positions::transitions`
//! FSM behind a per-mint async lock so concurrent triggers on the same mint
//! serialize instead of racing.

mod locks;
pub mod tiers;

use crate::config::{PolicyConfig, SlippageConfig, TakeProfitConfig, TierConfig};
use crate::events::{AgentSignal, CreditExhausted, HunterEvicted, PositionClosed, ResonanceSignal};
use crate::hunters::HunterStore;
use crate::logger::{self, LogTag};
use crate::positions::{self, Effect, PositionStore};
use crate::pricing::PriceOracle;
use crate::risk_gate::{DenyReason, RiskGate, TokenSafetyOracle};
use crate::rpc::Chain;
use crate::swap::{Side, SwapExecutor};
use crate::trading_history::TradingHistory;
use locks::MintLocks;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration};

const WSOL_MINT: &str = "So11111111111111111111111111111111111111112";

fn now_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

pub struct Trader<O: TokenSafetyOracle> {
    chain: Arc<dyn Chain>,
    swap: Arc<SwapExecutor>,
    risk_gate: Arc<RiskGate<O>>,
    position_store: Arc<PositionStore>,
    hunter_store: Arc<HunterStore>,
    price_oracle: Arc<PriceOracle>,
    trading_history: Arc<TradingHistory>,
    signer: Arc<Keypair>,
    tiers: TierConfig,
    take_profit: TakeProfitConfig,
    policy: PolicyConfig,
    slippage: SlippageConfig,
    locks: MintLocks,
    position_closed_tx: mpsc::Sender<PositionClosed>,
}

impl<O: TokenSafetyOracle> Trader<O> {
    pub fn new(
        chain: Arc<dyn Chain>,
        swap: Arc<SwapExecutor>,
        risk_gate: Arc<RiskGate<O>>,
        position_store: Arc<PositionStore>,
        hunter_store: Arc<HunterStore>,
        price_oracle: Arc<PriceOracle>,
        trading_history: Arc<TradingHistory>,
        signer: Arc<Keypair>,
        tiers: TierConfig,
        take_profit: TakeProfitConfig,
        policy: PolicyConfig,
        slippage: SlippageConfig,
        position_closed_tx: mpsc::Sender<PositionClosed>,
    ) -> Self {
        Self {
            chain,
            swap,
            risk_gate,
            position_store,
            hunter_store,
            price_oracle,
            trading_history,
            signer,
            tiers,
            take_profit,
            policy,
            slippage,
            locks: MintLocks::new(),
            position_closed_tx,
        }
    }

    fn owner(&self) -> String {
        self.signer.pubkey().to_string()
    }

    async fn decimals_of(&self, mint: &str) -> u8 {
        self.chain.token_supply(mint).await.map(|s| s.decimals).unwrap_or(9)
    }

    async fn close_position(&self, mint: &str, effect: Effect) {
        let Effect::Closed { entry_time, trade_records, total_pnl_sol } = effect;
        self.position_store.remove(mint).await;
        let closed = PositionClosed { mint: mint.to_string(), entry_time, trade_records, total_pnl_sol };
        let now = now_secs();
        self.trading_history.append(&closed, now).await;
        let _ = self.position_closed_tx.send(closed).await;
    }

    /// `ENTRY` (§4.8): only fires if no position exists yet for the mint.
    pub async fn handle_resonance(&self, signal: ResonanceSignal) {
        let _guard = self.locks.acquire(&signal.mint).await;

        if self.position_store.contains(&signal.mint).await {
            return;
        }

        let Some(tier) = tiers::find_tier(signal.score, &self.tiers.tiers) else {
            logger::debug(LogTag::Trader, &format!("entry skipped for {}: score {:.1} below tier floor", signal.mint, signal.score));
            return;
        };
        if signal.score < self.tiers.min_entry_score {
            return;
        }

        match self.risk_gate.check(&signal.mint).await {
            Ok(Ok(())) => {}
            Ok(Err(reason)) => {
                logger::info(LogTag::Trader, &format!("entry denied for {}: {}", signal.mint, deny_reason_str(&reason)));
                return;
            }
            Err(e) => {
                logger::warning(LogTag::Trader, &format!("risk gate unavailable for {}, denying entry: {}", signal.mint, e));
                return;
            }
        }

        let decimals = self.decimals_of(&signal.mint).await;
        let outcome = match self.swap.swap(&self.signer, WSOL_MINT, &signal.mint, tier.entry_sol, self.default_slippage_bps(), Side::Buy, 9).await {
            Ok(o) => o,
            Err(e) => {
                logger::error(LogTag::Trader, &format!("entry swap failed for {}: {}", signal.mint, e));
                return;
            }
        };
        let tokens_ui = outcome.out_amount / 10f64.powi(decimals as i32);

        let position = positions::apply_entry(&signal.lead_hunter, signal.score, tier.entry_sol, tokens_ui, decimals, now_secs());
        self.position_store.put(signal.mint.clone(), position).await;
        logger::info(LogTag::Trader, &format!("entered {} led by {} ({} SOL)", signal.mint, signal.lead_hunter, tier.entry_sol));
    }

    fn default_slippage_bps(&self) -> u32 {
        self.slippage.schedule_bps.first().copied().unwrap_or(200)
    }

    /// Routes an `AgentSignal` to the `ADD` or `FOLLOW_SELL` trigger.
    pub async fn handle_agent_signal(&self, signal: AgentSignal) {
        match signal {
            AgentSignal::HunterBuy { mint, hunter, .. } => self.handle_add(&mint, &hunter).await,
            AgentSignal::HunterSell { mint, hunter, ratio, .. } => self.handle_follow_sell(&mint, &hunter, ratio).await,
        }
    }

    /// `ADD` (§4.8): only the hunters already holding a share may add, and
    /// only before the first take-profit level fires.
    async fn handle_add(&self, mint: &str, hunter: &str) {
        let _guard = self.locks.acquire(mint).await;
        let Some(mut position) = self.position_store.get(mint).await else { return };
        if !position.shares.contains_key(hunter) {
            return;
        }
        if !position.tp_hit_levels.is_empty() {
            return;
        }

        let Some(tier) = tiers::find_tier(position.lead_hunter_score, &self.tiers.tiers) else { return };
        let headroom = tier.max_sol - position.total_cost_sol;
        if headroom < 0.01 {
            return;
        }
        let add_amount = tier.add_sol.min(headroom);

        let hunter_score = self.hunter_store.get(hunter).map(|h| h.score).unwrap_or(position.lead_hunter_score);
        let outcome = match self.swap.swap(&self.signer, WSOL_MINT, mint, add_amount, self.default_slippage_bps(), Side::Buy, 9).await {
            Ok(o) => o,
            Err(e) => {
                logger::warning(LogTag::Trader, &format!("add swap failed for {}: {}", mint, e));
                return;
            }
        };
        let tokens_ui = outcome.out_amount / 10f64.powi(position.decimals as i32);

        positions::apply_add(&mut position, hunter, hunter_score, add_amount, tokens_ui, now_secs());
        self.position_store.put(mint.to_string(), position).await;
        logger::info(LogTag::Trader, &format!("added {} SOL to {} on behalf of {}", add_amount, mint, hunter));
    }

    /// `FOLLOW_SELL` (§4.8): a tracked hunter reduced or exited its balance;
    /// sell the follower-weighted share proportionally.
    async fn handle_follow_sell(&self, mint: &str, hunter: &str, ratio: f64) {
        if ratio * 100.0 < self.policy.follow_sell_threshold_pct {
            return;
        }
        let _guard = self.locks.acquire(mint).await;
        let Some(mut position) = self.position_store.get(mint).await else { return };

        let chain_balance = self.chain.token_balance(&self.owner(), mint).await.unwrap_or(position.total_tokens);
        let expected = position.total_tokens;
        if expected > 0.0 && (expected - chain_balance) / expected > 0.01 {
            let scale = (chain_balance / expected).max(0.0);
            logger::warning(
                LogTag::Trader,
                &format!("follow-sell reconciliation for {}: expected {:.4} tokens, chain has {:.4}, rescaling shares by {:.4}", mint, expected, chain_balance, scale),
            );
            for share in position.shares.values_mut() {
                share.token_amount *= scale;
            }
            position.total_tokens = chain_balance.max(0.0);
        }

        let Some(share) = position.shares.get(hunter).copied() else { return };

        let effective_ratio = ratio.max(self.policy.min_sell_ratio_pct / 100.0);
        let mut sell_amount = (share.token_amount * effective_ratio).min(share.token_amount);

        let current_price = self.price_oracle.price(mint).await.map(|p| p.price_sol).unwrap_or(0.0);
        let remaining = share.token_amount - sell_amount;
        if remaining * current_price < self.policy.min_share_value_sol {
            sell_amount = share.token_amount;
        }
        sell_amount = sell_amount.min(position.total_tokens).min(chain_balance.max(0.0));
        if sell_amount <= 0.0 {
            return;
        }

        let outcome = match self.swap.sell_with_retry(&self.signer, &self.owner(), mint, WSOL_MINT, sell_amount, position.decimals as u32).await {
            Ok(o) => o,
            Err(e) => {
                logger::warning(LogTag::Trader, &format!("follow-sell failed for {}/{}: {}", mint, hunter, e));
                return;
            }
        };

        let effect = positions::apply_follow_sell(&mut position, hunter, sell_amount, outcome.out_amount, now_secs());
        match effect {
            Some(effect) => self.close_position(mint, effect).await,
            None => self.position_store.put(mint.to_string(), position).await,
        }
    }

    /// `PNL_CHECK` (§4.8): stop-loss (with second-oracle rescue) then the
    /// take-profit ladder, run once per tracked mint on a fixed interval.
    pub async fn run_pnl_loop(&self, interval_secs: u64) {
        let mut ticker = interval(Duration::from_secs(interval_secs));
        loop {
            ticker.tick().await;
            for mint in self.position_store.all_mints().await {
                self.check_pnl(&mint).await;
            }
        }
    }

    async fn check_pnl(&self, mint: &str) {
        let _guard = self.locks.acquire(mint).await;
        let Some(mut position) = self.position_store.get(mint).await else { return };
        if position.average_price <= 0.0 {
            return;
        }

        let current_price = match self.price_oracle.price(mint).await {
            Ok(p) => p.price_sol,
            Err(_) => return,
        };
        let pnl_multiple = current_price / position.average_price - 1.0;
        let pnl_pct = pnl_multiple * 100.0;

        if pnl_pct > self.policy.jupiter_pnl_crosscheck_threshold_pct {
            if let Ok(implied) = self.swap.implied_price_sol(mint, position.total_tokens, position.decimals as u32).await {
                let implied_pct = (implied / position.average_price - 1.0) * 100.0;
                if implied_pct < self.policy.jupiter_pnl_crosscheck_implied_ceiling_pct {
                    logger::warning(LogTag::Trader, &format!("pnl crosscheck rejected for {}: oracle {:.0}% vs implied {:.0}%", mint, pnl_pct, implied_pct));
                    return;
                }
            }
        }

        let Some(tier) = tiers::find_tier(position.lead_hunter_score, &self.tiers.tiers) else { return };
        if pnl_pct <= -tier.stop_loss_pct {
            let fresh_price = self.price_oracle.fresh_price(mint).await.map(|p| p.price_sol).unwrap_or(current_price);
            let fresh_pct = (fresh_price / position.average_price - 1.0) * 100.0;
            if fresh_pct <= -tier.stop_loss_pct {
                self.execute_stop_loss(mint, &mut position).await;
            }
            return;
        }

        for (idx, (threshold, fraction)) in self.take_profit.levels.clone().into_iter().enumerate() {
            if position.tp_hit_levels.contains(&idx) {
                continue;
            }
            if pnl_multiple >= threshold {
                self.execute_take_profit(mint, &mut position, idx, fraction).await;
                return;
            }
        }
    }

    async fn execute_stop_loss(&self, mint: &str, position: &mut crate::positions::Position) {
        let chain_balance = self.chain.token_balance(&self.owner(), mint).await.unwrap_or(position.total_tokens);
        let sell_amount = chain_balance.min(position.total_tokens);
        if sell_amount <= 0.0 {
            return;
        }
        let outcome = match self.swap.sell_with_retry(&self.signer, &self.owner(), mint, WSOL_MINT, sell_amount, position.decimals as u32).await {
            Ok(o) => o,
            Err(e) => {
                logger::error(LogTag::Trader, &format!("stop-loss sell failed for {}: {}", mint, e));
                return;
            }
        };
        if let Some(effect) = positions::apply_stop_loss(position, sell_amount, outcome.out_amount, now_secs()) {
            self.close_position(mint, effect).await;
        }
    }

    async fn execute_take_profit(&self, mint: &str, position: &mut crate::positions::Position, idx: usize, fraction: f64) {
        let sell_amount = position.total_tokens * fraction;
        if sell_amount <= 0.0 {
            return;
        }
        let outcome = match self.swap.sell_with_retry(&self.signer, &self.owner(), mint, WSOL_MINT, sell_amount, position.decimals as u32).await {
            Ok(o) => o,
            Err(e) => {
                logger::warning(LogTag::Trader, &format!("take-profit sell failed for {}: {}", mint, e));
                return;
            }
        };
        match positions::apply_take_profit(position, idx, sell_amount, outcome.out_amount, now_secs()) {
            Some(effect) => self.close_position(mint, effect).await,
            None => self.position_store.put(mint.to_string(), position.clone()).await,
        }
    }

    /// `EMERGENCY_CLOSE_ALL` (§4.8): liquidate every open position once, on
    /// the credit-exhausted signal.
    pub async fn run_emergency_close_all(&self, mut credit_exhausted_rx: mpsc::Receiver<CreditExhausted>) {
        if credit_exhausted_rx.recv().await.is_none() {
            return;
        }
        logger::error(LogTag::Trader, "credit exhausted: closing every open position");
        for mint in self.position_store.all_mints().await {
            let _guard = self.locks.acquire(&mint).await;
            let Some(mut position) = self.position_store.get(&mint).await else { continue };
            let chain_balance = self.chain.token_balance(&self.owner(), &mint).await.unwrap_or(position.total_tokens * self.policy.sell_buffer);
            let sell_amount = chain_balance.min(position.total_tokens).max(0.0);
            if sell_amount <= 0.0 {
                continue;
            }
            let outcome = match self.swap.sell_with_retry(&self.signer, &self.owner(), &mint, WSOL_MINT, sell_amount, position.decimals as u32).await {
                Ok(o) => o,
                Err(e) => {
                    logger::error(LogTag::Trader, &format!("emergency close failed for {}: {}", mint, e));
                    continue;
                }
            };
            if let Some(effect) = positions::apply_emergency_close(&mut position, sell_amount, outcome.out_amount, now_secs()) {
                self.close_position(&mint, effect).await;
            }
        }
    }

    /// Force-closes any position the evicted hunter still holds a share in.
    pub async fn run_hunter_evicted_consumer(&self, mut hunter_evicted_rx: mpsc::Receiver<HunterEvicted>) {
        while let Some(evicted) = hunter_evicted_rx.recv().await {
            for mint in self.position_store.mints_led_by(&evicted.wallet).await {
                let _guard = self.locks.acquire(&mint).await;
                let Some(mut position) = self.position_store.get(&mint).await else { continue };
                let chain_balance = self.chain.token_balance(&self.owner(), &mint).await.unwrap_or(position.total_tokens);
                let sell_amount = chain_balance.min(position.total_tokens);
                if sell_amount <= 0.0 {
                    continue;
                }
                let outcome = match self.swap.sell_with_retry(&self.signer, &self.owner(), &mint, WSOL_MINT, sell_amount, position.decimals as u32).await {
                    Ok(o) => o,
                    Err(e) => {
                        logger::error(LogTag::Trader, &format!("forced close failed for {} after hunter {} evicted: {}", mint, evicted.wallet, e));
                        continue;
                    }
                };
                if let Some(effect) = positions::apply_emergency_close(&mut position, sell_amount, outcome.out_amount, now_secs()) {
                    self.close_position(&mint, effect).await;
                }
            }
        }
    }
}

fn deny_reason_str(reason: &DenyReason) -> String {
    format!("{:?}", reason)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wsol_mint_is_the_canonical_address() {
        assert_eq!(WSOL_MINT.len(), 44);
    }
}
