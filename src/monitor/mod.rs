//! Streaming Monitor (§4.6): one `transactionSubscribe` WebSocket
//! subscription over the hunter pool's addresses, batching signatures into
//! a single bulk parse per drain, and maintaining the active-holdings state
//! the resonance predicate (§4.6.1) runs against.
//!
//! Monitor exclusively owns `ActiveHoldings`, `blacklisted_mints` and
//! `resonance_emitted` (§3 Ownership) — nothing else mutates them.

mod holdings;
mod ws;

pub use holdings::{ActiveHoldings, SignatureDedupCache};

use crate::events::{CreditExhausted, HunterMintDelta, ResonanceSignal};
use crate::hunters::HunterStore;
use crate::logger::{self, LogTag};
use crate::pricing::PriceOracle;
use crate::rpc::{Chain, ParsedTransaction};
use crate::tx::{attribute, parse_wallet_effect};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration};

/// Current wall-clock seconds, used throughout for `last_active`/TTL
/// bookkeeping (no mocked clock exists in this codebase; tests pass
/// explicit timestamps to the pure helpers instead).
fn now_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

pub struct MonitorConfig {
    pub ws_urls: Vec<String>,
    pub ws_resubscribe_secs: u64,
    pub batch_drain_timeout_ms: u64,
    pub batch_size: usize,
    pub recent_sig_ttl_secs: i64,
    pub holdings_prune_interval_secs: u64,
    pub holdings_ttl_secs: i64,
    pub max_entry_pump_multiplier: f64,
}

pub struct Monitor {
    chain: Arc<dyn Chain>,
    hunter_store: Arc<HunterStore>,
    position_store: Arc<crate::positions::PositionStore>,
    wallet_trash: Arc<crate::hunters::WalletLineList>,
    price_oracle: Arc<PriceOracle>,
    cfg: MonitorConfig,
    holdings: holdings::ActiveHoldings,
    dedup: holdings::SignatureDedupCache,
    credit_exhausted_fired: AtomicBool,
    resonance_tx: mpsc::Sender<ResonanceSignal>,
    hunter_delta_tx: mpsc::Sender<HunterMintDelta>,
    credit_exhausted_tx: mpsc::Sender<CreditExhausted>,
}

impl Monitor {
    pub fn new(
        chain: Arc<dyn Chain>,
        hunter_store: Arc<HunterStore>,
        position_store: Arc<crate::positions::PositionStore>,
        wallet_trash: Arc<crate::hunters::WalletLineList>,
        price_oracle: Arc<PriceOracle>,
        cfg: MonitorConfig,
        resonance_tx: mpsc::Sender<ResonanceSignal>,
        hunter_delta_tx: mpsc::Sender<HunterMintDelta>,
        credit_exhausted_tx: mpsc::Sender<CreditExhausted>,
    ) -> Self {
        Self {
            chain,
            hunter_store,
            position_store,
            wallet_trash,
            price_oracle,
            cfg,
            holdings: holdings::ActiveHoldings::new(),
            dedup: holdings::SignatureDedupCache::new(),
            credit_exhausted_fired: AtomicBool::new(false),
            resonance_tx,
            hunter_delta_tx,
            credit_exhausted_tx,
        }
    }

    /// The WS-subscribe task (§4.6 step 1): reconnects on error and
    /// proactively every `ws_resubscribe_secs` so the `accountInclude` list
    /// tracks hunter pool churn.
    pub async fn run_subscription(&self, sig_tx: mpsc::Sender<String>) {
        loop {
            let addresses = self.hunter_store.addresses();
            if addresses.is_empty() {
                tokio::time::sleep(Duration::from_secs(5)).await;
                continue;
            }
            let deadline = tokio::time::sleep(Duration::from_secs(self.cfg.ws_resubscribe_secs));
            tokio::pin!(deadline);

            let stream_result = ws::stream_signatures(&self.cfg.ws_urls, &addresses, sig_tx.clone(), &mut deadline).await;

            if let Err(e) = stream_result {
                logger::warning(LogTag::Monitor, &format!("ws subscription dropped: {}, reconnecting", e));
                tokio::time::sleep(Duration::from_secs(3)).await;
            }
        }
    }

    /// The signature-consumer task (§4.6 steps 2-6): drains up to
    /// `batch_size` signatures every `batch_drain_timeout_ms`, dedups, bulk
    /// parses, and folds each transaction into holdings state.
    pub async fn run_consumer(&self, mut sig_rx: mpsc::Receiver<String>) {
        loop {
            let batch = self.drain_batch(&mut sig_rx).await;
            let Some(batch) = batch else {
                return;
            };
            if batch.is_empty() {
                continue;
            }

            let now = now_secs();
            let fresh: Vec<String> = batch.into_iter().filter(|s| self.dedup.observe(s, now, self.cfg.recent_sig_ttl_secs)).collect();
            if fresh.is_empty() {
                continue;
            }

            match self.chain.parsed_transactions_bulk(&fresh).await {
                Ok(txs) => {
                    for tx in &txs {
                        self.handle_transaction(tx).await;
                    }
                }
                Err(e) => {
                    self.handle_bulk_parse_error(&e).await;
                }
            }
        }
    }

    async fn drain_batch(&self, sig_rx: &mut mpsc::Receiver<String>) -> Option<Vec<String>> {
        let mut batch = Vec::with_capacity(self.cfg.batch_size);
        let first = sig_rx.recv().await?;
        batch.push(first);

        let timeout = tokio::time::sleep(Duration::from_millis(self.cfg.batch_drain_timeout_ms));
        tokio::pin!(timeout);
        loop {
            if batch.len() >= self.cfg.batch_size {
                break;
            }
            tokio::select! {
                _ = &mut timeout => break,
                maybe = sig_rx.recv() => {
                    match maybe {
                        Some(sig) => batch.push(sig),
                        None => break,
                    }
                }
            }
        }
        Some(batch)
    }

    async fn handle_bulk_parse_error(&self, err: &crate::errors::ScreenerBotError) {
        let is_rate_limit = matches!(err, crate::errors::ScreenerBotError::RateLimit(_));
        logger::warning(LogTag::Monitor, &format!("bulk parse failed: {}", err));
        if is_rate_limit && !self.credit_exhausted_fired.swap(true, Ordering::SeqCst) {
            logger::error(LogTag::Monitor, "parse credits exhausted, firing emergency close-all");
            let _ = self.credit_exhausted_tx.send(CreditExhausted).await;
        }
    }

    async fn handle_transaction(&self, tx: &ParsedTransaction) {
        let involved = involved_accounts(tx);
        let hunters: Vec<String> = involved.into_iter().filter(|a| self.hunter_store.contains(a)).collect();
        if hunters.is_empty() {
            return;
        }
        if !is_real_trade(tx) {
            return;
        }

        let usdc_per_sol = self.price_oracle.sol_usd_price().await.ok();
        let now = now_secs();

        for hunter in &hunters {
            self.hunter_store.touch_active(hunter, now);

            let effect = parse_wallet_effect(tx, hunter, usdc_per_sol);
            if effect.token_changes.is_empty() {
                continue;
            }
            let attribution = attribute(effect.sol_change, &effect.token_changes);

            for (mint, delta) in &effect.token_changes {
                if delta.abs() <= f64::EPSILON {
                    continue;
                }
                let is_buy = effect.sol_change < 0.0 && *delta > 0.0 && attribution.buy_sol.contains_key(mint);
                let is_sell = effect.sol_change > 0.0 && *delta < 0.0 && attribution.sell_sol.contains_key(mint);

                if is_buy {
                    let price_sol = self.price_oracle.price(mint).await.map(|p| p.price_sol).unwrap_or(0.0);
                    self.holdings.record_buy_with_price(mint, hunter, now, price_sol);
                } else if is_sell {
                    let became_blacklisted = self.holdings.record_sell(mint, hunter);
                    if became_blacklisted {
                        logger::info(LogTag::Monitor, &format!("mint {} blacklisted: lead hunter {} exited before resonance", mint, hunter));
                    }
                }

                if self.position_store.contains(mint).await {
                    let _ = self
                        .hunter_delta_tx
                        .send(HunterMintDelta { mint: mint.clone(), hunter: hunter.clone(), delta_ui: *delta, ts: now })
                        .await;
                }

                if is_buy || is_sell {
                    self.maybe_emit_resonance(mint).await;
                }
            }
        }
    }

    async fn maybe_emit_resonance(&self, mint: &str) {
        let Some(first_buyer) = self.holdings.first_buyer(mint) else { return };
        if self.holdings.is_blacklisted(mint) || self.holdings.resonance_already_emitted(mint) {
            return;
        }
        if !self.holdings.is_active_holder(mint, &first_buyer) {
            return;
        }
        if self.position_store.contains(mint).await {
            return;
        }
        if self.wallet_trash.contains(&first_buyer) {
            return;
        }
        let Some(first_buy_price) = self.holdings.first_buy_price(mint) else { return };
        let current_price = match self.price_oracle.price(mint).await {
            Ok(p) => p.price_sol,
            Err(_) => return,
        };
        if first_buy_price > 0.0 && current_price > first_buy_price * self.cfg.max_entry_pump_multiplier {
            return;
        }

        let Some(hunter) = self.hunter_store.get(&first_buyer) else { return };
        if !self.holdings.mark_resonance_emitted(mint) {
            return;
        }

        logger::info(LogTag::Monitor, &format!("resonance fired for {} led by {} (score {:.1})", mint, first_buyer, hunter.score));
        let _ = self
            .resonance_tx
            .send(ResonanceSignal { mint: mint.to_string(), lead_hunter: first_buyer, score: hunter.score, ts: now_secs() })
            .await;
    }

    /// Holdings-prune loop (§4.6 step 7): drops entries with no follower
    /// position and no fresh hunter activity.
    pub async fn run_holdings_prune(&self) {
        let mut ticker = interval(Duration::from_secs(self.cfg.holdings_prune_interval_secs));
        loop {
            ticker.tick().await;
            let now = now_secs();
            let mints = self.holdings.tracked_mints();
            let mut pruned = 0;
            for mint in mints {
                if self.position_store.contains(&mint).await {
                    continue;
                }
                if self.holdings.prune_if_stale(&mint, now, self.cfg.holdings_ttl_secs) {
                    pruned += 1;
                }
            }
            if pruned > 0 {
                logger::debug(LogTag::Monitor, &format!("holdings prune dropped {} stale mints", pruned));
            }
        }
    }
}

fn involved_accounts(tx: &ParsedTransaction) -> HashSet<String> {
    let mut set = HashSet::new();
    set.insert(tx.fee_payer.clone());
    for t in &tx.native_transfers {
        set.insert(t.from.clone());
        set.insert(t.to.clone());
    }
    for t in &tx.token_transfers {
        set.insert(t.from.clone());
        set.insert(t.to.clone());
    }
    set
}

fn is_real_trade(tx: &ParsedTransaction) -> bool {
    tx.err.is_none() && (!tx.native_transfers.is_empty() || !tx.token_transfers.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::{NativeTransfer, TokenAmount, TokenTransfer};

    fn tx() -> ParsedTransaction {
        ParsedTransaction {
            signature: "sig".into(),
            timestamp: 1,
            native_transfers: vec![NativeTransfer { from: "a".into(), to: "b".into(), amount_sol: 1.0 }],
            token_transfers: vec![TokenTransfer {
                from: "b".into(),
                to: "a".into(),
                mint: "MINT".into(),
                token_amount: TokenAmount { amount: 10.0, decimals: 6 },
            }],
            description: String::new(),
            tx_type: String::new(),
            fee_payer: "a".into(),
            err: None,
        }
    }

    #[test]
    fn involved_accounts_collects_every_endpoint() {
        let t = tx();
        let accounts = involved_accounts(&t);
        assert!(accounts.contains("a"));
        assert!(accounts.contains("b"));
    }

    #[test]
    fn failed_transaction_is_not_a_real_trade() {
        let mut t = tx();
        t.err = Some(serde_json::json!({"InstructionError": [0, "Custom"]}));
        assert!(!is_real_trade(&t));
    }

    #[test]
    fn empty_transfers_is_not_a_real_trade() {
        let mut t = tx();
        t.native_transfers.clear();
        t.token_transfers.clear();
        assert!(!is_real_trade(&t));
    }
}
