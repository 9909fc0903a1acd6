//! Providers (§9 Design Notes: "construct a per-process `Providers` value
//! and pass it explicitly into components instead of a global registry").
//! One instance is built in `main` and handed out to every actor by `Arc`.

use crate::config::Config;
use crate::discovery::sources::dexscreener::DexScreenerSource;
use crate::discovery::sources::SourceTrait;
use crate::hunters::HunterStore;
use crate::paths;
use crate::pricing::PriceOracle;
use crate::risk_gate::{HttpTokenSafetyOracle, RiskGate};
use crate::rpc::{Chain, SolanaChain};
use crate::swap::SwapExecutor;
use crate::trading_history::TradingHistory;
use solana_sdk::signature::Keypair;
use std::sync::Arc;

/// Every long-lived capability Discovery/Monitor/Agent/Trader are built
/// from, constructed once at startup from the loaded `Config`.
pub struct Providers {
    pub chain: Arc<dyn Chain>,
    pub price_oracle: Arc<PriceOracle>,
    pub swap: Arc<SwapExecutor>,
    pub risk_gate: Arc<RiskGate<HttpTokenSafetyOracle>>,
    pub hunter_store: Arc<HunterStore>,
    pub trading_history: Arc<TradingHistory>,
    pub hot_sources: Vec<Arc<dyn SourceTrait>>,
    pub signer: Arc<Keypair>,
}

impl Providers {
    pub fn build(cfg: &Config, signer: Keypair) -> Self {
        let chain: Arc<dyn Chain> = Arc::new(SolanaChain::new(&cfg.providers, &cfg.credentials));

        let price_oracle = Arc::new(PriceOracle::new(cfg.providers.price_base_url.clone(), cfg.credentials.price_keys.clone()));

        let swap = Arc::new(SwapExecutor::new(
            chain.clone(),
            cfg.providers.swap_base_url.clone(),
            cfg.credentials.swap_keys.clone(),
            cfg.slippage.clone(),
            cfg.intervals.tx_verify_max_wait_secs,
            cfg.intervals.tx_verify_retry_max_wait_secs,
            cfg.intervals.tx_verify_reconciliation_delay_secs,
            cfg.policy.tx_verify_reconciliation_retries,
        ));

        let oracle = HttpTokenSafetyOracle::new(cfg.providers.safety_base_url.clone(), cfg.credentials.safety_keys.clone());
        let risk_gate = Arc::new(RiskGate::new(oracle, cfg.risk_gate.clone()));

        let hunter_store = Arc::new(HunterStore::load(cfg.discovery.pool_limit, paths::get_hunter_store_path()));
        let trading_history = Arc::new(TradingHistory::new(paths::get_trading_history_path()));

        let hot_sources: Vec<Arc<dyn SourceTrait>> = vec![Arc::new(DexScreenerSource::new(reqwest::Client::new()))];

        Self {
            chain,
            price_oracle,
            swap,
            risk_gate,
            hunter_store,
            trading_history,
            hot_sources,
            signer: Arc::new(signer),
        }
    }
}
