/// All configuration structures, defined once with embedded defaults.
///
/// Each struct is declared with `config_struct!` (see `macros.rs`), which
/// derives `Serialize`/`Deserialize` with `#[serde(default)]` plus a `Default`
/// impl, so a missing key in `data/config.toml` silently falls back to the
/// value written here.
use crate::config_struct;

// ============================================================================
// CREDENTIALS & PROVIDERS
// ============================================================================

config_struct! {
    /// Credential pools backing the independently-rotating KeyPools (§4.1).
    pub struct CredentialsConfig {
        rpc_keys: Vec<String> = vec![],
        parse_keys: Vec<String> = vec![],
        swap_keys: Vec<String> = vec![],
        price_keys: Vec<String> = vec![],
        safety_keys: Vec<String> = vec![],
        signer_keypair_path: String = "data/signer.json".to_string(),
    }
}

config_struct! {
    /// RPC/WS/parse/swap/price provider endpoints.
    pub struct ProviderConfig {
        /// auto | primary | fallback
        primary_mode: String = "auto".to_string(),
        rpc_urls: Vec<String> = vec!["https://api.mainnet-beta.solana.com".to_string()],
        rpc_fallback_urls: Vec<String> = vec![],
        ws_urls: Vec<String> = vec!["wss://api.mainnet-beta.solana.com".to_string()],
        parse_base_url: String = "https://api.helius.xyz".to_string(),
        swap_base_url: String = "https://quote-api.jup.ag".to_string(),
        price_base_url: String = "https://lite-api.jup.ag/price/v3".to_string(),
        safety_base_url: String = "https://api.rugcheck.xyz/v1".to_string(),
        rpc_timeout_secs: u64 = 30,
        account_read_timeout_secs: u64 = 10,
        max_retries: u32 = 3,
        retry_backoff_base_secs: u64 = 1,
    }
}

// ============================================================================
// TIER TABLE & TAKE-PROFIT LADDER
// ============================================================================

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TierBand {
    pub min_score: f64,
    pub entry_sol: f64,
    pub add_sol: f64,
    pub max_sol: f64,
    pub stop_loss_pct: f64,
}

fn default_tiers() -> Vec<TierBand> {
    vec![
        TierBand { min_score: 60.0, entry_sol: 0.04, add_sol: 0.04, max_sol: 0.12, stop_loss_pct: 85.0 },
        TierBand { min_score: 80.0, entry_sol: 0.08, add_sol: 0.08, max_sol: 0.24, stop_loss_pct: 80.0 },
        TierBand { min_score: 90.0, entry_sol: 0.15, add_sol: 0.15, max_sol: 0.45, stop_loss_pct: 75.0 },
    ]
}

config_struct! {
    pub struct TierConfig {
        tiers: Vec<TierBand> = default_tiers(),
        min_entry_score: f64 = 60.0,
    }
}

config_struct! {
    /// List of (pnl_threshold, sell_fraction) pairs, evaluated in order.
    pub struct TakeProfitConfig {
        levels: Vec<(f64, f64)> = vec![(1.0, 0.50), (4.0, 0.50), (10.0, 0.80)],
    }
}

config_struct! {
    /// First entry is the default slippage; the rest are sell-retry escalations.
    pub struct SlippageConfig {
        schedule_bps: Vec<u32> = vec![200, 500, 1000],
    }
}

// ============================================================================
// DISCOVERY
// ============================================================================

config_struct! {
    pub struct DiscoveryConfig {
        enabled: bool = true,
        min_age_secs: i64 = 3600,
        max_age_secs: i64 = 21600,
        max_delay_secs: i64 = 21600,
        gain_24h_pct: f64 = 500.0,
        min_buy_sol: f64 = 0.1,
        max_buy_sol: f64 = 50.0,
        min_token_profit_pct: f64 = 200.0,
        min_entry_delay_secs: i64 = 15,
        earliest_tx_sample: usize = 360,
        audit_tx_limit: usize = 500,
        min_win_rate_pct: f64 = 20.0,
        min_pnl_ratio: f64 = 2.0,
        min_trade_count: u32 = 10,
        min_hunter_score: f64 = 60.0,
        pool_limit: usize = 300,
        min_avg_interval_secs: f64 = 300.0,
        min_successful_tx_for_frequency: usize = 10,
        max_failure_rate_for_frequency: f64 = 0.30,
        recent_tx_count_for_frequency: usize = 30,
        tier_three_roi_pct: f64 = 50.0,
        curated_wallet_list_path: String = "data/curated_wallets.txt".to_string(),
        use_ata_first: bool = true,
        ata_sig_limit: usize = 50,
    }
}

// ============================================================================
// INTERVALS
// ============================================================================

config_struct! {
    pub struct IntervalsConfig {
        discovery_interval_secs: u64 = 900,
        discovery_interval_when_full_secs: u64 = 86_400,
        maintenance_interval_secs: u64 = 86_400,
        audit_expiration_secs: i64 = 432_000,
        zombie_threshold_secs: i64 = 1_296_000,
        holdings_prune_interval_secs: u64 = 43_200,
        holdings_ttl_secs: i64 = 7_200,
        ws_resubscribe_secs: u64 = 300,
        recent_sig_ttl_secs: i64 = 90,
        pnl_check_interval_secs: u64 = 5,
        sync_interval_secs: u64 = 30,
        sync_protection_secs: i64 = 60,
        tx_verify_max_wait_secs: u64 = 45,
        tx_verify_retry_max_wait_secs: u64 = 30,
        tx_verify_reconciliation_delay_secs: u64 = 5,
        batch_drain_timeout_ms: u64 = 300,
        batch_size: usize = 15,
    }
}

// ============================================================================
// POLICY
// ============================================================================

config_struct! {
    pub struct PolicyConfig {
        min_share_value_sol: f64 = 0.01,
        follow_sell_threshold_pct: f64 = 5.0,
        min_sell_ratio_pct: f64 = 30.0,
        sell_buffer: f64 = 0.999,
        max_entry_pump_multiplier: f64 = 4.0,
        usdc_per_sol_default: f64 = 0.0,
        sync_min_delta_ratio_pct: f64 = 1.0,
        tx_verify_reconciliation_retries: u32 = 3,
        jupiter_pnl_crosscheck_threshold_pct: f64 = 200.0,
        jupiter_pnl_crosscheck_implied_ceiling_pct: f64 = 50.0,
    }
}

// ============================================================================
// RISK GATE
// ============================================================================

config_struct! {
    pub struct RiskGateConfig {
        enabled: bool = true,
        safety_score_ceiling: f64 = 2000.0,
        max_buy_tax_pct: f64 = 25.0,
        min_liquidity_usd: f64 = 1000.0,
        max_fdv_usd: f64 = 100_000_000.0,
        min_liquidity_to_fdv_pct: f64 = 3.0,
        min_lp_locked_pct: f64 = 70.0,
        max_top_2_10_holders_pct: f64 = 40.0,
        max_single_holder_pct: f64 = 10.0,
        require_social_link: bool = true,
    }
}

// ============================================================================
// LOGGING
// ============================================================================

config_struct! {
    pub struct LoggingConfig {
        level: String = "info".to_string(),
        console_enabled: bool = true,
        file_enabled: bool = true,
        colors_enabled: bool = true,
    }
}

// ============================================================================
// TOP-LEVEL CONFIG
// ============================================================================

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub credentials: CredentialsConfig,
    pub providers: ProviderConfig,
    pub tiers: TierConfig,
    pub take_profit: TakeProfitConfig,
    pub slippage: SlippageConfig,
    pub discovery: DiscoveryConfig,
    pub intervals: IntervalsConfig,
    pub policy: PolicyConfig,
    pub risk_gate: RiskGateConfig,
    pub logging: LoggingConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_three_tiers() {
        let cfg = Config::default();
        assert_eq!(cfg.tiers.tiers.len(), 3);
        assert_eq!(cfg.take_profit.levels.len(), 3);
    }

    #[test]
    fn default_config_round_trips_through_toml() {
        let cfg = Config::default();
        let s = toml::to_string_pretty(&cfg).unwrap();
        let back: Config = toml::from_str(&s).unwrap();
        assert_eq!(back.discovery.pool_limit, cfg.discovery.pool_limit);
    }
}
