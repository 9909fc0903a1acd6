//! Discovery: mine hunters either from a hot-token backtrack (Mode A) or a
//! curated wallet list (Mode B), sharing the audit/scoring tail (§4.5).

pub mod audit;
pub mod scoring;
pub mod sources;

use crate::config::DiscoveryConfig;
use crate::hunters::{Hunter, HunterMetrics, HunterSource, HunterStore, InsertOutcome, ScoreDetail, WalletLineList};
use crate::logger::{self, LogTag};
use crate::pricing::PriceOracle;
use crate::rpc::Chain;
use crate::tx::{attribution, parser};
use solana_sdk::pubkey::Pubkey;
use sources::SourceTrait;
use spl_associated_token_account::get_associated_token_address_with_program_id;
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

struct TokenWindow {
    created_at: i64,
    signatures: Vec<String>,
}

/// Owns the scanned-token dedup set and the wallet trash/blacklist (§3
/// Ownership). `HunterStore` is injected rather than owned, since Maintenance
/// shares write access to it.
pub struct Discovery {
    chain: Arc<dyn Chain>,
    hunter_store: Arc<HunterStore>,
    hot_sources: Vec<Arc<dyn SourceTrait>>,
    price_oracle: Arc<PriceOracle>,
    scanned_tokens: WalletLineList,
    wallet_trash: WalletLineList,
    cfg: DiscoveryConfig,
}

impl Discovery {
    pub fn new(
        chain: Arc<dyn Chain>,
        hunter_store: Arc<HunterStore>,
        hot_sources: Vec<Arc<dyn SourceTrait>>,
        price_oracle: Arc<PriceOracle>,
        scanned_tokens_path: std::path::PathBuf,
        wallet_trash_path: std::path::PathBuf,
        cfg: DiscoveryConfig,
    ) -> Self {
        Self {
            chain,
            hunter_store,
            hot_sources,
            price_oracle,
            scanned_tokens: WalletLineList::new(scanned_tokens_path),
            wallet_trash: WalletLineList::new(wallet_trash_path),
            cfg,
        }
    }

    /// Mode A: pull hot-token candidates from every configured source, then
    /// backtrack + audit + score each token's early buyers.
    pub async fn run_hot_token_cycle(&self, now: i64) {
        let mut candidates = HashSet::new();
        for source in &self.hot_sources {
            match source.discover_mints().await {
                Ok(mints) => candidates.extend(mints),
                Err(e) => logger::warning(
                    LogTag::Discovery,
                    &format!("hot-token source {} unavailable: {}", source.name(), e),
                ),
            }
        }

        for mint in candidates {
            if self.scanned_tokens.contains(&mint) {
                continue;
            }
            let _ = self.scanned_tokens.append(&mint);
            self.process_hot_token(&mint, now).await;
        }
    }

    async fn process_hot_token(&self, mint: &str, now: i64) {
        let window = match self.token_genesis_and_window(mint).await {
            Some(w) => w,
            None => return,
        };

        let age_secs = now - window.created_at;
        if age_secs < self.cfg.min_age_secs || age_secs > self.cfg.max_age_secs {
            return;
        }

        let candidates = match self.earliest_buyers(mint, &window).await {
            Ok(c) => c,
            Err(e) => {
                logger::warning(LogTag::Discovery, &format!("failed to backtrack {}: {}", mint, e));
                return;
            }
        };

        for wallet in candidates {
            if self.wallet_trash.contains(&wallet) || self.hunter_store.contains(&wallet) {
                continue;
            }
            self.audit_and_admit(&wallet, HunterSource::HotTokenBacktrack, now).await;
        }
    }

    /// Paginate `signatures_for_address(mint)` newest-to-oldest until genesis
    /// (a short page) or the configured cap, returning the earliest known
    /// timestamp and the signatures within `[created, created+MAX_DELAY]`.
    async fn token_genesis_and_window(&self, mint: &str) -> Option<TokenWindow> {
        let mut before: Option<String> = None;
        let mut all: Vec<(String, i64)> = Vec::new();
        const PAGE: usize = 1000;
        const MAX_PAGES: usize = 20;

        for _ in 0..MAX_PAGES {
            let page = self.chain.signatures_for_address(mint, before.clone(), PAGE).await.ok()?;
            if page.is_empty() {
                break;
            }
            let exhausted = page.len() < PAGE;
            before = page.last().map(|(sig, _)| sig.clone());
            all.extend(page.into_iter().filter_map(|(sig, ts)| ts.map(|t| (sig, t))));
            if exhausted {
                break;
            }
        }

        if all.is_empty() {
            return None;
        }

        let created_at = all.iter().map(|(_, ts)| *ts).min()?;
        let window_end = created_at + self.cfg.max_delay_secs;
        let mut windowed: Vec<(String, i64)> = all
            .into_iter()
            .filter(|(_, ts)| *ts >= created_at && *ts <= window_end)
            .collect();
        windowed.sort_by_key(|(_, ts)| *ts);

        Some(TokenWindow {
            created_at,
            signatures: windowed.into_iter().map(|(sig, _)| sig).collect(),
        })
    }

    /// Parse the earliest `earliest_tx_sample` signatures in the window and
    /// find each unique earliest buyer within `[MIN_BUY_SOL, MAX_BUY_SOL]`
    /// entering at least `MIN_DELAY` after genesis, whose subsequent ROI on
    /// this mint clears `MIN_TOKEN_PROFIT_PCT`.
    async fn earliest_buyers(&self, mint: &str, window: &TokenWindow) -> Result<Vec<String>, String> {
        let sample: Vec<String> = window.signatures.iter().take(self.cfg.earliest_tx_sample).cloned().collect();
        if sample.is_empty() {
            return Ok(Vec::new());
        }

        let mut txs = Vec::new();
        for chunk in sample.chunks(100) {
            let batch = self
                .chain
                .parsed_transactions_bulk(chunk)
                .await
                .map_err(|e| e.to_string())?;
            txs.extend(batch);
        }
        txs.sort_by_key(|tx| tx.timestamp);

        let mut buy_sol_by_wallet: std::collections::HashMap<String, f64> = std::collections::HashMap::new();
        let mut sell_sol_by_wallet: std::collections::HashMap<String, f64> = std::collections::HashMap::new();
        let mut entry_ts_by_wallet: std::collections::HashMap<String, i64> = std::collections::HashMap::new();

        for tx in &txs {
            if tx.err.is_some() {
                continue;
            }
            let wallets: HashSet<String> = tx
                .token_transfers
                .iter()
                .filter(|t| t.mint == mint)
                .flat_map(|t| vec![t.from.clone(), t.to.clone()])
                .collect();

            for wallet in wallets {
                let effect = parser::parse_wallet_effect(tx, &wallet, None);
                let attribution = attribution::attribute(effect.sol_change, &effect.token_changes);
                if let Some(sol) = attribution.buy_sol.get(mint) {
                    *buy_sol_by_wallet.entry(wallet.clone()).or_insert(0.0) += sol;
                    entry_ts_by_wallet.entry(wallet.clone()).or_insert(tx.timestamp);
                }
                if let Some(sol) = attribution.sell_sol.get(mint) {
                    *sell_sol_by_wallet.entry(wallet.clone()).or_insert(0.0) += sol;
                }
            }
        }

        let mut accepted = Vec::new();
        for (wallet, buy_sol) in &buy_sol_by_wallet {
            if *buy_sol < self.cfg.min_buy_sol || *buy_sol > self.cfg.max_buy_sol {
                continue;
            }
            let entry_ts = *entry_ts_by_wallet.get(wallet).unwrap_or(&window.created_at);
            if entry_ts - window.created_at < self.cfg.min_entry_delay_secs {
                continue;
            }
            if self.wallet_trash.contains(wallet) {
                continue;
            }

            let roi_pct = match self.ata_roi(wallet, mint).await {
                Some(roi) => roi,
                None => {
                    let sell_sol = *sell_sol_by_wallet.get(wallet).unwrap_or(&0.0);
                    if *buy_sol > 0.0 { (sell_sol - buy_sol) / buy_sol * 100.0 } else { 0.0 }
                }
            };
            if roi_pct < self.cfg.min_token_profit_pct {
                continue;
            }

            accepted.push(wallet.clone());
        }

        Ok(accepted)
    }

    /// Derives `wallet`'s Associated Token Account for `mint` under the
    /// classic SPL Token program, falling back to Token-2022, and values its
    /// dedicated trade history (including any unsold remainder, priced at the
    /// current oracle rate) instead of the window-sampled aggregate (§15
    /// "ATA-first probe"). Returns `None` when neither program's ATA has any
    /// signature history, so the caller falls back to the window aggregate.
    async fn ata_roi(&self, wallet: &str, mint: &str) -> Option<f64> {
        if !self.cfg.use_ata_first {
            return None;
        }
        let owner_pk = Pubkey::from_str(wallet).ok()?;
        let mint_pk = Pubkey::from_str(mint).ok()?;
        let candidate_atas = [spl_token::id(), spl_token_2022::id()]
            .map(|program_id| get_associated_token_address_with_program_id(&owner_pk, &mint_pk, &program_id).to_string());

        let mut ata_sigs: Vec<String> = Vec::new();
        for ata in &candidate_atas {
            match self.chain.signatures_for_address(ata, None, self.cfg.ata_sig_limit).await {
                Ok(sigs) if !sigs.is_empty() => {
                    ata_sigs = sigs.into_iter().map(|(sig, _)| sig).collect();
                    break;
                }
                _ => continue,
            }
        }
        if ata_sigs.is_empty() {
            return None;
        }

        let mut txs = Vec::new();
        for chunk in ata_sigs.chunks(100) {
            match self.chain.parsed_transactions_bulk(chunk).await {
                Ok(batch) => txs.extend(batch),
                Err(e) => {
                    logger::warning(LogTag::Discovery, &format!("ata probe fetch failed for {}/{}: {}", wallet, mint, e));
                    return None;
                }
            }
        }
        txs.sort_by_key(|tx| tx.timestamp);

        let (mut buy_sol, mut sell_sol, mut tokens_held) = (0.0, 0.0, 0.0);
        for tx in &txs {
            if tx.err.is_some() {
                continue;
            }
            let effect = parser::parse_wallet_effect(tx, wallet, None);
            let Some(&token_delta) = effect.token_changes.get(mint) else { continue };
            if token_delta.abs() < 1e-9 {
                continue;
            }
            let attribution = attribution::attribute(effect.sol_change, &effect.token_changes);
            buy_sol += attribution.buy_sol.get(mint).copied().unwrap_or(0.0);
            sell_sol += attribution.sell_sol.get(mint).copied().unwrap_or(0.0);
            tokens_held += token_delta;
        }

        if buy_sol < 0.01 {
            return Some(f64::NEG_INFINITY);
        }

        let mut total_value = sell_sol;
        if tokens_held > 1e-9 {
            if let Ok(price) = self.price_oracle.price(mint).await {
                total_value += tokens_held * price.price_sol;
            }
        }

        Some((total_value - buy_sol) / buy_sol * 100.0)
    }

    /// Mode B: audit every address in the curated wallet list directly.
    pub async fn run_curated_list_cycle(&self, now: i64) {
        let curated = WalletLineList::new(std::path::PathBuf::from(&self.cfg.curated_wallet_list_path));
        for wallet in curated.load() {
            if self.wallet_trash.contains(&wallet) || self.hunter_store.contains(&wallet) {
                continue;
            }
            self.audit_and_admit(&wallet, HunterSource::CuratedList, now).await;
        }
    }

    async fn audit_and_admit(&self, wallet: &str, source: HunterSource, now: i64) {
        let audited = audit::audit_wallet(self.chain.as_ref(), wallet, &self.cfg, None, now).await;

        let metrics = match audited {
            Ok(m) => m,
            Err(audit::AuditRejection::LpBehaviorDetected) => {
                let _ = self.wallet_trash.append(wallet);
                logger::info(LogTag::Discovery, &format!("wallet {} blacklisted: LP behavior", wallet));
                return;
            }
            Err(rejection) => {
                logger::debug(LogTag::Discovery, &format!("wallet {} rejected: {:?}", wallet, rejection));
                return;
            }
        };

        let (score, detail) = match source {
            HunterSource::HotTokenBacktrack => {
                if audit::gate_mode_a(&metrics, &self.cfg).is_err() {
                    return;
                }
                let scored = scoring::score_mode_a(scoring::ModeAInputs {
                    win_rate_pct: metrics.win_rate_pct,
                    avg_roi_pct: metrics.avg_roi_pct,
                    pnl_ratio: metrics.pnl_ratio,
                    max_roi_30d_pct: metrics.max_roi_30d_pct,
                    avg_roi_ceiling_pct: 1000.0,
                    pnl_ratio_ceiling: 5.0,
                });
                (
                    scored.total,
                    ScoreDetail {
                        win_rate_component: scored.win_rate_component,
                        roi_component: scored.roi_component,
                        pnl_ratio_component: scored.pnl_ratio_component,
                        ..Default::default()
                    },
                )
            }
            HunterSource::CuratedList => {
                if audit::gate_mode_b(&metrics, &self.cfg, 5, 60.0).is_err() {
                    return;
                }
                let scored = scoring::score_mode_b(scoring::ModeBInputs {
                    pnl_ratio: metrics.pnl_ratio,
                    avg_roi_pct: metrics.avg_roi_pct,
                    max_roi_pct: metrics.max_roi_30d_pct,
                    had_single_loss_over_99pct: false,
                    win_rate_pct: metrics.win_rate_pct,
                    tx_per_day: 1.0,
                    dust_ratio_pct: if metrics.trade_count > 0 {
                        metrics.dust_count as f64 / metrics.trade_count as f64 * 100.0
                    } else {
                        0.0
                    },
                    avg_hold_secs: metrics.avg_hold_secs,
                    profitable_avg_hold_secs: metrics.profitable_avg_hold_secs,
                    loss_avg_hold_secs: metrics.loss_avg_hold_secs,
                    closed_ratio_pct: metrics.closed_ratio_pct,
                });
                (
                    scored.total,
                    ScoreDetail {
                        profit_dim: scored.profit_dim,
                        persist_dim: scored.persist_dim,
                        authenticity_dim: scored.authenticity_dim,
                        ..Default::default()
                    },
                )
            }
        };

        if score < self.cfg.min_hunter_score {
            return;
        }

        let hunter = Hunter {
            wallet: wallet.to_string(),
            score,
            score_detail: detail,
            metrics: HunterMetrics {
                win_rate_pct: metrics.win_rate_pct,
                pnl_ratio: metrics.pnl_ratio,
                total_profit_sol: metrics.total_profit_sol,
                avg_roi_pct: metrics.avg_roi_pct,
                max_roi_30d_pct: metrics.max_roi_30d_pct,
                max_roi_60d_pct: metrics.max_roi_60d_pct,
                trade_count: metrics.trade_count,
                dust_count: metrics.dust_count,
                avg_hold_secs: metrics.avg_hold_secs,
            },
            last_active: now,
            last_audit: now,
            source,
        };

        if let InsertOutcome::InsertedWithRoom | InsertOutcome::Evicted { .. } = self.hunter_store.insert(hunter) {
            logger::info(LogTag::Discovery, &format!("hunter {} admitted (score {:.1})", wallet, score));
        }
    }
}

/// Maintenance: periodically re-audit hunters whose `last_audit` is stale,
/// evicting on any failure and notifying the Trader so led positions close.
pub struct Maintenance {
    chain: Arc<dyn Chain>,
    hunter_store: Arc<HunterStore>,
    wallet_trash: WalletLineList,
    cfg: DiscoveryConfig,
    zombie_threshold_secs: i64,
    on_evicted: Box<dyn Fn(&str) + Send + Sync>,
}

impl Maintenance {
    pub fn new(
        chain: Arc<dyn Chain>,
        hunter_store: Arc<HunterStore>,
        wallet_trash_path: std::path::PathBuf,
        cfg: DiscoveryConfig,
        zombie_threshold_secs: i64,
        on_evicted: Box<dyn Fn(&str) + Send + Sync>,
    ) -> Self {
        Self {
            chain,
            hunter_store,
            wallet_trash: WalletLineList::new(wallet_trash_path),
            cfg,
            zombie_threshold_secs,
            on_evicted,
        }
    }

    pub async fn run_cycle(&self, now: i64, audit_expiration_secs: i64) {
        for hunter in self.hunter_store.due_for_reaudit(now, audit_expiration_secs) {
            let audited = audit::audit_wallet(self.chain.as_ref(), &hunter.wallet, &self.cfg, None, now).await;
            match audited {
                Ok(metrics) => self.reaudit_succeeded(&hunter, metrics, now),
                Err(audit::AuditRejection::LpBehaviorDetected) => {
                    let _ = self.wallet_trash.append(&hunter.wallet);
                    self.evict(&hunter.wallet);
                }
                Err(_) => self.evict(&hunter.wallet),
            }
        }

        let evicted = self
            .hunter_store
            .sweep_zombies(now, self.zombie_threshold_secs, self.zombie_threshold_secs);
        for wallet in evicted {
            (self.on_evicted)(&wallet);
        }
    }

    fn reaudit_succeeded(&self, hunter: &Hunter, metrics: audit::AuditMetrics, now: i64) {
        let gate_ok = match hunter.source {
            HunterSource::HotTokenBacktrack => audit::gate_mode_a(&metrics, &self.cfg).is_ok(),
            HunterSource::CuratedList => audit::gate_mode_b(&metrics, &self.cfg, 5, 60.0).is_ok(),
        };
        if !gate_ok {
            self.evict(&hunter.wallet);
            return;
        }

        let score = match hunter.source {
            HunterSource::HotTokenBacktrack => {
                scoring::score_mode_a(scoring::ModeAInputs {
                    win_rate_pct: metrics.win_rate_pct,
                    avg_roi_pct: metrics.avg_roi_pct,
                    pnl_ratio: metrics.pnl_ratio,
                    max_roi_30d_pct: metrics.max_roi_30d_pct,
                    avg_roi_ceiling_pct: 1000.0,
                    pnl_ratio_ceiling: 5.0,
                })
                .total
            }
            HunterSource::CuratedList => {
                scoring::score_mode_b(scoring::ModeBInputs {
                    pnl_ratio: metrics.pnl_ratio,
                    avg_roi_pct: metrics.avg_roi_pct,
                    max_roi_pct: metrics.max_roi_30d_pct,
                    win_rate_pct: metrics.win_rate_pct,
                    avg_hold_secs: metrics.avg_hold_secs,
                    profitable_avg_hold_secs: metrics.profitable_avg_hold_secs,
                    loss_avg_hold_secs: metrics.loss_avg_hold_secs,
                    closed_ratio_pct: metrics.closed_ratio_pct,
                    ..Default::default()
                })
                .total
            }
        };

        let full_metrics = HunterMetrics {
            win_rate_pct: metrics.win_rate_pct,
            pnl_ratio: metrics.pnl_ratio,
            total_profit_sol: metrics.total_profit_sol,
            avg_roi_pct: metrics.avg_roi_pct,
            max_roi_30d_pct: metrics.max_roi_30d_pct,
            max_roi_60d_pct: metrics.max_roi_60d_pct,
            trade_count: metrics.trade_count,
            dust_count: metrics.dust_count,
            avg_hold_secs: metrics.avg_hold_secs,
        };
        self.hunter_store.update_after_audit(&hunter.wallet, score, full_metrics, now);
    }

    fn evict(&self, wallet: &str) {
        if self.hunter_store.evict(wallet).is_some() {
            (self.on_evicted)(wallet);
        }
    }
}
