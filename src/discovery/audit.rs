//! Discovery audit: frequency precheck, LP detection, per-mint project
//! aggregation, and the metric computation both Mode A and Mode B gate on
//! (§4.5 Audit). Network I/O (fetching signatures/parsed txs) is kept to a
//! thin shell around these pure functions so the math can be unit tested
//! without a live chain.

use crate::config::DiscoveryConfig;
use crate::rpc::{Chain, ParsedTransaction};
use crate::tx::{attribution, parser};
use std::collections::HashMap;

/// Why an audit rejected a wallet outright, before any scoring happens.
#[derive(Debug, Clone, PartialEq)]
pub enum AuditRejection {
    FrequencyFailed { failure_rate: f64, successful_count: usize, avg_interval_secs: f64 },
    LpBehaviorDetected,
    NoQualifyingProject,
    MetricsBelowFloor(String),
}

#[derive(Debug, Clone, Default)]
pub struct AuditMetrics {
    pub win_rate_pct: f64,
    pub pnl_ratio: f64,
    pub total_profit_sol: f64,
    pub avg_roi_pct: f64,
    pub max_roi_30d_pct: f64,
    pub max_roi_60d_pct: f64,
    pub trade_count: u32,
    pub dust_count: u32,
    pub avg_hold_secs: f64,
    pub profitable_avg_hold_secs: f64,
    pub loss_avg_hold_secs: f64,
    pub closed_ratio_pct: f64,
}

#[derive(Debug, Clone, Default)]
struct Project {
    buy_sol: f64,
    sell_sol: f64,
    tokens_bought: f64,
    tokens_sold: f64,
    first_ts: i64,
    last_ts: i64,
}

/// Frequency precheck: reject if failure_rate >= 30%, successful_count < 10,
/// or the average interval between successful txs is below the floor.
pub fn frequency_check(
    entries: &[(i64, bool)],
    min_successful: usize,
    max_failure_rate: f64,
    min_avg_interval_secs: f64,
) -> Result<(), AuditRejection> {
    if entries.is_empty() {
        return Err(AuditRejection::FrequencyFailed {
            failure_rate: 1.0,
            successful_count: 0,
            avg_interval_secs: 0.0,
        });
    }

    let failures = entries.iter().filter(|(_, failed)| *failed).count();
    let failure_rate = failures as f64 / entries.len() as f64;

    let mut successful_ts: Vec<i64> = entries
        .iter()
        .filter(|(_, failed)| !*failed)
        .map(|(ts, _)| *ts)
        .collect();
    successful_ts.sort_unstable();

    let avg_interval = if successful_ts.len() >= 2 {
        let span = (successful_ts.last().unwrap() - successful_ts.first().unwrap()) as f64;
        span / (successful_ts.len() - 1) as f64
    } else {
        f64::INFINITY
    };

    if failure_rate >= max_failure_rate
        || successful_ts.len() < min_successful
        || avg_interval < min_avg_interval_secs
    {
        return Err(AuditRejection::FrequencyFailed {
            failure_rate,
            successful_count: successful_ts.len(),
            avg_interval_secs: if avg_interval.is_finite() { avg_interval } else { 0.0 },
        });
    }

    Ok(())
}

/// LP behavior: any tx whose description/type mentions add/remove/withdraw/
/// deposit of liquidity or a pool, case-insensitive.
pub fn detect_lp_behavior(txs: &[ParsedTransaction]) -> bool {
    txs.iter().any(|tx| {
        let haystack = format!("{} {}", tx.description, tx.tx_type).to_uppercase();
        let mentions_liquidity_or_pool = haystack.contains("LIQUIDITY") || haystack.contains("POOL");
        let mentions_action = haystack.contains("ADD")
            || haystack.contains("REMOVE")
            || haystack.contains("WITHDRAW")
            || haystack.contains("DEPOSIT");
        mentions_liquidity_or_pool && mentions_action
    })
}

fn build_projects(wallet: &str, txs: &[ParsedTransaction], usdc_per_sol: Option<f64>) -> HashMap<String, Project> {
    let mut projects: HashMap<String, Project> = HashMap::new();

    for tx in txs {
        if tx.err.is_some() {
            continue;
        }
        let effect = parser::parse_wallet_effect(tx, wallet, usdc_per_sol);
        let attribution = attribution::attribute(effect.sol_change, &effect.token_changes);

        for (mint, sol) in &attribution.buy_sol {
            let project = projects.entry(mint.clone()).or_default();
            project.buy_sol += sol;
            project.tokens_bought += effect.token_changes.get(mint).copied().unwrap_or(0.0).max(0.0);
            if project.first_ts == 0 || effect.timestamp < project.first_ts {
                project.first_ts = effect.timestamp;
            }
            project.last_ts = project.last_ts.max(effect.timestamp);
        }
        for (mint, sol) in &attribution.sell_sol {
            let project = projects.entry(mint.clone()).or_default();
            project.sell_sol += sol;
            project.tokens_sold += effect.token_changes.get(mint).copied().unwrap_or(0.0).abs();
            if project.first_ts == 0 || effect.timestamp < project.first_ts {
                project.first_ts = effect.timestamp;
            }
            project.last_ts = project.last_ts.max(effect.timestamp);
        }
    }

    projects
}

/// Compute aggregate metrics over qualifying projects (buy_sol > 0.05 SOL).
fn compute_metrics(projects: &HashMap<String, Project>, now: i64) -> Result<AuditMetrics, AuditRejection> {
    let qualifying: Vec<&Project> = projects.values().filter(|p| p.buy_sol > 0.05).collect();
    if qualifying.is_empty() {
        return Err(AuditRejection::NoQualifyingProject);
    }

    let mut wins = 0usize;
    let mut closed = 0usize;
    let mut roi_sum = 0.0;
    let mut max_roi_30d: f64 = 0.0;
    let mut max_roi_60d: f64 = 0.0;
    let mut total_buy = 0.0;
    let mut total_sell = 0.0;
    let mut dust_count = 0u32;
    let mut hold_secs_sum = 0.0;
    let mut profitable_hold_sum = 0.0;
    let mut profitable_hold_count = 0usize;
    let mut loss_hold_sum = 0.0;
    let mut loss_hold_count = 0usize;

    const THIRTY_DAYS: i64 = 30 * 86_400;
    const SIXTY_DAYS: i64 = 60 * 86_400;

    for project in &qualifying {
        total_buy += project.buy_sol;
        total_sell += project.sell_sol;

        if project.buy_sol < 0.01 {
            dust_count += 1;
        }

        let roi_pct = if project.buy_sol > 0.0 {
            (project.sell_sol - project.buy_sol) / project.buy_sol * 100.0
        } else {
            0.0
        };
        roi_sum += roi_pct;

        if now - project.first_ts <= THIRTY_DAYS {
            max_roi_30d = max_roi_30d.max(roi_pct);
        }
        if now - project.first_ts <= SIXTY_DAYS {
            max_roi_60d = max_roi_60d.max(roi_pct);
        }

        let is_closed = project.tokens_bought > 0.0 && project.tokens_sold >= project.tokens_bought * 0.95;
        if is_closed {
            closed += 1;
            let hold = (project.last_ts - project.first_ts).max(0) as f64;
            hold_secs_sum += hold;
            let profitable = project.sell_sol > project.buy_sol;
            if profitable {
                wins += 1;
                profitable_hold_sum += hold;
                profitable_hold_count += 1;
            } else {
                loss_hold_sum += hold;
                loss_hold_count += 1;
            }
        }
    }

    let win_rate_pct = if closed > 0 { wins as f64 / closed as f64 * 100.0 } else { 0.0 };
    let avg_roi_pct = roi_sum / qualifying.len() as f64;
    let pnl_ratio = if total_buy > 0.0 { total_sell / total_buy } else { f64::INFINITY };
    let total_profit_sol = total_sell - total_buy;
    let avg_hold_secs = if closed > 0 { hold_secs_sum / closed as f64 } else { 0.0 };
    let profitable_avg_hold_secs = if profitable_hold_count > 0 {
        profitable_hold_sum / profitable_hold_count as f64
    } else {
        0.0
    };
    let loss_avg_hold_secs = if loss_hold_count > 0 { loss_hold_sum / loss_hold_count as f64 } else { 0.0 };
    let closed_ratio_pct = closed as f64 / qualifying.len() as f64 * 100.0;

    Ok(AuditMetrics {
        win_rate_pct,
        pnl_ratio,
        total_profit_sol,
        avg_roi_pct,
        max_roi_30d_pct: max_roi_30d,
        max_roi_60d_pct: max_roi_60d,
        trade_count: qualifying.len() as u32,
        dust_count,
        avg_hold_secs,
        profitable_avg_hold_secs,
        loss_avg_hold_secs,
        closed_ratio_pct,
    })
}

/// Mode A acceptance: pnl_ratio >= 2, win_rate >= 20%, trade_count >= 10,
/// total_profit > 0, max_roi_30d >= TIER_THREE_ROI (default 50%).
pub fn gate_mode_a(metrics: &AuditMetrics, cfg: &DiscoveryConfig) -> Result<(), AuditRejection> {
    if metrics.pnl_ratio < cfg.min_pnl_ratio {
        return Err(AuditRejection::MetricsBelowFloor("pnl_ratio".into()));
    }
    if metrics.win_rate_pct < cfg.min_win_rate_pct {
        return Err(AuditRejection::MetricsBelowFloor("win_rate_pct".into()));
    }
    if metrics.trade_count < cfg.min_trade_count {
        return Err(AuditRejection::MetricsBelowFloor("trade_count".into()));
    }
    if metrics.total_profit_sol <= 0.0 {
        return Err(AuditRejection::MetricsBelowFloor("total_profit_sol".into()));
    }
    if metrics.max_roi_30d_pct < cfg.tier_three_roi_pct {
        return Err(AuditRejection::MetricsBelowFloor("max_roi_30d_pct".into()));
    }
    Ok(())
}

/// Mode B acceptance additionally requires a low dust ratio and a minimum
/// average hold time (filters out instant flips / airdrop-farming wallets).
pub fn gate_mode_b(
    metrics: &AuditMetrics,
    cfg: &DiscoveryConfig,
    max_dust_count: u32,
    min_avg_hold_secs: f64,
) -> Result<(), AuditRejection> {
    if metrics.dust_count >= max_dust_count {
        return Err(AuditRejection::MetricsBelowFloor("dust_count".into()));
    }
    if metrics.avg_hold_secs <= min_avg_hold_secs {
        return Err(AuditRejection::MetricsBelowFloor("avg_hold_secs".into()));
    }
    if metrics.trade_count < cfg.min_trade_count {
        return Err(AuditRejection::MetricsBelowFloor("trade_count".into()));
    }
    Ok(())
}

/// Fetch up to `audit_tx_limit` signatures for `wallet`, bulk-fetch parsed
/// transactions, and reduce them to metrics. Pure gating is left to the
/// caller so Mode A / Mode B can apply their own thresholds.
pub async fn audit_wallet(
    chain: &dyn Chain,
    wallet: &str,
    cfg: &DiscoveryConfig,
    usdc_per_sol: Option<f64>,
    now: i64,
) -> Result<AuditMetrics, AuditRejection> {
    let mut signatures = Vec::new();
    let mut before: Option<String> = None;
    while signatures.len() < cfg.audit_tx_limit {
        let page_limit = (cfg.audit_tx_limit - signatures.len()).min(1000);
        let page = chain
            .signatures_for_address(wallet, before.clone(), page_limit)
            .await
            .map_err(|_| AuditRejection::FrequencyFailed {
                failure_rate: 1.0,
                successful_count: 0,
                avg_interval_secs: 0.0,
            })?;
        if page.is_empty() {
            break;
        }
        before = page.last().map(|(sig, _)| sig.clone());
        let exhausted = page.len() < page_limit;
        signatures.extend(page);
        if exhausted {
            break;
        }
    }

    if signatures.is_empty() {
        return Err(AuditRejection::FrequencyFailed {
            failure_rate: 1.0,
            successful_count: 0,
            avg_interval_secs: 0.0,
        });
    }

    let sig_strings: Vec<String> = signatures.iter().map(|(sig, _)| sig.clone()).collect();
    let txs = chain
        .parsed_transactions_bulk(&sig_strings)
        .await
        .map_err(|_| AuditRejection::FrequencyFailed {
            failure_rate: 1.0,
            successful_count: 0,
            avg_interval_secs: 0.0,
        })?;

    let entries: Vec<(i64, bool)> = txs.iter().map(|tx| (tx.timestamp, tx.err.is_some())).collect();
    frequency_check(
        &entries,
        cfg.min_successful_tx_for_frequency,
        cfg.max_failure_rate_for_frequency,
        cfg.min_avg_interval_secs,
    )?;

    if detect_lp_behavior(&txs) {
        return Err(AuditRejection::LpBehaviorDetected);
    }

    let projects = build_projects(wallet, &txs, usdc_per_sol);
    compute_metrics(&projects, now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frequency_check_rejects_high_failure_rate() {
        let entries: Vec<(i64, bool)> = (0..20).map(|i| (i * 1000, i % 2 == 0)).collect();
        let result = frequency_check(&entries, 10, 0.30, 300.0);
        assert!(matches!(result, Err(AuditRejection::FrequencyFailed { .. })));
    }

    #[test]
    fn frequency_check_rejects_too_few_successes() {
        let entries: Vec<(i64, bool)> = vec![(0, false), (400, false), (800, true)];
        let result = frequency_check(&entries, 10, 0.30, 300.0);
        assert!(matches!(result, Err(AuditRejection::FrequencyFailed { .. })));
    }

    #[test]
    fn frequency_check_rejects_tight_interval() {
        let entries: Vec<(i64, bool)> = (0..15).map(|i| (i * 10, false)).collect();
        let result = frequency_check(&entries, 10, 0.30, 300.0);
        assert!(result.is_err());
    }

    #[test]
    fn frequency_check_passes_healthy_wallet() {
        let entries: Vec<(i64, bool)> = (0..15).map(|i| (i * 400, i == 0)).collect();
        let result = frequency_check(&entries, 10, 0.30, 300.0);
        assert!(result.is_ok());
    }

    #[test]
    fn lp_behavior_detects_liquidity_remove() {
        let tx = ParsedTransaction {
            signature: "s".into(),
            timestamp: 0,
            native_transfers: vec![],
            token_transfers: vec![],
            description: "Remove Liquidity from pool".into(),
            tx_type: "UNKNOWN".into(),
            fee_payer: "w".into(),
            err: None,
        };
        assert!(detect_lp_behavior(&[tx]));
    }

    #[test]
    fn lp_behavior_false_for_ordinary_swap() {
        let tx = ParsedTransaction {
            signature: "s".into(),
            timestamp: 0,
            native_transfers: vec![],
            token_transfers: vec![],
            description: "Swap 1 SOL for token".into(),
            tx_type: "SWAP".into(),
            fee_payer: "w".into(),
            err: None,
        };
        assert!(!detect_lp_behavior(&[tx]));
    }

    #[test]
    fn gate_mode_a_rejects_below_floor_pnl_ratio() {
        let cfg = DiscoveryConfig::default();
        let metrics = AuditMetrics {
            pnl_ratio: 1.0,
            win_rate_pct: 50.0,
            trade_count: 20,
            total_profit_sol: 5.0,
            max_roi_30d_pct: 100.0,
            ..Default::default()
        };
        assert!(gate_mode_a(&metrics, &cfg).is_err());
    }

    #[test]
    fn gate_mode_a_accepts_healthy_metrics() {
        let cfg = DiscoveryConfig::default();
        let metrics = AuditMetrics {
            pnl_ratio: 3.0,
            win_rate_pct: 50.0,
            trade_count: 20,
            total_profit_sol: 5.0,
            max_roi_30d_pct: 100.0,
            ..Default::default()
        };
        assert!(gate_mode_a(&metrics, &cfg).is_ok());
    }
}
