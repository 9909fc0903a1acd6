//! RiskGate (§4.10): deny-by-default safety gate consulted before every
//! ENTRY. The external `TokenSafetyOracle` capability is a trait so tests can
//! inject canned responses instead of hitting a live safety API.

use crate::config::RiskGateConfig;
use crate::key_pool::KeyPool;
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct RiskLevel {
    pub name: String,
    pub level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HolderInfo {
    pub owner: String,
    pub pct: f64,
    pub is_lp: bool,
}

/// Response shape of the external token-safety provider.
#[derive(Debug, Clone, Deserialize)]
pub struct SafetyReport {
    pub score: f64,
    pub mint_authority: Option<String>,
    pub freeze_authority: Option<String>,
    pub risks: Vec<RiskLevel>,
    pub top_holders: Vec<HolderInfo>,
    pub markets: Vec<String>,
    pub liquidity_usd: f64,
    pub fdv_usd: f64,
    pub buy_tax_pct: f64,
    pub lp_locked_pct: f64,
    pub has_twitter: bool,
    pub has_telegram: bool,
}

#[derive(Debug, Clone)]
pub enum RiskGateError {
    OracleUnavailable(String),
}

impl std::fmt::Display for RiskGateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskGateError::OracleUnavailable(msg) => write!(f, "safety oracle request failed: {}", msg),
        }
    }
}

impl std::error::Error for RiskGateError {}

#[async_trait]
pub trait TokenSafetyOracle: Send + Sync {
    async fn safety_report(&self, mint: &str) -> Result<SafetyReport, RiskGateError>;
}

/// Default `TokenSafetyOracle`: a single `GET {base_url}/tokens/{mint}/report`
/// against the configured safety provider, with key rotation on 429 (§4.1
/// same KeyPool pattern as `PriceOracle`).
pub struct HttpTokenSafetyOracle {
    http: reqwest::Client,
    base_url: String,
    keys: KeyPool,
}

impl HttpTokenSafetyOracle {
    pub fn new(base_url: impl Into<String>, keys: Vec<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            keys: KeyPool::new(keys),
        }
    }
}

#[async_trait]
impl TokenSafetyOracle for HttpTokenSafetyOracle {
    async fn safety_report(&self, mint: &str) -> Result<SafetyReport, RiskGateError> {
        let url = format!("{}/tokens/{}/report", self.base_url, mint);
        let mut last_err = String::new();

        for _ in 0..3 {
            let mut req = self.http.get(&url);
            if let Some(key) = self.keys.current() {
                req = req.header("Authorization", format!("Bearer {}", key));
            }

            match req.send().await {
                Ok(resp) if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS => {
                    self.keys.mark_failed();
                    continue;
                }
                Ok(resp) if resp.status().is_success() => {
                    return resp.json().await.map_err(|e| RiskGateError::OracleUnavailable(e.to_string()));
                }
                Ok(resp) => last_err = format!("safety provider returned {}", resp.status()),
                Err(e) => last_err = e.to_string(),
            }
        }

        Err(RiskGateError::OracleUnavailable(last_err))
    }
}

/// Why a mint was denied entry, for logging (§7: "Safety-gate deny: silent
/// at trigger site, logged").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    SafetyScoreTooHigh,
    MintAuthorityNotRenounced,
    FreezeAuthorityNotRenounced,
    DangerRisk(String),
    HoneypotRisk(String),
    BuyTaxTooHigh,
    LiquidityTooLow,
    FdvTooHigh,
    LiquidityToFdvTooLow,
    LpLockedTooLow,
    Top2To10HoldersTooConcentrated,
    SingleHolderTooConcentrated,
    MissingSocialLinks,
}

pub struct RiskGate<O: TokenSafetyOracle> {
    oracle: O,
    cfg: RiskGateConfig,
}

impl<O: TokenSafetyOracle> RiskGate<O> {
    pub fn new(oracle: O, cfg: RiskGateConfig) -> Self {
        Self { oracle, cfg }
    }

    pub async fn check(&self, mint: &str) -> Result<Result<(), DenyReason>, RiskGateError> {
        if !self.cfg.enabled {
            return Ok(Ok(()));
        }
        let report = self.oracle.safety_report(mint).await?;
        Ok(evaluate(&report, &self.cfg))
    }
}

/// Pure evaluation of a fetched report against the configured thresholds, so
/// the deny logic is unit-testable without a live oracle.
pub fn evaluate(report: &SafetyReport, cfg: &RiskGateConfig) -> Result<(), DenyReason> {
    if report.score > cfg.safety_score_ceiling {
        return Err(DenyReason::SafetyScoreTooHigh);
    }
    if report.mint_authority.is_some() {
        return Err(DenyReason::MintAuthorityNotRenounced);
    }
    if report.freeze_authority.is_some() {
        return Err(DenyReason::FreezeAuthorityNotRenounced);
    }
    for risk in &report.risks {
        if risk.level.eq_ignore_ascii_case("danger") {
            return Err(DenyReason::DangerRisk(risk.name.clone()));
        }
        let lowered = risk.name.to_lowercase();
        if lowered.contains("honeypot") || lowered.contains("unsellable") {
            return Err(DenyReason::HoneypotRisk(risk.name.clone()));
        }
    }
    if report.buy_tax_pct > cfg.max_buy_tax_pct {
        return Err(DenyReason::BuyTaxTooHigh);
    }
    if report.liquidity_usd < cfg.min_liquidity_usd {
        return Err(DenyReason::LiquidityTooLow);
    }
    if report.fdv_usd > cfg.max_fdv_usd {
        return Err(DenyReason::FdvTooHigh);
    }
    let liquidity_to_fdv_pct = if report.fdv_usd > 0.0 { report.liquidity_usd / report.fdv_usd * 100.0 } else { 0.0 };
    if liquidity_to_fdv_pct < cfg.min_liquidity_to_fdv_pct {
        return Err(DenyReason::LiquidityToFdvTooLow);
    }
    if report.lp_locked_pct < cfg.min_lp_locked_pct {
        return Err(DenyReason::LpLockedTooLow);
    }

    let non_lp: Vec<&HolderInfo> = report.top_holders.iter().filter(|h| !h.is_lp).collect();
    let mut sorted = non_lp.clone();
    sorted.sort_by(|a, b| b.pct.partial_cmp(&a.pct).unwrap_or(std::cmp::Ordering::Equal));
    let top_2_10_pct: f64 = sorted.iter().skip(1).take(9).map(|h| h.pct).sum();
    if top_2_10_pct > cfg.max_top_2_10_holders_pct {
        return Err(DenyReason::Top2To10HoldersTooConcentrated);
    }
    if non_lp.iter().any(|h| h.pct > cfg.max_single_holder_pct) {
        return Err(DenyReason::SingleHolderTooConcentrated);
    }

    if cfg.require_social_link && !report.has_twitter && !report.has_telegram {
        return Err(DenyReason::MissingSocialLinks);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn healthy_report() -> SafetyReport {
        SafetyReport {
            score: 100.0,
            mint_authority: None,
            freeze_authority: None,
            risks: vec![],
            top_holders: vec![
                HolderInfo { owner: "lp".into(), pct: 50.0, is_lp: true },
                HolderInfo { owner: "a".into(), pct: 5.0, is_lp: false },
                HolderInfo { owner: "b".into(), pct: 4.0, is_lp: false },
            ],
            markets: vec!["raydium".into()],
            liquidity_usd: 50_000.0,
            fdv_usd: 500_000.0,
            buy_tax_pct: 0.0,
            lp_locked_pct: 100.0,
            has_twitter: true,
            has_telegram: false,
        }
    }

    #[test]
    fn accepts_healthy_report() {
        let cfg = RiskGateConfig::default();
        assert!(evaluate(&healthy_report(), &cfg).is_ok());
    }

    #[test]
    fn denies_active_mint_authority() {
        let cfg = RiskGateConfig::default();
        let mut report = healthy_report();
        report.mint_authority = Some("authority".into());
        assert_eq!(evaluate(&report, &cfg), Err(DenyReason::MintAuthorityNotRenounced));
    }

    #[test]
    fn denies_missing_social_links() {
        let cfg = RiskGateConfig::default();
        let mut report = healthy_report();
        report.has_twitter = false;
        report.has_telegram = false;
        assert_eq!(evaluate(&report, &cfg), Err(DenyReason::MissingSocialLinks));
    }

    #[test]
    fn denies_concentrated_single_holder() {
        let cfg = RiskGateConfig::default();
        let mut report = healthy_report();
        report.top_holders.push(HolderInfo { owner: "whale".into(), pct: 15.0, is_lp: false });
        assert_eq!(evaluate(&report, &cfg), Err(DenyReason::SingleHolderTooConcentrated));
    }

    #[test]
    fn denies_honeypot_risk_regardless_of_level() {
        let cfg = RiskGateConfig::default();
        let mut report = healthy_report();
        report.risks.push(RiskLevel { name: "Honeypot detected".into(), level: "warning".into() });
        assert!(matches!(evaluate(&report, &cfg), Err(DenyReason::HoneypotRisk(_))));
    }
}
