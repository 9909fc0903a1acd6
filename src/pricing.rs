//! PriceOracle: multi-source token price in SOL and USD.
//!
//! Two GET endpoints on the configured price provider: `/price` (spot price,
//! optionally with liquidity) and `/market-data` (scaled UI amounts). A small
//! in-memory cache with a freshness window avoids hammering the provider on
//! every PnL check; `fresh_price` bypasses the cache entirely and is what
//! Trader's stop-loss sanity check uses as its second opinion.

use crate::errors::ScreenerBotError;
use crate::key_pool::KeyPool;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

const CACHE_FRESHNESS: Duration = Duration::from_secs(5);
const SOL_MINT: &str = "So11111111111111111111111111111111111111112";

#[derive(Debug, Clone)]
pub struct TokenPrice {
    pub price_sol: f64,
    pub price_usd: f64,
    pub liquidity_usd: Option<f64>,
}

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    price: f64,
    fetched_at: Instant,
}

#[derive(Deserialize)]
struct JupiterPriceEntry {
    #[serde(rename = "usdPrice")]
    usd_price: f64,
}

#[derive(Deserialize)]
struct JupiterPriceResponse {
    #[serde(flatten)]
    prices: HashMap<String, JupiterPriceEntry>,
}

pub struct PriceOracle {
    keys: KeyPool,
    base_url: String,
    http: reqwest::Client,
    cache: RwLock<HashMap<String, CacheEntry>>,
}

static SOL_USD_CACHE: Lazy<RwLock<Option<CacheEntry>>> = Lazy::new(|| RwLock::new(None));

impl PriceOracle {
    pub fn new(base_url: impl Into<String>, keys: Vec<String>) -> Self {
        Self {
            keys: KeyPool::new(keys),
            base_url: base_url.into(),
            http: reqwest::Client::new(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Token price in SOL and USD, served from cache if fresher than
    /// `CACHE_FRESHNESS`.
    pub async fn price(&self, mint: &str) -> Result<TokenPrice, ScreenerBotError> {
        if let Some(cached) = self.cached_usd(mint) {
            let sol_usd = self.sol_usd_price().await?;
            return Ok(TokenPrice {
                price_sol: if sol_usd > 0.0 { cached / sol_usd } else { 0.0 },
                price_usd: cached,
                liquidity_usd: None,
            });
        }
        self.fresh_price(mint).await
    }

    /// Bypass the cache entirely. Used as the second-opinion read for
    /// stop-loss sanity checks.
    pub async fn fresh_price(&self, mint: &str) -> Result<TokenPrice, ScreenerBotError> {
        let usd_price = self.fetch_usd_price(mint).await?;
        self.cache.write().unwrap_or_else(|e| e.into_inner()).insert(
            mint.to_string(),
            CacheEntry {
                price: usd_price,
                fetched_at: Instant::now(),
            },
        );

        let sol_usd = self.sol_usd_price().await?;
        Ok(TokenPrice {
            price_sol: if sol_usd > 0.0 { usd_price / sol_usd } else { 0.0 },
            price_usd: usd_price,
            liquidity_usd: None,
        })
    }

    /// Current SOL/USD rate, itself read through the same provider (the
    /// wrapped-SOL mint priced in USD).
    pub async fn sol_usd_price(&self) -> Result<f64, ScreenerBotError> {
        if let Some(entry) = *SOL_USD_CACHE.read().unwrap_or_else(|e| e.into_inner()) {
            if entry.fetched_at.elapsed() < CACHE_FRESHNESS {
                return Ok(entry.price);
            }
        }
        let price = self.fetch_usd_price(SOL_MINT).await?;
        *SOL_USD_CACHE.write().unwrap_or_else(|e| e.into_inner()) = Some(CacheEntry {
            price,
            fetched_at: Instant::now(),
        });
        Ok(price)
    }

    fn cached_usd(&self, mint: &str) -> Option<f64> {
        let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
        cache.get(mint).and_then(|entry| {
            (entry.fetched_at.elapsed() < CACHE_FRESHNESS).then_some(entry.price)
        })
    }

    async fn fetch_usd_price(&self, mint: &str) -> Result<f64, ScreenerBotError> {
        let mut last_err = String::new();

        for _ in 0..3 {
            let key = self.keys.current().unwrap_or_default().to_string();
            let mut url = format!("{}?ids={}", self.base_url, mint);
            if !key.is_empty() {
                url.push_str(&format!("&api-key={}", key));
            }

            match self.http.get(&url).send().await {
                Ok(resp) if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS => {
                    self.keys.mark_failed();
                    continue;
                }
                Ok(resp) if resp.status().is_success() => {
                    let parsed: JupiterPriceResponse = resp.json().await.map_err(ScreenerBotError::from)?;
                    return Ok(parsed
                        .prices
                        .get(mint)
                        .map(|e| e.usd_price)
                        .unwrap_or(0.0));
                }
                Ok(resp) => last_err = format!("price provider returned {}", resp.status()),
                Err(e) => last_err = e.to_string(),
            }
        }

        Err(ScreenerBotError::transient("price_oracle", last_err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oracle_starts_with_empty_cache() {
        let oracle = PriceOracle::new("https://example.invalid/price", vec!["k1".into()]);
        assert!(oracle.cached_usd(SOL_MINT).is_none());
    }
}
