//! Pure state the Monitor exclusively owns (§3 Ownership): the active
//! holders per mint, the permanent mint blacklist, the resonance-fired set,
//! and the recent-signature dedup cache. Kept free of I/O so the resonance
//! and dedup rules are unit-testable without a live chain.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

struct MintHolders {
    first_buyer: String,
    first_buy_price: f64,
    holders: HashMap<String, i64>,
}

struct Inner {
    holdings: HashMap<String, MintHolders>,
    blacklisted: HashSet<String>,
    resonance_emitted: HashSet<String>,
}

/// Per-mint holder tracking, first-buyer/first-price snapshot, the
/// permanent blacklist, and the once-only resonance-emitted set (§4.6
/// steps 4-6).
pub struct ActiveHoldings {
    inner: Mutex<Inner>,
}

impl ActiveHoldings {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                holdings: HashMap::new(),
                blacklisted: HashSet::new(),
                resonance_emitted: HashSet::new(),
            }),
        }
    }

    /// Record a BUY: first holder for the mint becomes `first_buyer` with
    /// `first_buy_price` captured at this moment; every holder is tracked.
    pub fn record_buy_with_price(&self, mint: &str, hunter: &str, now: i64, price_sol: f64) {
        let mut inner = self.inner.lock();
        let entry = inner.holdings.entry(mint.to_string()).or_insert_with(|| MintHolders {
            first_buyer: hunter.to_string(),
            first_buy_price: price_sol,
            holders: HashMap::new(),
        });
        entry.holders.insert(hunter.to_string(), now);
    }

    /// Record a SELL: removes `hunter` as a holder. Returns `true` if this
    /// departure permanently blacklists the mint (departing holder was the
    /// first buyer and resonance never fired, §4.6 step 5).
    pub fn record_sell(&self, mint: &str, hunter: &str) -> bool {
        let mut inner = self.inner.lock();
        let Some(entry) = inner.holdings.get_mut(mint) else { return false };
        entry.holders.remove(hunter);

        if entry.first_buyer == hunter && !inner.resonance_emitted.contains(mint) {
            inner.blacklisted.insert(mint.to_string());
            inner.holdings.remove(mint);
            return true;
        }
        false
    }

    pub fn first_buyer(&self, mint: &str) -> Option<String> {
        self.inner.lock().holdings.get(mint).map(|h| h.first_buyer.clone())
    }

    pub fn first_buy_price(&self, mint: &str) -> Option<f64> {
        self.inner.lock().holdings.get(mint).map(|h| h.first_buy_price)
    }

    pub fn is_active_holder(&self, mint: &str, hunter: &str) -> bool {
        self.inner.lock().holdings.get(mint).map(|h| h.holders.contains_key(hunter)).unwrap_or(false)
    }

    pub fn is_blacklisted(&self, mint: &str) -> bool {
        self.inner.lock().blacklisted.contains(mint)
    }

    pub fn resonance_already_emitted(&self, mint: &str) -> bool {
        self.inner.lock().resonance_emitted.contains(mint)
    }

    /// Mark resonance fired for `mint`. Returns `false` if it was already
    /// marked (so the caller never double-emits).
    pub fn mark_resonance_emitted(&self, mint: &str) -> bool {
        self.inner.lock().resonance_emitted.insert(mint.to_string())
    }

    pub fn tracked_mints(&self) -> Vec<String> {
        self.inner.lock().holdings.keys().cloned().collect()
    }

    /// Drop `mint`'s holdings entry if every holder's last activity is
    /// older than `ttl_secs` (§4.6 step 7). Returns whether it was pruned.
    pub fn prune_if_stale(&self, mint: &str, now: i64, ttl_secs: i64) -> bool {
        let mut inner = self.inner.lock();
        let stale = match inner.holdings.get(mint) {
            Some(entry) => entry.holders.values().all(|ts| now - ts >= ttl_secs),
            None => false,
        };
        if stale {
            inner.holdings.remove(mint);
        }
        stale
    }
}

impl Default for ActiveHoldings {
    fn default() -> Self {
        Self::new()
    }
}

/// Recently-seen signature set with a TTL, so the same signature observed
/// across overlapping WS frames (or resubscriptions) is processed once
/// (§4.6 step 2). Monitor-exclusively-owned, not shared with other tasks.
pub struct SignatureDedupCache {
    seen: Mutex<HashMap<String, i64>>,
}

impl SignatureDedupCache {
    pub fn new() -> Self {
        Self { seen: Mutex::new(HashMap::new()) }
    }

    /// Returns `true` the first time `sig` is observed within the TTL
    /// window, `false` on a repeat. Expired entries are swept opportunistically.
    pub fn observe(&self, sig: &str, now: i64, ttl_secs: i64) -> bool {
        let mut seen = self.seen.lock();
        seen.retain(|_, ts| now - *ts < ttl_secs);
        if seen.contains_key(sig) {
            return false;
        }
        seen.insert(sig.to_string(), now);
        true
    }
}

impl Default for SignatureDedupCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_buyer_departure_before_resonance_blacklists_mint() {
        let holdings = ActiveHoldings::new();
        holdings.record_buy_with_price("MINT", "lead", 100, 1.0);
        holdings.record_buy_with_price("MINT", "follower", 110, 1.0);

        let blacklisted = holdings.record_sell("MINT", "lead");
        assert!(blacklisted);
        assert!(holdings.is_blacklisted("MINT"));
        assert_eq!(holdings.first_buyer("MINT"), None);
    }

    #[test]
    fn follower_departure_does_not_blacklist() {
        let holdings = ActiveHoldings::new();
        holdings.record_buy_with_price("MINT", "lead", 100, 1.0);
        holdings.record_buy_with_price("MINT", "follower", 110, 1.0);

        let blacklisted = holdings.record_sell("MINT", "follower");
        assert!(!blacklisted);
        assert!(!holdings.is_blacklisted("MINT"));
        assert!(holdings.is_active_holder("MINT", "lead"));
    }

    #[test]
    fn first_buyer_departure_after_resonance_does_not_blacklist() {
        let holdings = ActiveHoldings::new();
        holdings.record_buy_with_price("MINT", "lead", 100, 1.0);
        holdings.mark_resonance_emitted("MINT");

        let blacklisted = holdings.record_sell("MINT", "lead");
        assert!(!blacklisted);
        assert!(!holdings.is_blacklisted("MINT"));
    }

    #[test]
    fn resonance_emitted_only_once() {
        let holdings = ActiveHoldings::new();
        assert!(holdings.mark_resonance_emitted("MINT"));
        assert!(!holdings.mark_resonance_emitted("MINT"));
    }

    #[test]
    fn stale_holdings_are_pruned() {
        let holdings = ActiveHoldings::new();
        holdings.record_buy_with_price("MINT", "lead", 100, 1.0);
        assert!(!holdings.prune_if_stale("MINT", 1_000, 7_200));
        assert!(holdings.prune_if_stale("MINT", 10_000, 7_200));
        assert!(holdings.first_buyer("MINT").is_none());
    }

    #[test]
    fn dedup_cache_rejects_repeat_within_ttl() {
        let cache = SignatureDedupCache::new();
        assert!(cache.observe("sig1", 100, 90));
        assert!(!cache.observe("sig1", 150, 90));
        assert!(cache.observe("sig1", 300, 90));
    }
}
