//! Hunter & HunterPool: the durable record of a wallet with demonstrable
//! on-chain alpha, and the bounded pool that holds them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which discovery strategy produced this hunter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HunterSource {
    /// Mode A: hot-token backtrack.
    HotTokenBacktrack,
    /// Mode B: curated wallet list.
    CuratedList,
}

/// Per-dimension scoring breakdown, kept numeric so formatted strings
/// ("∞", "150%") are derived at render time instead of persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreDetail {
    pub profit_dim: f64,
    pub persist_dim: f64,
    pub authenticity_dim: f64,
    pub win_rate_component: f64,
    pub roi_component: f64,
    pub pnl_ratio_component: f64,
}

/// Aggregate performance metrics reconstructed by Discovery's audit step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HunterMetrics {
    pub win_rate_pct: f64,
    pub pnl_ratio: f64,
    pub total_profit_sol: f64,
    pub avg_roi_pct: f64,
    pub max_roi_30d_pct: f64,
    pub max_roi_60d_pct: f64,
    pub trade_count: u32,
    pub dust_count: u32,
    pub avg_hold_secs: f64,
}

/// A wallet selected by Discovery and tracked by Monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hunter {
    pub wallet: String,
    pub score: f64,
    pub score_detail: ScoreDetail,
    pub metrics: HunterMetrics,
    /// Unix seconds of the last on-chain activity Monitor observed.
    pub last_active: i64,
    /// Unix seconds of the last successful Discovery/Maintenance audit.
    pub last_audit: i64,
    pub source: HunterSource,
}

impl Hunter {
    pub fn is_brand_new(&self, now: i64, grace_secs: i64) -> bool {
        now - self.last_audit < grace_secs
    }
}

/// Bounded wallet→Hunter mapping with lowest-score eviction on insert.
///
/// Invariant: `|pool| <= limit`. A hunter is either in the pool or in the
/// trash set (enforced by `HunterStore`, not here), never both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HunterPool {
    pub hunters: HashMap<String, Hunter>,
    pub limit: usize,
}

/// Outcome of attempting to insert a hunter into an at-capacity pool.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    /// Pool had room; inserted directly.
    InsertedWithRoom,
    /// Pool was full; the named incumbent was evicted for the new entry.
    Evicted { evicted_wallet: String },
    /// Pool was full and the candidate did not strictly exceed the lowest
    /// score; rejected, incumbent kept.
    RejectedAtCapacity,
    /// A hunter with this wallet already existed; kept whichever score is
    /// higher (duplicate inserts within the same discovery batch).
    DuplicateKeptHigherScore,
}

impl HunterPool {
    pub fn new(limit: usize) -> Self {
        Self {
            hunters: HashMap::new(),
            limit,
        }
    }

    pub fn len(&self) -> usize {
        self.hunters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hunters.is_empty()
    }

    pub fn contains(&self, wallet: &str) -> bool {
        self.hunters.contains_key(wallet)
    }

    pub fn get(&self, wallet: &str) -> Option<&Hunter> {
        self.hunters.get(wallet)
    }

    pub fn get_mut(&mut self, wallet: &str) -> Option<&mut Hunter> {
        self.hunters.get_mut(wallet)
    }

    pub fn remove(&mut self, wallet: &str) -> Option<Hunter> {
        self.hunters.remove(wallet)
    }

    pub fn addresses(&self) -> Vec<String> {
        self.hunters.keys().cloned().collect()
    }

    fn lowest_scored(&self) -> Option<(String, f64)> {
        self.hunters
            .values()
            .min_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal))
            .map(|h| (h.wallet.clone(), h.score))
    }

    /// Insert or update `candidate`. Eviction order on a full pool: remove
    /// the lowest-scored existing entry iff the candidate's score strictly
    /// exceeds it; ties keep the incumbent.
    pub fn insert(&mut self, candidate: Hunter) -> InsertOutcome {
        if let Some(existing) = self.hunters.get(&candidate.wallet) {
            if candidate.score > existing.score {
                self.hunters.insert(candidate.wallet.clone(), candidate);
            }
            return InsertOutcome::DuplicateKeptHigherScore;
        }

        if self.hunters.len() < self.limit {
            self.hunters.insert(candidate.wallet.clone(), candidate);
            return InsertOutcome::InsertedWithRoom;
        }

        match self.lowest_scored() {
            Some((lowest_wallet, lowest_score)) if candidate.score > lowest_score => {
                self.hunters.remove(&lowest_wallet);
                self.hunters.insert(candidate.wallet.clone(), candidate);
                InsertOutcome::Evicted {
                    evicted_wallet: lowest_wallet,
                }
            }
            _ => InsertOutcome::RejectedAtCapacity,
        }
    }

    /// The minimum score currently held, used to assert eviction monotonicity in tests.
    pub fn min_score(&self) -> Option<f64> {
        self.hunters.values().map(|h| h.score).fold(None, |acc, s| {
            Some(acc.map_or(s, |a: f64| a.min(s)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hunter(wallet: &str, score: f64) -> Hunter {
        Hunter {
            wallet: wallet.to_string(),
            score,
            score_detail: ScoreDetail::default(),
            metrics: HunterMetrics::default(),
            last_active: 0,
            last_audit: 0,
            source: HunterSource::HotTokenBacktrack,
        }
    }

    #[test]
    fn inserts_freely_below_capacity() {
        let mut pool = HunterPool::new(2);
        assert_eq!(pool.insert(hunter("a", 50.0)), InsertOutcome::InsertedWithRoom);
        assert_eq!(pool.insert(hunter("b", 60.0)), InsertOutcome::InsertedWithRoom);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn evicts_lowest_when_candidate_strictly_exceeds() {
        let mut pool = HunterPool::new(2);
        pool.insert(hunter("a", 50.0));
        pool.insert(hunter("b", 60.0));
        let outcome = pool.insert(hunter("c", 55.0));
        assert_eq!(
            outcome,
            InsertOutcome::Evicted { evicted_wallet: "a".to_string() }
        );
        assert!(!pool.contains("a"));
        assert!(pool.contains("c"));
    }

    #[test]
    fn ties_keep_incumbent() {
        let mut pool = HunterPool::new(2);
        pool.insert(hunter("a", 50.0));
        pool.insert(hunter("b", 60.0));
        let outcome = pool.insert(hunter("c", 50.0));
        assert_eq!(outcome, InsertOutcome::RejectedAtCapacity);
        assert!(pool.contains("a"));
        assert!(!pool.contains("c"));
    }

    #[test]
    fn duplicate_insert_keeps_higher_score() {
        let mut pool = HunterPool::new(5);
        pool.insert(hunter("a", 50.0));
        pool.insert(hunter("a", 40.0));
        assert_eq!(pool.get("a").unwrap().score, 50.0);
        pool.insert(hunter("a", 70.0));
        assert_eq!(pool.get("a").unwrap().score, 70.0);
    }

    #[test]
    fn eviction_never_increases_minimum_pool_score() {
        let mut pool = HunterPool::new(3);
        pool.insert(hunter("a", 10.0));
        pool.insert(hunter("b", 20.0));
        pool.insert(hunter("c", 30.0));
        let before = pool.min_score().unwrap();
        pool.insert(hunter("d", 15.0));
        let after = pool.min_score().unwrap();
        assert!(after >= before);
    }
}
