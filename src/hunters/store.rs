//! HunterStore: durable wallet→Hunter persistence, eviction, and the zombie
//! sweep. The single owner of `Hunter` records (§3 Ownership); Discovery and
//! Maintenance are its only mutators, Monitor only updates `last_active`
//! through `touch_active`.

use super::types::{Hunter, HunterPool, InsertOutcome};
use crate::logger::{self, LogTag};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedStore {
    pool: HunterPool,
}

pub struct HunterStore {
    pool: RwLock<HunterPool>,
    path: PathBuf,
}

impl HunterStore {
    pub fn new(limit: usize, path: PathBuf) -> Self {
        Self {
            pool: RwLock::new(HunterPool::new(limit)),
            path,
        }
    }

    /// Load from `path`, falling back to an empty pool of `limit` on any
    /// read/parse failure so a corrupt file never blocks startup.
    pub fn load(limit: usize, path: PathBuf) -> Self {
        let pool = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<PersistedStore>(&contents) {
                Ok(persisted) => persisted.pool,
                Err(e) => {
                    logger::warning(
                        LogTag::HunterStore,
                        &format!("failed to parse hunter store at {}: {}, starting empty", path.display(), e),
                    );
                    HunterPool::new(limit)
                }
            },
            Err(_) => HunterPool::new(limit),
        };
        Self {
            pool: RwLock::new(pool),
            path,
        }
    }

    /// Write a backup copy of the existing file before overwriting it, then
    /// persist the current pool (§6: "a backup copy precedes every save").
    pub fn save(&self) -> std::io::Result<()> {
        let (primary, backup) = crate::paths::backup_pair(&self.path);
        if primary.exists() {
            let _ = std::fs::copy(&primary, &backup);
        }
        if let Some(parent) = primary.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let persisted = PersistedStore {
            pool: self.pool.read().clone(),
        };
        let body = serde_json::to_string_pretty(&persisted)?;
        std::fs::write(&primary, body)
    }

    pub fn len(&self) -> usize {
        self.pool.read().len()
    }

    pub fn is_full(&self) -> bool {
        let pool = self.pool.read();
        pool.len() >= pool.limit
    }

    pub fn contains(&self, wallet: &str) -> bool {
        self.pool.read().contains(wallet)
    }

    pub fn get(&self, wallet: &str) -> Option<Hunter> {
        self.pool.read().get(wallet).cloned()
    }

    pub fn addresses(&self) -> Vec<String> {
        self.pool.read().addresses()
    }

    pub fn insert(&self, candidate: Hunter) -> InsertOutcome {
        let outcome = self.pool.write().insert(candidate.clone());
        match &outcome {
            InsertOutcome::InsertedWithRoom => logger::info(
                LogTag::HunterStore,
                &format!("hunter {} added (score {:.1})", candidate.wallet, candidate.score),
            ),
            InsertOutcome::Evicted { evicted_wallet } => logger::info(
                LogTag::HunterStore,
                &format!(
                    "hunter {} added (score {:.1}), evicted {} (pool at capacity)",
                    candidate.wallet, candidate.score, evicted_wallet
                ),
            ),
            InsertOutcome::RejectedAtCapacity => logger::debug(
                LogTag::HunterStore,
                &format!("hunter {} rejected: pool at capacity and score too low", candidate.wallet),
            ),
            InsertOutcome::DuplicateKeptHigherScore => {}
        }
        if let Err(e) = self.save() {
            logger::error(LogTag::HunterStore, &format!("failed to persist hunter store: {}", e));
        }
        outcome
    }

    /// Evict `wallet` outright (e.g. failed re-audit, LP behavior detected).
    /// Returns the removed record so the caller can notify the Trader.
    pub fn evict(&self, wallet: &str) -> Option<Hunter> {
        let removed = self.pool.write().remove(wallet);
        if removed.is_some() {
            logger::info(LogTag::HunterStore, &format!("hunter {} evicted", wallet));
            if let Err(e) = self.save() {
                logger::error(LogTag::HunterStore, &format!("failed to persist hunter store: {}", e));
            }
        }
        removed
    }

    /// Monitor's write path: bump `last_active` without touching score/audit fields.
    pub fn touch_active(&self, wallet: &str, ts: i64) {
        let mut pool = self.pool.write();
        if let Some(hunter) = pool.get_mut(wallet) {
            hunter.last_active = ts;
        }
    }

    /// Re-score and refresh `last_audit` after a successful Maintenance re-audit.
    pub fn update_after_audit(&self, wallet: &str, score: f64, metrics: crate::hunters::types::HunterMetrics, now: i64) {
        {
            let mut pool = self.pool.write();
            if let Some(hunter) = pool.get_mut(wallet) {
                hunter.score = score;
                hunter.metrics = metrics;
                hunter.last_audit = now;
            }
        }
        if let Err(e) = self.save() {
            logger::error(LogTag::HunterStore, &format!("failed to persist hunter store: {}", e));
        }
    }

    /// Remove every hunter whose `last_active` is older than `zombie_threshold_secs`
    /// and who is not brand new (within `grace_secs` of its own last_audit).
    /// Returns the evicted wallets.
    pub fn sweep_zombies(&self, now: i64, zombie_threshold_secs: i64, grace_secs: i64) -> Vec<String> {
        let mut evicted = Vec::new();
        {
            let mut pool = self.pool.write();
            let zombies: Vec<String> = pool
                .hunters
                .values()
                .filter(|h| now - h.last_active >= zombie_threshold_secs && !h.is_brand_new(now, grace_secs))
                .map(|h| h.wallet.clone())
                .collect();
            for wallet in zombies {
                pool.remove(&wallet);
                evicted.push(wallet);
            }
        }
        if !evicted.is_empty() {
            logger::info(LogTag::HunterStore, &format!("zombie sweep evicted {} hunters", evicted.len()));
            if let Err(e) = self.save() {
                logger::error(LogTag::HunterStore, &format!("failed to persist hunter store: {}", e));
            }
        }
        evicted
    }

    /// Hunters whose `last_audit` is older than `audit_expiration_secs`, due for re-audit.
    pub fn due_for_reaudit(&self, now: i64, audit_expiration_secs: i64) -> Vec<Hunter> {
        self.pool
            .read()
            .hunters
            .values()
            .filter(|h| now - h.last_audit >= audit_expiration_secs)
            .cloned()
            .collect()
    }
}

/// A plain-text, one-address-per-line wallet list: used for both the
/// LP-participant trash list and the curated Mode B wallet list (§6).
pub struct WalletLineList {
    path: PathBuf,
}

impl WalletLineList {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn load(&self) -> Vec<String> {
        std::fs::read_to_string(&self.path)
            .unwrap_or_default()
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn contains(&self, wallet: &str) -> bool {
        self.load().iter().any(|w| w == wallet)
    }

    pub fn append(&self, wallet: &str) -> std::io::Result<()> {
        if self.contains(wallet) {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        use std::io::Write;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", wallet)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hunters::types::{HunterMetrics, HunterSource, ScoreDetail};
    use tempfile::tempdir;

    fn hunter(wallet: &str, score: f64, last_active: i64, last_audit: i64) -> Hunter {
        Hunter {
            wallet: wallet.to_string(),
            score,
            score_detail: ScoreDetail::default(),
            metrics: HunterMetrics::default(),
            last_active,
            last_audit,
            source: HunterSource::HotTokenBacktrack,
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hunter_store.json");
        let store = HunterStore::new(300, path.clone());
        store.insert(hunter("alpha", 80.0, 100, 100));
        store.insert(hunter("beta", 65.0, 100, 100));

        let reloaded = HunterStore::load(300, path);
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get("alpha").unwrap().score, 80.0);
    }

    #[test]
    fn load_missing_file_starts_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let store = HunterStore::load(300, path);
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn zombie_sweep_respects_grace_period() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hunter_store.json");
        let store = HunterStore::new(300, path);
        store.insert(hunter("old", 70.0, 0, 0));
        store.insert(hunter("brand_new", 70.0, 0, 1_000_000));

        let now = 2_000_000;
        let evicted = store.sweep_zombies(now, 1_296_000, 1_296_000);
        assert_eq!(evicted, vec!["old".to_string()]);
        assert!(store.contains("brand_new"));
    }

    #[test]
    fn wallet_line_list_dedups_on_append() {
        let dir = tempdir().unwrap();
        let list = WalletLineList::new(dir.path().join("trash.txt"));
        list.append("wallet1").unwrap();
        list.append("wallet1").unwrap();
        assert_eq!(list.load(), vec!["wallet1".to_string()]);
    }
}
