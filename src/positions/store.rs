//! TraderState persistence: the positions map is the Trader's sole owned
//! state (§3 Ownership), serialized after every mutating transition via a
//! background task so a slow disk never blocks the per-mint actor.

use super::types::Position;
use crate::logger::{self, LogTag};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PersistedTraderState {
    positions: HashMap<String, Position>,
}

/// Guarded by a single async mutex; `save` is invoked via `spawn_blocking`
/// underneath so it never stalls the caller's task.
pub struct PositionStore {
    inner: Arc<Mutex<HashMap<String, Position>>>,
    path: PathBuf,
}

impl PositionStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            path,
        }
    }

    /// Load from `path`, keeping only positions with `total_tokens > 0`
    /// (§3: "load restores exactly the positions with total_tokens > 0").
    pub async fn load(path: PathBuf) -> Self {
        let positions = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => match serde_json::from_str::<PersistedTraderState>(&contents) {
                Ok(state) => state.positions.into_iter().filter(|(_, p)| p.total_tokens > 0.0).collect(),
                Err(e) => {
                    logger::warning(
                        LogTag::Trader,
                        &format!("failed to parse trader state at {}: {}, starting empty", path.display(), e),
                    );
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        Self {
            inner: Arc::new(Mutex::new(positions)),
            path,
        }
    }

    pub async fn get(&self, mint: &str) -> Option<Position> {
        self.inner.lock().await.get(mint).cloned()
    }

    pub async fn contains(&self, mint: &str) -> bool {
        self.inner.lock().await.contains_key(mint)
    }

    pub async fn mints_led_by(&self, hunter: &str) -> Vec<String> {
        self.inner
            .lock()
            .await
            .iter()
            .filter(|(_, p)| p.shares.contains_key(hunter))
            .map(|(mint, _)| mint.clone())
            .collect()
    }

    pub async fn all_mints(&self) -> Vec<String> {
        self.inner.lock().await.keys().cloned().collect()
    }

    /// Insert/update (mutating transitions call this after computing the new
    /// Position), then persist in the background.
    pub async fn put(&self, mint: String, position: Position) {
        self.inner.lock().await.insert(mint, position);
        self.save().await;
    }

    /// Remove a closed position (§3: "once total_tokens == 0, the Position
    /// is destroyed"), then persist.
    pub async fn remove(&self, mint: &str) {
        self.inner.lock().await.remove(mint);
        self.save().await;
    }

    async fn save(&self) {
        let snapshot = self.inner.lock().await.clone();
        let path = self.path.clone();
        let result = tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let (primary, backup) = crate::paths::backup_pair(&path);
            if primary.exists() {
                let _ = std::fs::copy(&primary, &backup);
            }
            if let Some(parent) = primary.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let body = serde_json::to_string_pretty(&PersistedTraderState { positions: snapshot })?;
            std::fs::write(&primary, body)
        })
        .await;

        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => logger::error(LogTag::Trader, &format!("failed to persist trader state: {}", e)),
            Err(e) => logger::error(LogTag::Trader, &format!("trader state save task panicked: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::positions::transitions::apply_entry;
    use tempfile::tempdir;

    #[tokio::test]
    async fn save_then_load_keeps_only_open_positions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("trader_state.json");
        let store = PositionStore::new(path.clone());

        let open = apply_entry("H", 85.0, 0.04, 20.0, 6, 1_000);
        let mut closed = apply_entry("H", 85.0, 0.04, 20.0, 6, 1_000);
        closed.total_tokens = 0.0;

        store.put("open_mint".to_string(), open).await;
        store.put("closed_mint".to_string(), closed).await;

        let reloaded = PositionStore::load(path).await;
        assert!(reloaded.contains("open_mint").await);
        assert!(!reloaded.contains("closed_mint").await);
    }
}
