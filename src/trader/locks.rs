//! Per-mint serialization so `ENTRY`/`ADD`/`FOLLOW_SELL`/`PNL_CHECK` never
//! race each other over the same Position. Each mint gets its own
//! `tokio::sync::Mutex<()>`, created lazily and kept around for the life of
//! the process (a mint can reopen a position after closing).

use parking_lot::Mutex as SyncMutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

pub struct MintLocks {
    locks: SyncMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl MintLocks {
    pub fn new() -> Self {
        Self { locks: SyncMutex::new(HashMap::new()) }
    }

    /// Acquires the lock for `mint`, creating it if this is the first trigger
    /// ever seen for that mint. Hold the returned guard for the lifetime of
    /// the triggered handler.
    pub async fn acquire(&self, mint: &str) -> OwnedMutexGuard<()> {
        let lock = self.locks.lock().entry(mint.to_string()).or_insert_with(|| Arc::new(Mutex::new(()))).clone();
        lock.lock_owned().await
    }
}

impl Default for MintLocks {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_acquire_on_same_mint_waits_for_the_first() {
        let locks = Arc::new(MintLocks::new());
        let order = Arc::new(SyncMutex::new(Vec::new()));

        let l1 = locks.clone();
        let o1 = order.clone();
        let first = tokio::spawn(async move {
            let _g = l1.acquire("mint").await;
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            o1.lock().push(1);
        });

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let l2 = locks.clone();
        let o2 = order.clone();
        let second = tokio::spawn(async move {
            let _g = l2.acquire("mint").await;
            o2.lock().push(2);
        });

        first.await.unwrap();
        second.await.unwrap();
        assert_eq!(*order.lock(), vec![1, 2]);
    }

    #[tokio::test]
    async fn distinct_mints_do_not_serialize() {
        let locks = MintLocks::new();
        let _g1 = locks.acquire("mint_a").await;
        let _g2 = locks.acquire("mint_b").await;
    }
}
