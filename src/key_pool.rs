//! Round-robin credential rotation, one independent pool per provider.
//!
//! A pool never blocks: `current()` returns `None` on an empty list, and
//! `mark_failed()` always advances, even with a single key (a no-op rotation).

use std::sync::atomic::{AtomicUsize, Ordering};

/// An ordered list of credentials with a rotating cursor.
///
/// Thread-safe via an atomic index; the key list itself is immutable once
/// constructed, matching how `CredentialsConfig` is loaded once at startup.
#[derive(Debug)]
pub struct KeyPool {
    keys: Vec<String>,
    index: AtomicUsize,
}

impl KeyPool {
    pub fn new(keys: Vec<String>) -> Self {
        Self {
            keys,
            index: AtomicUsize::new(0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// The currently active key, or `None` if the pool has no keys.
    pub fn current(&self) -> Option<&str> {
        if self.keys.is_empty() {
            return None;
        }
        let idx = self.index.load(Ordering::SeqCst) % self.keys.len();
        Some(self.keys[idx].as_str())
    }

    /// Advance to the next key. A no-op for an empty or single-key pool.
    pub fn mark_failed(&self) {
        if self.keys.is_empty() {
            return;
        }
        self.index.fetch_add(1, Ordering::SeqCst);
    }
}

impl Clone for KeyPool {
    fn clone(&self) -> Self {
        Self {
            keys: self.keys.clone(),
            index: AtomicUsize::new(self.index.load(Ordering::SeqCst)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_pool_returns_none() {
        let pool = KeyPool::new(vec![]);
        assert_eq!(pool.current(), None);
        pool.mark_failed();
        assert_eq!(pool.current(), None);
    }

    #[test]
    fn rotates_on_failure() {
        let pool = KeyPool::new(vec!["a".into(), "b".into(), "c".into()]);
        assert_eq!(pool.current(), Some("a"));
        pool.mark_failed();
        assert_eq!(pool.current(), Some("b"));
        pool.mark_failed();
        assert_eq!(pool.current(), Some("c"));
        pool.mark_failed();
        assert_eq!(pool.current(), Some("a"));
    }

    #[test]
    fn single_key_pool_is_stable_under_failures() {
        let pool = KeyPool::new(vec!["only".into()]);
        pool.mark_failed();
        pool.mark_failed();
        assert_eq!(pool.current(), Some("only"));
    }
}
