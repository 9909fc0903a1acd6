/// Per-error-kind counters, queryable for observability without a metrics backend.
///
/// Every `ScreenerBotError` builder call increments its kind's counter via
/// `record()`. `snapshot()` returns the current totals.
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

static COUNTERS: Lazy<RwLock<HashMap<&'static str, AtomicU64>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

pub fn record(kind: &'static str) {
    let counters = COUNTERS.read().unwrap_or_else(|e| e.into_inner());
    if let Some(counter) = counters.get(kind) {
        counter.fetch_add(1, Ordering::Relaxed);
        return;
    }
    drop(counters);

    let mut counters = COUNTERS.write().unwrap_or_else(|e| e.into_inner());
    counters
        .entry(kind)
        .or_insert_with(|| AtomicU64::new(0))
        .fetch_add(1, Ordering::Relaxed);
}

pub fn snapshot() -> HashMap<String, u64> {
    COUNTERS
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .iter()
        .map(|(k, v)| (k.to_string(), v.load(Ordering::Relaxed)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_increments_and_snapshot_reflects_it() {
        record("test_kind_unique");
        record("test_kind_unique");
        let snap = snapshot();
        assert_eq!(snap.get("test_kind_unique"), Some(&2));
    }
}
