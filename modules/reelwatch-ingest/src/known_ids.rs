use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use reelwatch_common::Item;

/// In-memory set of item ids already seen.
///
/// Derived from the item store once at startup and only grown afterwards by
/// accepted discoveries. Interior mutability lets concurrent account scans
/// share one index; `claim` is atomic, so two scans can never both accept
/// the same id.
#[derive(Debug, Default)]
pub struct KnownIds {
    ids: Mutex<HashSet<String>>,
}

impl KnownIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: &[Item]) -> Self {
        Self {
            ids: Mutex::new(items.iter().map(|item| item.id.clone()).collect()),
        }
    }

    fn guard(&self) -> MutexGuard<'_, HashSet<String>> {
        // A panic while holding the lock cannot leave the set half-updated.
        self.ids.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.guard().contains(id)
    }

    /// Mark `id` as known. Returns true if it was not known before.
    pub fn claim(&self, id: &str) -> bool {
        let mut ids = self.guard();
        if ids.contains(id) {
            return false;
        }
        ids.insert(id.to_string())
    }

    /// Drop ids again, e.g. when the pass that claimed them failed to persist
    /// or their items were pruned from the store.
    pub fn forget<'a>(&self, ids: impl IntoIterator<Item = &'a str>) {
        let mut known = self.guard();
        for id in ids {
            known.remove(id);
        }
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }

    /// Sorted copy of the ids, for logging and assertions.
    pub fn snapshot(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.guard().iter().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::item;

    #[test]
    fn built_from_store_ids() {
        let known = KnownIds::from_items(&[item("1", "a", 10), item("2", "a", 20)]);
        assert_eq!(known.len(), 2);
        assert!(known.contains("1"));
        assert!(!known.contains("3"));
    }

    #[test]
    fn claim_succeeds_once() {
        let known = KnownIds::new();
        assert!(known.claim("7"));
        assert!(!known.claim("7"));
        assert_eq!(known.snapshot(), vec!["7".to_string()]);
    }

    #[test]
    fn forget_allows_reclaim() {
        let known = KnownIds::from_items(&[item("1", "a", 10)]);
        known.claim("2");
        known.forget(["2"]);
        assert!(!known.contains("2"));
        assert!(known.contains("1"));
        assert!(known.claim("2"));
    }
}
