use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use serde::Serialize;
use tracing::{error, info, warn};

use reelwatch_common::{Item, Stats};

use crate::error::Result;
use crate::gateway::FetchGateway;
use crate::traits::SnapshotStore;

/// Result of a completed refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshReport {
    pub updated_count: usize,
    pub duration: Duration,
}

/// What the on-demand trigger reports back to its caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_count: Option<usize>,
    pub message: String,
}

/// Re-fetches counters for the most recent items and rewrites the store
/// with the ones that changed.
pub struct MetricsRefresher {
    store: Arc<dyn SnapshotStore>,
    gateway: Arc<FetchGateway>,
    window: usize,
    batch_size: usize,
}

impl MetricsRefresher {
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        gateway: Arc<FetchGateway>,
        window: usize,
        batch_size: usize,
    ) -> Self {
        Self {
            store,
            gateway,
            window,
            batch_size: batch_size.max(1),
        }
    }

    /// Refresh the window once. Only a store failure is an error; per-item
    /// fetch failures leave that item untouched.
    pub async fn refresh(&self) -> Result<RefreshReport> {
        let started = Instant::now();
        info!("Starting metrics update");

        let snapshot = self.store.load().await?;
        let window = refresh_window(&snapshot, self.window);
        info!(
            candidates = window.len(),
            batch_size = self.batch_size,
            "Refreshing recent items"
        );

        let mut changed: HashMap<String, Stats> = HashMap::new();
        for (batch_no, batch) in window.chunks(self.batch_size).enumerate() {
            let start = batch_no * self.batch_size;
            let fetched = join_all(batch.iter().map(|item| self.fetch_changed(item))).await;

            let before = changed.len();
            changed.extend(fetched.into_iter().flatten());
            info!(
                from = start + 1,
                to = start + batch.len(),
                updated = changed.len() - before,
                "Batch complete"
            );
        }

        let updated_count = changed.len();
        if updated_count > 0 {
            let merged = merge_stats(snapshot, changed);
            self.store.save(&merged).await?;
        }

        let report = RefreshReport {
            updated_count,
            duration: started.elapsed(),
        };
        info!(
            updated = report.updated_count,
            duration_secs = report.duration.as_secs_f64(),
            "Metrics update complete"
        );
        Ok(report)
    }

    /// Fetch one item's counters. Returns the new stats only if they differ
    /// from what is stored.
    async fn fetch_changed(&self, item: &Item) -> Option<(String, Stats)> {
        match self.gateway.item_stats(item.handle(), &item.id).await {
            Ok(Some(stats)) if !stats.same_counters(&item.stats) => Some((item.id.clone(), stats)),
            Ok(_) => None,
            Err(e) => {
                warn!(item_id = %item.id, handle = item.handle(), error = %e, "Error updating item");
                None
            }
        }
    }

    /// On-demand entry point: never errors, reports success or failure.
    pub async fn trigger(&self) -> RefreshOutcome {
        match self.refresh().await {
            Ok(report) => RefreshOutcome {
                success: true,
                updated_count: Some(report.updated_count),
                message: format!(
                    "Updated {} videos in {:.2} seconds",
                    report.updated_count,
                    report.duration.as_secs_f64()
                ),
            },
            Err(e) => {
                error!(error = %e, "Metrics update failed");
                RefreshOutcome {
                    success: false,
                    updated_count: None,
                    message: e.to_string(),
                }
            }
        }
    }
}

/// The `limit` most recent items by creation time, newest first. Ties keep
/// snapshot order.
pub fn refresh_window(items: &[Item], limit: usize) -> Vec<&Item> {
    let mut recent: Vec<&Item> = items.iter().collect();
    recent.sort_by(|a, b| b.create_time.cmp(&a.create_time));
    recent.truncate(limit);
    recent
}

/// Replace counters in place for every changed id, keeping snapshot order and
/// leaving every other item exactly as it was.
pub fn merge_stats(snapshot: Vec<Item>, mut changed: HashMap<String, Stats>) -> Vec<Item> {
    snapshot
        .into_iter()
        .map(|mut item| {
            if let Some(stats) = changed.remove(&item.id) {
                item.stats.replace_counters(&stats);
            }
            item
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    fn refresher(source: &Arc<MockItemSource>, store: &Arc<MemorySnapshotStore>, window: usize) -> MetricsRefresher {
        MetricsRefresher::new(
            store.clone(),
            Arc::new(FetchGateway::new(source.clone(), 10)),
            window,
            20,
        )
    }

    #[tokio::test]
    async fn unchanged_stats_do_not_rewrite_store() {
        let mut stored = item("1", "maker", 100);
        stored.stats = stats(10);
        let source = Arc::new(MockItemSource::new());
        source.set_stats("1", stats(10));
        let store = Arc::new(MemorySnapshotStore::new(vec![stored]));

        let report = refresher(&source, &store, 480).refresh().await.unwrap();

        assert_eq!(report.updated_count, 0);
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn changed_item_is_replaced_and_others_untouched() {
        let mut first = item("1", "maker", 100);
        first.stats = stats(10);
        let mut second = item("2", "maker", 200);
        second.stats = stats(7);
        second.desc = "keep me".to_string();
        let original = vec![first, second.clone()];

        let source = Arc::new(MockItemSource::new());
        source.set_stats("1", stats(11));
        source.set_stats("2", stats(7));
        let store = Arc::new(MemorySnapshotStore::new(original.clone()));

        let report = refresher(&source, &store, 480).refresh().await.unwrap();

        assert_eq!(report.updated_count, 1);
        assert_eq!(store.save_count(), 1);
        let saved = store.items();
        assert_eq!(saved[0].id, "1");
        assert_eq!(saved[0].stats, stats(11));
        assert_eq!(
            serde_json::to_vec(&saved[1]).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
        let mut expected_first = original[0].clone();
        expected_first.stats = stats(11);
        assert_eq!(saved[0], expected_first);
    }

    #[tokio::test]
    async fn only_most_recent_window_is_fetched() {
        let items: Vec<Item> = (0..500).map(|i| item(&format!("v{i}"), "maker", i)).collect();
        let source = Arc::new(MockItemSource::new());
        let store = Arc::new(MemorySnapshotStore::new(items));

        refresher(&source, &store, 480).refresh().await.unwrap();

        let mut requested = source.stat_requests();
        requested.sort();
        let mut expected: Vec<String> = (20..500).map(|i| format!("v{i}")).collect();
        expected.sort();
        assert_eq!(requested, expected);
    }

    #[tokio::test]
    async fn failed_and_empty_fetches_count_as_unchanged() {
        let mut a = item("a", "maker", 3);
        a.stats = stats(1);
        let mut b = item("b", "maker", 2);
        b.stats = stats(1);
        let mut c = item("c", "maker", 1);
        c.stats = stats(1);

        let source = Arc::new(MockItemSource::new().failing_stats("a"));
        source.set_stats("c", stats(2));
        let store = Arc::new(MemorySnapshotStore::new(vec![a.clone(), b.clone(), c]));

        let report = refresher(&source, &store, 480).refresh().await.unwrap();

        assert_eq!(report.updated_count, 1);
        let saved = store.items();
        assert_eq!(saved[0], a);
        assert_eq!(saved[1], b);
        assert_eq!(saved[2].stats, stats(2));
    }

    #[tokio::test]
    async fn unmodelled_stat_keys_do_not_count_as_changes() {
        let mut stored = item("1", "maker", 100);
        stored.stats = stats(10);
        stored.stats.extra.insert("repostCount".to_string(), serde_json::json!(4));
        let source = Arc::new(MockItemSource::new());
        source.set_stats("1", stats(10));
        let store = Arc::new(MemorySnapshotStore::new(vec![stored.clone()]));

        let report = refresher(&source, &store, 480).refresh().await.unwrap();
        assert_eq!(report.updated_count, 0);
        assert_eq!(store.save_count(), 0);

        source.set_stats("1", stats(12));
        let report = refresher(&source, &store, 480).refresh().await.unwrap();
        assert_eq!(report.updated_count, 1);
        let saved = &store.items()[0].stats;
        assert_eq!(saved.digg_count, 12);
        assert_eq!(saved.extra.get("repostCount"), Some(&serde_json::json!(4)));
    }

    #[tokio::test]
    async fn merge_keeps_original_unsorted_order() {
        let snapshot = vec![item("old", "m", 1), item("new", "m", 9), item("mid", "m", 5)];
        let mut changed = HashMap::new();
        changed.insert("new".to_string(), stats(3));

        let merged = merge_stats(snapshot, changed);
        let ids: Vec<&str> = merged.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["old", "new", "mid"]);
        assert_eq!(merged[1].stats, stats(3));
    }

    #[test]
    fn window_ties_keep_snapshot_order() {
        let items = vec![item("x", "m", 5), item("y", "m", 5), item("z", "m", 9)];
        let ids: Vec<&str> = refresh_window(&items, 2).iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["z", "x"]);
    }

    #[tokio::test]
    async fn trigger_reports_success_and_failure() {
        let source = Arc::new(MockItemSource::new());
        let store = Arc::new(MemorySnapshotStore::new(vec![item("1", "m", 1)]));
        source.set_stats("1", stats(4));

        let ok = refresher(&source, &store, 480).trigger().await;
        assert!(ok.success);
        assert_eq!(ok.updated_count, Some(1));
        assert!(ok.message.starts_with("Updated 1 videos"));

        store.set_fail_loads(true);
        let failed = refresher(&source, &store, 480).trigger().await;
        assert!(!failed.success);
        assert_eq!(failed.updated_count, None);
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["success"], serde_json::json!(false));
        assert!(json.get("updatedCount").is_none());
    }
}
