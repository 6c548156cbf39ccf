use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use reelwatch_common::Item;

use crate::accounts::AccountBook;
use crate::error::Result;
use crate::gateway::FetchGateway;
use crate::known_ids::KnownIds;
use crate::scanner::AccountScanner;
use crate::thumbnails::ThumbnailCache;
use crate::traits::SnapshotStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Waiting for the next tick.
    Idle,
    /// A pass is in progress.
    Scanning,
}

/// Outcome of one discovery pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PassReport {
    pub accounts: usize,
    pub new_items: usize,
    pub elapsed: Duration,
}

/// Repeatedly scans every tracked account and prepends new items to the store.
pub struct DiscoveryScheduler {
    store: Arc<dyn SnapshotStore>,
    accounts: AccountBook,
    gateway: Arc<FetchGateway>,
    thumbnails: ThumbnailCache,
    known: KnownIds,
    poll_interval: Duration,
    page_size: u32,
    scanning: AtomicBool,
}

impl DiscoveryScheduler {
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        accounts: AccountBook,
        gateway: Arc<FetchGateway>,
        thumbnails: ThumbnailCache,
        known: KnownIds,
        poll_interval: Duration,
        page_size: u32,
    ) -> Self {
        Self {
            store,
            accounts,
            gateway,
            thumbnails,
            known,
            poll_interval,
            page_size,
            scanning: AtomicBool::new(false),
        }
    }

    /// Build the known-id index from the current store contents.
    pub async fn bootstrap(
        store: Arc<dyn SnapshotStore>,
        accounts: AccountBook,
        gateway: Arc<FetchGateway>,
        thumbnails: ThumbnailCache,
        poll_interval: Duration,
        page_size: u32,
    ) -> Result<Self> {
        let items = store.load().await?;
        let known = KnownIds::from_items(&items);
        info!(known = known.len(), "Loaded existing items");
        Ok(Self::new(
            store,
            accounts,
            gateway,
            thumbnails,
            known,
            poll_interval,
            page_size,
        ))
    }

    pub fn known(&self) -> &KnownIds {
        &self.known
    }

    pub fn state(&self) -> SchedulerState {
        if self.scanning.load(Ordering::Acquire) {
            SchedulerState::Scanning
        } else {
            SchedulerState::Idle
        }
    }

    /// Run one pass: scan all accounts concurrently (bounded only by the
    /// gateway), wait for every scan, then persist the combined new items in
    /// a single snapshot write.
    ///
    /// If the write fails, ids claimed during the pass are released so the
    /// next pass finds those items again.
    pub async fn run_pass(&self) -> Result<PassReport> {
        self.scanning.store(true, Ordering::Release);
        let result = self.scan_and_commit().await;
        self.scanning.store(false, Ordering::Release);
        result
    }

    async fn scan_and_commit(&self) -> Result<PassReport> {
        let started = Instant::now();
        info!("Starting discovery pass");

        let accounts = self.accounts.load().await?;
        let scanner = AccountScanner::new(&self.gateway, &self.thumbnails, self.page_size);

        let per_account = join_all(accounts.iter().map(|account| scanner.scan(account, &self.known))).await;
        let new_items: Vec<Item> = per_account.into_iter().flatten().collect();

        let persisted = if new_items.is_empty() {
            0
        } else {
            match self.commit(&new_items).await {
                Ok(count) => count,
                Err(e) => {
                    self.known.forget(new_items.iter().map(|item| item.id.as_str()));
                    return Err(e);
                }
            }
        };

        let report = PassReport {
            accounts: accounts.len(),
            new_items: persisted,
            elapsed: started.elapsed(),
        };
        info!(
            accounts = report.accounts,
            new_items = report.new_items,
            elapsed_secs = report.elapsed.as_secs_f64(),
            "Discovery pass complete"
        );
        Ok(report)
    }

    /// Prepend `new_items` to the stored snapshot. Items whose id is already
    /// present in the snapshot are dropped. Returns how many were written.
    async fn commit(&self, new_items: &[Item]) -> Result<usize> {
        let existing = self.store.load().await?;
        let stored: HashSet<&str> = existing.iter().map(|item| item.id.as_str()).collect();

        let fresh: Vec<Item> = new_items
            .iter()
            .filter(|item| {
                let dup = stored.contains(item.id.as_str());
                if dup {
                    debug!(item_id = %item.id, "Item already in store, not re-adding");
                }
                !dup
            })
            .cloned()
            .collect();

        if fresh.is_empty() {
            return Ok(0);
        }

        let count = fresh.len();
        let mut merged = fresh;
        merged.extend(existing);
        self.store.save(&merged).await?;

        info!(saved = count, total = merged.len(), "Saved new items to store");
        Ok(count)
    }

    /// Tick forever: one pass, then sleep for the poll interval. A failed pass
    /// is logged and the loop carries on. When `shutdown` flips to true (or
    /// its sender is dropped) the loop exits after the in-progress pass; a
    /// pass is never interrupted mid-write.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.poll_interval.as_secs(),
            "Discovery scheduler started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            if let Err(e) = self.run_pass().await {
                error!(error = %e, "Discovery pass failed");
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        warn!("Shutdown channel closed");
                        break;
                    }
                }
            }
        }

        info!("Discovery scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IngestError;
    use crate::testing::*;

    struct Harness {
        source: Arc<MockItemSource>,
        store: Arc<MemorySnapshotStore>,
        scheduler: DiscoveryScheduler,
        _dir: tempfile::TempDir,
    }

    async fn harness(source: MockItemSource, stored: Vec<Item>, accounts: &[reelwatch_common::Account]) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let book = AccountBook::new(dir.path().join("UserIDs.json"));
        book.save(accounts).await.unwrap();

        let source = Arc::new(source);
        let store = Arc::new(MemorySnapshotStore::new(stored));
        let scheduler = DiscoveryScheduler::bootstrap(
            store.clone(),
            book,
            Arc::new(FetchGateway::new(source.clone(), 4)),
            ThumbnailCache::new(dir.path().join("thumbnails")),
            Duration::from_millis(10),
            30,
        )
        .await
        .unwrap();

        Harness {
            source,
            store,
            scheduler,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn new_items_are_prepended_in_account_order() {
        let h = harness(
            MockItemSource::new()
                .on_account("ua", vec![raw_video("1", 100), raw_video("2", 200)])
                .on_account("ub", vec![raw_video("4", 400)]),
            vec![item("0", "old", 1)],
            &[account("a", "ua"), account("b", "ub")],
        )
        .await;

        let report = h.scheduler.run_pass().await.unwrap();

        assert_eq!(report.accounts, 2);
        assert_eq!(report.new_items, 3);
        assert_eq!(h.store.ids(), vec!["1", "2", "4", "0"]);
        assert_eq!(h.store.save_count(), 1);
        assert_eq!(h.scheduler.state(), SchedulerState::Idle);
    }

    #[tokio::test]
    async fn pass_without_new_items_does_not_write() {
        let h = harness(
            MockItemSource::new().on_account("ua", vec![raw_video("1", 100)]),
            vec![item("1", "a", 100)],
            &[account("a", "ua")],
        )
        .await;

        let report = h.scheduler.run_pass().await.unwrap();
        assert_eq!(report.new_items, 0);
        assert_eq!(h.store.save_count(), 0);
    }

    #[tokio::test]
    async fn repeated_passes_never_duplicate() {
        let h = harness(
            MockItemSource::new().on_account("ua", vec![raw_video("1", 100), raw_video("2", 200)]),
            vec![],
            &[account("a", "ua")],
        )
        .await;

        h.scheduler.run_pass().await.unwrap();
        h.source.set_account_items("ua", vec![raw_video("3", 300), raw_video("1", 100), raw_video("2", 200)]);
        h.scheduler.run_pass().await.unwrap();
        h.scheduler.run_pass().await.unwrap();

        assert_eq!(h.store.ids(), vec!["3", "1", "2"]);
        assert_eq!(h.store.save_count(), 2);
    }

    #[tokio::test]
    async fn same_item_from_two_accounts_is_stored_once() {
        let h = harness(
            MockItemSource::new()
                .on_account("ua", vec![raw_video("collab", 100)])
                .on_account("ub", vec![raw_video("collab", 100)]),
            vec![],
            &[account("a", "ua"), account("b", "ub")],
        )
        .await;

        let report = h.scheduler.run_pass().await.unwrap();
        assert_eq!(report.new_items, 1);
        assert_eq!(h.store.ids(), vec!["collab"]);
    }

    #[tokio::test]
    async fn failing_account_does_not_abort_pass() {
        let h = harness(
            MockItemSource::new()
                .failing_account("ua")
                .on_account("ub", vec![raw_video("5", 500)]),
            vec![],
            &[account("a", "ua"), account("b", "ub")],
        )
        .await;

        let report = h.scheduler.run_pass().await.unwrap();
        assert_eq!(report.new_items, 1);
        assert_eq!(h.store.ids(), vec!["5"]);
    }

    #[tokio::test]
    async fn failed_save_releases_claims_for_next_pass() {
        let h = harness(
            MockItemSource::new().on_account("ua", vec![raw_video("1", 100)]),
            vec![],
            &[account("a", "ua")],
        )
        .await;

        h.store.set_fail_saves(true);
        let err = h.scheduler.run_pass().await.unwrap_err();
        assert!(matches!(err, IngestError::Persistence(_)));
        assert!(!h.scheduler.known().contains("1"));
        assert!(h.store.ids().is_empty());

        h.store.set_fail_saves(false);
        let report = h.scheduler.run_pass().await.unwrap();
        assert_eq!(report.new_items, 1);
        assert_eq!(h.store.ids(), vec!["1"]);
    }

    #[tokio::test]
    async fn item_already_in_store_is_not_readded() {
        let h = harness(
            MockItemSource::new().on_account("ua", vec![raw_video("1", 100)]),
            vec![],
            &[account("a", "ua")],
        )
        .await;
        // Written by another process after the index was built.
        h.store.replace(vec![item("1", "a", 100)]);

        let report = h.scheduler.run_pass().await.unwrap();
        assert_eq!(report.new_items, 0);
        assert_eq!(h.store.ids(), vec!["1"]);
        assert_eq!(h.store.save_count(), 0);
    }

    #[tokio::test]
    async fn run_survives_failed_passes_and_stops_on_shutdown() {
        let h = harness(
            MockItemSource::new().on_account("ua", vec![raw_video("1", 100)]),
            vec![],
            &[account("a", "ua")],
        )
        .await;
        h.store.set_fail_saves(true);

        let (tx, rx) = watch::channel(false);
        let scheduler = &h.scheduler;
        let store = h.store.clone();
        let driver = async move {
            // Let a few failing passes go by, then allow saves.
            tokio::time::sleep(Duration::from_millis(35)).await;
            store.set_fail_saves(false);
            tokio::time::sleep(Duration::from_millis(35)).await;
            tx.send(true).unwrap();
        };

        tokio::join!(scheduler.run(rx), driver);

        assert_eq!(h.store.ids(), vec!["1"]);
        assert!(h.source.account_requests().len() >= 3);
    }

    #[tokio::test]
    async fn run_exits_immediately_when_already_shut_down() {
        let h = harness(MockItemSource::new(), vec![], &[]).await;
        let (_tx, rx) = watch::channel(true);

        h.scheduler.run(rx).await;
        assert_eq!(h.source.calls(), 0);
    }
}
