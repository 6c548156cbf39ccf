// Test mocks for the ingestion engine.
//
// Two mocks matching the two trait boundaries:
// - MockItemSource (ItemSource): HashMap-based account/item/asset responses,
//   with optional latency and in-flight tracking for concurrency assertions
// - MemorySnapshotStore (SnapshotStore): in-memory snapshot with save counting
//   and switchable failures
//
// Plus helpers for constructing raw videos, items, accounts and stats.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use reelwatch_common::{Account, AuthorRef, Item, Stats};
use tiktok_client::RawVideo;

use crate::error::{FetchError, IngestError, Result};
use crate::traits::{ItemSource, SnapshotStore};

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn stats(digg_count: u64) -> Stats {
    Stats {
        digg_count,
        ..Stats::default()
    }
}

pub fn raw_video(id: &str, create_time: i64) -> RawVideo {
    RawVideo {
        video_id: id.to_string(),
        title: format!("video {id}"),
        create_time,
        ..RawVideo::default()
    }
}

pub fn item(id: &str, handle: &str, create_time: i64) -> Item {
    Item {
        aigc_description: String::new(),
        category_type: 0,
        author: AuthorRef {
            id: format!("uid-{handle}"),
            unique_id: handle.to_string(),
            nickname: handle.to_string(),
            ..AuthorRef::default()
        },
        create_time,
        desc: format!("video {id}"),
        id: id.to_string(),
        music: Default::default(),
        stats: Stats::default(),
        video: Default::default(),
        local_thumbnail: None,
        extra: Default::default(),
    }
}

pub fn account(handle: &str, user_id: &str) -> Account {
    Account::new(handle, user_id)
}

// ---------------------------------------------------------------------------
// MockItemSource
// ---------------------------------------------------------------------------

/// Scripted item source. Unregistered accounts return an empty list,
/// unregistered stats return `Ok(None)`, unregistered assets fail.
pub struct MockItemSource {
    accounts: Mutex<HashMap<String, Vec<RawVideo>>>,
    stats: Mutex<HashMap<String, Stats>>,
    assets: HashMap<String, Bytes>,
    failing_accounts: HashSet<String>,
    failing_stats: HashSet<String>,
    latency: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    account_requests: Mutex<Vec<(String, u32)>>,
    stat_requests: Mutex<Vec<String>>,
}

impl MockItemSource {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            stats: Mutex::new(HashMap::new()),
            assets: HashMap::new(),
            failing_accounts: HashSet::new(),
            failing_stats: HashSet::new(),
            latency: None,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            account_requests: Mutex::new(Vec::new()),
            stat_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn on_account(self, user_id: &str, videos: Vec<RawVideo>) -> Self {
        self.set_account_items(user_id, videos);
        self
    }

    pub fn on_asset(mut self, url: &str, bytes: &[u8]) -> Self {
        self.assets.insert(url.to_string(), Bytes::copy_from_slice(bytes));
        self
    }

    /// Make the account-list fetch for `user_id` fail.
    pub fn failing_account(mut self, user_id: &str) -> Self {
        self.failing_accounts.insert(user_id.to_string());
        self
    }

    /// Make the stats fetch for `item_id` fail.
    pub fn failing_stats(mut self, item_id: &str) -> Self {
        self.failing_stats.insert(item_id.to_string());
        self
    }

    /// Hold every call for `latency` so calls overlap.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn set_account_items(&self, user_id: &str, videos: Vec<RawVideo>) {
        self.accounts.lock().unwrap().insert(user_id.to_string(), videos);
    }

    pub fn set_stats(&self, item_id: &str, stats: Stats) {
        self.stats.lock().unwrap().insert(item_id.to_string(), stats);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn account_requests(&self) -> Vec<(String, u32)> {
        self.account_requests.lock().unwrap().clone()
    }

    pub fn stat_requests(&self) -> Vec<String> {
        self.stat_requests.lock().unwrap().clone()
    }

    async fn enter(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn exit(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Default for MockItemSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ItemSource for MockItemSource {
    async fn account_items(
        &self,
        user_id: &str,
        count: u32,
    ) -> std::result::Result<Vec<RawVideo>, FetchError> {
        self.enter().await;
        self.account_requests
            .lock()
            .unwrap()
            .push((user_id.to_string(), count));

        let result = if self.failing_accounts.contains(user_id) {
            Err(FetchError::Transient(format!(
                "API error (status 429): MockItemSource: throttled {user_id}"
            )))
        } else {
            let videos = self.accounts.lock().unwrap().get(user_id).cloned().unwrap_or_default();
            Ok(videos.into_iter().take(count as usize).collect())
        };
        self.exit();
        result
    }

    async fn item_stats(
        &self,
        _handle: &str,
        item_id: &str,
    ) -> std::result::Result<Option<Stats>, FetchError> {
        self.enter().await;
        self.stat_requests.lock().unwrap().push(item_id.to_string());

        let result = if self.failing_stats.contains(item_id) {
            Err(FetchError::Transient(format!(
                "MockItemSource: stats failed for {item_id}"
            )))
        } else {
            Ok(self.stats.lock().unwrap().get(item_id).cloned())
        };
        self.exit();
        result
    }

    async fn asset(&self, url: &str) -> std::result::Result<Bytes, FetchError> {
        self.enter().await;
        let result = self.assets.get(url).cloned().ok_or_else(|| {
            FetchError::Transient(format!("MockItemSource: no asset registered for {url}"))
        });
        self.exit();
        result
    }
}

// ---------------------------------------------------------------------------
// MemorySnapshotStore
// ---------------------------------------------------------------------------

/// In-memory item store. Thread-safe via interior Mutex.
pub struct MemorySnapshotStore {
    items: Mutex<Vec<Item>>,
    saves: AtomicUsize,
    fail_saves: AtomicBool,
    fail_loads: AtomicBool,
}

impl MemorySnapshotStore {
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            items: Mutex::new(items),
            saves: AtomicUsize::new(0),
            fail_saves: AtomicBool::new(false),
            fail_loads: AtomicBool::new(false),
        }
    }

    pub fn items(&self) -> Vec<Item> {
        self.items.lock().unwrap().clone()
    }

    pub fn ids(&self) -> Vec<String> {
        self.items.lock().unwrap().iter().map(|i| i.id.clone()).collect()
    }

    /// Overwrite the contents without counting a save, as another writer would.
    pub fn replace(&self, items: Vec<Item>) {
        *self.items.lock().unwrap() = items;
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn load(&self) -> Result<Vec<Item>> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(IngestError::Persistence("MemorySnapshotStore: load failed".to_string()));
        }
        Ok(self.items())
    }

    async fn save(&self, items: &[Item]) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(IngestError::Persistence("MemorySnapshotStore: save failed".to_string()));
        }
        *self.items.lock().unwrap() = items.to_vec();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
