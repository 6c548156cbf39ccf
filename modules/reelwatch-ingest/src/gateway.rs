use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::Semaphore;
use tracing::debug;

use reelwatch_common::Stats;
use tiktok_client::RawVideo;

use crate::error::FetchError;
use crate::traits::ItemSource;

/// Bounded-concurrency front for every external call.
///
/// At most `cap` calls run the underlying request at once. Excess callers
/// wait in arrival order (tokio's semaphore is fair). A failed call only
/// returns its error to its own caller; the permit is released either way.
/// One instance is shared by the scanner fan-out, thumbnail downloads and
/// the metrics refresher.
pub struct FetchGateway {
    source: Arc<dyn ItemSource>,
    permits: Semaphore,
    cap: usize,
}

impl FetchGateway {
    pub fn new(source: Arc<dyn ItemSource>, cap: usize) -> Self {
        let cap = cap.max(1);
        debug!(cap, "Fetch gateway created");
        Self {
            source,
            permits: Semaphore::new(cap),
            cap,
        }
    }

    /// Configured concurrency cap.
    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Calls currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.cap - self.permits.available_permits()
    }

    async fn admit<T, F>(&self, call: F) -> Result<T, FetchError>
    where
        F: Future<Output = Result<T, FetchError>>,
    {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| FetchError::Transient("fetch gateway closed".to_string()))?;
        call.await
    }

    pub async fn account_items(&self, user_id: &str, count: u32) -> Result<Vec<RawVideo>, FetchError> {
        self.admit(self.source.account_items(user_id, count)).await
    }

    pub async fn item_stats(&self, handle: &str, item_id: &str) -> Result<Option<Stats>, FetchError> {
        self.admit(self.source.item_stats(handle, item_id)).await
    }

    pub async fn asset(&self, url: &str) -> Result<Bytes, FetchError> {
        self.admit(self.source.asset(url)).await
    }
}
