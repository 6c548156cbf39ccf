// Trait seams for the engine's two external dependencies.
//
// ItemSource: the scraper API (item list per account, stats per item, assets).
// SnapshotStore: whole-snapshot persistence of the item list.
//
// Both have in-memory mocks in `testing` so the engine can be exercised
// without network or disk.

use async_trait::async_trait;
use bytes::Bytes;

use reelwatch_common::{Item, Stats};
use tiktok_client::{RawVideo, TikTokClient};

use crate::error::{FetchError, Result};

// ---------------------------------------------------------------------------
// ItemSource
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ItemSource: Send + Sync {
    /// Latest items for an account (single page of at most `count`).
    async fn account_items(
        &self,
        user_id: &str,
        count: u32,
    ) -> std::result::Result<Vec<RawVideo>, FetchError>;

    /// Current counters for one item. `Ok(None)` when the response carried no stats.
    async fn item_stats(
        &self,
        handle: &str,
        item_id: &str,
    ) -> std::result::Result<Option<Stats>, FetchError>;

    /// Raw bytes of an externally hosted asset.
    async fn asset(&self, url: &str) -> std::result::Result<Bytes, FetchError>;
}

#[async_trait]
impl ItemSource for TikTokClient {
    async fn account_items(
        &self,
        user_id: &str,
        count: u32,
    ) -> std::result::Result<Vec<RawVideo>, FetchError> {
        Ok(self.user_posts(user_id, count).await?)
    }

    async fn item_stats(
        &self,
        handle: &str,
        item_id: &str,
    ) -> std::result::Result<Option<Stats>, FetchError> {
        let info = self.video_info(handle, item_id).await?;
        Ok(info.stats().map(|raw| Stats {
            collect_count: raw.collect_count(),
            comment_count: raw.comment_count(),
            digg_count: raw.digg_count(),
            play_count: raw.play_count(),
            share_count: raw.share_count(),
            ..Stats::default()
        }))
    }

    async fn asset(&self, url: &str) -> std::result::Result<Bytes, FetchError> {
        Ok(self.download(url).await?)
    }
}

// ---------------------------------------------------------------------------
// SnapshotStore
// ---------------------------------------------------------------------------

/// Whole-snapshot persistence: load everything, save everything.
/// A save is all-or-nothing from a reader's point of view.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn load(&self) -> Result<Vec<Item>>;

    async fn save(&self, items: &[Item]) -> Result<()>;
}
