use serde_json::Map;
use tracing::{debug, info, warn};

use reelwatch_common::{Account, AuthorRef, Item, Music, Stats, VideoMedia};
use tiktok_client::RawVideo;

use crate::gateway::FetchGateway;
use crate::known_ids::KnownIds;
use crate::thumbnails::ThumbnailCache;

/// Frame size recorded for newly discovered videos.
const VIDEO_WIDTH: u64 = 576;
const VIDEO_HEIGHT: u64 = 1024;

/// Scans one account for items not yet in the known-id index.
pub struct AccountScanner<'a> {
    gateway: &'a FetchGateway,
    thumbnails: &'a ThumbnailCache,
    page_size: u32,
}

impl<'a> AccountScanner<'a> {
    pub fn new(gateway: &'a FetchGateway, thumbnails: &'a ThumbnailCache, page_size: u32) -> Self {
        Self {
            gateway,
            thumbnails,
            page_size,
        }
    }

    /// Return the account's new items, claiming each id in `known` as it is
    /// accepted. Never fails: a fetch failure or an unresolved account is
    /// logged and yields an empty list.
    pub async fn scan(&self, account: &Account, known: &KnownIds) -> Vec<Item> {
        let handle = account.unique_id.as_str();
        let Some(user_id) = account.resolved_id() else {
            warn!(handle, "Account has no resolved user id, skipping");
            return Vec::new();
        };

        let raw_items = match self.gateway.account_items(user_id, self.page_size).await {
            Ok(items) => items,
            Err(e) => {
                warn!(handle, user_id, error = %e, "Failed to fetch account items");
                return Vec::new();
            }
        };

        let mut new_items = Vec::new();
        for raw in raw_items {
            if raw.video_id.is_empty() {
                debug!(handle, "Skipping raw item without an id");
                continue;
            }
            if !known.claim(&raw.video_id) {
                continue;
            }

            info!(handle, item_id = %raw.video_id, "New item found");
            let mut item = shape_item(&raw, user_id, handle);
            if !raw.ai_dynamic_cover.is_empty() {
                item.local_thumbnail = self.fetch_thumbnail(&item.id, &raw.ai_dynamic_cover).await;
            }
            new_items.push(item);
        }

        new_items
    }

    /// Best-effort cover download. Failures are logged and leave the item
    /// without a local path.
    async fn fetch_thumbnail(&self, item_id: &str, url: &str) -> Option<String> {
        let bytes = match self.gateway.asset(url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(item_id, error = %e, "Error downloading thumbnail");
                return None;
            }
        };

        match self.thumbnails.store(item_id, &bytes).await {
            Ok(path) => Some(path.to_string_lossy().into_owned()),
            Err(e) => {
                warn!(item_id, error = %e, "Error saving thumbnail");
                None
            }
        }
    }
}

/// Convert a raw API record into the stored item shape. The account's own
/// id and handle are authoritative over the record's author echo.
pub fn shape_item(raw: &RawVideo, user_id: &str, handle: &str) -> Item {
    Item {
        aigc_description: String::new(),
        category_type: 0,
        author: AuthorRef {
            id: user_id.to_string(),
            unique_id: handle.to_string(),
            nickname: handle.to_string(),
            ..AuthorRef::default()
        },
        create_time: raw.create_time,
        desc: raw.title.clone(),
        id: raw.video_id.clone(),
        music: Music {
            play_url: raw.music.clone(),
            author_name: handle.to_string(),
            ..Music::default()
        },
        stats: Stats {
            collect_count: raw.collect_count,
            comment_count: raw.comment_count,
            digg_count: raw.digg_count,
            play_count: raw.play_count,
            share_count: raw.share_count,
            extra: Map::new(),
        },
        video: VideoMedia {
            cover: raw.cover.clone(),
            dynamic_cover: raw.ai_dynamic_cover.clone(),
            origin_cover: raw.origin_cover.clone(),
            play_addr: raw.play.clone(),
            download_addr: raw.play.clone(),
            duration: raw.duration,
            width: VIDEO_WIDTH,
            height: VIDEO_HEIGHT,
            extra: Map::new(),
        },
        local_thumbnail: None,
        extra: Map::new(),
    }
}
