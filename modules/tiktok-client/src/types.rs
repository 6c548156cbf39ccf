use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use reelwatch_common::lenient::{self, coerce_count};

// The scraper API is loose with types; every field goes through `lenient`
// so nothing downstream sees a null.

// --- user/posts ---

/// Wrapper for scraper API responses: `{ code, msg, data }`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default, deserialize_with = "lenient::int")]
    pub code: i64,
    #[serde(default, deserialize_with = "lenient::string")]
    pub msg: String,
    pub data: Option<T>,
}

/// Payload of the `user/posts` endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPostsData {
    #[serde(default, deserialize_with = "lenient::list")]
    pub videos: Vec<RawVideo>,
}

/// A single video as returned by `user/posts`. Untrusted: every field is optional
/// on the wire and defaulted here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawVideo {
    #[serde(default, deserialize_with = "lenient::string")]
    pub video_id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub cover: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub ai_dynamic_cover: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub origin_cover: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub play: String,
    /// Music play URL.
    #[serde(default, deserialize_with = "lenient::string")]
    pub music: String,
    #[serde(default, deserialize_with = "lenient::count")]
    pub duration: u64,
    #[serde(default, deserialize_with = "lenient::int")]
    pub create_time: i64,
    #[serde(default, deserialize_with = "lenient::count")]
    pub play_count: u64,
    #[serde(default, deserialize_with = "lenient::count")]
    pub digg_count: u64,
    #[serde(default, deserialize_with = "lenient::count")]
    pub comment_count: u64,
    #[serde(default, deserialize_with = "lenient::count")]
    pub share_count: u64,
    #[serde(default, deserialize_with = "lenient::count")]
    pub collect_count: u64,
}

// --- video/info_v2 ---

/// Response of the `video/info_v2` endpoint. Only the stats path is modelled.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoInfoResponse {
    #[serde(default, rename = "itemInfo")]
    pub item_info: Option<ItemInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemInfo {
    #[serde(default, rename = "itemStruct")]
    pub item_struct: Option<ItemStruct>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemStruct {
    #[serde(default)]
    pub stats: Option<RawStats>,
}

impl VideoInfoResponse {
    /// The `itemInfo.itemStruct.stats` object, if the response carried one.
    pub fn stats(&self) -> Option<&RawStats> {
        self.item_info
            .as_ref()?
            .item_struct
            .as_ref()?
            .stats
            .as_ref()
    }
}

/// Counter object from the detail endpoint. Keys show up either camelCase or
/// snake_case depending on the upstream version, so it is kept as a raw map.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct RawStats(pub Map<String, Value>);

impl RawStats {
    /// Read a counter, preferring the camelCase key when it is non-zero.
    pub fn counter(&self, camel: &str, snake: &str) -> u64 {
        let read = |key: &str| self.0.get(key).map(coerce_count).unwrap_or(0);
        match read(camel) {
            0 => read(snake),
            n => n,
        }
    }

    pub fn collect_count(&self) -> u64 {
        self.counter("collectCount", "collect_count")
    }

    pub fn comment_count(&self) -> u64 {
        self.counter("commentCount", "comment_count")
    }

    pub fn digg_count(&self) -> u64 {
        self.counter("diggCount", "digg_count")
    }

    pub fn play_count(&self) -> u64 {
        self.counter("playCount", "play_count")
    }

    pub fn share_count(&self) -> u64 {
        self.counter("shareCount", "share_count")
    }
}
