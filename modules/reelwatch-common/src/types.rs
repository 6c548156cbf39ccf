use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::lenient;

// Every persisted struct keeps the keys it does not model in `extra`, so a
// load/save cycle rewrites an item without dropping anything nested in it.
// Scalars go through `lenient` so snapshots with numeric strings or nulls load.

// --- Items ---

/// Engagement counters for one item. Counters are always replaced wholesale
/// from the latest fetched snapshot, never adjusted in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Stats {
    #[serde(deserialize_with = "lenient::count")]
    pub collect_count: u64,
    #[serde(deserialize_with = "lenient::count")]
    pub comment_count: u64,
    #[serde(deserialize_with = "lenient::count")]
    pub digg_count: u64,
    #[serde(deserialize_with = "lenient::count")]
    pub play_count: u64,
    #[serde(deserialize_with = "lenient::count")]
    pub share_count: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Stats {
    /// True when every counter matches. Unmodelled keys are ignored.
    pub fn same_counters(&self, other: &Stats) -> bool {
        self.collect_count == other.collect_count
            && self.comment_count == other.comment_count
            && self.digg_count == other.digg_count
            && self.play_count == other.play_count
            && self.share_count == other.share_count
    }

    /// Take every counter from `fresh`, keeping this record's unmodelled keys.
    pub fn replace_counters(&mut self, fresh: &Stats) {
        self.collect_count = fresh.collect_count;
        self.comment_count = fresh.comment_count;
        self.digg_count = fresh.digg_count;
        self.play_count = fresh.play_count;
        self.share_count = fresh.share_count;
    }
}

/// The producing account as echoed on an item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthorRef {
    #[serde(deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(deserialize_with = "lenient::string")]
    pub unique_id: String,
    #[serde(deserialize_with = "lenient::string")]
    pub nickname: String,
    #[serde(deserialize_with = "lenient::string")]
    pub avatar_larger: String,
    #[serde(deserialize_with = "lenient::string")]
    pub avatar_medium: String,
    #[serde(deserialize_with = "lenient::string")]
    pub avatar_thumb: String,
    #[serde(deserialize_with = "lenient::string")]
    pub signature: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Music {
    #[serde(deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(deserialize_with = "lenient::string")]
    pub play_url: String,
    #[serde(deserialize_with = "lenient::string")]
    pub cover_large: String,
    #[serde(deserialize_with = "lenient::string")]
    pub cover_medium: String,
    #[serde(deserialize_with = "lenient::string")]
    pub cover_thumb: String,
    #[serde(deserialize_with = "lenient::string")]
    pub author_name: String,
    #[serde(deserialize_with = "lenient::boolean")]
    pub original: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Externally hosted media URLs for an item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoMedia {
    #[serde(deserialize_with = "lenient::string")]
    pub cover: String,
    #[serde(deserialize_with = "lenient::string")]
    pub dynamic_cover: String,
    #[serde(deserialize_with = "lenient::string")]
    pub origin_cover: String,
    #[serde(deserialize_with = "lenient::string")]
    pub play_addr: String,
    #[serde(deserialize_with = "lenient::string")]
    pub download_addr: String,
    #[serde(deserialize_with = "lenient::count")]
    pub duration: u64,
    #[serde(deserialize_with = "lenient::count")]
    pub width: u64,
    #[serde(deserialize_with = "lenient::count")]
    pub height: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One discovered video, in the persisted snapshot shape.
///
/// `id` is the dedup key and never changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    #[serde(rename = "AIGCDescription", default, deserialize_with = "lenient::string")]
    pub aigc_description: String,
    #[serde(rename = "CategoryType", default, deserialize_with = "lenient::int")]
    pub category_type: i64,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub author: AuthorRef,
    #[serde(default, deserialize_with = "lenient::int")]
    pub create_time: i64,
    #[serde(default, deserialize_with = "lenient::string")]
    pub desc: String,
    #[serde(deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub music: Music,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub stats: Stats,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub video: VideoMedia,
    /// Locally cached cover image, when the download succeeded.
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub local_thumbnail: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Item {
    /// Handle of the producing account.
    pub fn handle(&self) -> &str {
        &self.author.unique_id
    }

    /// True when the item was produced by `handle` (case-insensitive).
    pub fn is_by(&self, handle: &str) -> bool {
        self.author.unique_id.eq_ignore_ascii_case(handle)
    }
}

// --- Accounts ---

/// A tracked producer, as stored in the account book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Human-readable handle. Unique within the book, compared case-insensitively.
    #[serde(deserialize_with = "lenient::string")]
    pub unique_id: String,
    /// Resolved internal identifier. `None` until registration resolves it.
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_id: Option<String>,
    /// Seed reference: `pending_<millis>` or the item the account was harvested from.
    #[serde(
        rename = "id",
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub seed_ref: Option<String>,
}

impl Account {
    pub fn new(handle: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            unique_id: handle.into(),
            user_id: Some(user_id.into()),
            seed_ref: None,
        }
    }

    /// Resolved identifier, treating an empty string as unresolved.
    pub fn resolved_id(&self) -> Option<&str> {
        self.user_id.as_deref().filter(|id| !id.trim().is_empty())
    }

    pub fn same_handle(&self, handle: &str) -> bool {
        self.unique_id.eq_ignore_ascii_case(handle)
    }
}
