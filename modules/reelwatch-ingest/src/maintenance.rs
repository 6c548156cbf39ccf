// Store upkeep outside the ingestion path: dropping an account's items and
// growing the account book from authors already present in the store.

use std::collections::HashSet;

use tracing::info;

use reelwatch_common::{Account, Item};

use crate::error::Result;
use crate::traits::SnapshotStore;

/// Remove every item by `handle` (case-insensitive) from the store. Returns
/// the removed ids so a caller holding a live [`KnownIds`] can forget them.
///
/// [`KnownIds`]: crate::known_ids::KnownIds
pub async fn prune_account(store: &dyn SnapshotStore, handle: &str) -> Result<Vec<String>> {
    let snapshot = store.load().await?;
    let (removed, kept): (Vec<Item>, Vec<Item>) = snapshot.into_iter().partition(|item| item.is_by(handle));

    if removed.is_empty() {
        info!(handle, "No items to prune");
        return Ok(Vec::new());
    }

    store.save(&kept).await?;

    info!(handle, removed = removed.len(), remaining = kept.len(), "Pruned account items");
    Ok(removed.into_iter().map(|item| item.id).collect())
}

/// Accounts for item authors that are not tracked yet, matched by user id or
/// handle. Each is seeded with the first item it was seen on.
pub fn harvest_accounts(items: &[Item], tracked: &[Account]) -> Vec<Account> {
    let mut seen_ids: HashSet<String> = tracked
        .iter()
        .filter_map(|a| a.resolved_id().map(str::to_string))
        .collect();
    let mut seen_handles: HashSet<String> = tracked
        .iter()
        .map(|a| a.unique_id.to_ascii_lowercase())
        .collect();

    let mut harvested = Vec::new();
    for item in items {
        let author = &item.author;
        if author.id.is_empty() || author.unique_id.is_empty() {
            continue;
        }
        if seen_ids.contains(&author.id) || seen_handles.contains(&author.unique_id.to_ascii_lowercase()) {
            continue;
        }

        seen_ids.insert(author.id.clone());
        seen_handles.insert(author.unique_id.to_ascii_lowercase());
        harvested.push(Account {
            unique_id: author.unique_id.clone(),
            user_id: Some(author.id.clone()),
            seed_ref: Some(item.id.clone()),
        });
    }

    harvested
}
