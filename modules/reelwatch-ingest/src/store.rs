use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use reelwatch_common::Item;

use crate::error::{IngestError, Result};
use crate::traits::SnapshotStore;

/// Item store backed by one pretty-printed JSON array on disk.
pub struct JsonSnapshotStore {
    path: PathBuf,
}

impl JsonSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SnapshotStore for JsonSnapshotStore {
    /// A missing file is an empty store. An unreadable or unparseable file is
    /// an error: treating it as empty would overwrite it on the next save.
    async fn load(&self) -> Result<Vec<Item>> {
        match read_json::<Vec<Item>>(&self.path).await? {
            Some(items) => {
                debug!(path = %self.path.display(), count = items.len(), "Loaded item store");
                Ok(items)
            }
            None => {
                info!(path = %self.path.display(), "No existing item store, starting fresh");
                Ok(Vec::new())
            }
        }
    }

    async fn save(&self, items: &[Item]) -> Result<()> {
        write_json_atomic(&self.path, items).await?;
        debug!(path = %self.path.display(), count = items.len(), "Saved item store");
        Ok(())
    }
}

/// Read and parse a JSON file. `Ok(None)` when the file does not exist.
pub(crate) async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(IngestError::Persistence(format!(
                "Failed to read {}: {e}",
                path.display()
            )))
        }
    };

    serde_json::from_slice(&bytes).map(Some).map_err(|e| {
        IngestError::Persistence(format!("Failed to parse {}: {e}", path.display()))
    })
}

/// Serialize `value` and replace `path` with it atomically.
///
/// The bytes go to a temp file in the target's directory, are synced, then
/// renamed over the target. Readers see the old file or the new one, never a
/// partial write; an interrupted save leaves the old file in place.
pub(crate) async fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut bytes = serde_json::to_vec_pretty(value)
        .map_err(|e| IngestError::Persistence(format!("Failed to serialize snapshot: {e}")))?;
    bytes.push(b'\n');

    let target = path.to_path_buf();
    tokio::task::spawn_blocking(move || replace_file(&target, &bytes))
        .await
        .map_err(|e| IngestError::Persistence(format!("Snapshot writer task failed: {e}")))?
}

fn replace_file(target: &Path, bytes: &[u8]) -> Result<()> {
    replace_file_staged(target, bytes, |_| Ok(()))
}

/// `before_persist` runs once the staging file is fully written and synced,
/// while the target still holds the previous snapshot.
fn replace_file_staged(
    target: &Path,
    bytes: &[u8],
    before_persist: impl FnOnce(&Path) -> std::io::Result<()>,
) -> Result<()> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let fail = |what: &str, e: std::io::Error| {
        IngestError::Persistence(format!("Failed to {what} {}: {e}", target.display()))
    };

    std::fs::create_dir_all(&dir).map_err(|e| fail("create directory for", e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| fail("stage", e))?;
    tmp.write_all(bytes).map_err(|e| fail("write", e))?;
    tmp.as_file().sync_all().map_err(|e| fail("sync", e))?;
    before_persist(tmp.path()).map_err(|e| fail("replace", e))?;
    tmp.persist(target).map_err(|e| fail("replace", e.error))?;
    Ok(())
}
