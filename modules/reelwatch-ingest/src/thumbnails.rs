use std::path::PathBuf;

/// Local directory of downloaded cover images, one `<id>.jpg` per item.
#[derive(Debug, Clone)]
pub struct ThumbnailCache {
    dir: PathBuf,
}

impl ThumbnailCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Where the thumbnail for `item_id` lives. Ids come from an untrusted
    /// API, so anything outside `[A-Za-z0-9_-]` is replaced.
    pub fn path_for(&self, item_id: &str) -> PathBuf {
        let name: String = item_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{name}.jpg"))
    }

    /// Write a thumbnail, creating the directory on first use.
    pub async fn store(&self, item_id: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(item_id);
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }
}
