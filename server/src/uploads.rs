use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Flat directory of uploaded targets, addressed by generated file ids.
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store `data` under a fresh id that keeps the extension of `original_name`.
    pub async fn save(&self, original_name: &str, data: &[u8]) -> io::Result<String> {
        let file_id = format!("{}{}", Uuid::new_v4(), extension_of(original_name));
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.root.join(&file_id), data).await?;
        tracing::debug!(%file_id, bytes = data.len(), "stored upload");
        Ok(file_id)
    }
}

/// `.ext` of a client-supplied file name, or nothing if it is missing or odd.
fn extension_of(original_name: &str) -> String {
    let base = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original_name);
    Path::new(base)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default()
}
