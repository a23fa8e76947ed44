//! Object storage for generated decks

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::ApiError;

const DEFAULT_FILE_NAME: &str = "presentation";
const EXTENSION: &str = ".pptx";

/// Stores generated files and returns a URL they can be downloaded from
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<String, ApiError>;
}

/// Stores files below a local directory
pub struct LocalStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self { root: root.into(), public_base_url: public_base_url.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, ApiError> {
        let relative = Path::new(key);
        let is_plain = !key.is_empty()
            && relative.components().all(|c| matches!(c, Component::Normal(_)));
        if !is_plain {
            return Err(ApiError::StorageUpload(format!("invalid storage key {:?}", key)));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<String, ApiError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ApiError::StorageUpload(e.to_string()))?;
        }
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| ApiError::StorageUpload(e.to_string()))?;
        debug!(path = %path.display(), size = bytes.len(), "stored generated deck");
        Ok(format!("{}/{}", self.public_base_url.trim_end_matches('/'), key))
    }
}

/// Clean a requested output name: word characters, `-` and `.` are kept,
/// runs of anything else become one `_`, separators are trimmed from both
/// ends and the `.pptx` extension is ensured.
pub fn sanitize_file_name(requested: Option<&str>) -> String {
    let requested = requested.map(str::trim).unwrap_or_default();
    let stem = match requested.len().checked_sub(EXTENSION.len()) {
        Some(split)
            if requested.is_char_boundary(split)
                && requested[split..].eq_ignore_ascii_case(EXTENSION) =>
        {
            &requested[..split]
        }
        _ => requested,
    };

    let cleaned = clean_segment(stem);
    let stem = if cleaned.is_empty() { DEFAULT_FILE_NAME } else { cleaned.as_str() };
    format!("{}{}", stem, EXTENSION)
}

/// `<user>/<timestamp-ms>_<file name>`
pub fn storage_key(user: &str, file_name: &str, timestamp_ms: i64) -> String {
    let user = clean_segment(user);
    let user = if user.is_empty() { "anonymous" } else { user.as_str() };
    format!("{}/{}_{}", user, timestamp_ms, file_name)
}

fn clean_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
            out.push(c);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches(|c| matches!(c, '_' | '-' | '.')).to_string()
}
