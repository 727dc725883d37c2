//! Resume file persistence. Uploaded files land under a server-generated
//! name: a fresh UUID plus the sanitized extension of the client filename.
//! The client's own filename is never trusted or stored.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use uuid::Uuid;

#[derive(Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        UploadStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persists the file content and returns the generated filename. The
    /// uploads directory is created on first use.
    pub async fn save_resume(&self, original_name: &str, content: &[u8]) -> Result<String> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("creating uploads dir {}", self.dir.display()))?;

        let filename = match sanitized_extension(original_name) {
            Some(ext) => format!("{}.{ext}", Uuid::new_v4()),
            None => Uuid::new_v4().to_string(),
        };
        let path = self.dir.join(&filename);
        tokio::fs::write(&path, content)
            .await
            .with_context(|| format!("writing upload {}", path.display()))?;
        Ok(filename)
    }
}

/// Extracts a lowercase alphanumeric extension from a client filename.
/// Anything else (no dot, traversal characters, oversized) is discarded.
fn sanitized_extension(original_name: &str) -> Option<String> {
    let ext = original_name.rsplit('.').next()?;
    if ext == original_name || ext.is_empty() || ext.len() > 10 {
        return None;
    }
    let ext = ext.to_lowercase();
    if ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        Some(ext)
    } else {
        None
    }
}
