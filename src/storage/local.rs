//! Local filesystem checkpoint.
//!
//! The checkpoint is a pretty-printed JSON array of competition records,
//! rewritten atomically (temp file + rename) on every save.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::CompetitionRecord;
use crate::storage::CheckpointStore;

/// JSON file checkpoint backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    path: PathBuf,
}

impl LocalStorage {
    /// Create a LocalStorage backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        self.ensure_dir().await?;

        let tmp = self.path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(&bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        match self.read_bytes().await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl CheckpointStore for LocalStorage {
    async fn load(&self) -> Result<Vec<CompetitionRecord>> {
        match self.read_json::<Vec<CompetitionRecord>>().await {
            Ok(Some(records)) => Ok(records),
            Ok(None) => {
                log::info!("No checkpoint at {} yet", self.path.display());
                Ok(Vec::new())
            }
            Err(e) => Err(AppError::persistence(format!(
                "reading {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    async fn save(&self, records: &[CompetitionRecord]) -> Result<()> {
        self.write_json(records).await.map_err(|e| {
            AppError::persistence(format!("writing {}: {}", self.path.display(), e))
        })?;
        log::info!(
            "Checkpoint saved: {} competitions to {}",
            records.len(),
            self.path.display()
        );
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
