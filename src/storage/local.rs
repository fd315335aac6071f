//! Local filesystem storage implementation.
//!
//! Used for development and for single-host deployments; the Lambda build
//! uses `S3Storage` instead.
//!
//! Snapshots are written to a uniquely named temp file next to the target and
//! renamed over it, so a reader never observes a half-written snapshot.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{Snapshot, StorageConfig, Subscriber};
use crate::storage::{
    SnapshotStore, SubscriberDirectory, decode_snapshot, parse_subscribers, snapshot_key,
};

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
    snapshot_dir: String,
    subscribers_file: String,
}

impl LocalStorage {
    /// Create a LocalStorage rooted at the given directory with default locations.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self::with_config(root_dir, &StorageConfig::default())
    }

    /// Create a LocalStorage using the configured snapshot and subscriber locations.
    pub fn with_config(root_dir: impl Into<PathBuf>, config: &StorageConfig) -> Self {
        Self {
            root_dir: root_dir.into(),
            snapshot_dir: config.snapshot_dir.clone(),
            subscribers_file: config.subscribers_file.clone(),
        }
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension(format!(
            "{}.{}.tmp",
            std::process::id(),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        let written = async {
            let mut file = tokio::fs::File::create(&tmp).await?;
            file.write_all(bytes).await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&tmp, &path).await
        }
        .await;

        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Read bytes, returning None if the file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.path(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::storage(key, e)),
        }
    }
}

#[async_trait]
impl SnapshotStore for LocalStorage {
    async fn load(&self, source_id: &str) -> Result<Option<Snapshot>> {
        let key = snapshot_key(&self.snapshot_dir, source_id);
        match self.read_bytes(&key).await? {
            Some(bytes) => decode_snapshot(&key, source_id, &bytes).map(Some),
            None => {
                log::debug!("No snapshot at {}", self.path(&key).display());
                Ok(None)
            }
        }
    }

    async fn save(&self, source_id: &str, snapshot: &Snapshot) -> Result<()> {
        let key = snapshot_key(&self.snapshot_dir, source_id);
        let bytes = snapshot.to_json()?;
        self.write_bytes(&key, &bytes)
            .await
            .map_err(|e| AppError::storage(&key, e))?;
        log::info!(
            "Saved snapshot of {} entries to {}",
            snapshot.len(),
            self.path(&key).display()
        );
        Ok(())
    }
}

#[async_trait]
impl SubscriberDirectory for LocalStorage {
    async fn list_subscribers(&self, source_id: &str) -> Result<Vec<Subscriber>> {
        let key = self.subscribers_file.as_str();
        let Some(bytes) = self.read_bytes(key).await? else {
            log::warn!("No subscriber file at {}", self.path(key).display());
            return Ok(Vec::new());
        };
        let all = parse_subscribers(&bytes).map_err(|e| AppError::storage(key, e))?;
        Ok(all
            .into_iter()
            .filter(|subscriber| subscriber.is_subscribed(source_id))
            .collect())
    }
}
