//! AWS S3 storage implementation.
//!
//! Keys mirror the local layout below a configurable prefix:
//! `{prefix}/snapshots/{source_id}.json` and `{prefix}/subscribers.json`.
//! A single `PutObject` replaces a snapshot, so readers never see a partial one.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;

use crate::error::{AppError, Result};
use crate::models::{Snapshot, StorageConfig, Subscriber};
use crate::storage::{
    SnapshotStore, SubscriberDirectory, decode_snapshot, parse_subscribers, snapshot_key,
};

/// S3-backed snapshot and subscriber storage.
#[derive(Debug, Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
    prefix: String,
    snapshot_dir: String,
    subscribers_file: String,
}

impl S3Storage {
    /// Create a new S3 storage instance with default locations.
    pub fn new(client: Client, bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        let defaults = StorageConfig::default();
        Self {
            client,
            bucket: bucket.into(),
            prefix: prefix.into().trim_matches('/').to_string(),
            snapshot_dir: defaults.snapshot_dir,
            subscribers_file: defaults.subscribers_file,
        }
    }

    /// Create S3 storage from environment configuration (`S3_BUCKET`, `S3_PREFIX`).
    pub async fn from_env() -> Result<Self> {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let client = Client::new(&config);

        let bucket =
            std::env::var("S3_BUCKET").map_err(|_| AppError::config("S3_BUCKET is not set"))?;
        let prefix = std::env::var("S3_PREFIX").unwrap_or_else(|_| "cinewatch".to_string());

        Ok(Self::new(client, bucket, prefix))
    }

    /// Use the configured snapshot and subscriber locations.
    pub fn with_config(mut self, config: &StorageConfig) -> Self {
        self.snapshot_dir = config.snapshot_dir.clone();
        self.subscribers_file = config.subscribers_file.clone();
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Full object key for a key relative to the prefix.
    pub fn key(&self, relative: &str) -> String {
        if self.prefix.is_empty() {
            relative.to_string()
        } else {
            format!("{}/{}", self.prefix, relative.trim_start_matches('/'))
        }
    }

    /// Read an object, returning None if it does not exist.
    pub async fn read_bytes_optional(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match result {
            Ok(output) => {
                let bytes = output
                    .body
                    .collect()
                    .await
                    .map_err(|e| AppError::storage(key, e))?;
                Ok(Some(bytes.into_bytes().to_vec()))
            }
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_no_such_key() {
                    log::info!("No object at s3://{}/{}", self.bucket, key);
                    Ok(None)
                } else {
                    Err(AppError::storage(key, service_err))
                }
            }
        }
    }

    /// Write an object in one request.
    pub async fn write_bytes(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type("application/json")
            .send()
            .await
            .map_err(|e| AppError::storage(key, e.into_service_error()))?;
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for S3Storage {
    async fn load(&self, source_id: &str) -> Result<Option<Snapshot>> {
        let key = self.key(&snapshot_key(&self.snapshot_dir, source_id));
        match self.read_bytes_optional(&key).await? {
            Some(bytes) => decode_snapshot(&key, source_id, &bytes).map(Some),
            None => Ok(None),
        }
    }

    async fn save(&self, source_id: &str, snapshot: &Snapshot) -> Result<()> {
        let key = self.key(&snapshot_key(&self.snapshot_dir, source_id));
        self.write_bytes(&key, snapshot.to_json()?).await?;
        log::info!(
            "Wrote snapshot of {} entries to s3://{}/{}",
            snapshot.len(),
            self.bucket,
            key
        );
        Ok(())
    }
}

#[async_trait]
impl SubscriberDirectory for S3Storage {
    async fn list_subscribers(&self, source_id: &str) -> Result<Vec<Subscriber>> {
        let key = self.key(&self.subscribers_file);
        let Some(bytes) = self.read_bytes_optional(&key).await? else {
            log::warn!("No subscriber file at s3://{}/{}", self.bucket, key);
            return Ok(Vec::new());
        };
        let all = parse_subscribers(&bytes).map_err(|e| AppError::storage(&key, e))?;
        Ok(all
            .into_iter()
            .filter(|subscriber| subscriber.is_subscribed(source_id))
            .collect())
    }
}
