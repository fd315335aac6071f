//! Storage abstractions for snapshot and subscriber persistence.
//!
//! ## Layout
//!
//! ```text
//! {root}/
//! ├── config.toml           # Watcher configuration
//! ├── subscribers.json      # Subscriber directory (read-only for the watcher)
//! └── snapshots/            # One current snapshot per source
//!     ├── meisengeige.json
//!     └── {source_id}.json
//! ```
//!
//! A missing snapshot is `Ok(None)` (first run for that source); only an
//! unreadable or corrupt one is an error.

pub mod local;
pub mod memory;
#[cfg(feature = "s3")]
pub mod s3;
pub mod subscribers;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::Snapshot;

pub use local::LocalStorage;
pub use memory::MemoryStorage;
#[cfg(feature = "s3")]
pub use s3::S3Storage;
pub use subscribers::{StaticSubscribers, SubscriberDirectory, parse_subscribers};

/// Persistence for the last-known snapshot of each source.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Load the current snapshot for a source, `None` if none was ever saved.
    async fn load(&self, source_id: &str) -> Result<Option<Snapshot>>;

    /// Replace the current snapshot for a source.
    ///
    /// Implementations must commit in a single step: a concurrent `load`
    /// sees either the old or the new snapshot, never a partial write.
    async fn save(&self, source_id: &str, snapshot: &Snapshot) -> Result<()>;
}

/// Storage key of a source's snapshot below the snapshot directory.
pub fn snapshot_key(snapshot_dir: &str, source_id: &str) -> String {
    let dir = snapshot_dir.trim_matches('/');
    if dir.is_empty() {
        format!("{source_id}.json")
    } else {
        format!("{dir}/{source_id}.json")
    }
}

/// Decode stored snapshot bytes, checking they belong to `source_id`.
pub(crate) fn decode_snapshot(key: &str, source_id: &str, bytes: &[u8]) -> Result<Snapshot> {
    let snapshot = Snapshot::from_json(bytes)
        .map_err(|e| AppError::storage(key, format!("corrupt snapshot: {e}")))?;
    if snapshot.source_id != source_id {
        return Err(AppError::storage(
            key,
            format!(
                "snapshot belongs to '{}', expected '{source_id}'",
                snapshot.source_id
            ),
        ));
    }
    Ok(snapshot)
}
