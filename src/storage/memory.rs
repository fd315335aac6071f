//! In-memory snapshot store for tests and dry runs.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::Snapshot;
use crate::storage::SnapshotStore;

/// Snapshot store backed by a shared map. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    snapshots: Arc<RwLock<HashMap<String, Snapshot>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing snapshots.
    pub fn with_snapshots(snapshots: impl IntoIterator<Item = Snapshot>) -> Self {
        let map = snapshots
            .into_iter()
            .map(|snapshot| (snapshot.source_id.clone(), snapshot))
            .collect();
        Self {
            snapshots: Arc::new(RwLock::new(map)),
        }
    }

    /// Current snapshot of a source without going through the async trait.
    pub fn get(&self, source_id: &str) -> Option<Snapshot> {
        self.snapshots
            .read()
            .ok()
            .and_then(|map| map.get(source_id).cloned())
    }
}

#[async_trait]
impl SnapshotStore for MemoryStorage {
    async fn load(&self, source_id: &str) -> Result<Option<Snapshot>> {
        let map = self
            .snapshots
            .read()
            .map_err(|_| AppError::storage(source_id, "snapshot map poisoned"))?;
        Ok(map.get(source_id).cloned())
    }

    async fn save(&self, source_id: &str, snapshot: &Snapshot) -> Result<()> {
        let mut map = self
            .snapshots
            .write()
            .map_err(|_| AppError::storage(source_id, "snapshot map poisoned"))?;
        map.insert(source_id.to_string(), snapshot.clone());
        Ok(())
    }
}
