use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::schemas::Collection;

/// Loads and saves the whole group collection as a single unit.
#[async_trait]
pub trait GroupStore: Send + Sync {
    /// Returns every group; an empty collection if nothing was saved yet.
    async fn load(&self) -> Result<Collection, StoreError>;

    /// Replaces the persisted collection.
    async fn save(&self, groups: &Collection) -> Result<(), StoreError>;
}

/// Process-local store. Its contents are lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    groups: Mutex<Collection>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GroupStore for MemoryStore {
    async fn load(&self) -> Result<Collection, StoreError> {
        Ok(self.groups.lock().await.clone())
    }

    async fn save(&self, groups: &Collection) -> Result<(), StoreError> {
        *self.groups.lock().await = groups.clone();
        Ok(())
    }
}
