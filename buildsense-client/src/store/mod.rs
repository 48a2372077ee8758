mod firebase;
mod memory;
mod push_id;
mod sse;
pub mod tree;

pub use firebase::FirebaseStore;
pub use memory::MemoryStore;
pub use push_id::PushIdGenerator;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;

use crate::configs::settings::Store;
use crate::errors::StoreError;

/// Full value at a path, re-sent on every change. The first item is the
/// value at registration time; `None` means nothing is stored there.
pub type SnapshotStream = BoxStream<'static, Result<Option<Value>, StoreError>>;

/// Hierarchical key-value realtime database.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError>;

    /// Replaces the value at `path`. Writing `null` or an empty object deletes.
    async fn set(&self, path: &str, value: Value) -> Result<(), StoreError>;

    /// Deleting an absent path succeeds.
    async fn remove(&self, path: &str) -> Result<(), StoreError>;

    /// Reserves a new unique child key under `collection`.
    async fn push(&self, collection: &str) -> Result<String, StoreError>;

    /// Registers for change notifications. Dropping the stream unregisters.
    async fn subscribe(&self, path: &str) -> Result<SnapshotStream, StoreError>;

    /// Cheapest read proving the store answers.
    async fn probe(&self) -> Result<(), StoreError> {
        self.get("").await.map(|_| ())
    }
}

/// Where each collection lives in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    pub buildings_path: String,
    pub telemetry_path: String,
    pub connectivity_path: String,
    /// Building whose feed lives at `telemetry_path` instead of inline
    pub device_feed_building: String,
}

impl StoreLayout {
    pub fn building_path(&self, id: &str) -> String {
        tree::join(&self.buildings_path, id)
    }
}

impl Default for StoreLayout {
    fn default() -> Self {
        Self {
            buildings_path: "buildings".to_string(),
            telemetry_path: "batch_data".to_string(),
            connectivity_path: ".info/connected".to_string(),
            device_feed_building: "batch_data".to_string(),
        }
    }
}

impl From<&Store> for StoreLayout {
    fn from(store: &Store) -> Self {
        Self {
            buildings_path: store.buildings_path.clone(),
            telemetry_path: store.telemetry_path.clone(),
            connectivity_path: store.connectivity_path.clone(),
            device_feed_building: store.device_feed_building.clone(),
        }
    }
}
