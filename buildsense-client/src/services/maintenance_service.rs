use std::sync::Arc;

use buildsense_api::models::{BuildingId, BuildingRecord, NewBuilding, TelemetryFeed, now_millis};
use serde_json::{Value, json};

use crate::configs::settings::{Maintenance, MaintenanceTask};
use crate::errors::StoreError;
use crate::services::store_service::StoreService;
use crate::store::tree;

const DEVICE_BUILDING_NAME: &str = "ESP32 Main Building";

/// Outcome of [`MaintenanceService::cleanup_structure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupReport {
    /// Batches found in the root telemetry feed
    pub root_batches: usize,
    /// Whether the device-fed building record was reset to metadata only
    pub rewrote_building: bool,
}

/// One-off repair and import routines for the store layout.
pub struct MaintenanceService {
    service: Arc<StoreService>,
}

impl MaintenanceService {
    pub fn new(service: Arc<StoreService>) -> Self {
        Self { service }
    }

    /// Runs the configured task, if any.
    pub async fn perform(&self, maintenance: &Maintenance) -> Result<(), StoreError> {
        let Some(task) = maintenance.task else {
            return Ok(());
        };
        tracing::info!("running maintenance task {:?}", task);

        match task {
            MaintenanceTask::Cleanup => {
                self.cleanup_structure().await?;
            }
            MaintenanceTask::ImportSample => self.import_sample_data().await?,
            MaintenanceTask::ImportDeviceFeed => {
                self.import_batch_data(&sample_feed()).await?;
            }
            MaintenanceTask::ImportBuildings => {
                self.import_as_multiple_buildings(&sample_feed(), maintenance.building_count)
                    .await?;
            }
            MaintenanceTask::Verify => {
                let id = &self.service.layout().device_feed_building;
                if !self.verify_imported_data(id).await {
                    tracing::warn!("building {} has no imported data", id);
                }
            }
        }

        Ok(())
    }

    /// Resets the device-fed building to metadata only, since its readings
    /// belong in the root telemetry feed.
    pub async fn cleanup_structure(&self) -> Result<CleanupReport, StoreError> {
        self.ensure_connected().await?;
        let layout = self.service.layout();
        let store = self.service.store();

        let root = store.get(&layout.telemetry_path).await?;
        let root_batches = root.as_ref().and_then(Value::as_object).map_or(0, |batches| batches.len());
        tracing::info!("found {} batches in root {}", root_batches, layout.telemetry_path);

        let path = layout.building_path(&layout.device_feed_building);
        let rewrote_building = match store.get(&path).await? {
            Some(existing) => {
                let name = existing
                    .get("name")
                    .and_then(Value::as_str)
                    .filter(|name| !name.is_empty())
                    .unwrap_or(DEVICE_BUILDING_NAME);
                let now = now_millis();
                let created_at = existing
                    .get("createdAt")
                    .and_then(Value::as_i64)
                    .filter(|created_at| *created_at > 0)
                    .unwrap_or(now);

                let mut record = NewBuilding::new(name).into_record(now);
                record.created_at = created_at;
                store.set(&path, serde_json::to_value(record)?).await?;

                tracing::info!("cleaned up {} structure", path);
                true
            }
            None => false,
        };

        if root_batches == 0 {
            tracing::warn!("root {} is empty", layout.telemetry_path);
        }

        Ok(CleanupReport {
            root_batches,
            rewrote_building,
        })
    }

    /// Merges `feed` into the root telemetry feed, creating the device-fed
    /// building's metadata when missing. Returns that building's id.
    pub async fn import_batch_data(&self, feed: &TelemetryFeed) -> Result<BuildingId, StoreError> {
        self.ensure_connected().await?;
        let layout = self.service.layout();
        let store = self.service.store();
        let id = layout.device_feed_building.clone();
        let building_path = layout.building_path(&id);

        if store.get(&building_path).await?.is_none() {
            let record = NewBuilding::new(DEVICE_BUILDING_NAME).into_record(now_millis());
            store.set(&building_path, serde_json::to_value(record)?).await?;
            tracing::info!("created {} building metadata", id);
        }

        self.merge_into_root(feed).await?;
        store
            .set(&tree::join(&building_path, "lastUpdated"), Value::from(now_millis()))
            .await?;

        tracing::info!("imported {} batches into root {}", feed.batch_count(), layout.telemetry_path);
        Ok(id)
    }

    /// Spreads the batches of `feed` over up to `count` new buildings.
    pub async fn import_as_multiple_buildings(
        &self,
        feed: &TelemetryFeed,
        count: usize,
    ) -> Result<Vec<BuildingId>, StoreError> {
        self.ensure_connected().await?;

        let mut ids = Vec::new();
        for (index, chunk) in feed.split(count).into_iter().enumerate() {
            let name = format!("Building {}", index + 1);
            let id = self.service.add_building(NewBuilding::new(name.as_str())).await?;

            let path = tree::join(&self.service.layout().building_path(&id), "batch_data");
            self.service.store().set(&path, chunk.to_value()).await?;

            tracing::info!("created and populated {} with id {}", name, id);
            ids.push(id);
        }

        Ok(ids)
    }

    /// Adds the bundled reference batch to the root telemetry feed.
    pub async fn import_sample_data(&self) -> Result<(), StoreError> {
        self.ensure_connected().await?;
        self.merge_into_root(&sample_feed()).await?;

        tracing::info!("sample data imported to root {}", self.service.layout().telemetry_path);
        Ok(())
    }

    /// Whether the building exists with at least one inline batch.
    pub async fn verify_imported_data(&self, id: &str) -> bool {
        if self.ensure_connected().await.is_err() {
            return false;
        }

        let path = self.service.layout().building_path(id);
        match self.service.store().get(&path).await {
            Ok(Some(value)) => match BuildingRecord::from_value(value) {
                Ok((record, _)) => {
                    tracing::info!("building {} has {} batch entries", id, record.feed.batch_count());
                    !record.feed.is_empty()
                }
                Err(e) => {
                    tracing::warn!("building {} is malformed: {}", id, e);
                    false
                }
            },
            Ok(None) => false,
            Err(e) => {
                tracing::error!("data verification failed: {}", e);
                false
            }
        }
    }

    async fn ensure_connected(&self) -> Result<(), StoreError> {
        if self.service.test_connection().await {
            Ok(())
        } else {
            Err(StoreError::Unreachable)
        }
    }

    /// Incoming batch ids replace existing ones; everything else is kept as stored.
    async fn merge_into_root(&self, feed: &TelemetryFeed) -> Result<(), StoreError> {
        let path = &self.service.layout().telemetry_path;
        let store = self.service.store();

        let mut merged = match store.get(path).await? {
            Some(Value::Object(existing)) => existing,
            _ => Default::default(),
        };
        if let Value::Object(incoming) = feed.to_value() {
            merged.extend(incoming);
        }

        store.set(path, Value::Object(merged)).await
    }
}

/// Two upload cycles of the reference installation, batch `16226`.
pub fn sample_feed() -> TelemetryFeed {
    TelemetryFeed::parse(&json!({
        "16226": [
            {
                "E1": {
                    "M1": { "x": -0.8, "y": -1.3, "z": 10.47 },
                    "M2": { "x": 5.25, "y": -3.05, "z": 7.31 }
                },
                "E2": {
                    "S1": { "x": -0.54, "y": -0.12, "z": 9.78 },
                    "S2": { "x": -0.81, "y": -0.17, "z": 10.86 }
                },
                "timestamp": 15804
            },
            {
                "E1": {
                    "M1": { "x": -0.79, "y": -1.35, "z": 10.39 },
                    "M2": { "x": 5.19, "y": -3.13, "z": 7.07 }
                },
                "E2": {
                    "S1": { "x": -0.6, "y": -0.08, "z": 9.91 },
                    "S2": { "x": -0.8, "y": -0.21, "z": 10.85 }
                },
                "timestamp": 15890
            }
        ]
    }))
    .feed
}

#[cfg(test)]
mod tests {
    use buildsense_api::models::BatchEntry;

    use super::*;
    use crate::store::{MemoryStore, RemoteStore, StoreLayout};

    fn maintenance(store: &Arc<MemoryStore>) -> MaintenanceService {
        MaintenanceService::new(Arc::new(StoreService::new(store.clone(), StoreLayout::default())))
    }

    #[tokio::test]
    async fn test_cleanup_strips_inline_feed() {
        let store = Arc::new(MemoryStore::with_root(json!({
            "batch_data": { "b1": [{ "timestamp": 1 }], "b2": [{ "timestamp": 2 }] },
            "buildings": {
                "batch_data": {
                    "name": "Lab",
                    "createdAt": 7,
                    "batch_data": { "b1": [{ "timestamp": 1 }] }
                }
            }
        })));

        let report = maintenance(&store).cleanup_structure().await.unwrap();

        assert_eq!(report, CleanupReport { root_batches: 2, rewrote_building: true });
        let building = store.get("buildings/batch_data").await.unwrap().unwrap();
        assert_eq!(building["name"], json!("Lab"));
        assert_eq!(building["createdAt"], json!(7));
        assert_eq!(building["floors"], json!(["E1", "E2"]));
        assert!(building.get("batch_data").is_none());
    }

    #[tokio::test]
    async fn test_import_batch_data_creates_device_building() {
        let store = Arc::new(MemoryStore::with_root(json!({
            "batch_data": { "old": [{ "timestamp": 1 }], "16226": [{ "timestamp": 2 }] }
        })));

        let id = maintenance(&store).import_batch_data(&sample_feed()).await.unwrap();

        assert_eq!(id, "batch_data");
        let root = store.get("batch_data").await.unwrap().unwrap();
        assert!(root.get("old").is_some());
        assert_eq!(root["16226"][0]["timestamp"], json!(15804));
        let building = store.get("buildings/batch_data").await.unwrap().unwrap();
        assert_eq!(building["name"], json!(DEVICE_BUILDING_NAME));
    }

    #[tokio::test]
    async fn test_import_as_multiple_buildings() {
        let store = Arc::new(MemoryStore::new());
        let maintenance = maintenance(&store);
        let feed: TelemetryFeed = (1..=4)
            .map(|i| (format!("b{i}"), vec![BatchEntry::new(i)]))
            .collect();

        let ids = maintenance.import_as_multiple_buildings(&feed, 3).await.unwrap();

        assert_eq!(ids.len(), 2);
        for id in &ids {
            assert!(maintenance.verify_imported_data(id).await);
        }
        let first = store.get(&format!("buildings/{}", ids[0])).await.unwrap().unwrap();
        assert_eq!(first["name"], json!("Building 1"));
        assert_eq!(first["batch_data"].as_object().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_requires_connectivity() {
        let store = Arc::new(MemoryStore::new());
        store.set_offline(true);
        let maintenance = maintenance(&store);

        assert!(matches!(maintenance.import_sample_data().await, Err(StoreError::Unreachable)));
        assert!(matches!(maintenance.cleanup_structure().await, Err(StoreError::Unreachable)));
        assert!(!maintenance.verify_imported_data("batch_data").await);
    }

    #[tokio::test]
    async fn test_verify_missing_or_empty() {
        let store = Arc::new(MemoryStore::with_root(json!({ "buildings": { "a": { "name": "A" } } })));
        let maintenance = maintenance(&store);

        assert!(!maintenance.verify_imported_data("a").await);
        assert!(!maintenance.verify_imported_data("missing").await);
    }

    #[tokio::test]
    async fn test_perform_configured_task() {
        let store = Arc::new(MemoryStore::new());
        let maintenance = maintenance(&store);

        maintenance.perform(&Maintenance::default()).await.unwrap();
        assert_eq!(store.snapshot(), Value::Null);

        let import = Maintenance {
            task: Some(MaintenanceTask::ImportDeviceFeed),
            ..Maintenance::default()
        };
        maintenance.perform(&import).await.unwrap();

        assert_eq!(store.get("batch_data/16226/1/timestamp").await.unwrap(), Some(json!(15890)));
        assert!(store.get("buildings/batch_data").await.unwrap().is_some());

        let verify = Maintenance {
            task: Some(MaintenanceTask::Verify),
            ..Maintenance::default()
        };
        maintenance.perform(&verify).await.unwrap();
    }

    #[tokio::test]
    async fn test_perform_reports_unreachable_store() {
        let store = Arc::new(MemoryStore::new());
        store.set_offline(true);
        let cleanup = Maintenance {
            task: Some(MaintenanceTask::Cleanup),
            ..Maintenance::default()
        };

        assert!(matches!(maintenance(&store).perform(&cleanup).await, Err(StoreError::Unreachable)));
    }
}
