use std::sync::{Arc, Mutex, MutexGuard};

use buildsense_api::models::{
    Building, BuildingId, BuildingRecord, DebugLevel, DebugLogEntry, NewBuilding, TelemetryFeed, now_millis,
};
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::configs::Settings;
use crate::errors::StoreError;
use crate::services::debug_log::DebugLog;
use crate::services::merge::{BuildingMerger, MergeInput};
use crate::services::subscription::{self, Registration, Subscription};
use crate::store::{FirebaseStore, RemoteStore, SnapshotStream, StoreLayout, tree};

/// Remote store adapter: typed reads, writes and change subscriptions over
/// the building collection and the root telemetry feed.
pub struct StoreService {
    store: Arc<dyn RemoteStore>,
    layout: StoreLayout,
    debug: Arc<DebugLog>,
    registry: Mutex<Vec<Arc<Registration>>>,
}

impl StoreService {
    pub fn new(store: Arc<dyn RemoteStore>, layout: StoreLayout) -> Self {
        Self {
            store,
            layout,
            debug: Arc::new(DebugLog::new()),
            registry: Mutex::new(Vec::new()),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            Arc::new(FirebaseStore::from_settings(&settings.store)),
            StoreLayout::from(&settings.store),
        )
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    pub(crate) fn store(&self) -> &Arc<dyn RemoteStore> {
        &self.store
    }

    /// Replaces the debug log listener.
    pub fn set_debug_listener(&self, listener: impl Fn(DebugLogEntry) + Send + Sync + 'static) {
        self.debug.set_listener(Arc::new(listener));
    }

    pub fn clear_debug_listener(&self) {
        self.debug.clear_listener();
    }

    pub fn log(&self, level: DebugLevel, message: impl Into<String>, data: Option<Value>) {
        self.debug.log(level, message, data);
    }

    /// Reads the connectivity flag, falling back to a root read when it is
    /// unavailable or not `true`. Never fails.
    pub async fn test_connection(&self) -> bool {
        self.debug.info("Testing store connection");

        match self.store.get(&self.layout.connectivity_path).await {
            Ok(Some(Value::Bool(true))) => {
                self.debug.info(format!("Connection test: connected via {}", self.layout.connectivity_path));
                return true;
            }
            Ok(_) => {}
            Err(error) => self.debug.warning(
                format!("Failed to check {}, trying root read", self.layout.connectivity_path),
                Some(error.to_value()),
            ),
        }

        match self.store.probe().await {
            Ok(()) => {
                self.debug.info("Connection test: connected via root read");
                true
            }
            Err(error) => {
                self.debug
                    .error("Connection test failed, cannot read from store", Some(error.to_value()));
                false
            }
        }
    }

    pub async fn fetch_all_buildings(&self) -> Result<Vec<Building>, StoreError> {
        self.debug.info("Fetching all buildings");

        let value = self
            .store
            .get(&self.layout.buildings_path)
            .await
            .inspect_err(|error| self.debug.error("Failed to fetch buildings", Some(error.to_value())))?;

        let buildings = into_buildings(building_records(&self.debug, value));
        self.debug.info(format!("Successfully fetched {} buildings", buildings.len()));

        Ok(buildings)
    }

    /// Full building list on every change of the collection.
    pub fn subscribe_to_buildings<F>(&self, mut on_change: F) -> Subscription
    where
        F: FnMut(Vec<Building>) + Send + 'static,
    {
        self.debug.info("Subscribing to all buildings");

        let debug = Arc::clone(&self.debug);
        let stream = self.watch(self.layout.buildings_path.clone());

        self.register(subscription::listen("buildings", stream, move |item| match item {
            Ok(value) => {
                let buildings = into_buildings(building_records(&debug, value));
                debug.info(format!("Received update for {} buildings", buildings.len()));
                on_change(buildings);
            }
            Err(error) => debug.error("Error subscribing to buildings", Some(error.to_value())),
        }))
    }

    /// One building with its inline feed, `None` while it does not exist.
    pub fn subscribe_to_building<F>(&self, id: &str, mut on_change: F) -> Subscription
    where
        F: FnMut(Option<Building>) + Send + 'static,
    {
        self.debug.info(format!("Subscribing to building: {id}"));

        let debug = Arc::clone(&self.debug);
        let stream = self.watch(self.layout.building_path(id));
        let id = id.to_string();

        self.register(subscription::listen(id.clone(), stream, move |item| match item {
            Ok(Some(value)) => match BuildingRecord::from_value(value) {
                Ok((record, rejected)) => {
                    if rejected > 0 {
                        debug.warning(format!("Dropped {rejected} malformed telemetry values from building {id}"), None);
                    }
                    debug.info(format!("Received update for building: {id}"));
                    on_change(Some(Building::from_record(id.clone(), record)));
                }
                Err(error) => debug.warning(format!("Skipping malformed building {id}"), Some(Value::String(error.to_string()))),
            },
            Ok(None) => {
                debug.warning(format!("Building {id} not found"), None);
                on_change(None);
            }
            Err(error) => debug.error(format!("Error subscribing to building {id}"), Some(error.to_value())),
        }))
    }

    /// Buildings joined with the root telemetry feed. Emits on every change
    /// of either side, in any interleaving.
    pub fn subscribe_to_all_buildings_merged<F>(&self, mut on_change: F) -> Subscription
    where
        F: FnMut(Vec<Building>) + Send + 'static,
    {
        let telemetry_path = self.layout.telemetry_path.clone();
        self.debug.info(format!("Subscribing to all buildings and root {telemetry_path}"));

        let (sender, receiver) = mpsc::unbounded_channel();

        let debug = Arc::clone(&self.debug);
        let buildings = self.forward(self.layout.buildings_path.clone(), sender.clone(), move |value| {
            MergeInput::Buildings(building_records(&debug, value))
        });

        let debug = Arc::clone(&self.debug);
        let telemetry = self.forward(telemetry_path.clone(), sender, move |value| {
            MergeInput::Telemetry(telemetry_feed(&debug, &telemetry_path, value))
        });

        let debug = Arc::clone(&self.debug);
        let mut merger = BuildingMerger::new(self.layout.device_feed_building.clone());
        let stop = subscription::spawn_listener(UnboundedReceiverStream::new(receiver).boxed(), move |input| {
            let buildings = merger.apply(input);
            debug.info(format!("Received update for {} buildings", buildings.len()));
            on_change(buildings);
        });

        self.register(Subscription::new("all-buildings", move || {
            buildings.abort();
            telemetry.abort();
            stop();
        }))
    }

    pub async fn add_building(&self, building: NewBuilding) -> Result<BuildingId, StoreError> {
        let name = building.name.clone();
        self.debug.info(format!("Adding new building: {name}"));

        let result = async {
            let id = self.store.push(&self.layout.buildings_path).await?;
            let record = serde_json::to_value(building.into_record(now_millis()))?;
            self.store.set(&self.layout.building_path(&id), record).await?;

            Ok::<_, StoreError>(id)
        }
        .await;

        result
            .inspect(|id| self.debug.info(format!("Successfully added building: {name} with ID: {id}")))
            .inspect_err(|error| self.debug.error(format!("Failed to add building: {name}"), Some(error.to_value())))
    }

    /// Replaces the inline feed and bumps `lastUpdated`, leaving metadata alone.
    pub async fn update_building_feed(&self, id: &str, feed: &TelemetryFeed) -> Result<(), StoreError> {
        self.debug.info(format!("Updating data for building: {id}"));

        let path = self.layout.building_path(id);
        let result = async {
            self.store.set(&tree::join(&path, "batch_data"), feed.to_value()).await?;
            self.store.set(&tree::join(&path, "lastUpdated"), Value::from(now_millis())).await
        }
        .await;

        result
            .inspect(|_| self.debug.info(format!("Successfully updated building: {id}")))
            .inspect_err(|error| self.debug.error(format!("Failed to update building: {id}"), Some(error.to_value())))
    }

    /// Deleting an absent building succeeds.
    pub async fn delete_building(&self, id: &str) -> Result<(), StoreError> {
        self.debug.info(format!("Deleting building: {id}"));

        self.store
            .remove(&self.layout.building_path(id))
            .await
            .inspect(|_| self.debug.info(format!("Successfully deleted building: {id}")))
            .inspect_err(|error| self.debug.error(format!("Failed to delete building: {id}"), Some(error.to_value())))
    }

    /// Disposes every registration still alive. Safe to call repeatedly.
    pub fn cleanup(&self) {
        let registrations = std::mem::take(&mut *self.lock_registry());
        self.debug.info("Cleaning up listeners");

        for registration in registrations {
            if registration.dispose() {
                self.debug.info(format!("Cleaning up listener: {}", registration.label()));
            }
        }
    }

    /// Live registrations tracked for cleanup.
    pub fn active_subscriptions(&self) -> usize {
        let mut registry = self.lock_registry();
        registry.retain(|registration| registration.is_active());
        registry.len()
    }

    fn lock_registry(&self) -> MutexGuard<'_, Vec<Arc<Registration>>> {
        self.registry.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn register(&self, subscription: Subscription) -> Subscription {
        let mut registry = self.lock_registry();
        registry.retain(|registration| registration.is_active());
        registry.push(subscription.registration());

        subscription
    }

    /// Lazy change stream. Registration happens on first poll, and a failed
    /// registration comes through as the only item.
    fn watch(&self, path: String) -> SnapshotStream {
        let store = Arc::clone(&self.store);

        futures::stream::once(async move { store.subscribe(&path).await })
            .flat_map(|result| match result {
                Ok(stream) => stream,
                Err(error) => futures::stream::iter([Err(error)]).boxed(),
            })
            .boxed()
    }

    fn forward<F>(&self, path: String, sender: mpsc::UnboundedSender<MergeInput>, convert: F) -> JoinHandle<()>
    where
        F: Fn(Option<Value>) -> MergeInput + Send + 'static,
    {
        let debug = Arc::clone(&self.debug);
        let mut stream = self.watch(path.clone());

        tokio::spawn(async move {
            while let Some(item) = stream.next().await {
                match item {
                    Ok(value) => {
                        if sender.send(convert(value)).is_err() {
                            break;
                        }
                    }
                    Err(error) => debug.error(format!("Error subscribing to {path}"), Some(error.to_value())),
                }
            }
        })
    }
}

fn into_buildings(records: Vec<(BuildingId, BuildingRecord)>) -> Vec<Building> {
    records
        .into_iter()
        .map(|(id, record)| Building::from_record(id, record))
        .collect()
}

fn building_records(debug: &DebugLog, value: Option<Value>) -> Vec<(BuildingId, BuildingRecord)> {
    let records = match value {
        None => {
            debug.info("No buildings found");
            return Vec::new();
        }
        Some(Value::Object(records)) => records,
        Some(other) => {
            debug.warning("Buildings collection is not an object", Some(other));
            return Vec::new();
        }
    };

    records
        .into_iter()
        .filter_map(|(id, raw)| match BuildingRecord::from_value(raw) {
            Ok((record, rejected)) => {
                if rejected > 0 {
                    debug.warning(format!("Dropped {rejected} malformed telemetry values from building {id}"), None);
                }
                Some((id, record))
            }
            Err(error) => {
                debug.warning(format!("Skipping malformed building {id}"), Some(Value::String(error.to_string())));
                None
            }
        })
        .collect()
}

fn telemetry_feed(debug: &DebugLog, path: &str, value: Option<Value>) -> TelemetryFeed {
    let Some(value) = value else {
        debug.info(format!("No root {path} found"));
        return TelemetryFeed::new();
    };

    let parsed = TelemetryFeed::parse(&value);
    if parsed.rejected > 0 {
        debug.warning(format!("Dropped {} malformed values from root {path}", parsed.rejected), None);
    }
    debug.info(format!("Received root {path} update with {} batches", parsed.feed.batch_count()));

    parsed.feed
}
