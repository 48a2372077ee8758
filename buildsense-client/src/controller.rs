use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use buildsense_api::form::BuildingForm;
use buildsense_api::models::{BuildingId, DebugLevel, DebugLogEntry, NewBuilding};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::configs::Controller;
use crate::errors::{ClientError, StoreError};
use crate::services::{StoreService, Subscription};
use crate::state::{Action, AppState};

fn dispatch_to(state: &watch::Sender<AppState>, action: Action) {
    state.send_modify(|state| *state = mem::take(state).reduce(action));
}

/// Drives [`AppState`] from the store adapter and publishes every new state
/// on a watch channel.
pub struct AppController {
    service: Arc<StoreService>,
    state: Arc<watch::Sender<AppState>>,
    subscription: Mutex<Option<Subscription>>,
    probes: AtomicU64,
    probe_timeout: Duration,
}

impl AppController {
    pub fn new(service: Arc<StoreService>, probe_timeout: Duration) -> Self {
        let (state, _) = watch::channel(AppState::new());

        Self {
            service,
            state: Arc::new(state),
            subscription: Mutex::new(None),
            probes: AtomicU64::new(0),
            probe_timeout,
        }
    }

    pub fn from_settings(service: Arc<StoreService>, controller: &Controller) -> Self {
        Self::new(service, Duration::from_millis(controller.probe_timeout_ms))
    }

    pub fn service(&self) -> &Arc<StoreService> {
        &self.service
    }

    pub fn dispatch(&self, action: Action) {
        dispatch_to(&self.state, action);
    }

    /// Wires the debug log into the state, probes the store and starts the
    /// merged subscription, or falls back to a single fetch when offline.
    pub async fn start(&self) {
        let state = Arc::clone(&self.state);
        self.service
            .set_debug_listener(move |entry| dispatch_to(&state, Action::AddDebugLog(entry)));

        self.dispatch(Action::SetLoading(true));

        if self.test_connection().await {
            let state = Arc::clone(&self.state);
            let subscription = self
                .service
                .subscribe_to_all_buildings_merged(move |buildings| dispatch_to(&state, Action::SetBuildings(buildings)));

            // Replacing an earlier subscription drops and disposes it.
            self.lock_subscription().replace(subscription);
        } else {
            let buildings = self.service.fetch_all_buildings().await.unwrap_or_default();
            self.dispatch(Action::SetBuildings(buildings));
        }
    }

    /// Re-probes the store. Only the most recently started probe may update
    /// the connected flag.
    pub async fn test_connection(&self) -> bool {
        let probe = self.probes.fetch_add(1, Ordering::SeqCst) + 1;

        let connected = match tokio::time::timeout(self.probe_timeout, self.service.test_connection()).await {
            Ok(connected) => connected,
            Err(_) => {
                self.report(DebugLogEntry::warning(format!(
                    "Connection test timed out after {}ms",
                    self.probe_timeout.as_millis()
                )));
                false
            }
        };

        if self.probes.load(Ordering::SeqCst) == probe {
            self.dispatch(Action::SetConnected(connected));
        }

        connected
    }

    /// The new building shows up through the subscription, not here.
    pub async fn add_building(&self, building: NewBuilding) -> Result<BuildingId, ClientError> {
        let name = building.name.clone();

        self.service
            .add_building(building)
            .await
            .map_err(|error| self.failed(format!("Failed to add building: {name}"), error))
    }

    pub async fn submit_form(&self, form: &BuildingForm) -> Result<BuildingId, ClientError> {
        let building = form.validate().inspect_err(|error| {
            self.report(DebugLogEntry::warning(format!("Invalid building form: {error}")));
        })?;

        self.add_building(building).await
    }

    pub async fn delete_building(&self, id: &str) -> Result<(), ClientError> {
        self.service
            .delete_building(id)
            .await
            .map_err(|error| self.failed(format!("Failed to delete building: {id}"), error))
    }

    pub fn select_building(&self, id: Option<BuildingId>) {
        self.dispatch(Action::SelectBuilding(id));
    }

    pub fn clear_debug_logs(&self) {
        self.dispatch(Action::ClearDebugLogs);
    }

    pub fn toggle_debug_panel(&self, show: Option<bool>) {
        self.dispatch(Action::ToggleDebug(show));
    }

    pub fn state(&self) -> AppState {
        self.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<AppState> {
        self.state.subscribe()
    }

    pub fn stream(&self) -> WatchStream<AppState> {
        WatchStream::new(self.state.subscribe())
    }

    /// Stops the building subscription and every adapter registration.
    pub fn shutdown(&self) {
        if let Some(subscription) = self.lock_subscription().take() {
            subscription.unsubscribe();
        }
        self.service.cleanup();
        self.service.clear_debug_listener();
    }

    fn failed(&self, message: String, error: StoreError) -> ClientError {
        self.report(DebugLogEntry::error(message, Some(error.to_value())));
        error.into()
    }

    fn report(&self, entry: DebugLogEntry) {
        match entry.level {
            DebugLevel::Error => tracing::error!("{}", entry.message),
            _ => tracing::warn!("{}", entry.message),
        }
        self.dispatch(Action::AddDebugLog(entry));
    }

    fn lock_subscription(&self) -> MutexGuard<'_, Option<Subscription>> {
        self.subscription.lock().unwrap_or_else(|e| e.into_inner())
    }
}
