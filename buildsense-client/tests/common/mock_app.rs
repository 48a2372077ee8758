use std::sync::{Arc, Mutex};
use std::time::Duration;

use buildsense_api::models::DebugLogEntry;
use buildsense_client::controller::AppController;
use buildsense_client::services::StoreService;
use buildsense_client::state::AppState;
use buildsense_client::store::{MemoryStore, StoreLayout};
use serde_json::{Value, json};
use tokio::sync::mpsc;

pub const WAIT: Duration = Duration::from_secs(5);

pub struct MockApp {
    pub store: Arc<MemoryStore>,
    pub service: Arc<StoreService>,
    pub controller: AppController,
}

impl MockApp {
    pub fn new() -> Self {
        Self::with_root(Value::Null)
    }

    pub fn with_root(root: Value) -> Self {
        let store = Arc::new(MemoryStore::with_root(root));
        let service = Arc::new(StoreService::new(store.clone(), StoreLayout::default()));
        let controller = AppController::new(service.clone(), Duration::from_secs(1));

        Self {
            store,
            service,
            controller,
        }
    }

    pub async fn wait_for(&self, predicate: impl Fn(&AppState) -> bool) -> AppState {
        let mut receiver = self.controller.watch();
        let state = tokio::time::timeout(WAIT, receiver.wait_for(|state| predicate(state)))
            .await
            .expect("timed out waiting for state")
            .expect("state channel closed");

        state.clone()
    }

    /// Collects debug entries written through the adapter.
    pub fn capture_debug_log(&self) -> Arc<Mutex<Vec<DebugLogEntry>>> {
        let entries = Arc::new(Mutex::new(Vec::new()));
        let sink = entries.clone();
        self.service
            .set_debug_listener(move |entry| sink.lock().unwrap().push(entry));

        entries
    }
}

/// Channel-backed callback for subscription tests.
pub fn recorder<T: Send + 'static>() -> (impl FnMut(T) + Send + 'static, mpsc::UnboundedReceiver<T>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (
        move |item| {
            let _ = sender.send(item);
        },
        receiver,
    )
}

pub async fn next<T>(receiver: &mut mpsc::UnboundedReceiver<T>) -> T {
    tokio::time::timeout(WAIT, receiver.recv())
        .await
        .expect("timed out waiting for emission")
        .expect("emitter closed")
}

/// Polls `condition` until it holds or the wait runs out.
pub async fn eventually(condition: impl Fn() -> bool) {
    tokio::time::timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition never held");
}

pub fn building_value(name: &str) -> Value {
    json!({
        "name": name,
        "floors": ["E1", "E2"],
        "sensorsPerFloor": { "E1": ["M1", "M2"], "E2": ["S1", "S2"] },
        "createdAt": 1_700_000_000_000i64,
        "lastUpdated": 1_700_000_000_000i64
    })
}

pub fn batch_value(timestamps: &[i64]) -> Value {
    let entries: Vec<Value> = timestamps
        .iter()
        .map(|timestamp| {
            json!({
                "E1": { "M1": { "x": *timestamp as f64, "y": 0.0, "z": 9.81 } },
                "timestamp": timestamp
            })
        })
        .collect();

    Value::Array(entries)
}
