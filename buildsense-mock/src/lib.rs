use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use buildsense_client::store::{FirebaseStore, MemoryStore, RemoteStore, tree};
use tokio::time;

use crate::settings::{Settings, Target};
use crate::simulate::FeedSimulator;

pub mod settings;
pub mod simulate;

pub async fn run(settings: &Arc<Settings>) {
    let store: Arc<dyn RemoteStore> = match &settings.target {
        Target::Firebase {
            database_url,
            auth_token,
        } => Arc::new(FirebaseStore::new(database_url.clone(), auth_token.clone())),
        Target::Memory => Arc::new(MemoryStore::new()),
    };

    if let Err(e) = run_with_store(settings, store, None).await {
        tracing::error!("simulation stopped: {}", e);
    }
}

/// Uploads one simulated batch per interval under a fresh key of the
/// telemetry path, the way the devices do. Stops after `cycles` uploads when
/// given. Returns the number of uploads.
pub async fn run_with_store(
    settings: &Settings,
    store: Arc<dyn RemoteStore>,
    cycles: Option<usize>,
) -> Result<usize, Box<dyn Error + Send + Sync>> {
    let mock = &settings.mock;
    let mut simulator = FeedSimulator::new(mock)?;
    let mut interval = time::interval(Duration::from_millis(mock.interval_ms.max(1)));

    let mut uploads = 0;
    while cycles.is_none_or(|cycles| uploads < cycles) {
        interval.tick().await;

        let entries = simulator.next_batch(&mut rand::rng());
        let key = store.push(&mock.telemetry_path).await?;
        store
            .set(&tree::join(&mock.telemetry_path, &key), serde_json::to_value(&entries)?)
            .await?;

        uploads += 1;
        tracing::info!("uploaded batch {} with {} entries", key, entries.len());
    }

    Ok(uploads)
}
