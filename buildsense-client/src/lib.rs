use std::sync::Arc;

use buildsense_api::models::{BuildingStats, now_millis};

use crate::configs::settings::Settings;
use crate::controller::AppController;
use crate::services::{MaintenanceService, StoreService};
use crate::state::AppState;

pub mod configs;
pub mod controller;
pub mod errors;
pub mod services;
pub mod state;
pub mod store;

/// Runs the headless monitor until interrupted, reporting every state change
/// through `tracing`.
pub async fn run(settings: &Arc<Settings>) {
    let service = Arc::new(StoreService::from_settings(settings));

    if let Err(e) = MaintenanceService::new(service.clone()).perform(&settings.maintenance).await {
        tracing::error!("maintenance task failed: {}", e);
    }

    let controller = AppController::from_settings(service, &settings.controller);
    let mut states = controller.watch();

    controller.start().await;

    let mut last_reported = None;
    loop {
        tokio::select! {
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = states.borrow_and_update().clone();
                report(&state, &mut last_reported);
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                break;
            }
        }
    }

    controller.shutdown();
}

/// What changed enough to be worth a log line. Debug entries are traced as
/// they are written, so they are left out.
#[derive(PartialEq)]
struct Summary {
    connected: bool,
    loading: bool,
    buildings: Vec<(String, i64, usize)>,
}

fn report(state: &AppState, last_reported: &mut Option<Summary>) {
    let summary = Summary {
        connected: state.connected,
        loading: state.loading,
        buildings: state
            .buildings
            .iter()
            .map(|building| (building.id.clone(), building.last_updated, building.feed.entry_count()))
            .collect(),
    };
    if last_reported.as_ref() == Some(&summary) {
        return;
    }
    *last_reported = Some(summary);

    tracing::info!(
        "connected: {}, loading: {}, buildings: {}",
        state.connected,
        state.loading,
        state.buildings.len()
    );

    let now = now_millis();
    for building in &state.buildings {
        let stats = BuildingStats::of(building, now);
        tracing::info!(
            "{} ({}): {} floors, {} sensors, {} data points{}",
            building.name,
            building.id,
            stats.total_floors,
            stats.total_sensors,
            stats.total_data_points,
            if stats.has_recent_data { ", live" } else { "" }
        );

        for (floor, sensor) in building.sensors() {
            if let Some(latest) = building.sensor_history(floor, sensor).last() {
                tracing::debug!(
                    "{}/{}/{}: x={:.2} y={:.2} z={:.2} |a|={:.2} at {}",
                    building.id,
                    floor,
                    sensor,
                    latest.x,
                    latest.y,
                    latest.z,
                    latest.magnitude(),
                    latest.timestamp.unwrap_or_default()
                );
            }
        }
    }
}
