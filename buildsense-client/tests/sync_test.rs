use std::time::Duration;

use buildsense_api::models::{DebugLevel, TelemetryFeed};
use buildsense_client::services::{BuildingMerger, MergeInput};
use buildsense_client::store::RemoteStore;
use serde_json::json;

mod common;
use common::mock_app::{MockApp, batch_value, building_value, eventually, next, recorder};

#[tokio::test]
async fn test_merged_emission_sequence() {
    let app = MockApp::with_root(json!({ "buildings": { "batch_data": building_value("ESP32") } }));
    let (callback, mut emissions) = recorder();

    let _subscription = app.service.subscribe_to_all_buildings_merged(callback);

    // One emission per side on registration, in either order.
    next(&mut emissions).await;
    let initial = next(&mut emissions).await;
    assert_eq!(initial.len(), 1);
    assert!(initial[0].feed.is_empty());

    app.store.set("batch_data/t1", batch_value(&[2, 1])).await.unwrap();
    let with_telemetry = next(&mut emissions).await;

    app.store.set("buildings/zeta", building_value("Zeta")).await.unwrap();
    let with_second_building = next(&mut emissions).await;

    let b1 = json!({ "batch_data": building_value("ESP32") });
    let b2 = json!({ "batch_data": building_value("ESP32"), "zeta": building_value("Zeta") });
    let t1 = TelemetryFeed::parse(&json!({ "t1": batch_value(&[2, 1]) })).feed;

    let expected = |buildings: serde_json::Value, telemetry: &TelemetryFeed| {
        let records = buildings
            .as_object()
            .unwrap()
            .iter()
            .map(|(id, raw)| {
                let (record, _) = buildsense_api::models::BuildingRecord::from_value(raw.clone()).unwrap();
                (id.clone(), record)
            })
            .collect();
        let mut merger = BuildingMerger::new("batch_data");
        merger.apply(MergeInput::Telemetry(telemetry.clone()));
        merger.apply(MergeInput::Buildings(records))
    };

    assert_eq!(with_telemetry, expected(b1, &t1));
    assert_eq!(with_second_building, expected(b2, &t1));
    assert_eq!(
        with_second_building[0].sensor_history("E1", "M1").iter().map(|r| r.timestamp).collect::<Vec<_>>(),
        vec![Some(1), Some(2)]
    );
    assert!(with_second_building[1].feed.is_empty());
}

#[tokio::test]
async fn test_subscription_errors_are_logged_and_survived() {
    let app = MockApp::new();
    let entries = app.capture_debug_log();
    let (callback, mut emissions) = recorder();

    let _subscription = app.service.subscribe_to_buildings(callback);
    assert!(next(&mut emissions).await.is_empty());

    app.store.fail_subscriptions("permission denied");
    app.store.set("buildings/a", building_value("A")).await.unwrap();

    let buildings = next(&mut emissions).await;
    assert_eq!(buildings.len(), 1);
    assert!(
        entries
            .lock()
            .unwrap()
            .iter()
            .any(|entry| entry.level == DebugLevel::Error && entry.message == "Error subscribing to buildings")
    );
}

#[tokio::test]
async fn test_cleanup_disposes_every_registration() {
    let app = MockApp::new();
    let entries = app.capture_debug_log();
    let (on_buildings, mut buildings) = recorder();
    let (on_building, mut building) = recorder();

    let _all = app.service.subscribe_to_buildings(on_buildings);
    let _one = app.service.subscribe_to_building("a", on_building);
    next(&mut buildings).await;
    next(&mut building).await;
    assert_eq!(app.service.active_subscriptions(), 2);

    app.service.cleanup();
    app.service.cleanup();

    assert_eq!(app.service.active_subscriptions(), 0);
    eventually(|| app.store.watcher_count() == 0).await;

    app.store.set("buildings/a", building_value("A")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(buildings.try_recv().is_err());
    assert!(building.try_recv().is_err());

    let cleaned: Vec<String> = entries
        .lock()
        .unwrap()
        .iter()
        .filter(|entry| entry.message.starts_with("Cleaning up listener: "))
        .map(|entry| entry.message.clone())
        .collect();
    assert_eq!(cleaned.len(), 2);
    assert!(cleaned.contains(&"Cleaning up listener: a".to_string()));
}

#[tokio::test]
async fn test_dropped_subscription_releases_store_watchers() {
    let app = MockApp::new();
    let (callback, mut emissions) = recorder::<Vec<_>>();

    let subscription = app.service.subscribe_to_all_buildings_merged(callback);
    next(&mut emissions).await;
    next(&mut emissions).await;
    assert_eq!(app.store.watcher_count(), 2);

    drop(subscription);

    eventually(|| app.store.watcher_count() == 0).await;
    assert_eq!(app.service.active_subscriptions(), 0);
}
