use buildsense_api::chart::{ChartConfigs, ChartSeries};
use buildsense_api::form::BuildingForm;
use buildsense_api::models::{Building, BuildingRecord, BuildingStats, TelemetryFeed};
use buildsense_api::{HISTORY_WINDOW, sensor_history};
use serde_json::{Value, json};

fn feed_value(entries: usize) -> Value {
    let batches: serde_json::Map<String, Value> = (0..entries)
        .map(|i| {
            let timestamp = (entries - i) as i64 * 100;
            let entry = json!({
                "E1": { "M1": { "x": i as f64, "y": 0.5, "z": 9.81 } },
                "E2": { "S1": { "x": 0.0, "y": 0.0, "z": "bad" } },
                "timestamp": timestamp
            });
            (format!("batch-{i:03}"), json!([entry]))
        })
        .collect();

    Value::Object(batches)
}

#[test]
fn test_form_to_sensor_cards() {
    let new_building = BuildingForm {
        name: "Bridge".to_string(),
        floors: "E1, E2".to_string(),
        sensors: "E1:M1;E2:S1".to_string(),
    }
    .validate()
    .unwrap();

    let mut record = new_building.into_record(1_000);
    let parsed = TelemetryFeed::parse(&feed_value(150));
    assert_eq!(parsed.rejected, 150);
    record.feed = parsed.feed;
    let building = Building::from_record("bridge", record);

    let cards: Vec<(&str, &str)> = building.sensors().collect();
    assert_eq!(cards, vec![("E1", "M1"), ("E2", "S1")]);

    let history = building.sensor_history("E1", "M1");
    assert_eq!(history.len(), HISTORY_WINDOW);
    assert_eq!(history, sensor_history(&building.feed, "E1", "M1"));
    assert!(building.sensor_history("E2", "S1").is_empty());

    let series = ChartSeries::from_readings(&history);
    assert_eq!(series.len(), HISTORY_WINDOW);
    assert_eq!(series.labels.first().map(String::as_str), Some("0.0s"));
    assert_eq!(series.labels.last().map(String::as_str), Some("9.9s"));
    assert_eq!(ChartConfigs::default().get("E1", "M1").point_radius(), 1);

    let stats = BuildingStats::of(&building, 2_000);
    assert_eq!(stats.total_data_points, 150);
    assert_eq!(stats.total_sensors, 2);
    assert!(stats.has_recent_data);
}

#[test]
fn test_store_record_round_trip() {
    let raw = json!({
        "name": "Bridge",
        "floors": ["E1"],
        "sensorsPerFloor": { "E1": ["M1"] },
        "createdAt": 5,
        "lastUpdated": 6,
        "batch_data": { "b": [null, { "timestamp": 3, "E1": { "M1": { "x": 1, "y": 2, "z": 3 } } }] }
    });

    let (record, rejected) = BuildingRecord::from_value(raw).unwrap();
    assert_eq!(rejected, 0);

    let value = serde_json::to_value(&record).unwrap();
    assert_eq!(value["batch_data"]["b"][0]["E1"]["M1"], json!({ "x": 1.0, "y": 2.0, "z": 3.0 }));
    assert_eq!(value["lastUpdated"], json!(6));
}
