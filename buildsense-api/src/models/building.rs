use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{BuildingId, TelemetryFeed, TelemetryReading};
use crate::history::sensor_history;

/// Window within which a building counts as recently updated.
pub const RECENT_UPDATE_MS: i64 = 30_000;

/// Building record as stored under the buildings collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BuildingRecord {
    /// Display name
    pub name: String,
    /// Floor identifiers in display order
    pub floors: Vec<String>,
    /// Sensor identifiers per floor
    pub sensors_per_floor: BTreeMap<String, Vec<String>>,
    /// Creation time in epoch milliseconds
    pub created_at: i64,
    /// Last metadata or feed write in epoch milliseconds
    pub last_updated: i64,
    /// Inline telemetry; empty for the device-fed building
    #[serde(rename = "batch_data")]
    pub feed: TelemetryFeed,
}

impl BuildingRecord {
    /// Validates a raw record, returning it with the number of feed values
    /// that failed the reading schema.
    pub fn from_value(mut value: Value) -> Result<(Self, usize), serde_json::Error> {
        let raw_feed = value
            .as_object_mut()
            .and_then(|object| object.remove("batch_data"))
            .unwrap_or(Value::Null);

        let mut record: BuildingRecord = serde_json::from_value(value)?;
        let parsed = TelemetryFeed::parse(&raw_feed);
        record.feed = parsed.feed;

        Ok((record, parsed.rejected))
    }
}

/// Building view model, as the dashboard renders it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Building {
    pub id: BuildingId,
    pub name: String,
    pub floors: Vec<String>,
    pub sensors_per_floor: BTreeMap<String, Vec<String>>,
    pub created_at: i64,
    pub last_updated: i64,
    pub feed: TelemetryFeed,
}

impl Building {
    pub fn from_record(id: impl Into<BuildingId>, record: BuildingRecord) -> Self {
        let BuildingRecord {
            name,
            floors,
            sensors_per_floor,
            created_at,
            last_updated,
            feed,
        } = record;

        Self {
            id: id.into(),
            name,
            floors,
            sensors_per_floor,
            created_at,
            last_updated,
            feed,
        }
    }

    /// Time-ordered readings of one sensor, bounded to the history window.
    pub fn sensor_history(&self, floor: &str, sensor: &str) -> Vec<TelemetryReading> {
        sensor_history(&self.feed, floor, sensor)
    }

    /// Every configured `(floor, sensor)` pair, floors in display order.
    pub fn sensors(&self) -> impl Iterator<Item = (&str, &str)> {
        self.floors.iter().flat_map(move |floor| {
            self.sensors_per_floor
                .get(floor)
                .into_iter()
                .flatten()
                .map(move |sensor| (floor.as_str(), sensor.as_str()))
        })
    }
}

/// Input of the add-building operation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBuilding {
    pub name: String,
    pub floors: Vec<String>,
    pub sensors_per_floor: BTreeMap<String, Vec<String>>,
}

impl NewBuilding {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            floors: default_floors(),
            sensors_per_floor: default_sensors_per_floor(),
        }
    }

    pub fn into_record(self, now: i64) -> BuildingRecord {
        BuildingRecord {
            name: self.name,
            floors: self.floors,
            sensors_per_floor: self.sensors_per_floor,
            created_at: now,
            last_updated: now,
            feed: TelemetryFeed::new(),
        }
    }
}

/// Layout of the reference installation: two floors with two sensors each.
pub fn default_floors() -> Vec<String> {
    vec!["E1".to_string(), "E2".to_string()]
}

pub fn default_sensors_per_floor() -> BTreeMap<String, Vec<String>> {
    BTreeMap::from([
        ("E1".to_string(), vec!["M1".to_string(), "M2".to_string()]),
        ("E2".to_string(), vec!["S1".to_string(), "S2".to_string()]),
    ])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BuildingStats {
    pub total_sensors: usize,
    pub total_floors: usize,
    pub total_data_points: usize,
    pub has_recent_data: bool,
    pub is_active: bool,
}

impl BuildingStats {
    pub fn of(building: &Building, now: i64) -> Self {
        let total_data_points = building.feed.entry_count();

        Self {
            total_sensors: building.sensors_per_floor.values().map(Vec::len).sum(),
            total_floors: building.floors.len(),
            total_data_points,
            has_recent_data: building.last_updated > 0 && now - building.last_updated < RECENT_UPDATE_MS,
            is_active: total_data_points > 0,
        }
    }
}
