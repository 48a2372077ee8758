use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::reading::{TelemetryReading, integer};

/// Sensor id to reading, for one floor at one batch instant.
pub type FloorSnapshot = BTreeMap<String, TelemetryReading>;

/// One device upload cycle covering every floor and sensor at once.
///
/// On the wire every key other than `timestamp` is a floor key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchEntry {
    #[serde(flatten)]
    pub floors: BTreeMap<String, FloorSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl BatchEntry {
    pub fn new(timestamp: i64) -> Self {
        Self {
            floors: BTreeMap::new(),
            timestamp: Some(timestamp),
        }
    }

    pub fn with_reading(mut self, floor: &str, sensor: &str, reading: TelemetryReading) -> Self {
        self.floors
            .entry(floor.to_string())
            .or_default()
            .insert(sensor.to_string(), reading);
        self
    }

    fn parse(value: &Value, rejected: &mut usize) -> Option<Self> {
        let Some(object) = value.as_object() else {
            *rejected += 1;
            return None;
        };

        let mut entry = BatchEntry::default();

        for (key, value) in object {
            if key == "timestamp" {
                entry.timestamp = integer(value);
                continue;
            }

            let Some(sensors) = value.as_object() else {
                *rejected += 1;
                continue;
            };

            let mut snapshot = FloorSnapshot::new();
            for (sensor, raw) in sensors {
                match TelemetryReading::from_value(raw) {
                    // Entry timestamps live on the batch, never on the reading.
                    Ok(reading) => {
                        snapshot.insert(sensor.clone(), TelemetryReading { timestamp: None, ..reading });
                    }
                    Err(_) => *rejected += 1,
                }
            }
            entry.floors.insert(key.clone(), snapshot);
        }

        Some(entry)
    }
}

/// Result of validating a raw feed snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedParse {
    pub feed: TelemetryFeed,
    /// Values dropped because they did not match the feed schema
    pub rejected: usize,
}

/// Batch id to the entries uploaded under it.
///
/// Batch ids are insertion keys with no meaningful order; consumers order
/// readings by the entries' own timestamps.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TelemetryFeed {
    batches: BTreeMap<String, Vec<BatchEntry>>,
}

impl TelemetryFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the raw value stored under a feed path. `null` is an empty feed.
    pub fn parse(value: &Value) -> FeedParse {
        let mut rejected = 0;
        let mut feed = TelemetryFeed::new();

        let batches = match value {
            Value::Null => return FeedParse { feed, rejected },
            Value::Object(batches) => batches,
            _ => {
                return FeedParse { feed, rejected: 1 };
            }
        };

        for (batch_id, raw_entries) in batches {
            let raw_entries: Vec<&Value> = match raw_entries {
                Value::Array(items) => items.iter().collect(),
                // Sparse arrays come back from the store as objects with index keys.
                Value::Object(items) => {
                    let mut indexed: Vec<(&String, &Value)> = items.iter().collect();
                    indexed.sort_by_key(|(index, _)| index.parse::<u64>().unwrap_or(u64::MAX));
                    indexed.into_iter().map(|(_, value)| value).collect()
                }
                _ => {
                    rejected += 1;
                    continue;
                }
            };

            let entries = raw_entries
                .into_iter()
                .filter(|value| !value.is_null())
                .filter_map(|value| BatchEntry::parse(value, &mut rejected))
                .collect();

            feed.batches.insert(batch_id.clone(), entries);
        }

        FeedParse { feed, rejected }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    /// Number of upload cycles across all batches.
    pub fn entry_count(&self) -> usize {
        self.batches.values().map(Vec::len).sum()
    }

    pub fn batch(&self, batch_id: &str) -> Option<&[BatchEntry]> {
        self.batches.get(batch_id).map(Vec::as_slice)
    }

    pub fn batches(&self) -> impl Iterator<Item = (&str, &[BatchEntry])> {
        self.batches
            .iter()
            .map(|(id, entries)| (id.as_str(), entries.as_slice()))
    }

    pub fn entries(&self) -> impl Iterator<Item = &BatchEntry> {
        self.batches.values().flatten()
    }

    pub fn insert_batch(&mut self, batch_id: impl Into<String>, entries: Vec<BatchEntry>) {
        self.batches.insert(batch_id.into(), entries);
    }

    /// Adds every batch of `other`, replacing batches with the same id.
    pub fn merge(&mut self, other: TelemetryFeed) {
        self.batches.extend(other.batches);
    }

    /// Splits batch ids into `parts` contiguous chunks of `ceil(len / parts)`.
    /// Trailing empty chunks are not returned.
    pub fn split(&self, parts: usize) -> Vec<TelemetryFeed> {
        if parts == 0 || self.batches.is_empty() {
            return Vec::new();
        }

        let chunk = self.batches.len().div_ceil(parts);
        let ids: Vec<&String> = self.batches.keys().collect();

        ids.chunks(chunk)
            .take(parts)
            .map(|ids| {
                ids.iter()
                    .map(|id| ((*id).clone(), self.batches[*id].clone()))
                    .collect()
            })
            .collect()
    }
}

impl FromIterator<(String, Vec<BatchEntry>)> for TelemetryFeed {
    fn from_iter<T: IntoIterator<Item = (String, Vec<BatchEntry>)>>(iter: T) -> Self {
        Self {
            batches: iter.into_iter().collect(),
        }
    }
}

impl<'de> Deserialize<'de> for TelemetryFeed {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(TelemetryFeed::parse(&value).feed)
    }
}
