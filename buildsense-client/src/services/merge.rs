use buildsense_api::models::{Building, BuildingId, BuildingRecord, TelemetryFeed};

/// One side of the merged building view changed.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeInput {
    /// Every building record, in store key order
    Buildings(Vec<(BuildingId, BuildingRecord)>),
    /// The root telemetry feed written by devices
    Telemetry(TelemetryFeed),
}

/// Latest value of both subscriptions behind the merged building list.
///
/// The device-fed building keeps only metadata under the buildings
/// collection; its readings come from the root telemetry feed.
#[derive(Debug, Clone)]
pub struct BuildingMerger {
    device_feed_building: BuildingId,
    buildings: Option<Vec<(BuildingId, BuildingRecord)>>,
    telemetry: Option<TelemetryFeed>,
}

impl BuildingMerger {
    pub fn new(device_feed_building: impl Into<BuildingId>) -> Self {
        Self {
            device_feed_building: device_feed_building.into(),
            buildings: None,
            telemetry: None,
        }
    }

    /// Replaces one side and returns the recomputed list.
    pub fn apply(&mut self, input: MergeInput) -> Vec<Building> {
        match input {
            MergeInput::Buildings(buildings) => self.buildings = Some(buildings),
            MergeInput::Telemetry(feed) => self.telemetry = Some(feed),
        }

        self.merge()
    }

    /// Current list, or `None` until either side has arrived.
    pub fn merged(&self) -> Option<Vec<Building>> {
        (self.buildings.is_some() || self.telemetry.is_some()).then(|| self.merge())
    }

    fn merge(&self) -> Vec<Building> {
        let Some(buildings) = &self.buildings else {
            return Vec::new();
        };

        buildings
            .iter()
            .map(|(id, record)| {
                let mut building = Building::from_record(id.clone(), record.clone());
                if *id == self.device_feed_building {
                    building.feed = self.telemetry.clone().unwrap_or_default();
                }
                building
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use buildsense_api::models::{BatchEntry, NewBuilding};

    use super::*;

    fn feed(batch: &str, timestamps: &[i64]) -> TelemetryFeed {
        [(batch.to_string(), timestamps.iter().copied().map(BatchEntry::new).collect())]
            .into_iter()
            .collect()
    }

    fn records(ids: &[&str]) -> Vec<(BuildingId, BuildingRecord)> {
        ids.iter()
            .map(|id| {
                let mut record = NewBuilding::new(format!("Building {id}")).into_record(0);
                record.feed = feed("inline", &[1]);
                (id.to_string(), record)
            })
            .collect()
    }

    #[test]
    fn test_nothing_before_first_input() {
        assert_eq!(BuildingMerger::new("batch_data").merged(), None);
    }

    #[test]
    fn test_telemetry_first_emits_empty_list() {
        let mut merger = BuildingMerger::new("batch_data");

        assert!(merger.apply(MergeInput::Telemetry(feed("t1", &[5]))).is_empty());
        assert_eq!(merger.merged(), Some(Vec::new()));
    }

    #[test]
    fn test_device_building_takes_root_feed() {
        let mut merger = BuildingMerger::new("batch_data");

        let first = merger.apply(MergeInput::Buildings(records(&["a", "batch_data"])));
        assert_eq!(first[0].feed, feed("inline", &[1]));
        assert!(first[1].feed.is_empty());

        let second = merger.apply(MergeInput::Telemetry(feed("16226", &[15804, 15890])));
        assert_eq!(second[0].feed, feed("inline", &[1]));
        assert_eq!(second[1].feed, feed("16226", &[15804, 15890]));
        assert_eq!(second[1].name, "Building batch_data");
    }

    #[test]
    fn test_emission_sequence() {
        let mut merger = BuildingMerger::new("batch_data");
        let b1 = records(&["batch_data"]);
        let b2 = records(&["batch_data", "z"]);
        let t1 = feed("t1", &[1, 2]);

        let emitted = vec![
            merger.apply(MergeInput::Buildings(b1.clone())),
            merger.apply(MergeInput::Telemetry(t1.clone())),
            merger.apply(MergeInput::Buildings(b2.clone())),
        ];

        let expected = |buildings: &[(BuildingId, BuildingRecord)], telemetry: Option<&TelemetryFeed>| {
            let mut reference = BuildingMerger::new("batch_data");
            if let Some(telemetry) = telemetry {
                reference.apply(MergeInput::Telemetry(telemetry.clone()));
            }
            reference.apply(MergeInput::Buildings(buildings.to_vec()))
        };

        assert_eq!(emitted[0], expected(&b1, None));
        assert_eq!(emitted[1], expected(&b1, Some(&t1)));
        assert_eq!(emitted[2], expected(&b2, Some(&t1)));
        assert_eq!(emitted[2].len(), 2);
    }
}
