use std::collections::BTreeMap;

use crate::models::NewBuilding;

pub const DEFAULT_FLOORS: &str = "E1,E2";
pub const DEFAULT_SENSORS: &str = "E1:M1,M2;E2:S1,S2";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Building name is required")]
    MissingName,

    #[error("At least one floor is required")]
    NoFloors,

    #[error("At least one floor with sensors is required")]
    NoSensors,
}

/// Raw text of the add-building form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildingForm {
    pub name: String,
    /// Comma separated floor ids
    pub floors: String,
    /// `floor:sensor,sensor;floor:sensor`
    pub sensors: String,
}

impl Default for BuildingForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            floors: DEFAULT_FLOORS.to_string(),
            sensors: DEFAULT_SENSORS.to_string(),
        }
    }
}

impl BuildingForm {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<NewBuilding, ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::MissingName);
        }

        let floors = parse_floors(&self.floors);
        if floors.is_empty() {
            return Err(ValidationError::NoFloors);
        }

        let sensors_per_floor = parse_sensor_config(&self.sensors);
        if sensors_per_floor.is_empty() {
            return Err(ValidationError::NoSensors);
        }

        Ok(NewBuilding {
            name: name.to_string(),
            floors,
            sensors_per_floor,
        })
    }
}

pub fn parse_floors(input: &str) -> Vec<String> {
    split_list(input, ',')
}

/// Parses `floor:sensor,sensor;floor:sensor`. Malformed segments and floors
/// without sensors are dropped silently.
pub fn parse_sensor_config(input: &str) -> BTreeMap<String, Vec<String>> {
    input
        .split(';')
        .filter_map(|segment| {
            let mut parts = segment.split(':');
            let floor = parts.next()?.trim();
            let sensors = split_list(parts.next()?, ',');

            (!floor.is_empty() && !sensors.is_empty()).then(|| (floor.to_string(), sensors))
        })
        .collect()
}

fn split_list(input: &str, separator: char) -> Vec<String> {
    input
        .split(separator)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_sensor_config() {
        let parsed = parse_sensor_config("E1:M1,M2;E2:S1,S2");

        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed["E1"], ids(&["M1", "M2"]));
        assert_eq!(parsed["E2"], ids(&["S1", "S2"]));
    }

    #[test]
    fn test_parse_sensor_config_drops_empty_floor() {
        let parsed = parse_sensor_config("E1:;E2:S1");

        assert_eq!(parsed, BTreeMap::from([("E2".to_string(), ids(&["S1"]))]));
    }

    #[test]
    fn test_parse_sensor_config_tolerates_noise() {
        let parsed = parse_sensor_config(" E1 : M1 , ,M2 ;;garbage; :S9;E3:S1:extra");

        assert_eq!(parsed["E1"], ids(&["M1", "M2"]));
        assert_eq!(parsed["E3"], ids(&["S1"]));
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn test_parse_floors() {
        assert_eq!(parse_floors(" E1, ,E2,"), ids(&["E1", "E2"]));
        assert!(parse_floors(" , ").is_empty());
    }

    #[test]
    fn test_validate_defaults() {
        let building = BuildingForm::new("  North Tower ").validate().unwrap();

        assert_eq!(building.name, "North Tower");
        assert_eq!(building.floors, ids(&["E1", "E2"]));
        assert_eq!(building.sensors_per_floor["E2"], ids(&["S1", "S2"]));
    }

    #[test]
    fn test_validate_errors() {
        assert_eq!(BuildingForm::new("   ").validate(), Err(ValidationError::MissingName));

        let form = BuildingForm { floors: ",".to_string(), ..BuildingForm::new("A") };
        assert_eq!(form.validate(), Err(ValidationError::NoFloors));

        let form = BuildingForm { sensors: "E1:;E2".to_string(), ..BuildingForm::new("A") };
        assert_eq!(form.validate(), Err(ValidationError::NoSensors));
    }
}
