use std::collections::BTreeMap;
use std::error::Error;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logger {
    pub level: String,
}

/// Where simulated batches are uploaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Target {
    Firebase {
        database_url: String,
        auth_token: Option<String>,
    },
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mock {
    /// Root feed path the devices write to
    pub telemetry_path: String,
    /// Time between uploads
    pub interval_ms: u64,
    /// Samples per upload
    pub entries_per_batch: usize,
    /// Device clock advance between samples
    pub sample_spacing_ms: i64,
    /// Standard deviation of the sensor noise in m/s²
    pub noise_std_dev: f64,
    /// Peak horizontal sway in m/s²
    pub sway_amplitude: f64,
    pub sway_period_ms: f64,
    pub sensors_per_floor: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub logger: Logger,
    pub target: Target,
    pub mock: Mock,
}

impl Settings {
    pub fn new() -> Result<Self, Box<dyn Error>> {
        let settings: Settings = toml::from_str(include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../",
            "configs/mock.toml"
        )))?;

        Ok(settings)
    }
}
