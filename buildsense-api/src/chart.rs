use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::TelemetryReading;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    #[default]
    Line,
    Scatter,
}

/// Presentation toggles of one sensor chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartConfig {
    #[serde(rename = "type")]
    pub kind: ChartKind,
    pub show_grid: bool,
    pub animated: bool,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            kind: ChartKind::Line,
            show_grid: true,
            animated: true,
        }
    }
}

impl ChartConfig {
    pub fn point_radius(&self) -> u8 {
        match self.kind {
            ChartKind::Line => 1,
            ChartKind::Scatter => 3,
        }
    }
}

/// Per-sensor chart settings keyed by `{floor}-{sensor}`.
#[derive(Debug, Clone, Default)]
pub struct ChartConfigs {
    configs: HashMap<String, ChartConfig>,
}

impl ChartConfigs {
    pub fn get(&self, floor: &str, sensor: &str) -> ChartConfig {
        self.configs
            .get(&Self::key(floor, sensor))
            .copied()
            .unwrap_or_default()
    }

    pub fn set(&mut self, floor: &str, sensor: &str, config: ChartConfig) {
        self.configs.insert(Self::key(floor, sensor), config);
    }

    fn key(floor: &str, sensor: &str) -> String {
        format!("{floor}-{sensor}")
    }
}

/// Column-oriented series ready for a 3-axis line or scatter chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSeries {
    /// Seconds since the first sample, e.g. `"1.5s"`
    pub labels: Vec<String>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
}

impl ChartSeries {
    pub fn from_readings(readings: &[TelemetryReading]) -> Self {
        let mut sorted = readings.to_vec();
        sorted.sort_by_key(|reading| reading.timestamp.unwrap_or_default());

        let base = sorted
            .first()
            .and_then(|reading| reading.timestamp)
            .unwrap_or_default();

        let mut series = Self::default();
        for reading in sorted {
            let offset = reading.timestamp.unwrap_or(base) - base;

            series.labels.push(format!("{:.1}s", offset as f64 / 1000.0));
            series.x.push(reading.x);
            series.y.push(reading.y);
            series.z.push(reading.z);
        }

        series
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
