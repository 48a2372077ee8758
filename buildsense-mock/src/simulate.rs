use std::collections::BTreeMap;
use std::f64::consts::TAU;

use buildsense_api::models::{BatchEntry, TelemetryReading};
use rand::Rng;
use rand_distr::{Distribution, Normal, NormalError};

use crate::settings::Mock;

/// Standard gravity in m/s².
pub const GRAVITY: f64 = 9.81;

/// Accelerometer feed of one building at rest, with noise and a slow sway.
pub struct FeedSimulator {
    sensors_per_floor: BTreeMap<String, Vec<String>>,
    noise: Normal<f64>,
    sway_amplitude: f64,
    sway_period_ms: f64,
    entries_per_batch: usize,
    sample_spacing_ms: i64,
    /// Device milliseconds since boot
    clock: i64,
}

impl FeedSimulator {
    /// Fails on a negative or non-finite noise deviation.
    pub fn new(mock: &Mock) -> Result<Self, NormalError> {
        if mock.noise_std_dev < 0.0 {
            return Err(NormalError::BadVariance);
        }

        Ok(Self {
            sensors_per_floor: mock.sensors_per_floor.clone(),
            noise: Normal::new(0.0, mock.noise_std_dev)?,
            sway_amplitude: mock.sway_amplitude,
            sway_period_ms: mock.sway_period_ms,
            entries_per_batch: mock.entries_per_batch,
            sample_spacing_ms: mock.sample_spacing_ms,
            clock: 0,
        })
    }

    /// Samples of one upload cycle, every sensor per sample.
    pub fn next_batch<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Vec<BatchEntry> {
        (0..self.entries_per_batch)
            .map(|_| {
                self.clock += self.sample_spacing_ms;
                self.sample(rng, self.clock)
            })
            .collect()
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R, timestamp: i64) -> BatchEntry {
        let mut entry = BatchEntry::new(timestamp);

        for (floor_index, (floor, sensors)) in self.sensors_per_floor.iter().enumerate() {
            // Higher floors sway further.
            let amplitude = self.sway_amplitude * (floor_index + 1) as f64;

            for (sensor_index, sensor) in sensors.iter().enumerate() {
                let phase = sensor_index as f64 * 0.25 * TAU;
                let sway = if self.sway_period_ms > 0.0 {
                    amplitude * (TAU * timestamp as f64 / self.sway_period_ms + phase).sin()
                } else {
                    0.0
                };

                let reading = TelemetryReading::new(
                    round(sway + self.noise.sample(rng)),
                    round(sway / 2.0 + self.noise.sample(rng)),
                    round(GRAVITY + self.noise.sample(rng)),
                );
                entry = entry.with_reading(floor, sensor, reading);
            }
        }

        entry
    }
}

/// Devices report two decimals.
fn round(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
