use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn key(&self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ReadingError {
    #[error("Reading is not an object")]
    NotAnObject,

    #[error("Reading has no {0} axis")]
    MissingAxis(Axis),

    #[error("Reading has a non-numeric {0} axis")]
    NonNumericAxis(Axis),
}

/// One 3-axis accelerometer sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetryReading {
    /// Acceleration along x in m/s²
    pub x: f64,
    /// Acceleration along y in m/s²
    pub y: f64,
    /// Acceleration along z in m/s²
    pub z: f64,
    /// Batch timestamp, attached when the reading is pulled out of a feed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl TelemetryReading {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z, timestamp: None }
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Length of the acceleration vector in m/s².
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Validates a raw store value. All three axes must be JSON numbers.
    pub fn from_value(value: &Value) -> Result<Self, ReadingError> {
        let object = value.as_object().ok_or(ReadingError::NotAnObject)?;

        let axis = |axis: Axis| match object.get(axis.key()) {
            None | Some(Value::Null) => Err(ReadingError::MissingAxis(axis)),
            Some(value) => value.as_f64().ok_or(ReadingError::NonNumericAxis(axis)),
        };

        Ok(Self {
            x: axis(Axis::X)?,
            y: axis(Axis::Y)?,
            z: axis(Axis::Z)?,
            timestamp: object.get("timestamp").and_then(integer),
        })
    }
}

/// Device clocks sometimes serialise whole numbers as floats.
pub(crate) fn integer(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|number| number.fract() == 0.0 && number.is_finite())
            .map(|number| number as i64)
    })
}
