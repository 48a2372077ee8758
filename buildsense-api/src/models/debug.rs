use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::now_millis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebugLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for DebugLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DebugLevel::Info => "info",
            DebugLevel::Warning => "warning",
            DebugLevel::Error => "error",
        })
    }
}

/// Entry of the operator-facing debug console.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugLogEntry {
    /// Time-ordered unique id
    pub id: String,
    /// Creation time in epoch milliseconds
    pub timestamp: i64,
    pub level: DebugLevel,
    pub message: String,
    /// Opaque context, usually an error rendering
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl DebugLogEntry {
    pub fn new(level: DebugLevel, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            timestamp: now_millis(),
            level,
            message: message.into(),
            data,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(DebugLevel::Info, message, None)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(DebugLevel::Warning, message, None)
    }

    pub fn error(message: impl Into<String>, data: Option<Value>) -> Self {
        Self::new(DebugLevel::Error, message, data)
    }
}
