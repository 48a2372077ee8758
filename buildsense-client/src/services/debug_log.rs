use std::sync::{Arc, Mutex};

use buildsense_api::models::{DebugLevel, DebugLogEntry};
use serde_json::Value;

pub type DebugListener = Arc<dyn Fn(DebugLogEntry) + Send + Sync>;

/// Operator-facing log channel. Every entry is mirrored to `tracing` and
/// handed to at most one listener; registering a listener replaces the
/// previous one.
#[derive(Default)]
pub struct DebugLog {
    listener: Mutex<Option<DebugListener>>,
}

impl DebugLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_listener(&self, listener: DebugListener) {
        *self.listener.lock().unwrap_or_else(|e| e.into_inner()) = Some(listener);
    }

    pub fn clear_listener(&self) {
        self.listener.lock().unwrap_or_else(|e| e.into_inner()).take();
    }

    pub fn log(&self, level: DebugLevel, message: impl Into<String>, data: Option<Value>) {
        let entry = DebugLogEntry::new(level, message, data);

        match (entry.level, &entry.data) {
            (DebugLevel::Info, _) => tracing::info!("{}", entry.message),
            (DebugLevel::Warning, Some(data)) => tracing::warn!("{}: {}", entry.message, data),
            (DebugLevel::Warning, None) => tracing::warn!("{}", entry.message),
            (DebugLevel::Error, Some(data)) => tracing::error!("{}: {}", entry.message, data),
            (DebugLevel::Error, None) => tracing::error!("{}", entry.message),
        }

        let listener = self.listener.lock().unwrap_or_else(|e| e.into_inner()).clone();
        if let Some(listener) = listener {
            listener(entry);
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(DebugLevel::Info, message, None);
    }

    pub fn warning(&self, message: impl Into<String>, data: Option<Value>) {
        self.log(DebugLevel::Warning, message, data);
    }

    pub fn error(&self, message: impl Into<String>, data: Option<Value>) {
        self.log(DebugLevel::Error, message, data);
    }
}
