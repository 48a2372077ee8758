use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Store responded with status {code}: {message}")]
    Status { code: u16, message: String },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Subscription error: {0}")]
    Subscription(String),

    #[error("Store is unreachable")]
    Unreachable,
}

impl StoreError {
    /// Payload attached to debug log entries.
    pub fn to_value(&self) -> Value {
        Value::String(self.to_string())
    }
}
