use buildsense_api::form::ValidationError;

use super::{ConfigurationError, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}
