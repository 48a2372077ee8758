#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Missing or invalid configuration field: {0}")]
    Missing(&'static str),

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}
