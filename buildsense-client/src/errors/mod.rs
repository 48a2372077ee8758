pub mod client;
pub mod configuration;
pub mod store;

pub use client::ClientError;
pub use configuration::ConfigurationError;
pub use store::StoreError;
