pub mod settings;

pub use settings::{Controller, Logger, Settings, Store};
