use std::env;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};

use crate::errors::ConfigurationError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logger {
    pub level: String,
}

impl Default for Logger {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

/// Realtime database connection and layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Store {
    pub database_url: String,
    pub api_key: String,
    pub auth_domain: String,
    pub project_id: String,
    pub storage_bucket: Option<String>,
    pub messaging_sender_id: Option<String>,
    pub app_id: Option<String>,
    /// Database secret or ID token passed as the `auth` query parameter
    pub auth_token: Option<String>,
    #[serde(default = "default_buildings_path")]
    pub buildings_path: String,
    #[serde(default = "default_telemetry_path")]
    pub telemetry_path: String,
    #[serde(default = "default_connectivity_path")]
    pub connectivity_path: String,
    /// Building whose telemetry is read from `telemetry_path`
    #[serde(default = "default_telemetry_path")]
    pub device_feed_building: String,
}

fn default_buildings_path() -> String {
    "buildings".to_string()
}

fn default_telemetry_path() -> String {
    "batch_data".to_string()
}

fn default_connectivity_path() -> String {
    ".info/connected".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Controller {
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

impl Default for Controller {
    fn default() -> Self {
        Self {
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

fn default_probe_timeout_ms() -> u64 {
    5_000
}

/// Operator routine run once before monitoring starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceTask {
    Cleanup,
    ImportSample,
    ImportDeviceFeed,
    ImportBuildings,
    Verify,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Maintenance {
    #[serde(default)]
    pub task: Option<MaintenanceTask>,
    /// Buildings created by `import_buildings`
    #[serde(default = "default_building_count")]
    pub building_count: usize,
}

impl Default for Maintenance {
    fn default() -> Self {
        Self {
            task: None,
            building_count: default_building_count(),
        }
    }
}

fn default_building_count() -> usize {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub logger: Logger,
    pub store: Store,
    #[serde(default)]
    pub controller: Controller,
    #[serde(default)]
    pub maintenance: Maintenance,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigurationError> {
        let run_mode = env::var("RUN_MODE").unwrap_or("development".into());

        let builder = Config::builder()
            .add_source(File::with_name("configs/default").required(false))
            .add_source(File::with_name(&format!("configs/{run_mode}")).required(false))
            .add_source(
                Environment::with_prefix("BUILDSENSE")
                    .prefix_separator("_")
                    .separator("__"),
            );

        Self::load(builder)
    }

    /// Builds, deserializes and validates settings from any source stack.
    pub fn load(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigurationError> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;

        Ok(settings)
    }

    /// Required connection fields must be present and not a placeholder.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let required = [
            ("store.database_url", &self.store.database_url),
            ("store.api_key", &self.store.api_key),
            ("store.auth_domain", &self.store.auth_domain),
            ("store.project_id", &self.store.project_id),
        ];

        for (field, value) in required {
            let value = value.trim();
            if value.is_empty() || value == "undefined" {
                return Err(ConfigurationError::Missing(field));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use config::FileFormat;

    use super::*;

    const COMPLETE: &str = r#"
        [logger]
        level = "debug"

        [store]
        database_url = "https://buildsense-test.firebaseio.com"
        api_key = "key"
        auth_domain = "buildsense-test.firebaseapp.com"
        project_id = "buildsense-test"
    "#;

    fn from_toml(source: &str) -> Result<Settings, ConfigurationError> {
        Settings::load(Config::builder().add_source(File::from_str(source, FileFormat::Toml)))
    }

    #[test]
    fn test_load_applies_defaults() {
        let settings = from_toml(COMPLETE).unwrap();

        assert_eq!(settings.logger.level, "debug");
        assert_eq!(settings.store.buildings_path, "buildings");
        assert_eq!(settings.store.telemetry_path, "batch_data");
        assert_eq!(settings.store.connectivity_path, ".info/connected");
        assert_eq!(settings.store.device_feed_building, "batch_data");
        assert_eq!(settings.store.auth_token, None);
        assert_eq!(settings.controller.probe_timeout_ms, 5_000);
        assert_eq!(settings.maintenance.task, None);
        assert_eq!(settings.maintenance.building_count, 3);
    }

    #[test]
    fn test_load_maintenance_task() {
        let source = format!("{COMPLETE}\n[maintenance]\ntask = \"import_buildings\"\nbuilding_count = 5\n");
        let settings = from_toml(&source).unwrap();

        assert_eq!(settings.maintenance.task, Some(MaintenanceTask::ImportBuildings));
        assert_eq!(settings.maintenance.building_count, 5);

        let source = format!("{COMPLETE}\n[maintenance]\ntask = \"reformat\"\n");
        assert!(matches!(from_toml(&source), Err(ConfigurationError::Load(_))));
    }

    #[test]
    fn test_placeholder_values_are_missing() {
        let source = COMPLETE.replace(r#"api_key = "key""#, r#"api_key = "undefined""#);

        assert!(matches!(from_toml(&source), Err(ConfigurationError::Missing("store.api_key"))));

        let source = COMPLETE.replace(r#"project_id = "buildsense-test""#, r#"project_id = "  ""#);

        assert!(matches!(from_toml(&source), Err(ConfigurationError::Missing("store.project_id"))));
    }

    #[test]
    fn test_absent_field_fails_to_load() {
        let source = COMPLETE.replace(r#"auth_domain = "buildsense-test.firebaseapp.com""#, "");

        assert!(matches!(from_toml(&source), Err(ConfigurationError::Load(_))));
    }
}
