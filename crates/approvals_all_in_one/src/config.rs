use common::telemetry::{LogFormat, TelemetryConfig};
use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output format (json, pretty)
    #[serde(default)]
    pub log_format: LogFormat,

    /// Service name attached to every log line
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Optional JSON file with organizations and users to load at startup
    #[serde(default)]
    pub seed_file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "approvals".to_string()
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("APPROVALS"))
            .build()?
            .try_deserialize()
    }

    pub fn telemetry(&self) -> TelemetryConfig {
        TelemetryConfig {
            service_name: self.service_name.clone(),
            log_level: self.log_level.clone(),
            log_format: self.log_format,
        }
    }
}
