//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `host.toml`.
//!     loads configuration from file or falls back to defaults.
//!
//! structure:
//!     - role:            "hub" (ingest + dashboard) or "sensor" (simulated node)
//!     - MqttConfig:      broker address, topic, client id, keepalive, retry delay
//!     - ServerConfig:    where the dashboard listens
//!     - LoggingConfig:   log level and per-reading verbosity
//!     - SimulatorConfig: node id, publish interval, weather profile
//!
//! every section is optional; missing sections and keys take the defaults
//! below, so an empty file is a valid configuration.
//!
//! ==============================================================================

use serde::Deserialize;
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct HostConfig {
    pub role: Role,
    pub mqtt: MqttConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub simulator: SimulatorConfig,
}

/// which half of the system this process runs
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// subscribe to the sensor topic and serve the dashboard
    #[default]
    Hub,
    /// publish synthetic readings like a field node would
    Sensor,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Hub => f.write_str("hub"),
            Role::Sensor => f.write_str("sensor"),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct MqttConfig {
    pub broker_host: String,
    pub broker_port: u16,
    pub topic: String,
    /// client id used by the hub; the simulator uses `sensor-<node_id>`
    pub client_id: String,
    pub keep_alive_seconds: u64,
    /// pause between polls after a connection error
    pub retry_seconds: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_host: "broker.hivemq.com".to_string(),
            broker_port: 1883,
            topic: "sih/project_cwarn/data".to_string(),
            client_id: "cwarn-hub".to_string(),
            keep_alive_seconds: 60,
            retry_seconds: 5,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub show_sensor_data: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            show_sensor_data: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SimulatorConfig {
    pub node_id: String,
    pub interval_seconds: u64,
    /// publish cloudburst-like readings instead of fair weather
    pub trigger_cloudburst: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            node_id: "MD-01".to_string(),
            interval_seconds: 3,
            trigger_cloudburst: false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// where the active configuration came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigOrigin {
    File(PathBuf),
    /// no usable file; `skipped` lists files that exist but failed to load
    Defaults { skipped: Vec<(PathBuf, String)> },
}

impl HostConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: HostConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load with default fallback
    ///
    /// looks in `config/host.toml` then `../config/host.toml`. runs before
    /// logging is up, so problems are reported through the returned origin.
    pub fn load_or_default() -> (Self, ConfigOrigin) {
        let paths = [
            PathBuf::from("config").join("host.toml"),
            PathBuf::from("..").join("config").join("host.toml"),
        ];

        let mut skipped = Vec::new();
        for path in paths {
            if path.exists() {
                match Self::load(&path) {
                    Ok(config) => return (config, ConfigOrigin::File(path)),
                    Err(e) => skipped.push((path, e.to_string())),
                }
            }
        }

        (Self::default(), ConfigOrigin::Defaults { skipped })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mqtt.topic.trim().is_empty() {
            return Err(ConfigError::Invalid("mqtt.topic must not be empty".into()));
        }
        if self.mqtt.broker_host.trim().is_empty() {
            return Err(ConfigError::Invalid("mqtt.broker_host must not be empty".into()));
        }
        if self.mqtt.broker_port == 0 {
            return Err(ConfigError::Invalid("mqtt.broker_port must be non-zero".into()));
        }
        if self.simulator.interval_seconds == 0 {
            return Err(ConfigError::Invalid(
                "simulator.interval_seconds must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// log configuration summary
    pub fn log_summary(&self) {
        tracing::info!(
            role = %self.role,
            broker = %format!("{}:{}", self.mqtt.broker_host, self.mqtt.broker_port),
            topic = %self.mqtt.topic,
            log_level = %self.logging.level,
            "host configuration"
        );
        match self.role {
            Role::Hub => tracing::info!(listen = %self.server.listen_addr, "dashboard settings"),
            Role::Sensor => tracing::info!(
                node = %self.simulator.node_id,
                interval_seconds = self.simulator.interval_seconds,
                cloudburst = self.simulator.trigger_cloudburst,
                "simulator settings"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_is_all_defaults() {
        let config = HostConfig::parse("").unwrap();
        assert_eq!(config, HostConfig::default());
        assert_eq!(config.role, Role::Hub);
        assert_eq!(config.mqtt.broker_host, "broker.hivemq.com");
        assert_eq!(config.mqtt.broker_port, 1883);
        assert_eq!(config.mqtt.topic, "sih/project_cwarn/data");
        assert_eq!(config.server.listen_addr.port(), 5000);
    }

    #[test]
    fn parses_partial_sections() {
        let config = HostConfig::parse(
            r#"
            role = "sensor"

            [mqtt]
            broker_host = "localhost"
            topic = "test/cwarn"

            [simulator]
            node_id = "MD-07"
            trigger_cloudburst = true
            "#,
        )
        .unwrap();

        assert_eq!(config.role, Role::Sensor);
        assert_eq!(config.mqtt.broker_host, "localhost");
        assert_eq!(config.mqtt.broker_port, 1883);
        assert_eq!(config.mqtt.topic, "test/cwarn");
        assert_eq!(config.simulator.node_id, "MD-07");
        assert_eq!(config.simulator.interval_seconds, 3);
        assert!(config.simulator.trigger_cloudburst);
    }

    #[test]
    fn rejects_unknown_role() {
        assert!(matches!(
            HostConfig::parse(r#"role = "relay""#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            HostConfig::parse("[mqtt]\ntopic = \"  \""),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            HostConfig::parse("[mqtt]\nbroker_port = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            HostConfig::parse("[simulator]\ninterval_seconds = 0"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nlisten_addr = \"127.0.0.1:8080\"").unwrap();

        let config = HostConfig::load(file.path()).unwrap();
        assert_eq!(config.server.listen_addr, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = HostConfig::load(dir.path().join("nope.toml"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
