//! Configuration types for the E3DC hub
//!
//! Hosts usually build a [`HubConfig`] from their own configuration store,
//! either in code via the builder methods or by deserializing JSON.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{HubError, Result};

pub const DEFAULT_NAME: &str = "E3DC Hauskraftwerk";
pub const DEFAULT_PORT: u16 = 502;
pub const DEFAULT_UNIT: u8 = 1;
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(5);

/// Lower bound for the per-request timeout
const MIN_REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

/// Connection settings for one device
///
/// Immutable once a hub has been built from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubConfig {
    /// Name of the hub, also used as the device identifier
    /// Default: "E3DC Hauskraftwerk"
    #[serde(default = "default_name")]
    pub name: String,

    /// Host name or IP address of the device
    pub host: String,

    /// Modbus TCP port
    /// Default: 502
    #[serde(default = "default_port")]
    pub port: u16,

    /// Modbus unit (slave) address, at least 1
    /// Default: 1
    #[serde(default = "default_unit", alias = "modbus_address")]
    pub unit: u8,

    /// Interval between polls
    /// Default: 5 seconds
    #[serde(
        default = "default_scan_interval",
        with = "duration_secs"
    )]
    pub scan_interval: Duration,
}

fn default_name() -> String {
    DEFAULT_NAME.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_unit() -> u8 {
    DEFAULT_UNIT
}

fn default_scan_interval() -> Duration {
    DEFAULT_SCAN_INTERVAL
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

impl HubConfig {
    /// Create a configuration for `host` with default values
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            name: default_name(),
            host: host.into(),
            port: DEFAULT_PORT,
            unit: DEFAULT_UNIT,
            scan_interval: DEFAULT_SCAN_INTERVAL,
        }
    }

    /// Parse a configuration from a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| HubError::Configuration(format!("invalid JSON configuration: {}", e)))
    }

    /// Read and parse a JSON configuration file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            HubError::Configuration(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&contents)
    }

    /// Validate the configuration and return any issues
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(HubError::Configuration(
                "Hub name must not be empty".to_string(),
            ));
        }

        if self.host.trim().is_empty() {
            return Err(HubError::Configuration("Host must not be empty".to_string()));
        }

        if self.port == 0 {
            return Err(HubError::Configuration(
                "Port must be greater than 0".to_string(),
            ));
        }

        if self.unit == 0 {
            return Err(HubError::Configuration(
                "Modbus unit address must be at least 1".to_string(),
            ));
        }

        if self.scan_interval.is_zero() {
            return Err(HubError::Configuration(
                "Scan interval must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Timeout applied to each register request: `max(3s, scan_interval - 1s)`
    pub fn request_timeout(&self) -> Duration {
        self.scan_interval
            .saturating_sub(Duration::from_secs(1))
            .max(MIN_REQUEST_TIMEOUT)
    }

    /// `host:port` as used in log messages
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Builder pattern methods for fluent configuration

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_unit(mut self, unit: u8) -> Self {
        self.unit = unit;
        self
    }

    pub fn with_scan_interval(mut self, interval: Duration) -> Self {
        self.scan_interval = interval;
        self
    }
}
