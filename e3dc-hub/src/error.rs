use e3dc_registers::DecodeError;
use modbus_client::ModbusError;
use thiserror::Error;

/// Errors that can occur in the E3DC hub
#[derive(Error, Debug)]
pub enum HubError {
    /// Opening the connection failed when the first listener attached
    #[error("Failed to connect to {endpoint}: {source}")]
    Connection {
        endpoint: String,
        #[source]
        source: ModbusError,
    },

    /// Socket failure, timeout or malformed reply while reading a field or
    /// issuing an ad hoc request
    #[error("Transport error on {field}: {source}")]
    Transport {
        field: &'static str,
        #[source]
        source: ModbusError,
    },

    /// The device answered with an exception response
    #[error("Device rejected {field} with exception code {code:#04x}")]
    Protocol { field: &'static str, code: u8 },

    /// The returned words could not be decoded
    #[error("Failed to decode {field}: {source}")]
    Decode {
        field: &'static str,
        #[source]
        source: DecodeError,
    },

    /// Invalid hub configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The polling worker could not be started
    #[error("Polling scheduler error: {0}")]
    Scheduler(String),

    /// No hub registered under the entry id
    #[error("Hub not found for entry {0}")]
    HubNotFound(String),

    /// A hub is already registered under the entry id
    #[error("Hub already registered for entry {0}")]
    HubAlreadyRegistered(String),
}

impl HubError {
    /// Classify a failed request; `field` names the field or operation
    pub(crate) fn from_request(field: &'static str, error: ModbusError) -> Self {
        match error {
            ModbusError::Exception(code) => HubError::Protocol { field, code },
            source => HubError::Transport { field, source },
        }
    }
}

/// Result type for hub operations
pub type Result<T> = std::result::Result<T, HubError>;
