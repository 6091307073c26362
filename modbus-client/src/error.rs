//! Error types for the Modbus client

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during Modbus register communication
#[derive(Debug, Error)]
pub enum ModbusError {
    /// The TCP connection could not be established
    #[error("Connection error: {0}")]
    Connection(String),

    /// Socket or framing error on an established connection
    #[error("Network error: {0}")]
    Network(String),

    /// The device did not answer within the request timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Exception response returned by the device
    #[error("Modbus exception: code {0:#04x}")]
    Exception(u8),

    /// The device answered with a different number of registers than requested
    #[error("Invalid response: expected {expected} registers, got {actual}")]
    InvalidResponse { expected: u16, actual: usize },

    /// A request was issued while the client is closed
    #[error("Client is not connected")]
    NotConnected,
}

impl ModbusError {
    /// Whether the error leaves the socket in an unusable state
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, ModbusError::Network(_) | ModbusError::Timeout(_))
    }
}
