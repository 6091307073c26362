//! Private Modbus register client for E3DC device communication
//!
//! This crate provides a minimal, blocking holding-register client for
//! talking to an E3DC Hauskraftwerk over Modbus TCP. The async
//! `tokio-modbus` client is driven by a private current-thread runtime so
//! callers never need to be async.
//!
//! Every operation takes `&mut self`: one client is one socket, and a
//! socket carries one outstanding request at a time. Callers that share a
//! client across threads must wrap it in a mutex. Since the client blocks,
//! it must not be used from inside another async runtime's worker.

mod error;

pub use error::ModbusError;

use std::net::SocketAddr;
use std::time::Duration;

use tokio::runtime::{Builder, Runtime};
use tokio_modbus::client::Context;
use tokio_modbus::prelude::*;

/// Convenience type alias for Results using ModbusError
pub type Result<T> = std::result::Result<T, ModbusError>;

/// Holding-register transport to a single device endpoint
///
/// Implementations are blocking. Register addresses are passed to the
/// device verbatim.
pub trait RegisterTransport: Send {
    /// Open the connection
    fn connect(&mut self) -> Result<()>;

    /// Close the connection; safe to call when already closed
    fn close(&mut self);

    /// Whether a socket is currently open
    fn is_connected(&self) -> bool;

    /// Read `count` holding registers starting at `address` from device `unit`
    fn read_holding_registers(&mut self, unit: u8, address: u16, count: u16) -> Result<Vec<u16>>;

    /// Write a sequence of holding registers starting at `address` on device `unit`
    fn write_registers(&mut self, unit: u8, address: u16, values: &[u16]) -> Result<()>;

    /// Human readable endpoint used in log messages
    fn endpoint(&self) -> String;
}

/// A minimal Modbus TCP client
pub struct ModbusTcpClient {
    host: String,
    port: u16,
    timeout: Duration,
    runtime: Option<Runtime>,
    context: Option<Context>,
}

impl ModbusTcpClient {
    /// Create a new client; no connection is opened until [`connect`](RegisterTransport::connect)
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
            runtime: None,
            context: None,
        }
    }

    /// Timeout applied to connect and to every request
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn ensure_runtime(&mut self) -> Result<()> {
        if self.runtime.is_none() {
            let runtime = Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| ModbusError::Connection(format!("failed to start runtime: {}", e)))?;
            self.runtime = Some(runtime);
        }
        Ok(())
    }

    /// Drop the socket after an error that leaves it unusable
    fn discard_on_failure<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if e.is_connection_lost() {
                tracing::debug!("Dropping Modbus connection to {} after error: {}", self.endpoint(), e);
                self.context = None;
            }
        }
        result
    }
}

async fn open_context(host: &str, port: u16, timeout: Duration) -> Result<Context> {
    let connect = async {
        let addr: SocketAddr = tokio::net::lookup_host((host, port))
            .await
            .map_err(|e| ModbusError::Connection(format!("failed to resolve {}: {}", host, e)))?
            .next()
            .ok_or_else(|| ModbusError::Connection(format!("no address found for {}", host)))?;

        tcp::connect(addr)
            .await
            .map_err(|e| ModbusError::Connection(format!("{}:{}: {}", host, port, e)))
    };

    tokio::time::timeout(timeout, connect)
        .await
        .map_err(|_| ModbusError::Connection(format!("{}:{}: timed out after {:?}", host, port, timeout)))?
}

impl RegisterTransport for ModbusTcpClient {
    fn connect(&mut self) -> Result<()> {
        self.ensure_runtime()?;
        let Some(runtime) = self.runtime.as_ref() else {
            return Err(ModbusError::Connection("runtime unavailable".to_string()));
        };

        let context = runtime.block_on(open_context(&self.host, self.port, self.timeout))?;
        self.context = Some(context);
        Ok(())
    }

    fn close(&mut self) {
        // Dropping the context closes the socket
        self.context = None;
    }

    fn is_connected(&self) -> bool {
        self.context.is_some()
    }

    fn read_holding_registers(&mut self, unit: u8, address: u16, count: u16) -> Result<Vec<u16>> {
        let (Some(runtime), Some(context)) = (self.runtime.as_ref(), self.context.as_mut()) else {
            return Err(ModbusError::NotConnected);
        };

        context.set_slave(Slave(unit));
        let timeout = self.timeout;
        // Raw request: the typed reader asserts on the word count in debug builds
        let request = Request::ReadHoldingRegisters(address, count);
        let response = runtime.block_on(async {
            tokio::time::timeout(timeout, context.call(request)).await
        });

        let result = match response {
            Err(_) => Err(ModbusError::Timeout(timeout)),
            Ok(Err(e)) => Err(ModbusError::Network(e.to_string())),
            Ok(Ok(Err(exception))) => Err(ModbusError::Exception(u8::from(exception))),
            Ok(Ok(Ok(Response::ReadHoldingRegisters(words)))) if words.len() != usize::from(count) => {
                Err(ModbusError::InvalidResponse {
                    expected: count,
                    actual: words.len(),
                })
            }
            Ok(Ok(Ok(Response::ReadHoldingRegisters(words)))) => Ok(words),
            Ok(Ok(Ok(other))) => Err(ModbusError::Network(format!(
                "unexpected response to holding register read: {:?}",
                other
            ))),
        };

        self.discard_on_failure(result)
    }

    fn write_registers(&mut self, unit: u8, address: u16, values: &[u16]) -> Result<()> {
        let (Some(runtime), Some(context)) = (self.runtime.as_ref(), self.context.as_mut()) else {
            return Err(ModbusError::NotConnected);
        };

        context.set_slave(Slave(unit));
        let timeout = self.timeout;
        let response = runtime.block_on(async {
            tokio::time::timeout(timeout, context.write_multiple_registers(address, values)).await
        });

        let result = match response {
            Err(_) => Err(ModbusError::Timeout(timeout)),
            Ok(Err(e)) => Err(ModbusError::Network(e.to_string())),
            Ok(Ok(Err(exception))) => Err(ModbusError::Exception(u8::from(exception))),
            Ok(Ok(Ok(()))) => Ok(()),
        };

        self.discard_on_failure(result)
    }

    fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl std::fmt::Debug for ModbusTcpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModbusTcpClient")
            .field("endpoint", &self.endpoint())
            .field("timeout", &self.timeout)
            .field("connected", &self.is_connected())
            .finish()
    }
}
