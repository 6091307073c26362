//! Serialized access to the device connection
//!
//! The transport is a single stateful socket, so every operation holds the
//! connection mutex for its full duration. This also covers callers outside
//! the poll loop, such as ad hoc register reads from the host.

use modbus_client::{ModbusError, RegisterTransport};
use parking_lot::Mutex;

/// Whether the hub currently wants the connection open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

pub(crate) struct Connection {
    inner: Mutex<ConnectionInner>,
}

struct ConnectionInner {
    transport: Box<dyn RegisterTransport>,
    state: ConnectionState,
}

impl ConnectionInner {
    /// Re-open a socket the transport dropped after an error
    fn ensure_open(&mut self) -> Result<(), ModbusError> {
        match self.state {
            ConnectionState::Disconnected => Err(ModbusError::NotConnected),
            ConnectionState::Connected if !self.transport.is_connected() => {
                tracing::debug!("Reconnecting to {}", self.transport.endpoint());
                self.transport.connect()
            }
            ConnectionState::Connected => Ok(()),
        }
    }
}

impl Connection {
    pub(crate) fn new(transport: Box<dyn RegisterTransport>) -> Self {
        Self {
            inner: Mutex::new(ConnectionInner {
                transport,
                state: ConnectionState::Disconnected,
            }),
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.inner.lock().state
    }

    pub(crate) fn endpoint(&self) -> String {
        self.inner.lock().transport.endpoint()
    }

    pub(crate) fn connect(&self) -> Result<(), ModbusError> {
        let mut inner = self.inner.lock();
        let endpoint = inner.transport.endpoint();

        match inner.transport.connect() {
            Ok(()) => {
                inner.state = ConnectionState::Connected;
                tracing::info!("Successfully connected to {}", endpoint);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Not able to connect to {}: {}", endpoint, e);
                Err(e)
            }
        }
    }

    pub(crate) fn close(&self) {
        let mut inner = self.inner.lock();
        inner.transport.close();
        if inner.state == ConnectionState::Connected {
            tracing::debug!("Closed connection to {}", inner.transport.endpoint());
        }
        inner.state = ConnectionState::Disconnected;
    }

    pub(crate) fn read_holding_registers(
        &self,
        unit: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, ModbusError> {
        let mut inner = self.inner.lock();
        inner.ensure_open()?;
        inner.transport.read_holding_registers(unit, address, count)
    }

    pub(crate) fn write_registers(
        &self,
        unit: u8,
        address: u16,
        values: &[u16],
    ) -> Result<(), ModbusError> {
        let mut inner = self.inner.lock();
        inner.ensure_open()?;
        inner.transport.write_registers(unit, address, values)
    }
}
