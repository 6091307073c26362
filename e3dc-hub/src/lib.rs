//! # E3DC Hub - listener-driven polling for E3DC Hauskraftwerk devices
//!
//! One [`E3dcHub`] per device. Listeners attach to it; while at least one is
//! attached the hub keeps a Modbus TCP connection open and polls the device
//! at the configured scan interval, caching the decoded fields and notifying
//! every listener after each successful refresh.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use e3dc_hub::{sensors_for_block, E3dcHub, HubConfig, IDENTIFICATION_BLOCK};
//!
//! fn main() -> Result<(), e3dc_hub::HubError> {
//!     let config = HubConfig::new("192.168.99.40")
//!         .with_scan_interval(Duration::from_secs(10));
//!     let hub = E3dcHub::new(config)?;
//!
//!     // The first listener connects and starts polling
//!     let sensors = sensors_for_block(&IDENTIFICATION_BLOCK);
//!     for sensor in &sensors {
//!         hub.add_listener(sensor.clone())?;
//!     }
//!
//!     std::thread::sleep(Duration::from_secs(15));
//!     for sensor in &sensors {
//!         println!("{}: {:?}", sensor.name(), sensor.state());
//!     }
//!
//!     hub.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! ## Lifecycle
//!
//! ```text
//! Idle --(first add_listener: connect, start scheduler)--> Active
//! Active --(last remove_listener: stop scheduler, close)--> Idle
//! ```
//!
//! A failed connect is returned from `add_listener` and the hub stays idle.
//! Failed refreshes are logged and leave the cache unchanged; the previous
//! values stay available as last known good data.

pub mod cache;
pub mod config;
pub mod connection;
pub mod error;
pub mod hub;
pub mod listener;
pub mod logging;
pub mod manager;
pub mod refresh;
pub mod sensor;

mod registry;
mod scheduler;

pub use cache::{DataSnapshot, DeviceDataCache};
pub use config::HubConfig;
pub use connection::ConnectionState;
pub use error::{HubError, Result};
pub use hub::{DeviceInfo, E3dcHub, HubBuilder};
pub use listener::{FanOutReport, Listener, ListenerId, ListenerResult};
pub use manager::HubRegistry;
pub use refresh::{PollingStats, RefreshOutcome};
pub use sensor::{sensors_for_block, FieldSensor};

pub use e3dc_registers::{keys, FieldValue, RegisterBlock, IDENTIFICATION_BLOCK};
pub use modbus_client::{ModbusError, RegisterTransport};

/// Commonly used types
pub mod prelude {
    pub use crate::{
        DeviceDataCache, E3dcHub, FieldValue, HubConfig, HubError, Listener, ListenerId,
        ListenerResult,
    };
}
