//! The hub: one instance per device
//!
//! The hub exclusively owns the connection, the data cache and the listener
//! registry. Listeners drive its lifecycle: the first one opens the
//! connection and starts polling, the last one to leave stops polling and
//! closes the connection.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use e3dc_registers::{keys, FieldValue, RegisterBlock, DEFAULT_BLOCKS};
use modbus_client::{ModbusTcpClient, RegisterTransport};
use parking_lot::Mutex;
use serde::Serialize;

use crate::cache::{DataSnapshot, DeviceDataCache};
use crate::config::HubConfig;
use crate::connection::{Connection, ConnectionState};
use crate::error::{HubError, Result};
use crate::listener::{fan_out, FanOutReport, Listener, ListenerId};
use crate::refresh::{read_blocks, PollingStats, RefreshOutcome, StatsRecorder};
use crate::registry::SubscriberRegistry;
use crate::scheduler::{PollingScheduler, TickHandler};

/// Integration domain, first half of the device identifier
pub const DOMAIN: &str = "e3dc_modbus";
pub const MANUFACTURER: &str = "HagerEnergy GmbH";
pub const CONFIGURATION_URL: &str = "https://s10.e3dc.com/";

/// Operation names reported in errors from ad hoc register access
const REGISTER_READ: &str = "register read";
const REGISTER_WRITE: &str = "register write";

/// Device metadata for host device registries
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// `(DOMAIN, hub name)`
    pub identifiers: (String, String),
    pub manufacturer: String,
    /// `None` until the first successful poll
    pub model: Option<String>,
    pub name: String,
    /// `None` until the first successful poll
    pub sw_version: Option<String>,
    pub configuration_url: String,
}

/// Handle to an E3DC device hub
///
/// Cloning is cheap and every clone refers to the same hub.
#[derive(Clone)]
pub struct E3dcHub {
    inner: Arc<HubInner>,
}

struct HubInner {
    config: HubConfig,
    connection: Connection,
    cache: DeviceDataCache,
    blocks: Vec<&'static RegisterBlock>,
    /// Registry and scheduler change together under one lock
    subscribers: Mutex<Subscribers>,
    refresh_in_flight: AtomicBool,
    stats: StatsRecorder,
}

struct Subscribers {
    registry: SubscriberRegistry,
    scheduler: PollingScheduler,
}

/// Builder for hubs with a custom transport or extra register blocks
pub struct HubBuilder {
    config: HubConfig,
    transport: Option<Box<dyn RegisterTransport>>,
    blocks: Vec<&'static RegisterBlock>,
}

impl HubBuilder {
    /// Use `transport` instead of a Modbus TCP client built from the config
    pub fn with_transport(mut self, transport: Box<dyn RegisterTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Read `block` after the blocks already configured
    pub fn with_block(mut self, block: &'static RegisterBlock) -> Self {
        self.blocks.push(block);
        self
    }

    pub fn build(self) -> Result<E3dcHub> {
        self.config.validate()?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => Box::new(ModbusTcpClient::new(
                self.config.host.clone(),
                self.config.port,
                self.config.request_timeout(),
            )),
        };

        tracing::debug!(
            "Creating hub {} for {} (unit {}, every {:?})",
            self.config.name,
            transport.endpoint(),
            self.config.unit,
            self.config.scan_interval
        );

        let scheduler = PollingScheduler::new(self.config.scan_interval);
        Ok(E3dcHub {
            inner: Arc::new(HubInner {
                config: self.config,
                connection: Connection::new(transport),
                cache: DeviceDataCache::new(),
                blocks: self.blocks,
                subscribers: Mutex::new(Subscribers {
                    registry: SubscriberRegistry::new(),
                    scheduler,
                }),
                refresh_in_flight: AtomicBool::new(false),
                stats: StatsRecorder::default(),
            }),
        })
    }
}

impl E3dcHub {
    /// Create a hub talking Modbus TCP to the configured host
    ///
    /// Nothing is opened until the first listener is added.
    pub fn new(config: HubConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    pub fn builder(config: HubConfig) -> HubBuilder {
        HubBuilder {
            config,
            transport: None,
            blocks: DEFAULT_BLOCKS.to_vec(),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    pub fn config(&self) -> &HubConfig {
        &self.inner.config
    }

    /// Register a listener for data updates
    ///
    /// The first listener opens the connection and starts polling. If the
    /// connection cannot be opened the error is returned, the listener is not
    /// registered and the hub stays idle.
    pub fn add_listener(&self, listener: Arc<dyn Listener>) -> Result<ListenerId> {
        let mut subscribers = self.inner.subscribers.lock();

        if subscribers.registry.is_empty() {
            self.inner
                .connection
                .connect()
                .map_err(|source| HubError::Connection {
                    endpoint: self.inner.connection.endpoint(),
                    source,
                })?;

            let handler: Arc<dyn TickHandler> = self.inner.clone();
            let handler: Weak<dyn TickHandler> = Arc::downgrade(&handler);
            if let Err(e) = subscribers.scheduler.start(&self.inner.config.name, handler) {
                self.inner.connection.close();
                return Err(e);
            }
            tracing::info!("Started polling {}", self.inner.config.name);
        }

        let id = subscribers.registry.add(listener);
        Ok(id)
    }

    /// Unregister a listener
    ///
    /// Unknown ids are logged and ignored. Removing the last listener stops
    /// polling and closes the connection. Returns whether `id` was registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut subscribers = self.inner.subscribers.lock();

        match subscribers.registry.remove(id) {
            None => {
                tracing::warn!(
                    "Listener {} was not registered for removal on hub {}",
                    id,
                    self.inner.config.name
                );
                false
            }
            Some(now_empty) => {
                if now_empty {
                    subscribers.scheduler.stop();
                    self.inner.connection.close();
                    tracing::info!("Stopped polling {}", self.inner.config.name);
                }
                true
            }
        }
    }

    /// Drop every listener, stop polling and close the connection
    pub fn shutdown(&self) {
        let mut subscribers = self.inner.subscribers.lock();
        let removed = subscribers.registry.clear();
        if subscribers.scheduler.stop() {
            tracing::info!(
                "Shut down hub {} ({} listeners dropped)",
                self.inner.config.name,
                removed
            );
        }
        self.inner.connection.close();
    }

    /// Run one scheduler tick now: refresh, then notify listeners on success
    ///
    /// Returns `None` when nothing was fanned out, because there are no
    /// listeners, the refresh failed or another refresh was in flight.
    pub fn tick(&self) -> Option<FanOutReport> {
        self.inner.tick()
    }

    /// Run one refresh cycle without notifying listeners
    ///
    /// Fails while no listener holds the connection open.
    pub fn refresh(&self) -> Result<RefreshOutcome> {
        self.inner.refresh()
    }

    /// Snapshot of all cached values
    pub fn data(&self) -> DataSnapshot {
        self.inner.cache.snapshot()
    }

    pub fn get(&self, key: &str) -> Option<FieldValue> {
        self.inner.cache.get(key)
    }

    /// Shared read handle to the cache
    pub fn cache(&self) -> DeviceDataCache {
        self.inner.cache.clone()
    }

    pub fn listener_count(&self) -> usize {
        self.inner.subscribers.lock().registry.len()
    }

    pub fn is_polling(&self) -> bool {
        self.inner.subscribers.lock().scheduler.is_active()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.inner.connection.state()
    }

    pub fn stats(&self) -> PollingStats {
        let polling_since = self.inner.subscribers.lock().scheduler.started_at();
        self.inner.stats.snapshot(polling_since)
    }

    pub fn device_info(&self) -> DeviceInfo {
        let text = |key: &str| {
            self.inner
                .cache
                .get(key)
                .and_then(|value| value.as_text().map(str::to_string))
        };

        DeviceInfo {
            identifiers: (DOMAIN.to_string(), self.inner.config.name.clone()),
            manufacturer: MANUFACTURER.to_string(),
            model: text(keys::MODEL),
            name: self.inner.config.name.clone(),
            sw_version: text(keys::FIRMWARE),
            configuration_url: CONFIGURATION_URL.to_string(),
        }
    }

    /// Read registers outside the refresh cycle
    ///
    /// Shares the connection lock with polling, so it waits for an in-flight
    /// request to finish.
    pub fn read_holding_registers(&self, unit: u8, address: u16, count: u16) -> Result<Vec<u16>> {
        self.inner
            .connection
            .read_holding_registers(unit, address, count)
            .map_err(|e| HubError::from_request(REGISTER_READ, e))
    }

    /// Write registers through the hub's connection
    pub fn write_registers(&self, unit: u8, address: u16, values: &[u16]) -> Result<()> {
        self.inner
            .connection
            .write_registers(unit, address, values)
            .map_err(|e| HubError::from_request(REGISTER_WRITE, e))
    }
}

impl fmt::Debug for E3dcHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("E3dcHub")
            .field("name", &self.inner.config.name)
            .field("endpoint", &self.inner.config.endpoint())
            .field("connection", &self.inner.connection.state())
            .finish()
    }
}

/// Clears the in-flight flag when a refresh ends, including by panic
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl HubInner {
    fn tick(&self) -> Option<FanOutReport> {
        if self.subscribers.lock().registry.is_empty() {
            return None;
        }
        self.stats.record_tick();

        match self.refresh() {
            Ok(RefreshOutcome::Updated { .. }) => {
                // Listeners removed from here on are not notified
                let snapshot = self.subscribers.lock().registry.snapshot();
                let report = fan_out(&snapshot, &self.cache);
                if report.failed > 0 {
                    tracing::debug!(
                        "{} of {} listeners failed on hub {}",
                        report.failed,
                        snapshot.len(),
                        self.config.name
                    );
                }
                Some(report)
            }
            Ok(RefreshOutcome::Skipped) | Err(_) => None,
        }
    }

    fn refresh(&self) -> Result<RefreshOutcome> {
        if self
            .refresh_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.stats.record_skip();
            tracing::debug!("Refresh already in flight for {}, skipping", self.config.name);
            return Ok(RefreshOutcome::Skipped);
        }
        let _guard = InFlightGuard(&self.refresh_in_flight);

        match read_blocks(&self.connection, self.config.unit, &self.blocks) {
            Ok(staged) => {
                let changed = self.cache.commit(staged);
                self.stats.record_success();
                tracing::debug!("Refreshed {}: {} fields changed", self.config.name, changed);
                Ok(RefreshOutcome::Updated { changed })
            }
            Err(e) => {
                let failures = self.stats.record_failure();
                tracing::error!(
                    "Error reading modbus data from {} ({} consecutive failures): {}",
                    self.config.name,
                    failures,
                    e
                );
                Err(e)
            }
        }
    }
}

impl TickHandler for HubInner {
    fn on_tick(&self) {
        self.tick();
    }
}

impl Drop for HubInner {
    fn drop(&mut self) {
        let subscribers = self.subscribers.get_mut();
        tracing::debug!(
            "Hub {} dropping, {} listeners registered",
            self.config.name,
            subscribers.registry.len()
        );
        subscribers.scheduler.stop();
        self.connection.close();
    }
}
