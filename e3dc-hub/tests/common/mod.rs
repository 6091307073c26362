//! Scripted transport and recording listeners shared by the hub tests.
//!
//! `MockTransport` serves a fixed register image of an E3DC device and can be
//! told to fail connects or individual reads. All state lives behind `Arc`s so
//! a test keeps a clone for inspection after handing one to the hub.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use e3dc_hub::{
    DeviceDataCache, E3dcHub, HubConfig, Listener, ListenerResult, ModbusError, RegisterTransport,
};
use e3dc_registers::{keys, RegisterEncoder, IDENTIFICATION_BLOCK};
use parking_lot::Mutex;

pub const MANUFACTURER: &str = "HagerEnergy GmbH";
pub const MODEL: &str = "S10 E AIO Pro 912";
pub const SERIAL_NUMBER: &str = "S10-123456789012";
pub const FIRMWARE: &str = "S10_2024_04";
pub const MODBUS_FIRMWARE: u16 = 0x0102;
pub const REGISTER_COUNT: u16 = 103;

/// How a scripted read fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadFailure {
    /// Device answers with an exception response
    Exception(u8),
    /// Socket error; the transport drops its connection like the TCP client
    Network,
    /// Words that are not valid UTF-8 for a string field
    InvalidUtf8,
}

/// Scriptable in-memory transport
#[derive(Clone, Default)]
pub struct MockTransport {
    registers: Arc<Mutex<HashMap<u16, Vec<u16>>>>,
    failures: Arc<Mutex<HashMap<u16, ReadFailure>>>,
    read_delay: Arc<Mutex<Duration>>,
    open: Arc<AtomicBool>,
    fail_connect: Arc<AtomicBool>,
    connect_count: Arc<AtomicUsize>,
    close_count: Arc<AtomicUsize>,
    read_count: Arc<AtomicUsize>,
    written: Arc<Mutex<Vec<(u8, u16, Vec<u16>)>>>,
}

impl MockTransport {
    /// Transport serving the identification block of a typical device
    pub fn new() -> Self {
        let transport = Self::default();
        transport.set_identification(MODEL, FIRMWARE);
        transport
    }

    /// Replace the served model and firmware strings
    pub fn set_identification(&self, model: &str, firmware: &str) {
        let mut registers = self.registers.lock();
        registers.insert(40001, vec![MODBUS_FIRMWARE]);
        registers.insert(40002, vec![REGISTER_COUNT]);
        registers.insert(40003, string_words(MANUFACTURER, 16));
        registers.insert(40019, string_words(model, 16));
        registers.insert(40035, string_words(SERIAL_NUMBER, 16));
        registers.insert(40051, string_words(firmware, 16));
    }

    pub fn set_registers(&self, address: u16, words: Vec<u16>) {
        self.registers.lock().insert(address, words);
    }

    /// Make every read starting at `address` fail until cleared
    pub fn fail_read_at(&self, address: u16, failure: ReadFailure) {
        self.failures.lock().insert(address, failure);
    }

    pub fn clear_failures(&self) {
        self.failures.lock().clear();
    }

    pub fn set_fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    pub fn set_read_delay(&self, delay: Duration) {
        *self.read_delay.lock() = delay;
    }

    pub fn connect_count(&self) -> usize {
        self.connect_count.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.close_count.load(Ordering::SeqCst)
    }

    pub fn read_count(&self) -> usize {
        self.read_count.load(Ordering::SeqCst)
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    pub fn written(&self) -> Vec<(u8, u16, Vec<u16>)> {
        self.written.lock().clone()
    }
}

impl RegisterTransport for MockTransport {
    fn connect(&mut self) -> Result<(), ModbusError> {
        self.connect_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(ModbusError::Connection("connection refused".to_string()));
        }
        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn close(&mut self) {
        self.close_count.fetch_add(1, Ordering::SeqCst);
        self.open.store(false, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn read_holding_registers(
        &mut self,
        _unit: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, ModbusError> {
        if !self.is_connected() {
            return Err(ModbusError::NotConnected);
        }
        self.read_count.fetch_add(1, Ordering::SeqCst);

        let delay = *self.read_delay.lock();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        let failure = self.failures.lock().get(&address).copied();
        match failure {
            Some(ReadFailure::Exception(code)) => return Err(ModbusError::Exception(code)),
            Some(ReadFailure::Network) => {
                self.open.store(false, Ordering::SeqCst);
                return Err(ModbusError::Network("connection reset by peer".to_string()));
            }
            Some(ReadFailure::InvalidUtf8) => return Ok(vec![0xFFFE; usize::from(count)]),
            None => {}
        }

        let words = self
            .registers
            .lock()
            .get(&address)
            .cloned()
            .ok_or(ModbusError::Exception(0x02))?;

        if words.len() != usize::from(count) {
            return Err(ModbusError::InvalidResponse {
                expected: count,
                actual: words.len(),
            });
        }
        Ok(words)
    }

    fn write_registers(&mut self, unit: u8, address: u16, values: &[u16]) -> Result<(), ModbusError> {
        if !self.is_connected() {
            return Err(ModbusError::NotConnected);
        }
        self.written.lock().push((unit, address, values.to_vec()));
        Ok(())
    }

    fn endpoint(&self) -> String {
        "mock-e3dc:502".to_string()
    }
}

/// Encode `value` as a NUL-padded string block
pub fn string_words(value: &str, words: usize) -> Vec<u16> {
    let mut encoder = RegisterEncoder::new();
    encoder
        .encode_fixed_string(value, words)
        .expect("fixture string fits");
    encoder.into_words()
}

/// Start addresses of the identification block in read order
pub fn identification_addresses() -> Vec<u16> {
    IDENTIFICATION_BLOCK.fields.iter().map(|f| f.address).collect()
}

pub fn test_config() -> HubConfig {
    HubConfig::new("mock-e3dc").with_scan_interval(Duration::from_secs(3600))
}

/// Hub over a fresh mock transport; the scan interval is long enough that
/// only explicit `tick()` calls poll.
pub fn mock_hub() -> (E3dcHub, MockTransport) {
    hub_with_config(test_config())
}

pub fn hub_with_config(config: HubConfig) -> (E3dcHub, MockTransport) {
    let transport = MockTransport::new();
    let hub = E3dcHub::builder(config)
        .with_transport(Box::new(transport.clone()))
        .build()
        .expect("valid test config");
    (hub, transport)
}

/// Listener behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    Ok,
    Fail,
    Panic,
}

/// Listener that appends its label to a shared log on every notification
pub struct RecordingListener {
    label: &'static str,
    behaviour: Behaviour,
    log: Arc<Mutex<Vec<&'static str>>>,
    seen_model: Mutex<Option<String>>,
}

impl RecordingListener {
    pub fn new(label: &'static str, log: &Arc<Mutex<Vec<&'static str>>>) -> Arc<Self> {
        Self::with_behaviour(label, Behaviour::Ok, log)
    }

    pub fn with_behaviour(
        label: &'static str,
        behaviour: Behaviour,
        log: &Arc<Mutex<Vec<&'static str>>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            label,
            behaviour,
            log: Arc::clone(log),
            seen_model: Mutex::new(None),
        })
    }

    pub fn seen_model(&self) -> Option<String> {
        self.seen_model.lock().clone()
    }
}

impl Listener for RecordingListener {
    fn notify(&self, data: &DeviceDataCache) -> ListenerResult {
        self.log.lock().push(self.label);
        *self.seen_model.lock() = data
            .get(keys::MODEL)
            .and_then(|value| value.as_text().map(str::to_string));

        match self.behaviour {
            Behaviour::Ok => Ok(()),
            Behaviour::Fail => Err(format!("{} refused the update", self.label).into()),
            Behaviour::Panic => panic!("{} crashed", self.label),
        }
    }
}

pub fn new_log() -> Arc<Mutex<Vec<&'static str>>> {
    Arc::new(Mutex::new(Vec::new()))
}

/// Listener that does nothing
pub fn noop_listener() -> Arc<dyn Listener> {
    Arc::new(|_: &DeviceDataCache| -> ListenerResult { Ok(()) })
}
