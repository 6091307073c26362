//! Listeners that mirror one cached field each

use std::sync::Arc;

use e3dc_registers::{FieldDescriptor, FieldValue, RegisterBlock};
use parking_lot::Mutex;

use crate::cache::DeviceDataCache;
use crate::hub::DOMAIN;
use crate::listener::{Listener, ListenerResult};

/// The current state of one field, updated on every fan-out
///
/// When the field is missing from the cache the previous state is kept.
#[derive(Debug)]
pub struct FieldSensor {
    descriptor: &'static FieldDescriptor,
    state: Mutex<Option<FieldValue>>,
}

impl FieldSensor {
    pub fn new(descriptor: &'static FieldDescriptor) -> Self {
        Self {
            descriptor,
            state: Mutex::new(None),
        }
    }

    /// Stable id, `e3dc_modbus_<key>`
    pub fn unique_id(&self) -> String {
        format!("{}_{}", DOMAIN, self.descriptor.key)
    }

    pub fn name(&self) -> &'static str {
        self.descriptor.name
    }

    pub fn key(&self) -> &'static str {
        self.descriptor.key
    }

    pub fn icon(&self) -> &'static str {
        self.descriptor.icon
    }

    pub fn descriptor(&self) -> &'static FieldDescriptor {
        self.descriptor
    }

    /// Last value seen, `None` before the first successful poll
    pub fn state(&self) -> Option<FieldValue> {
        self.state.lock().clone()
    }
}

impl Listener for FieldSensor {
    fn notify(&self, data: &DeviceDataCache) -> ListenerResult {
        if let Some(value) = data.get(self.descriptor.key) {
            *self.state.lock() = Some(value);
        }
        Ok(())
    }
}

/// One sensor per field of `block`, in block order
pub fn sensors_for_block(block: &'static RegisterBlock) -> Vec<Arc<FieldSensor>> {
    block
        .fields
        .iter()
        .map(|descriptor| Arc::new(FieldSensor::new(descriptor)))
        .collect()
}
