//! Device data cache
//!
//! Maps field keys to the last successfully decoded value. Only the refresh
//! cycle writes, and it writes a whole cycle's values under a single write
//! lock, so readers see either the previous or the new batch, never a mix.
//! Values are never cleared: they are the "last known good" data.

use std::collections::HashMap;
use std::sync::Arc;

use e3dc_registers::FieldValue;
use parking_lot::RwLock;

/// Point-in-time copy of the cache
pub type DataSnapshot = HashMap<String, FieldValue>;

/// Shared, cheaply cloneable handle to a hub's decoded data
#[derive(Debug, Clone, Default)]
pub struct DeviceDataCache {
    values: Arc<RwLock<HashMap<String, FieldValue>>>,
}

impl DeviceDataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a field, `None` until the first successful poll
    pub fn get(&self, key: &str) -> Option<FieldValue> {
        self.values.read().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.read().contains_key(key)
    }

    /// Copy of every cached field
    pub fn snapshot(&self) -> DataSnapshot {
        self.values.read().clone()
    }

    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }

    /// Write a batch of decoded values atomically
    ///
    /// Returns how many keys were added or changed.
    pub(crate) fn commit<I>(&self, batch: I) -> usize
    where
        I: IntoIterator<Item = (&'static str, FieldValue)>,
    {
        let mut values = self.values.write();
        let mut changed = 0;
        for (key, value) in batch {
            if values.get(key) != Some(&value) {
                values.insert(key.to_string(), value);
                changed += 1;
            }
        }
        changed
    }
}
