//! Host-level registry of hubs keyed by configuration entry

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::config::HubConfig;
use crate::error::{HubError, Result};
use crate::hub::E3dcHub;

/// Owns the hubs created for a host's configuration entries
///
/// Each entry id maps to exactly one hub. Unloading an entry shuts its hub
/// down before forgetting it.
#[derive(Debug, Default)]
pub struct HubRegistry {
    hubs: DashMap<String, E3dcHub>,
}

impl HubRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a hub for `config` and register it under `entry_id`
    pub fn setup_entry(&self, entry_id: impl Into<String>, config: HubConfig) -> Result<E3dcHub> {
        let entry_id = entry_id.into();
        if self.hubs.contains_key(&entry_id) {
            return Err(HubError::HubAlreadyRegistered(entry_id));
        }
        let hub = E3dcHub::new(config)?;
        self.insert(entry_id, hub.clone())?;
        Ok(hub)
    }

    /// Register an already built hub
    pub fn insert(&self, entry_id: impl Into<String>, hub: E3dcHub) -> Result<()> {
        match self.hubs.entry(entry_id.into()) {
            Entry::Occupied(entry) => Err(HubError::HubAlreadyRegistered(entry.key().clone())),
            Entry::Vacant(entry) => {
                tracing::debug!("Registered hub {} as entry {}", hub.name(), entry.key());
                entry.insert(hub);
                Ok(())
            }
        }
    }

    pub fn get(&self, entry_id: &str) -> Option<E3dcHub> {
        self.hubs.get(entry_id).map(|hub| hub.clone())
    }

    /// Like [`get`](Self::get) but reports a missing entry as an error
    pub fn hub(&self, entry_id: &str) -> Result<E3dcHub> {
        self.get(entry_id)
            .ok_or_else(|| HubError::HubNotFound(entry_id.to_string()))
    }

    /// Shut down and forget the hub of `entry_id`
    ///
    /// Returns `false` and logs a warning if no hub was registered.
    pub fn unload_entry(&self, entry_id: &str) -> bool {
        match self.hubs.remove(entry_id) {
            Some((_, hub)) => {
                hub.shutdown();
                tracing::debug!("Unloaded entry {}", entry_id);
                true
            }
            None => {
                tracing::warn!("Attempted to unload entry {} but no hub is registered", entry_id);
                false
            }
        }
    }

    pub fn entry_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.hubs.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.hubs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hubs.is_empty()
    }
}
