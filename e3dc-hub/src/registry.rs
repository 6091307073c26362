//! Ordered collection of registered listeners

use std::sync::Arc;

use crate::listener::{Listener, ListenerId};

/// Listeners in registration order, keyed by [`ListenerId`]
///
/// The registry itself is not synchronized; the hub keeps it behind the same
/// lock as the scheduler so the "active iff non-empty" rule holds.
#[derive(Default)]
pub(crate) struct SubscriberRegistry {
    listeners: Vec<(ListenerId, Arc<dyn Listener>)>,
    next_id: u64,
}

impl SubscriberRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append a listener and return its id
    pub(crate) fn add(&mut self, listener: Arc<dyn Listener>) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId::new(self.next_id);
        self.listeners.push((id, listener));

        tracing::debug!(
            "Listener count: {} -> {} (added {})",
            self.listeners.len() - 1,
            self.listeners.len(),
            id
        );

        id
    }

    /// Remove a listener by id; `None` if it was not registered
    ///
    /// On success returns whether the registry is now empty.
    pub(crate) fn remove(&mut self, id: ListenerId) -> Option<bool> {
        let index = self.listeners.iter().position(|(existing, _)| *existing == id)?;
        self.listeners.remove(index);

        tracing::debug!(
            "Listener count: {} -> {} (removed {})",
            self.listeners.len() + 1,
            self.listeners.len(),
            id
        );

        Some(self.listeners.is_empty())
    }

    /// Stable copy for fan-out
    pub(crate) fn snapshot(&self) -> Vec<(ListenerId, Arc<dyn Listener>)> {
        self.listeners.clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub(crate) fn clear(&mut self) -> usize {
        let removed = self.listeners.len();
        self.listeners.clear();
        removed
    }
}
