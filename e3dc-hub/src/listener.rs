//! Listener capability and update fan-out

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::cache::DeviceDataCache;

/// Outcome of a listener notification
pub type ListenerResult = std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Something interested in fresh device data
///
/// `notify` is called once per successful refresh cycle. It runs on the
/// polling worker, so it should return quickly.
pub trait Listener: Send + Sync {
    fn notify(&self, data: &DeviceDataCache) -> ListenerResult;
}

impl<F> Listener for F
where
    F: Fn(&DeviceDataCache) -> ListenerResult + Send + Sync,
{
    fn notify(&self, data: &DeviceDataCache) -> ListenerResult {
        self(data)
    }
}

/// Handle identifying a registered listener
///
/// Ids are handed out in increasing order and never reused by a hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// Result of notifying one snapshot of listeners
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOutReport {
    pub notified: usize,
    pub failed: usize,
}

/// Notify every listener in `snapshot`, in order
///
/// A listener that errors or panics is logged and counted; the remaining
/// listeners still run.
pub(crate) fn fan_out(
    snapshot: &[(ListenerId, Arc<dyn Listener>)],
    cache: &DeviceDataCache,
) -> FanOutReport {
    let mut report = FanOutReport::default();

    for (id, listener) in snapshot {
        match panic::catch_unwind(AssertUnwindSafe(|| listener.notify(cache))) {
            Ok(Ok(())) => report.notified += 1,
            Ok(Err(e)) => {
                tracing::warn!("{} failed to handle update: {}", id, e);
                report.failed += 1;
            }
            Err(_) => {
                tracing::error!("{} panicked while handling update", id);
                report.failed += 1;
            }
        }
    }

    report
}
