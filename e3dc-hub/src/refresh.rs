//! Refresh cycle: read every configured block and decode it
//!
//! Values are staged per cycle and only handed back when every field of every
//! block decoded. The hub commits the staged batch to the cache in one write,
//! so a failure at any sub-read leaves the cache untouched.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use e3dc_registers::{FieldValue, RegisterBlock};
use parking_lot::Mutex;
use serde::Serialize;

use crate::connection::Connection;
use crate::error::{HubError, Result};

/// Decoded values of one cycle, in read order
pub(crate) type StagedValues = Vec<(&'static str, FieldValue)>;

/// What a call to `refresh` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The cycle completed and `changed` cache entries were added or updated
    Updated { changed: usize },
    /// Another cycle was already in flight
    Skipped,
}

/// Read and decode all fields of `blocks` in declared order
pub(crate) fn read_blocks(
    connection: &Connection,
    unit: u8,
    blocks: &[&'static RegisterBlock],
) -> Result<StagedValues> {
    let mut staged = Vec::new();
    for block in blocks {
        read_block(connection, unit, block, &mut staged)?;
    }
    Ok(staged)
}

fn read_block(
    connection: &Connection,
    unit: u8,
    block: &'static RegisterBlock,
    staged: &mut StagedValues,
) -> Result<()> {
    for field in block.fields {
        let words = connection
            .read_holding_registers(unit, field.address, field.count())
            .map_err(|e| HubError::from_request(field.key, e))?;

        let value = field.decode(&words).map_err(|source| HubError::Decode {
            field: field.key,
            source,
        })?;

        tracing::trace!("{}.{} = {}", block.name, field.key, value);
        staged.push((field.key, value));
    }
    Ok(())
}

/// Counters describing a hub's polling history
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollingStats {
    pub ticks: u64,
    pub successful_refreshes: u64,
    pub failed_refreshes: u64,
    pub skipped_refreshes: u64,
    pub consecutive_failures: u64,
    pub last_success: Option<SystemTime>,
    pub polling_since: Option<SystemTime>,
}

#[derive(Debug, Default)]
pub(crate) struct StatsRecorder {
    ticks: AtomicU64,
    successful: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
    consecutive_failures: AtomicU64,
    last_success: Mutex<Option<SystemTime>>,
}

impl StatsRecorder {
    pub(crate) fn record_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_success(&self) {
        self.successful.fetch_add(1, Ordering::Relaxed);
        self.consecutive_failures.store(0, Ordering::Relaxed);
        *self.last_success.lock() = Some(SystemTime::now());
    }

    pub(crate) fn record_failure(&self) -> u64 {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn record_skip(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, polling_since: Option<SystemTime>) -> PollingStats {
        PollingStats {
            ticks: self.ticks.load(Ordering::Relaxed),
            successful_refreshes: self.successful.load(Ordering::Relaxed),
            failed_refreshes: self.failed.load(Ordering::Relaxed),
            skipped_refreshes: self.skipped.load(Ordering::Relaxed),
            consecutive_failures: self.consecutive_failures.load(Ordering::Relaxed),
            last_success: *self.last_success.lock(),
            polling_since,
        }
    }
}
