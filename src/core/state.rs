//! Shared latest-reading slot.
//!
//! The store deliberately holds exactly one `Reading` (last-writer-wins,
//! no history, no queue). The poll loop is the only writer; scrape
//! handlers read concurrently. The critical section on either side is a
//! single struct copy.

use std::sync::Arc;

use parking_lot::RwLock;

use super::reading::Reading;

/// Thread-safe single-slot store for the most recent reading.
///
/// Cloning the store clones the handle, not the slot: all clones observe
/// the same reading. Before the first `set` the slot holds the zero-valued
/// reading.
#[derive(Debug, Clone, Default)]
pub struct StateStore {
    slot: Arc<RwLock<Reading>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites the stored reading.
    pub fn set(&self, reading: Reading) {
        *self.slot.write() = reading;
    }

    /// Returns a full copy of the stored reading.
    pub fn get(&self) -> Reading {
        *self.slot.read()
    }
}
