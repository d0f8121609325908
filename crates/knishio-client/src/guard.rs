//! Single-writer position locks.
//!
//! A position may sign exactly one molecule. [`PositionLocks`] hands out at
//! most one [`PositionGuard`] per position at a time and remembers positions
//! whose molecule reached a node, refusing them from then on.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::error::{ClientError, Result};

#[derive(Debug, Default)]
struct LockState {
    in_flight: HashSet<String>,
    spent: HashSet<String>,
}

/// Tracks in-flight and spent signing positions.
///
/// Spent positions are never forgotten, so the set grows by one entry per
/// submitted molecule for the lifetime of the value. Long-lived clients that
/// share one instance should expect that growth.
#[derive(Debug, Default)]
pub struct PositionLocks {
    state: Mutex<LockState>,
}

impl PositionLocks {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Claim `position` for one molecule.
    pub fn acquire(self: &Arc<Self>, position: &str) -> Result<PositionGuard> {
        let mut state = self.lock();
        if state.spent.contains(position) {
            warn!(position = short(position), "refusing spent position");
            return Err(ClientError::PositionSpent(position.to_string()));
        }
        if !state.in_flight.insert(position.to_string()) {
            warn!(position = short(position), "position already in flight");
            return Err(ClientError::PositionInUse(position.to_string()));
        }
        debug!(position = short(position), "position locked");
        Ok(PositionGuard {
            locks: Arc::clone(self),
            position: position.to_string(),
        })
    }

    pub fn is_spent(&self, position: &str) -> bool {
        self.lock().spent.contains(position)
    }

    pub fn is_in_flight(&self, position: &str) -> bool {
        self.lock().in_flight.contains(position)
    }

    fn release(&self, position: &str, spent: bool) {
        let mut state = self.lock();
        state.in_flight.remove(position);
        if spent {
            state.spent.insert(position.to_string());
        }
    }

    // A poisoned lock still holds consistent sets.
    fn lock(&self) -> MutexGuard<'_, LockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Exclusive claim on one position. Dropping it releases the position.
#[derive(Debug)]
pub struct PositionGuard {
    locks: Arc<PositionLocks>,
    position: String,
}

impl PositionGuard {
    pub fn position(&self) -> &str {
        &self.position
    }

    /// Release the position and mark it spent.
    pub fn spend(self) {
        self.locks.release(&self.position, true);
        debug!(position = short(&self.position), "position spent");
    }
}

impl Drop for PositionGuard {
    fn drop(&mut self) {
        self.locks.release(&self.position, false);
    }
}

pub(crate) fn short(s: &str) -> &str {
    s.get(..16).unwrap_or(s)
}
