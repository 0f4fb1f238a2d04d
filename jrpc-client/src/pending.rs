//! Pending-call table
//!
//! Maps the canonical text of a request id to the promise waiting for its
//! response. Every operation runs under one lock, and draining seals the table:
//! after `drain_all` nothing can be stored again, so a call that races with
//! `close` either lands before the drain (and is failed by it) or is refused.

use crate::promise::ResponseFuture;
use jrpc_core::{Error, Result};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct Table {
    calls: HashMap<String, ResponseFuture>,
    sealed: bool,
}

/// Calls waiting for a response
#[derive(Default)]
pub(crate) struct PendingCalls {
    table: Mutex<Table>,
}

impl PendingCalls {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Table> {
        // The table is never left half-updated, so a poisoned lock is still usable
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a call
    ///
    /// Fails with [`Error::Closed`] once the table is sealed, and with
    /// [`Error::DuplicateId`] if a call with the same key is still waiting.
    pub(crate) fn store(&self, key: String, future: ResponseFuture) -> Result<()> {
        let mut table = self.lock();
        if table.sealed {
            return Err(Error::Closed);
        }
        if table.calls.contains_key(&key) {
            return Err(Error::DuplicateId(key));
        }
        table.calls.insert(key, future);
        Ok(())
    }

    /// Load and delete
    pub(crate) fn take(&self, key: &str) -> Option<ResponseFuture> {
        self.lock().calls.remove(key)
    }

    /// Delete the entry for `key` only if it still holds `future`
    pub(crate) fn retract(&self, key: &str, future: &ResponseFuture) -> bool {
        let mut table = self.lock();
        match table.calls.get(key) {
            Some(stored) if stored.same(future) => {
                table.calls.remove(key);
                true
            }
            _ => false,
        }
    }

    /// Seal the table and hand back every waiting call
    pub(crate) fn drain_all(&self) -> Vec<ResponseFuture> {
        let mut table = self.lock();
        table.sealed = true;
        table.calls.drain().map(|(_, future)| future).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().calls.len()
    }
}
