//! Per-role table of in-progress calls.

use crate::error::registry::RegistryError;

use common::ErrorLocation;
use models::CallId;

use std::collections::HashMap;
use std::panic::Location;

/// Maps a [`CallId`] to the state of one in-progress call.
///
/// An endpoint owns two of these: one for calls it originated (caller role)
/// and one for calls it serves (callee role). Lookups and closes for unknown
/// ids are no-ops, so a late or duplicated terminal envelope is harmless.
#[derive(Debug)]
pub struct CallRegistry<T> {
    calls: HashMap<CallId, T>,
}

impl<T> Default for CallRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CallRegistry<T> {
    pub fn new() -> Self {
        Self {
            calls: HashMap::new(),
        }
    }

    /// Register a new call.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateCall`] if the id is already live; the
    /// existing entry is left untouched.
    #[track_caller]
    pub fn open(&mut self, call_id: CallId, state: T) -> Result<(), RegistryError> {
        if self.calls.contains_key(&call_id) {
            return Err(RegistryError::DuplicateCall {
                call_id,
                location: ErrorLocation::from(Location::caller()),
            });
        }

        self.calls.insert(call_id, state);
        Ok(())
    }

    pub fn lookup(&self, call_id: &CallId) -> Option<&T> {
        self.calls.get(call_id)
    }

    pub fn lookup_mut(&mut self, call_id: &CallId) -> Option<&mut T> {
        self.calls.get_mut(call_id)
    }

    /// Remove an entry, returning it if it was still registered.
    pub fn close(&mut self, call_id: &CallId) -> Option<T> {
        self.calls.remove(call_id)
    }

    /// Remove every entry; used when the channel closes.
    pub fn drain(&mut self) -> Vec<(CallId, T)> {
        self.calls.drain().collect()
    }

    pub fn contains(&self, call_id: &CallId) -> bool {
        self.calls.contains_key(call_id)
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}
