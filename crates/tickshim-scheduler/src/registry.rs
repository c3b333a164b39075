//! Identifier registry: facade task ids → backend-native cancellation tokens.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Weak;

use dashmap::DashMap;

use crate::{handle::HandleInner, host::NativeToken, types::TaskId};

pub(crate) struct Entry {
    pub(crate) token: NativeToken,
    /// Non-owning; the caller owns the handle.
    pub(crate) handle: Weak<HandleInner>,
}

/// Concurrent map plus an atomic id counter, owned by one facade.
///
/// Every id present belongs to a task that was submitted and has neither
/// been cancelled through the facade nor finished. Callers only ever see it
/// read-only.
pub struct Registry {
    entries: DashMap<TaskId, Entry>,
    next_id: AtomicU64,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Hand out the next identifier. Never returns the same id twice.
    pub(crate) fn allocate(&self) -> TaskId {
        TaskId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn insert(&self, id: TaskId, entry: Entry) {
        self.entries.insert(id, entry);
    }

    pub(crate) fn remove(&self, id: TaskId) -> Option<Entry> {
        self.entries.remove(&id).map(|(_, entry)| entry)
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
