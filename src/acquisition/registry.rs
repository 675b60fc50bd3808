/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! Registry of live acquisition futures.
//!
//! The registry holds the authoritative strong reference to each future's
//! shared state. Entries are keyed by a generation-stamped slot index: a
//! released slot is reused with its generation bumped, so a stale
//! [`FutureId`] can never release a newer future in the same slot.

use super::future::FutureState;
use super::lock;
use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

/// Identifier of a registered future.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FutureId {
    index: u32,
    generation: u32,
}

impl FutureId {
    /// Slot index within the registry.
    #[must_use]
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Number of times the slot was reused before this id was issued.
    #[must_use]
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for FutureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

struct Slot {
    generation: u32,
    state: Arc<FutureState>,
}

/// Concurrent registry shared by the submitting threads and the dispatcher.
pub struct FutureRegistry {
    slots: DashMap<u32, Slot>,
    free: Mutex<Vec<FutureId>>,
    next_index: AtomicU32,
}

impl FutureRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
            free: Mutex::new(Vec::new()),
            next_index: AtomicU32::new(0),
        }
    }

    /// Registers `state`, reusing a released slot when one is available.
    pub(crate) fn register(&self, state: Arc<FutureState>) -> FutureId {
        let id = match lock(&self.free).pop() {
            Some(released) => FutureId {
                index: released.index,
                generation: released.generation.wrapping_add(1),
            },
            None => FutureId {
                index: self.next_index.fetch_add(1, Ordering::Relaxed),
                generation: 0,
            },
        };
        self.slots.insert(
            id.index,
            Slot {
                generation: id.generation,
                state,
            },
        );
        id
    }

    /// Removes the future identified by `id`.
    ///
    /// Returns `false` if `id` is stale or was already released.
    pub fn release(&self, id: FutureId) -> bool {
        let removed = self
            .slots
            .remove_if(&id.index, |_, slot| slot.generation == id.generation)
            .is_some();
        if removed {
            lock(&self.free).push(id);
        }
        removed
    }

    /// Returns `true` if `id` refers to a live future.
    #[must_use]
    pub fn contains(&self, id: FutureId) -> bool {
        self.slots
            .get(&id.index)
            .is_some_and(|slot| slot.generation == id.generation)
    }

    /// Number of live futures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if no future is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Copies out the live futures so they can be notified without holding
    /// any registry lock.
    pub(crate) fn snapshot(&self) -> Vec<Arc<FutureState>> {
        self.slots
            .iter()
            .map(|entry| Arc::clone(&entry.value().state))
            .collect()
    }
}

impl Default for FutureRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FutureRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FutureRegistry")
            .field("live", &self.len())
            .finish()
    }
}
