//! Linked-instance accessor.
//!
//! Descriptors handed to the scripting side live in a [`HandleTable`] and are
//! referred to by opaque [`Handle`]s. Resolution is the single gate in front
//! of every descriptor access: it yields a reference or nothing, never a
//! dangling pointer.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use super::switch_info::SwitchInfo;
use super::value::Value;

static NEXT_TABLE: AtomicU32 = AtomicU32::new(1);

/// Opaque reference to a descriptor held by a specific table.
///
/// Ids are never reused, so a handle whose descriptor was destroyed stays
/// unresolvable forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Handle {
    table: u32,
    id: u64,
}

impl Handle {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "switch_info_t#{}.{}", self.table, self.id)
    }
}

/// How a descriptor came to be linked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ownership {
    /// Created explicitly, released by an explicit destroy
    Owned,
    /// Produced by a database query, released with the querying scope
    Linked,
}

#[derive(Debug)]
struct Slot {
    info: Box<SwitchInfo>,
    ownership: Ownership,
}

/// Storage for linked descriptors.
#[derive(Debug)]
pub struct HandleTable {
    table: u32,
    next_id: u64,
    slots: HashMap<u64, Slot>,
}

impl Default for HandleTable {
    fn default() -> Self {
        Self::new()
    }
}

impl HandleTable {
    pub fn new() -> Self {
        Self {
            table: NEXT_TABLE.fetch_add(1, Ordering::Relaxed),
            next_id: 1,
            slots: HashMap::new(),
        }
    }

    /// Link a descriptor and return its handle.
    pub fn insert(&mut self, info: SwitchInfo, ownership: Ownership) -> Handle {
        let id = self.next_id;
        self.next_id += 1;
        self.slots.insert(
            id,
            Slot {
                info: Box::new(info),
                ownership,
            },
        );
        Handle {
            table: self.table,
            id,
        }
    }

    fn key(&self, handle: &Value) -> Option<u64> {
        match handle {
            Value::Handle(h) if h.table == self.table => Some(h.id),
            _ => None,
        }
    }

    /// Resolve a runtime value to the descriptor it refers to.
    pub fn resolve(&self, handle: &Value) -> Option<&SwitchInfo> {
        let key = self.key(handle)?;
        self.slots.get(&key).map(|s| s.info.as_ref())
    }

    pub fn resolve_mut(&mut self, handle: &Value) -> Option<&mut SwitchInfo> {
        let key = self.key(handle)?;
        self.slots.get_mut(&key).map(|s| s.info.as_mut())
    }

    pub fn ownership(&self, handle: &Value) -> Option<Ownership> {
        let key = self.key(handle)?;
        self.slots.get(&key).map(|s| s.ownership)
    }

    /// Unlink a descriptor, returning it if the handle resolved.
    pub fn remove(&mut self, handle: &Value) -> Option<SwitchInfo> {
        let key = self.key(handle)?;
        self.slots.remove(&key).map(|s| *s.info)
    }

    /// Drop one query-produced descriptor. Owned descriptors are left alone;
    /// they go through [`HandleTable::remove`].
    pub fn release(&mut self, handle: &Value) -> bool {
        if self.ownership(handle) != Some(Ownership::Linked) {
            return false;
        }
        self.remove(handle).is_some()
    }

    /// Drop every query-produced descriptor. Returns how many were released.
    pub fn release_linked(&mut self) -> usize {
        let before = self.slots.len();
        self.slots.retain(|_, s| s.ownership == Ownership::Owned);
        before - self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
