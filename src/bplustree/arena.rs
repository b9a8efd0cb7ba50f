//! Slab-style storage for the tree's entries, records and nodes.
//!
//! Every unit of tree structure lives in an arena and is addressed by a
//! typed id. Freed slots go onto a free list and are reused by later
//! allocations, so ids stay stable as the tree grows and shrinks around
//! them.

use crate::types::ArenaId;
use std::marker::PhantomData;

#[derive(Debug)]
enum Slot<T> {
    Occupied(T),
    Vacant,
}

/// A typed arena with slot reuse.
///
/// Accessing a vacant or out-of-range slot panics: a dangling id means the
/// tree's structural invariants were already violated.
#[derive(Debug)]
pub(crate) struct Arena<I, T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
    _marker: PhantomData<I>,
}

impl<I: ArenaId, T> Arena<I, T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
            _marker: PhantomData,
        }
    }

    /// Stores `value`, reusing a freed slot if one is available.
    pub fn alloc(&mut self, value: T) -> I {
        self.len += 1;
        match self.free.pop() {
            Some(raw) => {
                let slot = &mut self.slots[raw as usize];
                debug_assert!(matches!(slot, Slot::Vacant));
                *slot = Slot::Occupied(value);
                I::from_raw(raw)
            }
            None => {
                let raw = u32::try_from(self.slots.len()).expect("arena exhausted the id space");
                self.slots.push(Slot::Occupied(value));
                I::from_raw(raw)
            }
        }
    }

    pub fn get(&self, id: I) -> &T {
        match self.slots.get(id.raw() as usize) {
            Some(Slot::Occupied(value)) => value,
            _ => panic!("dangling arena id {}", id.raw()),
        }
    }

    pub fn get_mut(&mut self, id: I) -> &mut T {
        match self.slots.get_mut(id.raw() as usize) {
            Some(Slot::Occupied(value)) => value,
            _ => panic!("dangling arena id {}", id.raw()),
        }
    }

    /// Vacates the slot and returns its value.
    pub fn free(&mut self, id: I) -> T {
        let slot = self
            .slots
            .get_mut(id.raw() as usize)
            .unwrap_or_else(|| panic!("dangling arena id {}", id.raw()));
        match std::mem::replace(slot, Slot::Vacant) {
            Slot::Occupied(value) => {
                self.free.push(id.raw());
                self.len -= 1;
                value
            }
            Slot::Vacant => panic!("double free of arena id {}", id.raw()),
        }
    }

    /// The number of occupied slots.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Drops every slot, occupied or not.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.len = 0;
    }
}
