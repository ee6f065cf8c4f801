//! Stale set
//!
//! Bounded list of composite values whose parent edge was overwritten. Entries are weak: they
//! never keep a value alive and are only trusted again after a marking pass has looked at
//! them. Each value appears at most once.

use alloc::vec::Vec;

use crate::pool::ValueRef;

pub struct StaleSet {
    entries: Vec<ValueRef>,
    capacity: usize,
}

impl StaleSet {
    pub fn with_capacity(capacity: usize) -> StaleSet {
        StaleSet {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// Linear scan, the set is small
    #[inline]
    pub fn contains(&self, value: ValueRef) -> bool {
        self.entries.contains(&value)
    }

    /// Record a value. Returns false only when the value is absent and there is no room.
    pub fn insert(&mut self, value: ValueRef) -> bool {
        if self.contains(value) {
            return true;
        }
        if self.is_full() {
            return false;
        }

        self.entries.push(value);
        true
    }

    pub fn as_slice(&self) -> &[ValueRef] {
        &self.entries
    }

    /// Move the entries out so they can be compacted while the heap is mutated. Must be paired
    /// with `restore`.
    pub(crate) fn take(&mut self) -> Vec<ValueRef> {
        core::mem::take(&mut self.entries)
    }

    pub(crate) fn restore(&mut self, entries: Vec<ValueRef>) {
        debug_assert!(self.entries.is_empty());
        self.entries = entries;
    }
}
