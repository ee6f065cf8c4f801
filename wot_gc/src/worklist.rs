//! Worklist for marking and sweeping
//!
//! Vec-based stack of slot indices waiting to be traced or reclaimed. Capacity is reserved for
//! the whole pool up front. Both marking and sweeping colour a slot before pushing it, so a
//! slot is queued at most once per pass and the buffer never grows.

use alloc::vec::Vec;

use crate::pool::NodeIndex;

/// Stack of slots waiting to be processed
pub struct Worklist {
    items: Vec<NodeIndex>,
}

impl Worklist {
    /// Create an empty worklist with room for `capacity` entries
    pub fn with_capacity(capacity: usize) -> Worklist {
        Worklist {
            items: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn push(&mut self, index: NodeIndex) {
        debug_assert!(
            self.items.len() < self.items.capacity(),
            "worklist outgrew its reservation at {:?}",
            index
        );
        self.items.push(index);
    }

    #[inline]
    pub fn pop(&mut self) -> Option<NodeIndex> {
        self.items.pop()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.items.clear();
    }
}
