use thiserror::Error;

use crate::{
    pool::ValueRef,
    value::{Tag, TreeKey},
};

/// Result type for heap operations
pub type HeapResult<T> = Result<T, HeapError>;

/// Recoverable failures of heap operations. The heap is left unchanged when one is returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum HeapError {
    /// No free slot even after a full collection
    #[error("node pool exhausted: all {capacity} slots are live after collection")]
    CapacityExhausted { capacity: usize },

    /// An overwritten composite value could not be recorded even after a collection
    #[error("stale set full: {capacity} entries still pending after collection")]
    StaleSetFull { capacity: usize },

    #[error("pin stack full: {capacity} values already pinned")]
    PinStackFull { capacity: usize },

    #[error("{value:?} is not of kind {expected:?}")]
    TypeMismatch { value: ValueRef, expected: Tag },

    /// The value's slot has been reclaimed
    #[error("{0:?} has been reclaimed")]
    Dangling(ValueRef),

    /// A leaf value already held by another entry
    #[error("{0:?} is already stored in another entry")]
    AlreadyAttached(ValueRef),

    /// A symbol or array index too large to offset into a tree key
    #[error("key {0} does not fit in a tree key")]
    KeyOutOfRange(usize),
}

/// AVL invariant violations reported by `avl::validate`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("node {key} has balance factor {balance}")]
    Unbalanced { key: TreeKey, balance: i16 },

    #[error("node {key} is out of order")]
    Unordered { key: TreeKey },

    #[error("node {key} caches height {cached} but has height {actual}")]
    HeightMismatch { key: TreeKey, cached: u8, actual: u8 },

    #[error("tree is deeper than any AVL tree that fits in the pool")]
    TooDeep,
}
