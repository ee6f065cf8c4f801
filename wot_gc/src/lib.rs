//! WoT Node Pool and Garbage Collector
//!
//! A fixed-capacity node pool with a two-colour mark-sweep garbage collector.
//! Every dynamic structure of the runtime (tree nodes and tagged values) lives in
//! one slab of uniformly sized slots addressed by 16-bit indices.
//!
//! Key types:
//! - `NodePool`: The slab of slots
//! - `Heap`: Owns the pool, the stale set and the collector state
//! - `Value`: The tagged payload stored in a value slot
//! - `ValueRef` / `TreeRef`: Typed indices that only the pool can mint
//!
//! Key traits:
//! - `GcVisitor`: Implemented by the collector, used by the runtime to report roots
//! - `GcContext`: Implemented by the runtime, provides roots and release notifications

#![no_std]
extern crate alloc;

pub mod avl;
mod error;
mod heap;
mod pool;
mod stale_set;
mod value;
mod visitor;
mod worklist;

pub use error::{HeapError, HeapResult, TreeError};
pub use heap::{CollectionKind, CollectionReport, GcStats, Heap, HeapConfig, Marker, PinScope};
pub use pool::{NodeIndex, NodePool, Slot, TreeNode, TreeRef, ValueRef};
pub use stale_set::StaleSet;
pub use value::{FunctionId, ProxyId, Symbol, Tag, TextRef, ThingId, TreeKey, Value};
pub use visitor::{GcContext, GcVisitor, Orphans};
