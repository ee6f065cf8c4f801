//! Web of Things runtime
//!
//! Things and proxies registered by URI, each owning property, action, event and proxy objects
//! that live in the fixed node pool of `wot_gc`. The registry is the collector's root set.
//!
//! Key types:
//! - `Runtime`: Owns the heap, the registry, the symbol table and the text table
//! - `SharedRuntime`: A runtime behind a mutex, for use from more than one thread
//! - `Options`: Sizes of every fixed table, built with `OptionsBuilder`

pub mod common;
pub mod runtime;

pub use common::{
    error::{RuntimeError, RuntimeResult},
    names::Names,
    options::{Options, OptionsBuilder},
};
pub use runtime::{
    ActionHandler, EventHandler, Record, RecordField, RecordId, Registry, Runtime,
    RuntimeContext, SharedRuntime, TextTable,
};
pub use wot_gc::{FunctionId, ProxyId, Symbol, Tag, ThingId, Value, ValueRef};
