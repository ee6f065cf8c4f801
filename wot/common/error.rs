use thiserror::Error;
use wot_gc::{HeapError, ProxyId, ThingId};

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Heap(#[from] HeapError),

    #[error("symbol table full: all {capacity} names are in use")]
    NamesFull { capacity: usize },

    #[error("cannot register {uri:?}: all {capacity} {kind} records are in use")]
    RegistryFull {
        kind: &'static str,
        uri: String,
        capacity: usize,
    },

    #[error("no thing registered as {0:?}")]
    UnknownThing(ThingId),

    #[error("no proxy registered as {0:?}")]
    UnknownProxy(ProxyId),

    #[error("text table full: {capacity} strings are live")]
    TextTableFull { capacity: usize },

    #[error("{name:?} is not an action")]
    NotCallable { name: String },
}
