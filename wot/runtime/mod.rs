mod context;
mod engine;
mod json;
mod registry;
mod shared;
mod texts;

pub use context::RuntimeContext;
pub use engine::{ActionHandler, EventHandler, Runtime};
pub use registry::{Record, RecordField, RecordId, Registry};
pub use shared::SharedRuntime;
pub use texts::TextTable;

#[cfg(test)]
mod tests;
