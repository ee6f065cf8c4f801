//! GC Visitor and Context traits
//!
//! These traits decouple the collector from the runtime that owns the roots.
//! - `GcVisitor`: Implemented by the collector's `Marker`, used by the runtime to report values
//! - `GcContext`: Implemented by the runtime, provides the root set and release notifications

use alloc::vec::Vec;

use crate::{
    pool::ValueRef,
    value::{ProxyId, ThingId, Value},
};

/// GC Visitor trait - implemented by the collector's marking logic
///
/// # Example
/// ```ignore
/// impl GcContext for Registry {
///     fn visit_roots(&mut self, visitor: &mut impl GcVisitor) {
///         for record in self.things() {
///             visitor.visit_opt(record.properties);
///             visitor.visit_opt(record.events);
///         }
///     }
/// }
/// ```
pub trait GcVisitor {
    /// Mark a value and everything reachable from it
    fn visit(&mut self, value: ValueRef);

    #[inline]
    fn visit_opt(&mut self, value: Option<ValueRef>) {
        if let Some(value) = value {
            self.visit(value);
        }
    }
}

/// Values handed back to the heap while it is releasing something else. They are queued into
/// the stale set once the current operation finishes.
pub struct Orphans<'a> {
    entries: &'a mut Vec<ValueRef>,
}

impl<'a> Orphans<'a> {
    pub fn new(entries: &'a mut Vec<ValueRef>) -> Orphans<'a> {
        Orphans { entries }
    }

    /// Hand back a value whose only owner was just released
    #[inline]
    pub fn push(&mut self, value: ValueRef) {
        self.entries.push(value);
    }
}

/// GC Context trait - implemented by the runtime that owns the root set
pub trait GcContext {
    /// Visit every root. Called at the start of each collection cycle.
    fn visit_roots(&mut self, visitor: &mut impl GcVisitor);

    /// Visit the values held by a thing record referenced from a `Value::Thing`
    fn trace_thing(&mut self, thing: ThingId, visitor: &mut impl GcVisitor) {
        let _ = (thing, visitor);
    }

    /// Visit the values held by a proxy record referenced from a `Value::Proxy`
    fn trace_proxy(&mut self, proxy: ProxyId, visitor: &mut impl GcVisitor) {
        let _ = (proxy, visitor);
    }

    /// Called for every value slot the heap reclaims, with the payload it held.
    ///
    /// Implementations release whatever the payload refers to outside the pool (string text,
    /// registry records). Values that were only owned by such a record go to `orphans`.
    fn released(&mut self, value: Value, orphans: &mut Orphans<'_>) {
        let _ = (value, orphans);
    }
}

/// A context without roots, for values that are never attached to anything
impl GcContext for () {
    fn visit_roots(&mut self, _visitor: &mut impl GcVisitor) {}
}
