use wot_gc::{GcContext, GcVisitor, Orphans, ProxyId, ThingId, Value};

use super::{
    registry::{RecordId, Registry},
    texts::TextTable,
};

/// Everything outside the pool that the collector needs to see: the root set and the owners of
/// what values refer to
pub struct RuntimeContext {
    pub registry: Registry,
    pub texts: TextTable,
}

impl GcContext for RuntimeContext {
    fn visit_roots(&mut self, visitor: &mut impl GcVisitor) {
        self.registry.visit_roots(visitor);
    }

    fn trace_thing(&mut self, thing: ThingId, visitor: &mut impl GcVisitor) {
        if let Some(record) = self.registry.record(thing.into()) {
            record.visit(visitor);
        }
    }

    fn trace_proxy(&mut self, proxy: ProxyId, visitor: &mut impl GcVisitor) {
        if let Some(record) = self.registry.record(proxy.into()) {
            record.visit(visitor);
        }
    }

    fn released(&mut self, value: Value, orphans: &mut Orphans<'_>) {
        match value {
            Value::String(text) => self.texts.release(text),
            Value::Thing(thing) => self
                .registry
                .release_reference(RecordId::Thing(thing), orphans),
            Value::Proxy(proxy) => self
                .registry
                .release_reference(RecordId::Proxy(proxy), orphans),
            _ => {}
        }
    }
}
