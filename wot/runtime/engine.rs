//! Runtime - things, proxies and their values on top of the collected heap
//!
//! Design:
//! - Every registered record owns four objects: properties, actions, events and proxies
//! - Records are roots, so everything attached to their objects survives collection
//! - Actions are native functions stored in a dispatch table and referenced by `Value::Function`
//! - Emitting an event stores its data in the events object and calls the observers
//!
//! Values returned by the constructors are not rooted. Attach them to a record object, or pin
//! them, before the next allocation.

use log::{debug, info, trace, warn};
use wot_gc::{
    CollectionReport, FunctionId, GcStats, Heap, PinScope, ProxyId, Symbol, ThingId, Value,
    ValueRef,
};

use crate::common::{
    error::{RuntimeError, RuntimeResult},
    names::Names,
    options::Options,
};

use super::{
    context::RuntimeContext,
    registry::{Record, RecordField, RecordId, Registry},
    texts::TextTable,
};

/// Native implementation of an action. Receives the record the action was invoked on and the
/// arguments, and may return a value.
pub type ActionHandler =
    fn(&mut Runtime, RecordId, &[ValueRef]) -> RuntimeResult<Option<ValueRef>>;

/// Called with the record and the event data each time an observed event is emitted
pub type EventHandler = fn(&mut Runtime, RecordId, ValueRef);

struct Observer {
    target: RecordId,
    event: Symbol,
    handler: EventHandler,
}

pub struct Runtime {
    heap: Heap,
    cx: RuntimeContext,
    names: Names,

    /// Indexed by `FunctionId`
    handlers: Vec<ActionHandler>,

    observers: Vec<Observer>,

    options: Options,
}

impl Runtime {
    pub fn new(options: Options) -> Runtime {
        info!(
            "runtime: {} pool slots, {} things, {} proxies, {} symbols",
            options.pool_capacity, options.max_things, options.max_proxies, options.symbol_capacity
        );

        Runtime {
            heap: Heap::new(options.heap_config()),
            cx: RuntimeContext {
                registry: Registry::with_capacity(options.max_things, options.max_proxies),
                texts: TextTable::with_capacity(options.text_capacity),
            },
            names: Names::with_capacity(options.symbol_capacity),
            handlers: Vec::new(),
            observers: Vec::new(),
            options,
        }
    }

    #[inline]
    pub fn options(&self) -> &Options {
        &self.options
    }

    #[inline]
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    #[inline]
    pub fn context(&self) -> &RuntimeContext {
        &self.cx
    }

    #[inline]
    pub fn registry(&self) -> &Registry {
        &self.cx.registry
    }

    #[inline]
    pub fn names(&self) -> &Names {
        &self.names
    }

    #[inline]
    pub fn stats(&self) -> &GcStats {
        self.heap.stats()
    }

    // ========================================================================
    // Values
    // ========================================================================

    pub fn new_number(&mut self, number: f32) -> RuntimeResult<ValueRef> {
        Ok(self.heap.new_number(&mut self.cx, number)?)
    }

    pub fn new_unsigned(&mut self, number: u32) -> RuntimeResult<ValueRef> {
        Ok(self.heap.new_unsigned(&mut self.cx, number)?)
    }

    pub fn new_signed(&mut self, number: i32) -> RuntimeResult<ValueRef> {
        Ok(self.heap.new_signed(&mut self.cx, number)?)
    }

    pub fn new_bool(&mut self, b: bool) -> RuntimeResult<ValueRef> {
        Ok(self.heap.new_bool(&mut self.cx, b)?)
    }

    pub fn new_null(&mut self) -> RuntimeResult<ValueRef> {
        Ok(self.heap.new_null(&mut self.cx)?)
    }

    pub fn new_object(&mut self) -> RuntimeResult<ValueRef> {
        Ok(self.heap.new_object(&mut self.cx)?)
    }

    pub fn new_array(&mut self) -> RuntimeResult<ValueRef> {
        Ok(self.heap.new_array(&mut self.cx)?)
    }

    /// A string value holding a copy of `text`
    pub fn new_string(&mut self, text: &str) -> RuntimeResult<ValueRef> {
        let text = self.cx.texts.insert(text)?;
        match self.heap.new_string(&mut self.cx, text) {
            Ok(value) => Ok(value),
            Err(err) => {
                self.cx.texts.release(text);
                Err(err.into())
            }
        }
    }

    #[inline]
    pub fn value(&self, value: ValueRef) -> Option<Value> {
        self.heap.get(value)
    }

    /// Text of a string value
    pub fn text(&self, value: ValueRef) -> Option<&str> {
        match self.heap.get(value)? {
            Value::String(text) => self.cx.texts.get(text),
            _ => None,
        }
    }

    /// Intern a name
    #[inline]
    pub fn symbol(&mut self, name: &str) -> RuntimeResult<Symbol> {
        self.names.symbol(name)
    }

    /// Set a property of an object. A leaf already stored elsewhere is copied first.
    pub fn insert(&mut self, object: ValueRef, name: &str, value: ValueRef) -> RuntimeResult<()> {
        let symbol = self.names.symbol(name)?;
        let value = self.unattached(object, value)?;
        self.heap.insert_property(&mut self.cx, object, symbol, value)?;
        Ok(())
    }

    /// `value` itself, or a fresh copy if it is a leaf held by another entry. `parent` and
    /// `value` stay pinned while the copy is allocated.
    fn unattached(&mut self, parent: ValueRef, value: ValueRef) -> RuntimeResult<ValueRef> {
        let Some(payload) = self.heap.get(value) else {
            return Ok(value);
        };
        if payload.is_composite() || !self.heap.is_attached(value) {
            return Ok(value);
        }

        let scope = self.heap.enter_scope();
        let copy = self
            .heap
            .pin(parent)
            .and_then(|()| self.heap.pin(value))
            .map_err(RuntimeError::from)
            .and_then(|()| self.copy_leaf(value, payload));
        self.heap.exit_scope(scope);

        trace!("copied attached leaf {:?}", value);
        copy
    }

    fn copy_leaf(&mut self, value: ValueRef, payload: Value) -> RuntimeResult<ValueRef> {
        let cx = &mut self.cx;
        let copy = match payload {
            Value::String(text) => {
                let text = cx.texts.get(text).map(str::to_owned).unwrap_or_default();
                return self.new_string(&text);
            }
            Value::Thing(thing) => {
                let copy = self.heap.new_thing(cx, thing)?;
                cx.registry.add_reference(thing.into())?;
                copy
            }
            Value::Proxy(proxy) => {
                let copy = self.heap.new_proxy(cx, proxy)?;
                cx.registry.add_reference(proxy.into())?;
                copy
            }
            Value::Function(id) => self.heap.new_function(cx, id)?,
            Value::Float(x) => self.heap.new_number(cx, x)?,
            Value::UnsignedInt(n) => self.heap.new_unsigned(cx, n)?,
            Value::SignedInt(n) => self.heap.new_signed(cx, n)?,
            Value::Boolean(b) => self.heap.new_bool(cx, b)?,
            Value::Null => self.heap.new_null(cx)?,
            Value::Object(_) | Value::Array(_) => value,
        };
        Ok(copy)
    }

    /// A property of an object. Names that were never interned are never present.
    pub fn get(&self, object: ValueRef, name: &str) -> Option<ValueRef> {
        let symbol = self.names.lookup(name)?;
        self.heap.retrieve_property(object, symbol)
    }

    /// Append to an array, returning the new element's index
    pub fn push(&mut self, array: ValueRef, value: ValueRef) -> RuntimeResult<usize> {
        let value = self.unattached(array, value)?;
        Ok(self.heap.append_array_item(&mut self.cx, array, value)?)
    }

    pub fn set_item(&mut self, array: ValueRef, index: usize, value: ValueRef) -> RuntimeResult<()> {
        let value = self.unattached(array, value)?;
        Ok(self.heap.insert_array_item(&mut self.cx, array, index, value)?)
    }

    #[inline]
    pub fn item(&self, array: ValueRef, index: usize) -> Option<ValueRef> {
        self.heap.retrieve_array_item(array, index)
    }

    // ========================================================================
    // Pinning and collection
    // ========================================================================

    #[inline]
    pub fn enter_scope(&self) -> PinScope {
        self.heap.enter_scope()
    }

    #[inline]
    pub fn pin(&mut self, value: ValueRef) -> RuntimeResult<()> {
        Ok(self.heap.pin(value)?)
    }

    #[inline]
    pub fn exit_scope(&mut self, scope: PinScope) {
        self.heap.exit_scope(scope);
    }

    /// Reclaim overwritten values that are no longer reachable
    pub fn collect(&mut self) -> CollectionReport {
        self.heap.collect(&mut self.cx)
    }

    /// Reclaim every value that is no longer reachable
    pub fn collect_full(&mut self) -> CollectionReport {
        self.heap.collect_full(&mut self.cx)
    }

    /// Run a full collection before every allocation
    #[cfg(feature = "gc_stress_test")]
    pub fn enable_gc_stress_test(&mut self) {
        self.heap.gc_stress_test = true;
    }

    // ========================================================================
    // Things and proxies
    // ========================================================================

    /// The thing registered under `uri`, registering it if needed
    pub fn thing(&mut self, uri: &str) -> RuntimeResult<ThingId> {
        if let Some(thing) = self.cx.registry.find_thing(uri) {
            return Ok(thing);
        }

        let thing = self.cx.registry.register_thing(uri)?;
        self.populate(thing.into())?;
        info!("registered thing {:?} as {:?}", uri, thing);
        Ok(thing)
    }

    /// The proxy registered under `uri`, registering it if needed
    pub fn proxy(&mut self, uri: &str) -> RuntimeResult<ProxyId> {
        if let Some(proxy) = self.cx.registry.find_proxy(uri) {
            return Ok(proxy);
        }

        let proxy = self.cx.registry.register_proxy(uri)?;
        self.populate(proxy.into())?;
        info!("registered proxy {:?} as {:?}", uri, proxy);
        Ok(proxy)
    }

    /// Give a new record its objects. Each one is attached as soon as it is allocated, so the
    /// record keeps it alive through the next allocation.
    fn populate(&mut self, target: RecordId) -> RuntimeResult<()> {
        for field in RecordField::ALL {
            let object = match self.heap.new_object(&mut self.cx) {
                Ok(object) => object,
                Err(err) => {
                    warn!("cannot allocate {:?} of {:?}: {}", field, target, err);
                    self.remove(target)?;
                    return Err(err.into());
                }
            };

            if let Some(record) = self.cx.registry.record_mut(target) {
                record.set_object(field, object);
            }
        }

        Ok(())
    }

    /// Unregister a thing or proxy. Its objects are handed to the collector once no value
    /// refers to the record any more.
    pub fn remove(&mut self, target: impl Into<RecordId>) -> RuntimeResult<()> {
        let target = target.into();
        if self.cx.registry.record(target).map_or(true, Record::is_retired) {
            return Err(target.unknown());
        }

        self.observers.retain(|observer| observer.target != target);

        let Some(record) = self.cx.registry.remove(target) else {
            return Ok(());
        };

        debug!("removed {:?} {:?}", target, record.uri());
        for object in record.objects() {
            if let Err(err) = self.heap.add_stale(&mut self.cx, object) {
                warn!("{}: {:?} left for the next full collection", err, object);
            }
        }

        Ok(())
    }

    /// A new `Value::Thing` or `Value::Proxy` referring to a record
    pub fn reference(&mut self, target: impl Into<RecordId>) -> RuntimeResult<ValueRef> {
        let target = target.into();
        if self.cx.registry.record(target).map_or(true, Record::is_retired) {
            return Err(target.unknown());
        }

        let value = match target {
            RecordId::Thing(thing) => self.heap.new_thing(&mut self.cx, thing)?,
            RecordId::Proxy(proxy) => self.heap.new_proxy(&mut self.cx, proxy)?,
        };
        self.cx.registry.add_reference(target)?;
        Ok(value)
    }

    /// One of the objects owned by a record
    pub fn record_object(
        &self,
        target: impl Into<RecordId>,
        field: RecordField,
    ) -> RuntimeResult<ValueRef> {
        let target = target.into();
        self.cx
            .registry
            .record(target)
            .and_then(|record| record.object(field))
            .ok_or_else(|| target.unknown())
    }

    fn set_in(
        &mut self,
        target: RecordId,
        field: RecordField,
        name: &str,
        value: ValueRef,
    ) -> RuntimeResult<()> {
        let object = self.record_object(target, field)?;
        self.insert(object, name, value)
    }

    fn get_in(&self, target: RecordId, field: RecordField, name: &str) -> Option<ValueRef> {
        let object = self.record_object(target, field).ok()?;
        self.get(object, name)
    }

    pub fn set_property(
        &mut self,
        target: impl Into<RecordId>,
        name: &str,
        value: ValueRef,
    ) -> RuntimeResult<()> {
        self.set_in(target.into(), RecordField::Properties, name, value)
    }

    pub fn get_property(&self, target: impl Into<RecordId>, name: &str) -> Option<ValueRef> {
        self.get_in(target.into(), RecordField::Properties, name)
    }

    /// Attach a reference to `proxy` under `name` in the target's proxies object
    pub fn attach_proxy(
        &mut self,
        target: impl Into<RecordId>,
        name: &str,
        proxy: ProxyId,
    ) -> RuntimeResult<()> {
        let target = target.into();
        let value = self.reference(proxy)?;
        self.set_in(target, RecordField::Proxies, name, value)
    }

    pub fn get_proxy(&self, target: impl Into<RecordId>, name: &str) -> Option<ProxyId> {
        let value = self.get_in(target.into(), RecordField::Proxies, name)?;
        match self.heap.get(value)? {
            Value::Proxy(proxy) => Some(proxy),
            _ => None,
        }
    }

    // ========================================================================
    // Actions and events
    // ========================================================================

    /// Make `handler` available as action `name` of the target
    pub fn register_action(
        &mut self,
        target: impl Into<RecordId>,
        name: &str,
        handler: ActionHandler,
    ) -> RuntimeResult<()> {
        let target = target.into();
        self.record_object(target, RecordField::Actions)?;

        let known = self
            .handlers
            .iter()
            .position(|&known| known as usize == handler as usize);
        let id = match known {
            Some(index) => FunctionId(index as u16),
            None => {
                let id = FunctionId(self.handlers.len() as u16);
                self.handlers.push(handler);
                id
            }
        };

        let function = self.heap.new_function(&mut self.cx, id)?;
        self.set_in(target, RecordField::Actions, name, function)
    }

    /// Call action `name` of the target. Arguments must be rooted or pinned by the caller.
    pub fn invoke(
        &mut self,
        target: impl Into<RecordId>,
        name: &str,
        args: &[ValueRef],
    ) -> RuntimeResult<Option<ValueRef>> {
        let target = target.into();
        let handler = self
            .get_in(target, RecordField::Actions, name)
            .and_then(|function| match self.heap.get(function)? {
                Value::Function(id) => self.handlers.get(id.0 as usize).copied(),
                _ => None,
            })
            .ok_or_else(|| RuntimeError::NotCallable { name: name.into() })?;

        debug!("invoking {:?} on {:?}", name, target);
        handler(self, target, args)
    }

    /// Call `handler` each time event `name` is emitted on the target
    pub fn observe(
        &mut self,
        target: impl Into<RecordId>,
        name: &str,
        handler: EventHandler,
    ) -> RuntimeResult<()> {
        let target = target.into();
        self.record_object(target, RecordField::Events)?;
        let event = self.names.symbol(name)?;
        self.observers.push(Observer {
            target,
            event,
            handler,
        });
        Ok(())
    }

    /// Record `data` as the latest value of event `name` and notify its observers
    pub fn emit(
        &mut self,
        target: impl Into<RecordId>,
        name: &str,
        data: ValueRef,
    ) -> RuntimeResult<()> {
        let target = target.into();
        self.set_in(target, RecordField::Events, name, data)?;

        let event = self.names.lookup(name);
        let handlers: Vec<EventHandler> = self
            .observers
            .iter()
            .filter(|observer| observer.target == target && Some(observer.event) == event)
            .map(|observer| observer.handler)
            .collect();

        debug!(
            "emitting {:?} on {:?} to {} observers",
            name,
            target,
            handlers.len()
        );
        for handler in handlers {
            handler(self, target, data);
        }

        Ok(())
    }

    /// The latest data emitted for event `name`
    pub fn last_event(&self, target: impl Into<RecordId>, name: &str) -> Option<ValueRef> {
        self.get_in(target.into(), RecordField::Events, name)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Runtime::new(Options::default())
    }
}
