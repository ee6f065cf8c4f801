//! Registry of local things and proxies for remote things
//!
//! Records are kept in fixed tables and found by URI. Every record that is still registered is
//! a root of the collector. A removed record that is still referenced by a `Value::Thing` or
//! `Value::Proxy` is retired instead: it can no longer be found, but it stays reachable through
//! those values until the last one is released.

use log::{debug, warn};
use wot_gc::{GcVisitor, Orphans, ProxyId, ThingId, ValueRef};

use crate::common::error::{RuntimeError, RuntimeResult};

/// Objects owned by every record
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordField {
    Properties,
    Actions,
    Events,
    Proxies,
}

impl RecordField {
    pub const ALL: [RecordField; 4] = [
        RecordField::Properties,
        RecordField::Actions,
        RecordField::Events,
        RecordField::Proxies,
    ];
}

/// Either kind of record
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordId {
    Thing(ThingId),
    Proxy(ProxyId),
}

impl From<ThingId> for RecordId {
    fn from(thing: ThingId) -> Self {
        RecordId::Thing(thing)
    }
}

impl From<ProxyId> for RecordId {
    fn from(proxy: ProxyId) -> Self {
        RecordId::Proxy(proxy)
    }
}

impl RecordId {
    pub(crate) fn unknown(self) -> RuntimeError {
        match self {
            RecordId::Thing(thing) => RuntimeError::UnknownThing(thing),
            RecordId::Proxy(proxy) => RuntimeError::UnknownProxy(proxy),
        }
    }
}

pub struct Record {
    uri: Box<str>,
    objects: [Option<ValueRef>; 4],

    /// Number of live values referring to this record
    references: usize,

    retired: bool,
}

impl Record {
    fn new(uri: &str) -> Record {
        Record {
            uri: uri.into(),
            objects: [None; 4],
            references: 0,
            retired: false,
        }
    }

    #[inline]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    #[inline]
    pub fn object(&self, field: RecordField) -> Option<ValueRef> {
        self.objects[field as usize]
    }

    #[inline]
    pub fn set_object(&mut self, field: RecordField, object: ValueRef) {
        self.objects[field as usize] = Some(object);
    }

    #[inline]
    pub fn references(&self) -> usize {
        self.references
    }

    #[inline]
    pub fn is_retired(&self) -> bool {
        self.retired
    }

    /// The objects this record owns
    pub fn objects(&self) -> impl Iterator<Item = ValueRef> + '_ {
        self.objects.iter().flatten().copied()
    }

    pub fn visit(&self, visitor: &mut impl GcVisitor) {
        for object in self.objects() {
            visitor.visit(object);
        }
    }
}

/// Fixed table of one kind of record
struct Records {
    kind: &'static str,
    slots: Vec<Option<Record>>,
}

impl Records {
    fn with_capacity(kind: &'static str, capacity: usize) -> Records {
        let capacity = capacity.min(u8::MAX as usize + 1);
        Records {
            kind,
            slots: (0..capacity).map(|_| None).collect(),
        }
    }

    fn find(&self, uri: &str) -> Option<usize> {
        self.slots.iter().position(|slot| {
            slot.as_ref()
                .map_or(false, |record| !record.retired && &*record.uri == uri)
        })
    }

    fn register(&mut self, uri: &str) -> RuntimeResult<usize> {
        if let Some(index) = self.find(uri) {
            return Ok(index);
        }

        let Some(index) = self.slots.iter().position(Option::is_none) else {
            warn!("insufficient space to register {} {:?}", self.kind, uri);
            return Err(RuntimeError::RegistryFull {
                kind: self.kind,
                uri: uri.into(),
                capacity: self.slots.len(),
            });
        };

        self.slots[index] = Some(Record::new(uri));
        Ok(index)
    }

    #[inline]
    fn get(&self, index: usize) -> Option<&Record> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    #[inline]
    fn get_mut(&mut self, index: usize) -> Option<&mut Record> {
        self.slots.get_mut(index).and_then(Option::as_mut)
    }

    /// Unregister a record. It is returned if nothing refers to it any more, otherwise it is
    /// retired until the last reference is released.
    fn remove(&mut self, index: usize) -> Option<Record> {
        let slot = self.slots.get_mut(index)?;
        let record = slot.as_mut()?;

        if record.references > 0 {
            debug!(
                "retiring {} {:?} with {} references",
                self.kind, record.uri, record.references
            );
            record.retired = true;
            return None;
        }

        slot.take()
    }

    fn release_reference(&mut self, index: usize, orphans: &mut Orphans<'_>) {
        let Some(slot) = self.slots.get_mut(index) else {
            return;
        };
        let Some(record) = slot.as_mut() else {
            return;
        };

        record.references = record.references.saturating_sub(1);
        if record.retired && record.references == 0 {
            if let Some(record) = slot.take() {
                debug!("dropping retired {} {:?}", self.kind, record.uri);
                for object in record.objects() {
                    orphans.push(object);
                }
            }
        }
    }

    fn visit_roots(&self, visitor: &mut impl GcVisitor) {
        for record in self.slots.iter().flatten() {
            if !record.retired {
                record.visit(visitor);
            }
        }
    }

    fn iter(&self) -> impl Iterator<Item = (usize, &Record)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|record| (index, record)))
    }
}

pub struct Registry {
    things: Records,
    proxies: Records,
}

impl Registry {
    /// Create a registry with room for `max_things` things and `max_proxies` proxies, each
    /// clamped to 256
    pub fn with_capacity(max_things: usize, max_proxies: usize) -> Registry {
        Registry {
            things: Records::with_capacity("thing", max_things),
            proxies: Records::with_capacity("proxy", max_proxies),
        }
    }

    /// Register a thing, or return the thing already registered under `uri`
    pub fn register_thing(&mut self, uri: &str) -> RuntimeResult<ThingId> {
        self.things.register(uri).map(|index| ThingId(index as u8))
    }

    /// Register a proxy, or return the proxy already registered under `uri`
    pub fn register_proxy(&mut self, uri: &str) -> RuntimeResult<ProxyId> {
        self.proxies.register(uri).map(|index| ProxyId(index as u8))
    }

    pub fn find_thing(&self, uri: &str) -> Option<ThingId> {
        self.things.find(uri).map(|index| ThingId(index as u8))
    }

    pub fn find_proxy(&self, uri: &str) -> Option<ProxyId> {
        self.proxies.find(uri).map(|index| ProxyId(index as u8))
    }

    pub fn record(&self, id: RecordId) -> Option<&Record> {
        match id {
            RecordId::Thing(thing) => self.things.get(thing.0 as usize),
            RecordId::Proxy(proxy) => self.proxies.get(proxy.0 as usize),
        }
    }

    pub fn record_mut(&mut self, id: RecordId) -> Option<&mut Record> {
        match id {
            RecordId::Thing(thing) => self.things.get_mut(thing.0 as usize),
            RecordId::Proxy(proxy) => self.proxies.get_mut(proxy.0 as usize),
        }
    }

    /// Unregister a record. Returns it if it can be dropped right away.
    pub fn remove(&mut self, id: RecordId) -> Option<Record> {
        match id {
            RecordId::Thing(thing) => self.things.remove(thing.0 as usize),
            RecordId::Proxy(proxy) => self.proxies.remove(proxy.0 as usize),
        }
    }

    /// Count a new value referring to a record
    pub fn add_reference(&mut self, id: RecordId) -> RuntimeResult<()> {
        let record = self.record_mut(id).ok_or_else(|| id.unknown())?;
        record.references += 1;
        Ok(())
    }

    /// A value referring to a record was reclaimed. A retired record loses its last reference
    /// here and hands its objects to `orphans`.
    pub fn release_reference(&mut self, id: RecordId, orphans: &mut Orphans<'_>) {
        match id {
            RecordId::Thing(thing) => self.things.release_reference(thing.0 as usize, orphans),
            RecordId::Proxy(proxy) => self.proxies.release_reference(proxy.0 as usize, orphans),
        }
    }

    /// Visit the objects of every registered record
    pub fn visit_roots(&self, visitor: &mut impl GcVisitor) {
        self.things.visit_roots(visitor);
        self.proxies.visit_roots(visitor);
    }

    pub fn things(&self) -> impl Iterator<Item = (ThingId, &Record)> {
        self.things
            .iter()
            .map(|(index, record)| (ThingId(index as u8), record))
    }

    pub fn proxies(&self) -> impl Iterator<Item = (ProxyId, &Record)> {
        self.proxies
            .iter()
            .map(|(index, record)| (ProxyId(index as u8), record))
    }
}
