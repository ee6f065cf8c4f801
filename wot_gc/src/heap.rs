//! Heap - value constructors, property trees and the stale-set mark-sweep collector
//!
//! Design:
//! - Every value and tree node lives in a fixed `NodePool`, nothing is allocated per value
//! - Composite values are only reclaimed by a collection, leaf values may be freed eagerly
//! - Overwriting a composite property records the old value in a bounded stale set
//! - A stale collection marks from the roots and sweeps only the unmarked stale entries
//! - A full collection additionally reclaims every unmarked slot, it runs when the pool is
//!   exhausted
//!
//! The runtime provides:
//! - `GcContext::visit_roots` - enumerate root values
//! - `GcContext::trace_thing` / `trace_proxy` - values held by registry records
//! - `GcContext::released` - release what a reclaimed value refers to outside the pool
//!
//! Values that are neither reachable from a root nor pinned may be reclaimed by any allocation
//! that runs a collection. Pin fresh values, or attach them to a rooted composite, before the
//! next allocation.

use alloc::vec::Vec;
use core::fmt;

use log::{debug, error, trace, warn};

use crate::{
    avl::{self, Entry},
    error::{HeapError, HeapResult, TreeError},
    pool::{NodeIndex, NodePool, Slot, TreeNode, TreeRef, ValueRef},
    stale_set::StaleSet,
    value::{FunctionId, ProxyId, Symbol, Tag, TextRef, ThingId, TreeKey, Value},
    visitor::{GcContext, GcVisitor, Orphans},
    worklist::Worklist,
};

/// Default number of slots in the node pool
const DEFAULT_POOL_CAPACITY: usize = 70;

/// Default number of stale entries
const DEFAULT_STALE_CAPACITY: usize = 16;

/// Default depth of the pin stack
const DEFAULT_PIN_CAPACITY: usize = 32;

/// Sizes of the heap's fixed structures
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeapConfig {
    pub pool_capacity: usize,
    pub stale_capacity: usize,
    pub pin_capacity: usize,
}

impl Default for HeapConfig {
    fn default() -> Self {
        HeapConfig {
            pool_capacity: DEFAULT_POOL_CAPACITY,
            stale_capacity: DEFAULT_STALE_CAPACITY,
            pin_capacity: DEFAULT_PIN_CAPACITY,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollectionKind {
    /// Only unmarked stale entries are reclaimed
    Stale,
    /// Every unmarked slot is reclaimed
    Full,
}

/// Outcome of one collection cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CollectionReport {
    pub kind: CollectionKind,
    /// Slots reached from the roots and pins
    pub marked: usize,
    /// Slots returned to the pool
    pub freed: usize,
    /// Stale entries that survived the cycle
    pub stale_pending: usize,
}

/// Counters accumulated over the lifetime of the heap
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GcStats {
    pub collections: usize,
    pub full_collections: usize,
    /// Slots reclaimed by collections
    pub slots_collected: usize,
    /// Leaf values freed as soon as they were overwritten
    pub eager_frees: usize,
    pub last: Option<CollectionReport>,
}

/// Position in the pin stack to return to when a scope ends
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use]
pub struct PinScope(usize);

/// The managed heap
pub struct Heap {
    pool: NodePool,

    /// Overwritten composites awaiting a collection
    stale: StaleSet,

    /// Shared by marking and by sweeping a single stale entry
    worklist: Worklist,

    /// Values kept alive regardless of reachability
    pins: Vec<ValueRef>,
    pin_capacity: usize,

    /// Values handed back by the context while releasing registry records
    orphans: Vec<ValueRef>,

    stats: GcStats,

    #[cfg(feature = "gc_stress_test")]
    pub gc_stress_test: bool,
}

impl Heap {
    /// Create a heap. The pool, stale set and pin stack are sized once here.
    pub fn new(config: HeapConfig) -> Heap {
        let pool = NodePool::with_capacity(config.pool_capacity);
        debug!(
            "heap: {} slots of {} bytes, {} stale entries, {} pins",
            pool.capacity(),
            NodePool::slot_size(),
            config.stale_capacity,
            config.pin_capacity
        );

        Heap {
            worklist: Worklist::with_capacity(pool.capacity()),
            pool,
            stale: StaleSet::with_capacity(config.stale_capacity),
            pins: Vec::with_capacity(config.pin_capacity),
            pin_capacity: config.pin_capacity,
            orphans: Vec::new(),
            stats: GcStats::default(),

            #[cfg(feature = "gc_stress_test")]
            gc_stress_test: false,
        }
    }

    #[inline]
    pub fn pool(&self) -> &NodePool {
        &self.pool
    }

    #[inline]
    pub fn stale(&self) -> &StaleSet {
        &self.stale
    }

    #[inline]
    pub fn stats(&self) -> &GcStats {
        &self.stats
    }

    // ========================================================================
    // Allocation
    // ========================================================================

    /// Allocate a slot, running one full collection if the pool is exhausted.
    ///
    /// # Arguments
    /// * `ctx` - The runtime context, used if a collection is needed
    /// * `alloc` - Tries to place the new slot, returns `None` when the pool is full
    fn allocate<T>(
        &mut self,
        ctx: &mut impl GcContext,
        mut alloc: impl FnMut(&mut NodePool) -> Option<T>,
    ) -> HeapResult<T> {
        #[cfg(feature = "gc_stress_test")]
        if self.gc_stress_test {
            self.collect_full(ctx);
        }

        if let Some(slot) = alloc(&mut self.pool) {
            return Ok(slot);
        }

        warn!(
            "node pool exhausted ({} slots), running a full collection",
            self.pool.capacity()
        );
        self.collect_full(ctx);

        alloc(&mut self.pool).ok_or_else(|| {
            error!(
                "node pool exhausted after collection: {} slots live",
                self.pool.allocated()
            );
            HeapError::CapacityExhausted {
                capacity: self.pool.capacity(),
            }
        })
    }

    fn new_value(&mut self, ctx: &mut impl GcContext, value: Value) -> HeapResult<ValueRef> {
        self.allocate(ctx, |pool| pool.allocate_value(value))
    }

    pub fn new_number(&mut self, ctx: &mut impl GcContext, number: f32) -> HeapResult<ValueRef> {
        self.new_value(ctx, Value::Float(number))
    }

    pub fn new_unsigned(&mut self, ctx: &mut impl GcContext, number: u32) -> HeapResult<ValueRef> {
        self.new_value(ctx, Value::UnsignedInt(number))
    }

    pub fn new_signed(&mut self, ctx: &mut impl GcContext, number: i32) -> HeapResult<ValueRef> {
        self.new_value(ctx, Value::SignedInt(number))
    }

    /// A string value referring to text owned by the context
    pub fn new_string(&mut self, ctx: &mut impl GcContext, text: TextRef) -> HeapResult<ValueRef> {
        self.new_value(ctx, Value::String(text))
    }

    pub fn new_bool(&mut self, ctx: &mut impl GcContext, b: bool) -> HeapResult<ValueRef> {
        self.new_value(ctx, Value::Boolean(b))
    }

    pub fn new_null(&mut self, ctx: &mut impl GcContext) -> HeapResult<ValueRef> {
        self.new_value(ctx, Value::Null)
    }

    /// An empty object
    pub fn new_object(&mut self, ctx: &mut impl GcContext) -> HeapResult<ValueRef> {
        self.new_value(ctx, Value::Object(None))
    }

    /// An empty array
    pub fn new_array(&mut self, ctx: &mut impl GcContext) -> HeapResult<ValueRef> {
        self.new_value(ctx, Value::Array(None))
    }

    pub fn new_function(
        &mut self,
        ctx: &mut impl GcContext,
        function: FunctionId,
    ) -> HeapResult<ValueRef> {
        self.new_value(ctx, Value::Function(function))
    }

    pub fn new_thing(&mut self, ctx: &mut impl GcContext, thing: ThingId) -> HeapResult<ValueRef> {
        self.new_value(ctx, Value::Thing(thing))
    }

    pub fn new_proxy(&mut self, ctx: &mut impl GcContext, proxy: ProxyId) -> HeapResult<ValueRef> {
        self.new_value(ctx, Value::Proxy(proxy))
    }

    // ========================================================================
    // Reading values
    // ========================================================================

    /// Payload of a value, or `None` once its slot has been reclaimed
    #[inline]
    pub fn get(&self, value: ValueRef) -> Option<Value> {
        self.pool.value(value).copied()
    }

    /// Tag of a value, `Tag::Unused` once its slot has been reclaimed
    #[inline]
    pub fn tag(&self, value: ValueRef) -> Tag {
        self.get(value).map_or(Tag::Unused, |value| value.tag())
    }

    #[inline]
    pub fn is_live(&self, value: ValueRef) -> bool {
        self.pool.value(value).is_some()
    }

    /// Whether the value was reached by the marking pass of the current cycle
    #[inline]
    pub fn is_marked(&self, value: ValueRef) -> bool {
        self.pool.is_marked(value.index())
    }

    fn child_root(&self, value: ValueRef, expected: Tag) -> HeapResult<Option<TreeRef>> {
        match self.pool.value(value) {
            None => Err(HeapError::Dangling(value)),
            Some(payload) if payload.tag() == expected => Ok(payload.child_root()),
            Some(_) => Err(HeapError::TypeMismatch { value, expected }),
        }
    }

    fn set_child_root(&mut self, value: ValueRef, root: TreeRef) {
        if let Some(Value::Object(tree) | Value::Array(tree)) = self.pool.value_mut(value) {
            *tree = Some(root);
        }
    }

    /// Value of an object's property
    pub fn retrieve_property(&self, object: ValueRef, symbol: Symbol) -> Option<ValueRef> {
        let root = self.child_root(object, Tag::Object).ok()?;
        avl::find(&self.pool, root, symbol.to_key()?)
    }

    /// Element of an array
    pub fn retrieve_array_item(&self, array: ValueRef, index: usize) -> Option<ValueRef> {
        let root = self.child_root(array, Tag::Array).ok()?;
        avl::find(&self.pool, root, array_key(index).ok()?)
    }

    /// One past the largest index stored in the array, 0 if it is empty
    pub fn array_length(&self, array: ValueRef) -> usize {
        let root = self.child_root(array, Tag::Array).ok().flatten();
        avl::last(&self.pool, root).map_or(0, |entry| entry.key as usize)
    }

    /// Entries of an object or array in ascending key order. Empty for any other value.
    pub fn entries(&self, value: ValueRef) -> avl::Iter<'_> {
        let root = self.get(value).and_then(|payload| payload.child_root());
        avl::iter(&self.pool, root)
    }

    /// Properties of an object in ascending symbol order
    pub fn properties(&self, object: ValueRef) -> impl Iterator<Item = (Symbol, ValueRef)> + '_ {
        let root = self.child_root(object, Tag::Object).ok().flatten();
        avl::iter(&self.pool, root)
            .filter_map(|Entry { key, value }| Symbol::from_key(key).map(|symbol| (symbol, value)))
    }

    /// Number of entries of an object or array
    pub fn entry_count(&self, value: ValueRef) -> usize {
        self.entries(value).count()
    }

    /// Check the AVL invariants of the child tree of every live composite
    pub fn validate_trees(&self) -> Result<(), TreeError> {
        self.pool
            .occupied()
            .filter_map(|index| self.pool.value_ref(index))
            .filter_map(|value| self.get(value).and_then(|payload| payload.child_root()))
            .try_for_each(|root| avl::validate(&self.pool, Some(root)))
    }

    // ========================================================================
    // Mutating composites
    // ========================================================================

    /// Set an object property.
    ///
    /// Overwriting a composite records it as stale. If the stale set is full a stale
    /// collection runs first, and if that leaves no room the insert is rejected with
    /// `StaleSetFull`. Overwriting a leaf frees it immediately. A leaf already stored under
    /// another key is rejected with `AlreadyAttached`.
    pub fn insert_property(
        &mut self,
        ctx: &mut impl GcContext,
        object: ValueRef,
        symbol: Symbol,
        value: ValueRef,
    ) -> HeapResult<()> {
        let key = symbol
            .to_key()
            .ok_or(HeapError::KeyOutOfRange(symbol.0 as usize))?;
        self.insert_child(ctx, object, Tag::Object, key, value)
    }

    /// Set an array element, with the same overwrite rules as `insert_property`
    pub fn insert_array_item(
        &mut self,
        ctx: &mut impl GcContext,
        array: ValueRef,
        index: usize,
        value: ValueRef,
    ) -> HeapResult<()> {
        let key = array_key(index)?;
        self.insert_child(ctx, array, Tag::Array, key, value)
    }

    /// Append after the largest index in the array. Returns the new element's index.
    pub fn append_array_item(
        &mut self,
        ctx: &mut impl GcContext,
        array: ValueRef,
        value: ValueRef,
    ) -> HeapResult<usize> {
        self.child_root(array, Tag::Array)?;
        let index = self.array_length(array);
        self.insert_array_item(ctx, array, index, value)?;
        Ok(index)
    }

    fn insert_child(
        &mut self,
        ctx: &mut impl GcContext,
        parent: ValueRef,
        expected: Tag,
        key: TreeKey,
        value: ValueRef,
    ) -> HeapResult<()> {
        let root = self.child_root(parent, expected)?;
        let Some(payload) = self.get(value) else {
            return Err(HeapError::Dangling(value));
        };
        let leaf = !payload.is_composite();

        if let Some(node) = avl::find_node(&self.pool, root, key) {
            let old = self.pool.tree(node).value();
            if old == value {
                return Ok(());
            }
            if leaf && self.pool.is_attached(value) {
                return Err(HeapError::AlreadyAttached(value));
            }

            // The parent keeps the old value reachable while room is made for it
            self.with_pinned(&[parent, value], |heap| heap.reserve_stale(ctx, old))?;
            self.pool.tree_mut(node).value = value;
            self.pool.set_attached(value, leaf);
            self.pool.set_attached(old, false);
            return self.add_stale(ctx, old);
        }

        if leaf && self.pool.is_attached(value) {
            return Err(HeapError::AlreadyAttached(value));
        }

        let node = self.with_pinned(&[parent, value], |heap| {
            heap.allocate(ctx, |pool| pool.allocate_tree(TreeNode::leaf(key, value)))
        })?;

        let root = avl::link(&mut self.pool, root, node);
        self.set_child_root(parent, root);
        self.pool.set_attached(value, leaf);
        Ok(())
    }

    /// Whether a leaf value is held by a tree node. Such a leaf cannot be inserted anywhere
    /// else, and overwriting its entry is the only way to free it eagerly.
    #[inline]
    pub fn is_attached(&self, value: ValueRef) -> bool {
        self.pool.is_attached(value)
    }

    /// Make sure `old` can be recorded once it is overwritten
    fn reserve_stale(&mut self, ctx: &mut impl GcContext, old: ValueRef) -> HeapResult<()> {
        let composite = self.get(old).map_or(false, |payload| payload.is_composite());
        if !composite || self.stale.contains(old) || !self.stale.is_full() {
            return Ok(());
        }

        self.collect(ctx);
        if self.stale.is_full() {
            warn!(
                "stale set still full after collection, rejecting overwrite of {:?}",
                old
            );
            return Err(HeapError::StaleSetFull {
                capacity: self.stale.capacity(),
            });
        }

        Ok(())
    }

    /// Forget a value whose parent edge has been removed.
    ///
    /// Leaf values are freed immediately unless a tree node still holds them. Composites are
    /// recorded in the stale set and reclaimed by a later collection if nothing else refers
    /// to them. A value that has already been reclaimed is ignored.
    pub fn add_stale(&mut self, ctx: &mut impl GcContext, value: ValueRef) -> HeapResult<()> {
        let Some(payload) = self.get(value) else {
            return Ok(());
        };

        if !payload.is_composite() {
            self.free_leaf(ctx, value);
            return Ok(());
        }

        if self.stale.insert(value) {
            return Ok(());
        }

        self.collect(ctx);
        if !self.is_live(value) || self.stale.insert(value) {
            return Ok(());
        }

        warn!("stale set full, cannot record {:?}", value);
        Err(HeapError::StaleSetFull {
            capacity: self.stale.capacity(),
        })
    }

    /// Free a leaf value right away. Returns false for composites, for leaves still held by a
    /// tree node and for reclaimed values.
    pub fn free_leaf(&mut self, ctx: &mut impl GcContext, value: ValueRef) -> bool {
        let Some(payload) = self.get(value) else {
            return false;
        };
        if payload.is_composite() || self.pool.is_attached(value) {
            return false;
        }

        self.pool.free(value.index());
        self.stats.eager_frees += 1;
        trace!("freed leaf {:?} = {:?}", value, payload);

        ctx.released(payload, &mut Orphans::new(&mut self.orphans));
        self.adopt_orphans(ctx);
        true
    }

    /// Queue values handed back by the context. Leaf orphans are freed, composites go to the
    /// stale set. A composite that does not fit stays unreachable until a full collection.
    fn adopt_orphans(&mut self, ctx: &mut impl GcContext) {
        while let Some(orphan) = self.orphans.pop() {
            let Some(payload) = self.get(orphan) else {
                continue;
            };

            if payload.is_composite() {
                if !self.stale.insert(orphan) {
                    warn!(
                        "stale set full, {:?} left for the next full collection",
                        orphan
                    );
                }
            } else if !self.pool.is_attached(orphan) && self.pool.free(orphan.index()) {
                self.stats.eager_frees += 1;
                ctx.released(payload, &mut Orphans::new(&mut self.orphans));
            }
        }
    }

    // ========================================================================
    // Pinning
    // ========================================================================

    /// Start a pin scope. Values pinned after this are released by `exit_scope`.
    #[inline]
    pub fn enter_scope(&self) -> PinScope {
        PinScope(self.pins.len())
    }

    /// Keep a value alive until the enclosing scope exits
    pub fn pin(&mut self, value: ValueRef) -> HeapResult<()> {
        if self.pins.len() >= self.pin_capacity {
            return Err(HeapError::PinStackFull {
                capacity: self.pin_capacity,
            });
        }

        self.pins.push(value);
        Ok(())
    }

    #[inline]
    pub fn exit_scope(&mut self, scope: PinScope) {
        self.pins.truncate(scope.0);
    }

    #[inline]
    pub fn pinned(&self) -> &[ValueRef] {
        &self.pins
    }

    /// Run `f` with `values` pinned
    pub fn with_pinned<T>(
        &mut self,
        values: &[ValueRef],
        f: impl FnOnce(&mut Heap) -> HeapResult<T>,
    ) -> HeapResult<T> {
        let scope = self.enter_scope();
        let result = values
            .iter()
            .try_for_each(|&value| self.pin(value))
            .and_then(|()| f(self));
        self.exit_scope(scope);
        result
    }

    // ========================================================================
    // Collection
    // ========================================================================

    /// Run a stale collection: mark from the roots and pins, then reclaim every stale entry
    /// that was not reached, together with everything only it referred to.
    pub fn collect(&mut self, ctx: &mut impl GcContext) -> CollectionReport {
        self.run_collection(ctx, CollectionKind::Stale)
    }

    /// Run a full collection: a stale collection that also reclaims every unmarked slot
    pub fn collect_full(&mut self, ctx: &mut impl GcContext) -> CollectionReport {
        self.run_collection(ctx, CollectionKind::Full)
    }

    fn run_collection(&mut self, ctx: &mut impl GcContext, kind: CollectionKind) -> CollectionReport {
        let allocated = self.pool.allocated();

        let marked = self.mark(ctx);
        self.sweep_stale(ctx);
        if kind == CollectionKind::Full {
            let orphans = &mut self.orphans;
            self.pool
                .sweep_unmarked(|payload| ctx.released(payload, &mut Orphans::new(&mut *orphans)));
        }
        self.pool.flip_epoch();
        self.adopt_orphans(ctx);

        let report = CollectionReport {
            kind,
            marked,
            freed: allocated - self.pool.allocated(),
            stale_pending: self.stale.len(),
        };

        self.stats.collections += 1;
        if kind == CollectionKind::Full {
            self.stats.full_collections += 1;
        }
        self.stats.slots_collected += report.freed;
        self.stats.last = Some(report);

        debug!(
            "{:?} collection: marked {}, freed {}, {} stale pending, pool {:.0}% used",
            kind,
            report.marked,
            report.freed,
            report.stale_pending,
            self.pool.used_fraction() * 100.0
        );

        report
    }

    /// Colour everything reachable from the pins and roots. Returns the number of slots marked.
    fn mark(&mut self, ctx: &mut impl GcContext) -> usize {
        self.worklist.clear();

        let mut marker = Marker {
            pool: &mut self.pool,
            worklist: &mut self.worklist,
            marked: 0,
        };
        for &pinned in &self.pins {
            marker.visit(pinned);
        }
        ctx.visit_roots(&mut marker);
        let mut marked = marker.marked;

        while let Some(index) = self.worklist.pop() {
            let slot = self.pool.slot(index).copied();
            let mut marker = Marker {
                pool: &mut self.pool,
                worklist: &mut self.worklist,
                marked: 0,
            };

            match slot {
                Some(Slot::Tree(node)) => {
                    marker.visit_tree(node.left());
                    marker.visit_tree(node.right());
                    marker.visit(node.value());
                }
                Some(Slot::Value(Value::Object(root) | Value::Array(root))) => {
                    marker.visit_tree(root);
                }
                Some(Slot::Value(Value::Thing(thing))) => ctx.trace_thing(thing, &mut marker),
                Some(Slot::Value(Value::Proxy(proxy))) => ctx.trace_proxy(proxy, &mut marker),
                _ => {}
            }

            marked += marker.marked;
        }

        marked
    }

    /// Reclaim unmarked stale entries and keep the marked ones
    fn sweep_stale(&mut self, ctx: &mut impl GcContext) {
        let mut entries = self.stale.take();
        entries.retain(|&value| {
            if !self.is_live(value) {
                return false;
            }
            if self.is_marked(value) {
                return true;
            }

            self.sweep_value(ctx, value.index());
            false
        });
        self.stale.restore(entries);
    }

    /// Free an unmarked value and every unmarked slot reachable from it. Marked slots are
    /// still reachable from a root and stop the sweep. Slots are coloured as they are queued,
    /// so each is queued once.
    fn sweep_value(&mut self, ctx: &mut impl GcContext, index: NodeIndex) -> usize {
        self.worklist.clear();
        if !self.pool.mark(index) {
            return 0;
        }
        self.worklist.push(index);
        let mut freed = 0;

        while let Some(index) = self.worklist.pop() {
            match self.pool.slot(index).copied() {
                Some(Slot::Tree(node)) => {
                    if let Some(left) = node.left() {
                        self.queue_for_sweep(left.index());
                    }
                    if let Some(right) = node.right() {
                        self.queue_for_sweep(right.index());
                    }
                    self.queue_for_sweep(node.value().index());
                }
                Some(Slot::Value(payload)) => {
                    if let Some(root) = payload.child_root() {
                        self.queue_for_sweep(root.index());
                    }
                    ctx.released(payload, &mut Orphans::new(&mut self.orphans));
                }
                Some(Slot::Free) | None => continue,
            }

            self.pool.free(index);
            freed += 1;
        }

        trace!("swept {:?}: {} slots", index, freed);
        freed
    }

    #[inline]
    fn queue_for_sweep(&mut self, index: NodeIndex) {
        if self.pool.mark(index) {
            self.worklist.push(index);
        }
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new(HeapConfig::default())
    }
}

impl fmt::Debug for Heap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Heap")
            .field("pool", &self.pool)
            .field("stale", &self.stale.len())
            .field("pins", &self.pins.len())
            .field("stats", &self.stats)
            .finish()
    }
}

/// Tree key of an array index
fn array_key(index: usize) -> HeapResult<TreeKey> {
    index
        .checked_add(1)
        .and_then(|key| TreeKey::try_from(key).ok())
        .ok_or(HeapError::KeyOutOfRange(index))
}

// ============================================================================
// Marker - implements GcVisitor for the marking phase
// ============================================================================

/// Colours slots for the current epoch and queues them for scanning.
///
/// Handed to `GcContext::visit_roots` and the record tracing hooks.
pub struct Marker<'a> {
    pool: &'a mut NodePool,
    worklist: &'a mut Worklist,
    marked: usize,
}

impl Marker<'_> {
    #[inline]
    fn mark_index(&mut self, index: NodeIndex) {
        if self.pool.mark(index) {
            self.worklist.push(index);
            self.marked += 1;
        }
    }

    #[inline]
    fn visit_tree(&mut self, tree: Option<TreeRef>) {
        if let Some(tree) = tree {
            self.mark_index(tree.index());
        }
    }
}

impl GcVisitor for Marker<'_> {
    #[inline]
    fn visit(&mut self, value: ValueRef) {
        self.mark_index(value.index());
    }
}
