//! Node Pool - fixed-capacity slab of uniformly sized slots
//!
//! Every tree node and every tagged value occupies exactly one slot. Slots are addressed by a
//! 1-based `NodeIndex` so that `Option<NodeIndex>` keeps 0 as "none". A slot is free iff it
//! holds `Slot::Free`, which is never the state of a live node.
//!
//! Each slot also carries one colour bit. A slot is marked for the current collection cycle
//! iff its colour equals the pool's epoch; flipping the epoch unmarks every slot at once.

use alloc::{boxed::Box, vec::Vec};
use core::{fmt, mem::size_of, num::NonZeroU16};

use bitflags::bitflags;
use log::trace;

use crate::value::{TreeKey, Value};

/// Index of a slot in the pool. Index 1 is the first slot.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct NodeIndex(NonZeroU16);

impl NodeIndex {
    /// The raw 1-based index
    #[inline]
    pub fn get(self) -> u16 {
        self.0.get()
    }

    #[inline]
    fn slot(self) -> usize {
        self.0.get() as usize - 1
    }

    /// Slot offsets are always below `u16::MAX` since capacity is clamped to it
    #[inline]
    fn from_slot(slot: usize) -> NodeIndex {
        NodeIndex(NonZeroU16::MIN.saturating_add(slot as u16))
    }
}

impl fmt::Debug for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.get())
    }
}

/// Index of a slot holding a tree node. Only the pool creates these.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct TreeRef(NodeIndex);

impl TreeRef {
    #[inline]
    pub fn index(self) -> NodeIndex {
        self.0
    }
}

impl fmt::Debug for TreeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TreeRef({:?})", self.0)
    }
}

/// Index of a slot holding a tagged value. Only the pool creates these.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ValueRef(NodeIndex);

impl ValueRef {
    #[inline]
    pub fn index(self) -> NodeIndex {
        self.0
    }
}

impl fmt::Debug for ValueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValueRef({:?})", self.0)
    }
}

/// A node of an index-based AVL tree
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TreeNode {
    pub(crate) key: TreeKey,
    pub(crate) value: ValueRef,
    pub(crate) height: u8,
    pub(crate) left: Option<TreeRef>,
    pub(crate) right: Option<TreeRef>,
}

impl TreeNode {
    /// A detached node of height 1
    #[inline]
    pub fn leaf(key: TreeKey, value: ValueRef) -> TreeNode {
        TreeNode {
            key,
            value,
            height: 1,
            left: None,
            right: None,
        }
    }

    #[inline]
    pub fn key(&self) -> TreeKey {
        self.key
    }

    #[inline]
    pub fn value(&self) -> ValueRef {
        self.value
    }

    #[inline]
    pub fn height(&self) -> u8 {
        self.height
    }

    #[inline]
    pub fn left(&self) -> Option<TreeRef> {
        self.left
    }

    #[inline]
    pub fn right(&self) -> Option<TreeRef> {
        self.right
    }
}

/// Contents of one pool slot
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Slot {
    Free,
    Tree(TreeNode),
    Value(Value),
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct SlotFlags: u8 {
        /// Epoch colour of the slot
        const COLOR = 1 << 0;
        /// The value is held by a tree node of some composite
        const ATTACHED = 1 << 1;
    }
}

#[derive(Clone, Copy)]
struct Cell {
    flags: SlotFlags,
    slot: Slot,
}

impl Cell {
    const FREE: Cell = Cell {
        flags: SlotFlags::empty(),
        slot: Slot::Free,
    };

    #[inline]
    fn is_free(&self) -> bool {
        matches!(self.slot, Slot::Free)
    }

    #[inline]
    fn color(&self) -> bool {
        self.flags.contains(SlotFlags::COLOR)
    }
}

/// The fixed-capacity slab backing all trees and values
pub struct NodePool {
    cells: Box<[Cell]>,

    /// Number of occupied slots
    allocated: usize,

    /// Offset of the most recently allocated slot. Scans start just after it.
    cursor: usize,

    /// Current epoch colour. A slot is marked iff its colour equals the epoch.
    epoch: bool,
}

impl NodePool {
    /// Create a pool with `capacity` slots, clamped to `1..=u16::MAX`. This is the only
    /// allocation the pool ever makes.
    pub fn with_capacity(capacity: usize) -> NodePool {
        let capacity = capacity.clamp(1, u16::MAX as usize);
        let cells: Vec<Cell> = (0..capacity).map(|_| Cell::FREE).collect();

        NodePool {
            cells: cells.into_boxed_slice(),
            allocated: 0,
            cursor: capacity - 1,
            epoch: false,
        }
    }

    /// Size in bytes of a single slot
    #[inline]
    pub const fn slot_size() -> usize {
        size_of::<Cell>()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    /// Total size of the slab in bytes
    #[inline]
    pub fn size_in_bytes(&self) -> usize {
        self.capacity() * Self::slot_size()
    }

    #[inline]
    pub fn allocated(&self) -> usize {
        self.allocated
    }

    #[inline]
    pub fn free_count(&self) -> usize {
        self.capacity() - self.allocated
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.allocated == self.capacity()
    }

    /// Fraction of slots in use, between 0 and 1
    pub fn used_fraction(&self) -> f32 {
        self.allocated as f32 / self.capacity() as f32
    }

    #[inline]
    pub fn epoch(&self) -> bool {
        self.epoch
    }

    #[inline]
    pub(crate) fn flip_epoch(&mut self) {
        self.epoch = !self.epoch;
    }

    /// Place `slot` in the next free slot after the cursor, wrapping around. New slots are
    /// coloured unmarked for the current epoch.
    pub(crate) fn allocate(&mut self, slot: Slot) -> Option<NodeIndex> {
        debug_assert!(!matches!(slot, Slot::Free));

        if self.is_full() {
            return None;
        }

        let capacity = self.capacity();
        let cursor = self.cursor;
        let offset = (1..=capacity)
            .map(|step| (cursor + step) % capacity)
            .find(|&offset| self.cells[offset].is_free())?;

        let mut flags = SlotFlags::empty();
        flags.set(SlotFlags::COLOR, !self.epoch);
        self.cells[offset] = Cell { flags, slot };

        self.cursor = offset;
        self.allocated += 1;

        Some(NodeIndex::from_slot(offset))
    }

    pub(crate) fn allocate_value(&mut self, value: Value) -> Option<ValueRef> {
        self.allocate(Slot::Value(value)).map(ValueRef)
    }

    pub(crate) fn allocate_tree(&mut self, node: TreeNode) -> Option<TreeRef> {
        self.allocate(Slot::Tree(node)).map(TreeRef)
    }

    /// Return a slot to the pool. Freeing a slot that is already free, or that does not belong
    /// to this pool, leaves the counters untouched and returns false.
    pub(crate) fn free(&mut self, index: NodeIndex) -> bool {
        match self.cells.get_mut(index.slot()) {
            Some(cell) if !cell.is_free() => {
                *cell = Cell::FREE;
                self.allocated -= 1;
                true
            }
            _ => {
                trace!("ignoring free of unoccupied slot {:?}", index);
                false
            }
        }
    }

    /// Contents of a slot, or `None` for an index outside this pool
    #[inline]
    pub fn slot(&self, index: NodeIndex) -> Option<&Slot> {
        self.cells.get(index.slot()).map(|cell| &cell.slot)
    }

    #[inline]
    pub fn is_free(&self, index: NodeIndex) -> bool {
        self.cells.get(index.slot()).map_or(true, Cell::is_free)
    }

    /// Raw colour bit of an occupied slot
    #[inline]
    pub fn color(&self, index: NodeIndex) -> Option<bool> {
        self.cells
            .get(index.slot())
            .filter(|cell| !cell.is_free())
            .map(Cell::color)
    }

    /// Whether an occupied slot carries the current epoch's colour
    #[inline]
    pub fn is_marked(&self, index: NodeIndex) -> bool {
        self.color(index) == Some(self.epoch)
    }

    /// Colour an occupied slot with the current epoch. Returns false if it already was.
    #[inline]
    pub(crate) fn mark(&mut self, index: NodeIndex) -> bool {
        let epoch = self.epoch;
        match self.cells.get_mut(index.slot()) {
            Some(cell) if !cell.is_free() && cell.color() != epoch => {
                cell.flags.set(SlotFlags::COLOR, epoch);
                true
            }
            _ => false,
        }
    }

    /// Whether a live value is held by a tree node
    #[inline]
    pub fn is_attached(&self, value: ValueRef) -> bool {
        self.cells
            .get(value.0.slot())
            .is_some_and(|cell| !cell.is_free() && cell.flags.contains(SlotFlags::ATTACHED))
    }

    #[inline]
    pub(crate) fn set_attached(&mut self, value: ValueRef, attached: bool) {
        if let Some(cell) = self.cells.get_mut(value.0.slot()) {
            if !cell.is_free() {
                cell.flags.set(SlotFlags::ATTACHED, attached);
            }
        }
    }

    /// The value in a slot, or `None` if the slot has been reclaimed
    #[inline]
    pub fn value(&self, value: ValueRef) -> Option<&Value> {
        match self.slot(value.0) {
            Some(Slot::Value(value)) => Some(value),
            _ => None,
        }
    }

    #[inline]
    pub(crate) fn value_mut(&mut self, value: ValueRef) -> Option<&mut Value> {
        match self.cells.get_mut(value.0.slot()).map(|cell| &mut cell.slot) {
            Some(Slot::Value(value)) => Some(value),
            _ => None,
        }
    }

    /// A tree node. Tree indices are only held by the tree that owns the node, so a
    /// mismatch here is a broken invariant.
    #[inline]
    pub fn tree(&self, tree: TreeRef) -> &TreeNode {
        match self.slot(tree.0) {
            Some(Slot::Tree(node)) => node,
            other => panic!("{:?} refers to {:?}, not a tree node", tree, other),
        }
    }

    #[inline]
    pub(crate) fn tree_mut(&mut self, tree: TreeRef) -> &mut TreeNode {
        match self.cells.get_mut(tree.0.slot()).map(|cell| &mut cell.slot) {
            Some(Slot::Tree(node)) => node,
            _ => panic!("{:?} does not refer to a tree node", tree),
        }
    }

    /// View an index as a value reference if the slot currently holds a value
    #[inline]
    pub fn value_ref(&self, index: NodeIndex) -> Option<ValueRef> {
        match self.slot(index) {
            Some(Slot::Value(_)) => Some(ValueRef(index)),
            _ => None,
        }
    }

    /// Indices of every occupied slot, in slot order
    pub fn occupied(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| !cell.is_free())
            .map(|(offset, _)| NodeIndex::from_slot(offset))
    }

    /// Free every occupied slot that is not marked in the current epoch, handing the payload of
    /// each reclaimed value slot to `on_value`. Returns the number of slots freed.
    pub(crate) fn sweep_unmarked(&mut self, mut on_value: impl FnMut(Value)) -> usize {
        let epoch = self.epoch;
        let mut freed = 0;

        for cell in self.cells.iter_mut() {
            if cell.is_free() || cell.color() == epoch {
                continue;
            }

            if let Slot::Value(value) = cell.slot {
                on_value(value);
            }
            *cell = Cell::FREE;
            freed += 1;
        }

        self.allocated -= freed;
        freed
    }
}

impl fmt::Debug for NodePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodePool")
            .field("capacity", &self.capacity())
            .field("allocated", &self.allocated)
            .field("epoch", &self.epoch)
            .finish()
    }
}
