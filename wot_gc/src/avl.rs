//! Index-based AVL trees
//!
//! Trees live entirely inside a `NodePool`. A tree is identified by the index of its root node,
//! `None` being the empty tree. Every operation that can change the shape of a tree returns the
//! new root, which the owner must store.
//!
//! Rebalancing follows the classic four cases. The balance factor of a node is
//! `height(right) - height(left)` computed from the cached heights of its children:
//! - left-left: single right rotation
//! - right-right: single left rotation
//! - left-right: right-right on the left child, then left-left
//! - right-left: left-left on the right child, then right-right
//!
//! Traversals are iterative over a fixed stack. An AVL tree over at most `u16::MAX` nodes is
//! never higher than 23, so `MAX_TREE_HEIGHT` is a hard bound rather than a tuning knob.

use core::cmp::Ordering;

use crate::{
    error::{HeapError, HeapResult, TreeError},
    pool::{NodePool, TreeNode, TreeRef, ValueRef},
    value::TreeKey,
};

/// Upper bound on the height of any tree that fits in a pool
pub const MAX_TREE_HEIGHT: usize = 32;

/// A key and value visited in a tree
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Entry {
    pub key: TreeKey,
    pub value: ValueRef,
}

/// Outcome of an insert
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Insertion {
    /// Root of the tree after the insert
    pub root: TreeRef,
    /// Value previously stored under the key, if the key was already present
    pub replaced: Option<ValueRef>,
}

/// Find the node holding `key`
pub fn find_node(pool: &NodePool, root: Option<TreeRef>, key: TreeKey) -> Option<TreeRef> {
    let mut current = root;
    while let Some(tree) = current {
        let node = pool.tree(tree);
        current = match key.cmp(&node.key) {
            Ordering::Equal => return Some(tree),
            Ordering::Less => node.left,
            Ordering::Greater => node.right,
        };
    }

    None
}

/// Find the value stored under `key`
#[inline]
pub fn find(pool: &NodePool, root: Option<TreeRef>, key: TreeKey) -> Option<ValueRef> {
    find_node(pool, root, key).map(|node| pool.tree(node).value)
}

/// Insert `value` under `key`, overwriting the value of an existing key.
///
/// Overwriting never allocates and leaves the shape of the tree unchanged. Inserting a new key
/// allocates one slot directly from the pool, without collecting, and fails with
/// `CapacityExhausted` if there is none. The tree is unchanged on failure.
pub fn insert(
    pool: &mut NodePool,
    root: Option<TreeRef>,
    key: TreeKey,
    value: ValueRef,
) -> HeapResult<Insertion> {
    if let (Some(root), Some(node)) = (root, find_node(pool, root, key)) {
        let replaced = core::mem::replace(&mut pool.tree_mut(node).value, value);
        return Ok(Insertion {
            root,
            replaced: Some(replaced),
        });
    }

    let node = pool
        .allocate_tree(TreeNode::leaf(key, value))
        .ok_or(HeapError::CapacityExhausted {
            capacity: pool.capacity(),
        })?;

    Ok(Insertion {
        root: link(pool, root, node),
        replaced: None,
    })
}

/// Link a detached node into a tree and rebalance. Returns the new root.
///
/// If the key is already present the existing node takes the detached node's value and the
/// detached node is returned to the pool.
pub fn link(pool: &mut NodePool, root: Option<TreeRef>, node: TreeRef) -> TreeRef {
    let key = pool.tree(node).key;
    let root = match root {
        Some(root) => link_at(pool, root, node, key),
        None => node,
    };

    #[cfg(all(feature = "tree_validation", debug_assertions))]
    debug_assert_eq!(validate(pool, Some(root)).err(), None);

    root
}

fn link_at(pool: &mut NodePool, tree: TreeRef, node: TreeRef, key: TreeKey) -> TreeRef {
    let current = *pool.tree(tree);

    match key.cmp(&current.key) {
        Ordering::Less => {
            let left = match current.left {
                Some(left) => link_at(pool, left, node, key),
                None => node,
            };
            pool.tree_mut(tree).left = Some(left);
        }
        Ordering::Greater => {
            let right = match current.right {
                Some(right) => link_at(pool, right, node, key),
                None => node,
            };
            pool.tree_mut(tree).right = Some(right);
        }
        Ordering::Equal => {
            let value = pool.tree(node).value;
            pool.tree_mut(tree).value = value;
            pool.free(node.index());
            return tree;
        }
    }

    balance(pool, tree)
}

/// Cached height of a subtree, 0 for the empty tree
#[inline]
fn node_height(pool: &NodePool, tree: Option<TreeRef>) -> u8 {
    tree.map_or(0, |tree| pool.tree(tree).height)
}

#[inline]
fn update_height(pool: &mut NodePool, tree: TreeRef) {
    let node = *pool.tree(tree);
    let height = node_height(pool, node.left).max(node_height(pool, node.right)) + 1;
    pool.tree_mut(tree).height = height;
}

#[inline]
fn balance_factor(pool: &NodePool, tree: TreeRef) -> i16 {
    let node = pool.tree(tree);
    node_height(pool, node.right) as i16 - node_height(pool, node.left) as i16
}

fn left_left(pool: &mut NodePool, p5: TreeRef) -> TreeRef {
    let Some(p3) = pool.tree(p5).left else {
        return p5;
    };

    let p3_right = pool.tree(p3).right;
    pool.tree_mut(p5).left = p3_right;
    pool.tree_mut(p3).right = Some(p5);

    update_height(pool, p5);
    update_height(pool, p3);
    p3
}

fn right_right(pool: &mut NodePool, p3: TreeRef) -> TreeRef {
    let Some(p5) = pool.tree(p3).right else {
        return p3;
    };

    let p5_left = pool.tree(p5).left;
    pool.tree_mut(p3).right = p5_left;
    pool.tree_mut(p5).left = Some(p3);

    update_height(pool, p3);
    update_height(pool, p5);
    p5
}

fn left_right(pool: &mut NodePool, p5: TreeRef) -> TreeRef {
    if let Some(left) = pool.tree(p5).left {
        let left = right_right(pool, left);
        pool.tree_mut(p5).left = Some(left);
    }
    left_left(pool, p5)
}

fn right_left(pool: &mut NodePool, p3: TreeRef) -> TreeRef {
    if let Some(right) = pool.tree(p3).right {
        let right = left_left(pool, right);
        pool.tree_mut(p3).right = Some(right);
    }
    right_right(pool, p3)
}

fn balance(pool: &mut NodePool, tree: TreeRef) -> TreeRef {
    let factor = balance_factor(pool, tree);

    let tree = if factor < -1 {
        let left = match pool.tree(tree).left {
            Some(left) => balance_factor(pool, left),
            None => 0,
        };
        if left > 0 {
            left_right(pool, tree)
        } else {
            left_left(pool, tree)
        }
    } else if factor > 1 {
        let right = match pool.tree(tree).right {
            Some(right) => balance_factor(pool, right),
            None => 0,
        };
        if right < 0 {
            right_left(pool, tree)
        } else {
            right_right(pool, tree)
        }
    } else {
        tree
    };

    update_height(pool, tree);
    tree
}

/// Entry with the smallest key
pub fn first(pool: &NodePool, root: Option<TreeRef>) -> Option<Entry> {
    let mut tree = root?;
    while let Some(left) = pool.tree(tree).left {
        tree = left;
    }
    Some(entry(pool, tree))
}

/// Entry with the largest key
pub fn last(pool: &NodePool, root: Option<TreeRef>) -> Option<Entry> {
    let mut tree = root?;
    while let Some(right) = pool.tree(tree).right {
        tree = right;
    }
    Some(entry(pool, tree))
}

#[inline]
fn entry(pool: &NodePool, tree: TreeRef) -> Entry {
    let node = pool.tree(tree);
    Entry {
        key: node.key,
        value: node.value,
    }
}

/// Cached height of the tree
#[inline]
pub fn height(pool: &NodePool, root: Option<TreeRef>) -> u8 {
    node_height(pool, root)
}

/// Number of entries in the tree
pub fn len(pool: &NodePool, root: Option<TreeRef>) -> usize {
    iter(pool, root).count()
}

/// Call `visitor` with every entry in ascending key order
pub fn apply(pool: &NodePool, root: Option<TreeRef>, mut visitor: impl FnMut(TreeKey, ValueRef)) {
    for Entry { key, value } in iter(pool, root) {
        visitor(key, value);
    }
}

/// In-order iterator over a tree
pub fn iter(pool: &NodePool, root: Option<TreeRef>) -> Iter<'_> {
    Iter {
        pool,
        stack: TreeStack::new(),
        current: root,
    }
}

pub struct Iter<'a> {
    pool: &'a NodePool,
    stack: TreeStack,
    current: Option<TreeRef>,
}

impl Iterator for Iter<'_> {
    type Item = Entry;

    fn next(&mut self) -> Option<Entry> {
        while let Some(tree) = self.current {
            self.stack.push(tree);
            self.current = self.pool.tree(tree).left;
        }

        let tree = self.stack.pop()?;
        self.current = self.pool.tree(tree).right;
        Some(entry(self.pool, tree))
    }
}

/// Return every node of the tree to the pool, children before their parent. Each freed
/// node's entry is handed to `on_free`; the values themselves are not touched. Returns the
/// number of nodes freed.
pub fn free_subtree(
    pool: &mut NodePool,
    root: Option<TreeRef>,
    mut on_free: impl FnMut(Entry),
) -> usize {
    let mut stack = TreeStack::new();
    let mut current = root;
    let mut last = None;
    let mut freed = 0;

    loop {
        while let Some(tree) = current {
            stack.push(tree);
            current = pool.tree(tree).left;
        }

        let Some(tree) = stack.peek() else {
            break;
        };

        // Descend right once, then free the node on the way back up
        let right = pool.tree(tree).right;
        if right.is_some() && right != last {
            current = right;
            continue;
        }

        stack.pop();
        let node = entry(pool, tree);
        if pool.free(tree.index()) {
            freed += 1;
            on_free(node);
        }
        last = Some(tree);
    }

    freed
}

/// Check balance, ordering and cached heights of every node
pub fn validate(pool: &NodePool, root: Option<TreeRef>) -> Result<(), TreeError> {
    validate_subtree(pool, root, None, None, 0).map(|_| ())
}

fn validate_subtree(
    pool: &NodePool,
    tree: Option<TreeRef>,
    lower: Option<TreeKey>,
    upper: Option<TreeKey>,
    depth: usize,
) -> Result<u8, TreeError> {
    let Some(tree) = tree else {
        return Ok(0);
    };

    if depth >= MAX_TREE_HEIGHT {
        return Err(TreeError::TooDeep);
    }

    let node = pool.tree(tree);
    let key = node.key;
    if lower.map_or(false, |lower| key <= lower) || upper.map_or(false, |upper| key >= upper) {
        return Err(TreeError::Unordered { key });
    }

    let left = validate_subtree(pool, node.left, lower, Some(key), depth + 1)?;
    let right = validate_subtree(pool, node.right, Some(key), upper, depth + 1)?;

    let balance = right as i16 - left as i16;
    if balance.abs() > 1 {
        return Err(TreeError::Unbalanced { key, balance });
    }

    let actual = left.max(right) + 1;
    if node.height != actual {
        return Err(TreeError::HeightMismatch {
            key,
            cached: node.height,
            actual,
        });
    }

    Ok(actual)
}

/// Fixed-size stack of tree indices used by the iterative traversals
struct TreeStack {
    items: [Option<TreeRef>; MAX_TREE_HEIGHT],
    len: usize,
}

impl TreeStack {
    const fn new() -> TreeStack {
        TreeStack {
            items: [None; MAX_TREE_HEIGHT],
            len: 0,
        }
    }

    #[inline]
    fn push(&mut self, tree: TreeRef) {
        assert!(self.len < MAX_TREE_HEIGHT, "tree exceeds the AVL height bound");
        self.items[self.len] = Some(tree);
        self.len += 1;
    }

    #[inline]
    fn peek(&self) -> Option<TreeRef> {
        self.len.checked_sub(1).and_then(|top| self.items[top])
    }

    #[inline]
    fn pop(&mut self) -> Option<TreeRef> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        self.items[self.len].take()
    }
}
