//! Property-based tests for the heap.
//!
//! Uses proptest to generate random mutation sequences and verify invariants hold.

use std::collections::BTreeMap;

use proptest::prelude::*;
use wot_gc::{GcContext, GcVisitor, Heap, HeapConfig, HeapError, Symbol, Tag, Value, ValueRef};

struct Roots(Vec<ValueRef>);

impl GcContext for Roots {
    fn visit_roots(&mut self, visitor: &mut impl GcVisitor) {
        for &root in &self.0 {
            visitor.visit(root);
        }
    }
}

fn heap(pool_capacity: usize, stale_capacity: usize) -> Heap {
    Heap::new(HeapConfig {
        pool_capacity,
        stale_capacity,
        pin_capacity: 8,
    })
}

/// Count the slots reachable from `value`: values plus the tree nodes of composites
fn reachable_slots(heap: &Heap, value: ValueRef, seen: &mut Vec<ValueRef>) -> usize {
    if seen.contains(&value) {
        return 0;
    }
    seen.push(value);

    let entries: Vec<ValueRef> = heap.entries(value).map(|entry| entry.value).collect();
    let mut slots = 1 + entries.len();
    for child in entries {
        slots += reachable_slots(heap, child, seen);
    }
    slots
}

/// Strategy for a sequence of (symbol, number) property writes
fn writes() -> impl Strategy<Value = Vec<(u16, u32)>> {
    prop::collection::vec((0u16..40, any::<u32>()), 1..120)
}

/// What the model expects under a key: a number, or an object holding a number
#[derive(Clone, Copy, Debug, PartialEq)]
enum Expected {
    Leaf(u32),
    Object(u32),
}

#[derive(Clone, Debug)]
enum Op {
    Set { key: u16, n: u32, object: bool },
    Share { from: u16, to: u16 },
    Garbage(u8),
    Collect { full: bool },
}

fn ops() -> impl Strategy<Value = Vec<Op>> {
    let op = prop_oneof![
        4 => (0u16..8, any::<u32>(), any::<bool>())
            .prop_map(|(key, n, object)| Op::Set { key, n, object }),
        3 => (0u16..8, 0u16..8).prop_map(|(from, to)| Op::Share { from, to }),
        1 => (0u8..12).prop_map(Op::Garbage),
        1 => any::<bool>().prop_map(|full| Op::Collect { full }),
    ];
    prop::collection::vec(op, 1..150)
}

/// Allocate `expected` as a fresh, unattached value
fn build(heap: &mut Heap, roots: &mut Roots, expected: Expected) -> ValueRef {
    match expected {
        Expected::Leaf(n) => heap.new_unsigned(roots, n).unwrap(),
        Expected::Object(n) => {
            let object = heap.new_object(roots).unwrap();
            let scope = heap.enter_scope();
            heap.pin(object).unwrap();
            let leaf = heap.new_unsigned(roots, n).unwrap();
            heap.insert_property(roots, object, Symbol(0), leaf).unwrap();
            heap.exit_scope(scope);
            object
        }
    }
}

fn resolve(heap: &Heap, value: ValueRef) -> Option<Expected> {
    match heap.get(value)? {
        Value::UnsignedInt(n) => Some(Expected::Leaf(n)),
        Value::Object(_) => match heap.get(heap.retrieve_property(value, Symbol(0))?)? {
            Value::UnsignedInt(n) => Some(Expected::Object(n)),
            _ => None,
        },
        _ => None,
    }
}

proptest! {
    /// Random attaching, overwriting and sharing never leaves a key pointing at a reclaimed
    /// or reused slot. Leaves cannot be stored twice, composites can.
    #[test]
    fn every_key_resolves_after_sharing(ops in ops()) {
        let mut roots = Roots(Vec::new());
        let mut heap = heap(64, 16);
        let root = heap.new_object(&mut roots).unwrap();
        roots.0.push(root);

        let mut model: BTreeMap<u16, Expected> = BTreeMap::new();
        for op in ops {
            match op {
                Op::Set { key, n, object } => {
                    let expected = if object { Expected::Object(n) } else { Expected::Leaf(n) };
                    let value = build(&mut heap, &mut roots, expected);
                    heap.insert_property(&mut roots, root, Symbol(key), value).unwrap();
                    model.insert(key, expected);
                }
                Op::Share { from, to } => {
                    let Some(value) = heap.retrieve_property(root, Symbol(from)) else {
                        continue;
                    };
                    let result = heap.insert_property(&mut roots, root, Symbol(to), value);
                    match model[&from] {
                        Expected::Leaf(_) if from != to => {
                            prop_assert_eq!(result, Err(HeapError::AlreadyAttached(value)));
                        }
                        expected => {
                            prop_assert_eq!(result, Ok(()));
                            model.insert(to, expected);
                        }
                    }
                }
                Op::Garbage(count) => {
                    for n in 0..count {
                        heap.new_unsigned(&mut roots, n as u32).unwrap();
                    }
                }
                Op::Collect { full } => {
                    if full {
                        heap.collect_full(&mut roots);
                    } else {
                        heap.collect(&mut roots);
                    }
                }
            }

            for key in 0..8u16 {
                let stored = heap
                    .retrieve_property(root, Symbol(key))
                    .and_then(|value| resolve(&heap, value));
                prop_assert_eq!(stored, model.get(&key).copied());
            }
            prop_assert_eq!(heap.pool().allocated(), heap.pool().occupied().count());
        }

        heap.collect_full(&mut roots);
        prop_assert!(heap.validate_trees().is_ok());
        for (_, value) in heap.properties(root) {
            let leaf = heap.tag(value) != Tag::Object;
            prop_assert_eq!(heap.is_attached(value), leaf);
        }
    }

    /// Property trees stay balanced and ordered, and hold the last value written per key
    #[test]
    fn properties_match_model(ops in writes()) {
        let mut roots = Roots(Vec::new());
        let mut heap = heap(256, 8);
        let obj = heap.new_object(&mut roots).unwrap();
        roots.0.push(obj);

        let mut model = BTreeMap::new();
        for (symbol, n) in ops {
            let v = heap.new_unsigned(&mut roots, n).unwrap();
            heap.insert_property(&mut roots, obj, Symbol(symbol), v).unwrap();
            model.insert(symbol, n);
        }

        prop_assert!(heap.validate_trees().is_ok());
        let stored: Vec<(u16, Option<Value>)> = heap
            .properties(obj)
            .map(|(symbol, value)| (symbol.0, heap.get(value)))
            .collect();
        let expected: Vec<(u16, Option<Value>)> = model
            .iter()
            .map(|(&symbol, &n)| (symbol, Some(Value::UnsignedInt(n))))
            .collect();
        prop_assert_eq!(stored, expected);

        // Overwritten leaves were freed eagerly: the object, one node and one value per key
        prop_assert_eq!(heap.pool().allocated(), 1 + 2 * model.len());
    }

    /// After a full collection exactly the reachable slots remain, and a second collection
    /// frees nothing
    #[test]
    fn full_collection_keeps_exactly_the_reachable_slots(
        ops in prop::collection::vec((0u16..6, 0u8..3, any::<bool>()), 1..80)
    ) {
        let mut roots = Roots(Vec::new());
        let mut heap = heap(512, 4);
        let root = heap.new_object(&mut roots).unwrap();
        roots.0.push(root);

        for (symbol, depth, array) in ops {
            // Build a small chain, then attach it under the root
            let scope = heap.enter_scope();
            let head = if array {
                heap.new_array(&mut roots).unwrap()
            } else {
                heap.new_object(&mut roots).unwrap()
            };
            heap.pin(head).unwrap();

            let mut tail = head;
            for level in 0..depth {
                let next = heap.new_object(&mut roots).unwrap();
                if heap.tag(tail) == Tag::Array {
                    heap.append_array_item(&mut roots, tail, next).unwrap();
                } else {
                    heap.insert_property(&mut roots, tail, Symbol(level as u16), next).unwrap();
                }
                tail = next;
            }
            heap.exit_scope(scope);

            heap.insert_property(&mut roots, root, Symbol(symbol), head).unwrap();
        }

        heap.collect_full(&mut roots);
        let mut seen = Vec::new();
        prop_assert_eq!(heap.pool().allocated(), reachable_slots(&heap, root, &mut seen));
        prop_assert_eq!(heap.pool().allocated(), heap.pool().occupied().count());

        let report = heap.collect_full(&mut roots);
        prop_assert_eq!(report.freed, 0);
        prop_assert!(heap.validate_trees().is_ok());
    }

    /// Freeing a leaf twice changes nothing the second time
    #[test]
    fn double_free_is_idempotent(count in 1usize..32) {
        let mut roots = Roots(Vec::new());
        let mut heap = heap(32, 4);

        let values: Vec<ValueRef> = (0..count)
            .map(|n| heap.new_unsigned(&mut roots, n as u32).unwrap())
            .collect();
        for &v in &values {
            prop_assert!(heap.free_leaf(&mut roots, v));
        }
        for &v in &values {
            prop_assert!(!heap.free_leaf(&mut roots, v));
        }

        prop_assert_eq!(heap.pool().allocated(), 0);
        prop_assert_eq!(heap.pool().free_count(), 32);
    }
}
