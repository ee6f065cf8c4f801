//! Runtime tests
//!
//! Things, proxies and their objects living in a small pool, across collections.

use wot_gc::{HeapError, Tag, Value, ValueRef};

use crate::{
    common::{
        error::{RuntimeError, RuntimeResult},
        options::{Options, OptionsBuilder},
    },
    runtime::{RecordField, RecordId, Runtime},
};

fn runtime(pool_capacity: usize) -> Runtime {
    Runtime::new(OptionsBuilder::new().pool_capacity(pool_capacity).build())
}

fn toggle(
    rt: &mut Runtime,
    target: RecordId,
    _args: &[ValueRef],
) -> RuntimeResult<Option<ValueRef>> {
    let on = rt
        .get_property(target, "on")
        .and_then(|value| rt.value(value))
        .and_then(|value| value.as_bool())
        .unwrap_or(false);
    let value = rt.new_bool(!on)?;
    rt.set_property(target, "on", value)?;
    Ok(Some(value))
}

fn set_level(
    rt: &mut Runtime,
    target: RecordId,
    args: &[ValueRef],
) -> RuntimeResult<Option<ValueRef>> {
    if let Some(&level) = args.first() {
        rt.set_property(target, "level", level)?;
    }
    Ok(None)
}

fn remember_opening(rt: &mut Runtime, target: RecordId, data: ValueRef) {
    rt.set_property(target, "last_opened", data).unwrap();
}

// ============================================================================
// Records
// ============================================================================

#[test]
fn test_thing_registration_is_idempotent() {
    let mut rt = Runtime::default();
    let door = rt.thing("door12").unwrap();
    let light = rt.thing("light12").unwrap();

    assert_ne!(door, light);
    assert_eq!(rt.thing("door12").unwrap(), door);
    assert_eq!(rt.registry().find_thing("light12"), Some(light));

    // Four objects per record
    assert_eq!(rt.heap().pool().allocated(), 8);
    for field in RecordField::ALL {
        let object = rt.record_object(door, field).unwrap();
        assert_eq!(rt.heap().tag(object), Tag::Object);
    }
}

#[test]
fn test_records_survive_full_collection() {
    let mut rt = Runtime::default();
    let door = rt.thing("door12").unwrap();
    let remote = rt.proxy("light12").unwrap();

    let open = rt.new_bool(false).unwrap();
    rt.set_property(door, "open", open).unwrap();
    // Unattached, reclaimed by the next full collection
    rt.new_unsigned(7).unwrap();

    let report = rt.collect_full();
    assert_eq!(report.freed, 1);
    assert_eq!(rt.get_property(door, "open"), Some(open));
    assert!(rt.record_object(remote, RecordField::Events).is_ok());
}

#[test]
fn test_unknown_records_are_reported() {
    let mut rt = Runtime::default();
    let door = rt.thing("door12").unwrap();
    rt.remove(door).unwrap();

    assert_eq!(rt.remove(door), Err(RuntimeError::UnknownThing(door)));
    assert_eq!(
        rt.record_object(door, RecordField::Properties),
        Err(RuntimeError::UnknownThing(door))
    );
    let value = rt.new_null().unwrap();
    assert_eq!(
        rt.set_property(door, "open", value),
        Err(RuntimeError::UnknownThing(door))
    );
}

#[test]
fn test_removed_thing_is_reclaimed() {
    let mut rt = Runtime::default();
    let door = rt.thing("door12").unwrap();
    let label = rt.new_string("front").unwrap();
    rt.set_property(door, "label", label).unwrap();
    let before = rt.heap().pool().allocated();

    rt.remove(door).unwrap();
    assert_eq!(rt.registry().find_thing("door12"), None);
    assert_eq!(rt.heap().stale().len(), 4);

    let report = rt.collect();
    // Four objects, one tree node and the string
    assert_eq!(report.freed, before);
    assert_eq!(rt.heap().pool().allocated(), 0);
    assert_eq!(rt.context().texts.len(), 0);
}

#[test]
fn test_referenced_thing_is_retired_until_released() {
    let mut rt = Runtime::default();
    let agent = rt.thing("agent12").unwrap();
    let door = rt.thing("door12").unwrap();
    let open = rt.new_bool(true).unwrap();
    rt.set_property(door, "open", open).unwrap();

    let reference = rt.reference(door).unwrap();
    rt.set_property(agent, "door", reference).unwrap();

    rt.remove(door).unwrap();
    assert_eq!(rt.registry().find_thing("door12"), None);
    let record = rt.registry().record(door.into()).unwrap();
    assert!(record.is_retired());
    assert_eq!(record.references(), 1);

    // Still reachable through the agent's reference
    rt.collect_full();
    assert!(rt.heap().is_live(open));

    // Dropping the last reference hands the record's objects to the collector
    let nothing = rt.new_null().unwrap();
    rt.set_property(agent, "door", nothing).unwrap();
    assert!(rt.registry().record(door.into()).is_none());

    rt.collect();
    assert!(!rt.heap().is_live(open));
    assert!(rt.record_object(agent, RecordField::Properties).is_ok());
}

#[test]
fn test_failed_registration_leaves_no_record() {
    // Room for one record and a single object of a second
    let mut rt = runtime(5);
    let door = rt.thing("door12").unwrap();

    assert_eq!(
        rt.thing("light12"),
        Err(RuntimeError::Heap(HeapError::CapacityExhausted { capacity: 5 }))
    );
    assert_eq!(rt.registry().find_thing("light12"), None);
    assert_eq!(rt.registry().things().count(), 1);

    rt.collect();
    assert_eq!(rt.heap().pool().allocated(), 4);
    assert!(rt.record_object(door, RecordField::Properties).is_ok());
}

#[test]
fn test_registry_capacity() {
    let mut rt = Runtime::new(OptionsBuilder::new().max_proxies(1).build());
    rt.proxy("light12").unwrap();

    assert!(matches!(
        rt.proxy("door12"),
        Err(RuntimeError::RegistryFull { kind: "proxy", .. })
    ));
    assert_eq!(rt.heap().pool().allocated(), 4);
}

// ============================================================================
// Properties
// ============================================================================

#[test]
fn test_overwritten_object_property_is_collected() {
    let mut rt = Runtime::default();
    let light = rt.thing("light12").unwrap();

    let colour = rt.new_object().unwrap();
    rt.set_property(light, "colour", colour).unwrap();
    let red = rt.new_unsigned(255).unwrap();
    rt.insert(colour, "red", red).unwrap();

    let replacement = rt.new_object().unwrap();
    rt.set_property(light, "colour", replacement).unwrap();
    assert!(rt.heap().stale().contains(colour));

    rt.collect();
    assert!(!rt.heap().is_live(colour));
    assert!(!rt.heap().is_live(red));
    assert_eq!(rt.get_property(light, "colour"), Some(replacement));
}

#[test]
fn test_strings_release_their_text() {
    let mut rt = Runtime::default();
    let light = rt.thing("light12").unwrap();

    let name = rt.new_string("kitchen").unwrap();
    rt.set_property(light, "name", name).unwrap();
    assert_eq!(rt.text(name), Some("kitchen"));

    let other = rt.new_string("hall").unwrap();
    rt.set_property(light, "name", other).unwrap();
    assert_eq!(rt.context().texts.len(), 1);
    assert_eq!(rt.text(other), Some("hall"));
    assert_eq!(rt.text(name), None);
}

#[test]
fn test_shared_leaf_is_copied_per_property() {
    let mut rt = runtime(24);
    let light = rt.thing("light12").unwrap();

    let v = rt.new_unsigned(7).unwrap();
    rt.set_property(light, "a", v).unwrap();
    rt.set_property(light, "b", v).unwrap();
    let w = rt.new_unsigned(8).unwrap();
    rt.set_property(light, "a", w).unwrap();

    // Churn enough to reuse every free slot
    for n in 0..40 {
        rt.new_unsigned(1000 + n).unwrap();
    }

    let b = rt.get_property(light, "b").unwrap();
    assert_eq!(rt.value(b), Some(Value::UnsignedInt(7)));
    let a = rt.get_property(light, "a").unwrap();
    assert_eq!(rt.value(a), Some(Value::UnsignedInt(8)));
    assert!(rt.heap().validate_trees().is_ok());
}

#[test]
fn test_shared_string_and_reference_are_copied() {
    let mut rt = Runtime::default();
    let agent = rt.thing("agent12").unwrap();
    let door = rt.thing("door12").unwrap();

    let name = rt.new_string("porch").unwrap();
    rt.set_property(agent, "name", name).unwrap();
    rt.set_property(door, "name", name).unwrap();
    assert_eq!(rt.context().texts.len(), 2);

    let reference = rt.reference(door).unwrap();
    rt.set_property(agent, "door", reference).unwrap();
    let list = rt.new_array().unwrap();
    rt.set_property(agent, "doors", list).unwrap();
    rt.push(list, reference).unwrap();
    assert_eq!(rt.registry().record(door.into()).unwrap().references(), 2);

    // Replacing the first copy leaves the second intact
    let nothing = rt.new_null().unwrap();
    rt.set_property(agent, "name", nothing).unwrap();
    let copy = rt.get_property(door, "name").unwrap();
    assert_eq!(rt.text(copy), Some("porch"));
    assert_eq!(rt.context().texts.len(), 1);

    let nothing = rt.new_null().unwrap();
    rt.set_property(agent, "door", nothing).unwrap();
    assert_eq!(rt.registry().record(door.into()).unwrap().references(), 1);
    let item = rt.item(list, 0).unwrap();
    assert_eq!(rt.value(item), Some(Value::Thing(door)));
}

#[test]
fn test_text_table_full() {
    let mut rt = Runtime::new(OptionsBuilder::new().text_capacity(1).build());
    rt.new_string("one").unwrap();

    assert_eq!(
        rt.new_string("two"),
        Err(RuntimeError::TextTableFull { capacity: 1 })
    );
}

#[test]
fn test_string_allocation_failure_releases_text() {
    let mut rt = runtime(4);
    rt.thing("door12").unwrap();

    assert!(rt.new_string("never stored").is_err());
    assert_eq!(rt.context().texts.len(), 0);
}

#[test]
fn test_arrays_through_runtime() {
    let mut rt = Runtime::default();
    let agent = rt.thing("agent12").unwrap();
    let readings = rt.new_array().unwrap();
    rt.set_property(agent, "readings", readings).unwrap();

    for n in 0..3 {
        let reading = rt.new_signed(n - 1).unwrap();
        assert_eq!(rt.push(readings, reading).unwrap(), n as usize);
    }

    let first = rt.item(readings, 0).unwrap();
    assert_eq!(rt.value(first), Some(Value::SignedInt(-1)));
    assert_eq!(rt.heap().array_length(readings), 3);
}

#[test]
fn test_unpinned_value_is_kept_by_pin() {
    let mut rt = runtime(6);
    rt.thing("door12").unwrap();

    let scope = rt.enter_scope();
    let kept = rt.new_number(1.5).unwrap();
    rt.pin(kept).unwrap();
    rt.new_number(2.5).unwrap();

    // The pool is full; the unpinned number makes room
    let third = rt.new_number(3.5).unwrap();
    assert!(rt.heap().is_live(kept));
    rt.exit_scope(scope);

    assert_eq!(rt.value(third), Some(Value::Float(3.5)));
    assert_eq!(rt.stats().full_collections, 1);
}

#[test]
fn test_symbol_table_full() {
    let mut rt = Runtime::new(OptionsBuilder::new().symbol_capacity(1).build());
    let door = rt.thing("door12").unwrap();
    let value = rt.new_null().unwrap();
    rt.set_property(door, "open", value).unwrap();

    let other = rt.new_null().unwrap();
    assert_eq!(
        rt.set_property(door, "closed", other),
        Err(RuntimeError::NamesFull { capacity: 1 })
    );
    assert_eq!(rt.get_property(door, "closed"), None);
}

// ============================================================================
// Actions and events
// ============================================================================

#[test]
fn test_invoke_action() {
    let mut rt = Runtime::default();
    let light = rt.thing("light12").unwrap();
    rt.register_action(light, "toggle", toggle).unwrap();
    rt.register_action(light, "setLevel", set_level).unwrap();

    let result = rt.invoke(light, "toggle", &[]).unwrap().unwrap();
    assert_eq!(rt.value(result), Some(Value::Boolean(true)));
    let result = rt.invoke(light, "toggle", &[]).unwrap().unwrap();
    assert_eq!(rt.value(result), Some(Value::Boolean(false)));

    let scope = rt.enter_scope();
    let level = rt.new_unsigned(40).unwrap();
    rt.pin(level).unwrap();
    assert_eq!(rt.invoke(light, "setLevel", &[level]), Ok(None));
    rt.exit_scope(scope);
    assert_eq!(rt.get_property(light, "level"), Some(level));
}

#[test]
fn test_handlers_share_function_ids() {
    let mut rt = Runtime::default();
    let light = rt.thing("light12").unwrap();
    let door = rt.thing("door12").unwrap();
    rt.register_action(light, "toggle", toggle).unwrap();
    rt.register_action(door, "toggle", toggle).unwrap();

    let actions = |rt: &Runtime, target: RecordId| {
        let object = rt.record_object(target, RecordField::Actions).unwrap();
        rt.value(rt.get(object, "toggle").unwrap())
    };
    assert_eq!(actions(&rt, light.into()), actions(&rt, door.into()));
}

#[test]
fn test_invoke_unknown_action() {
    let mut rt = Runtime::default();
    let light = rt.thing("light12").unwrap();

    assert_eq!(
        rt.invoke(light, "dim", &[]),
        Err(RuntimeError::NotCallable { name: "dim".into() })
    );
}

#[test]
fn test_emit_notifies_observers() {
    let mut rt = Runtime::default();
    let door = rt.thing("door12").unwrap();
    let light = rt.thing("light12").unwrap();
    rt.observe(door, "opened", remember_opening).unwrap();

    let when = rt.new_unsigned(1234).unwrap();
    rt.emit(door, "opened", when).unwrap();
    assert_eq!(rt.last_event(door, "opened"), Some(when));

    // The observer stored its own copy of the data
    let remembered = rt.get_property(door, "last_opened").unwrap();
    assert_ne!(remembered, when);
    assert_eq!(rt.value(remembered), Some(Value::UnsignedInt(1234)));

    // Observers are per record
    let other = rt.new_unsigned(99).unwrap();
    rt.emit(light, "opened", other).unwrap();
    assert_eq!(rt.get_property(light, "last_opened"), None);
}

#[test]
fn test_removed_record_drops_observers() {
    let mut rt = Runtime::default();
    let door = rt.thing("door12").unwrap();
    rt.observe(door, "opened", remember_opening).unwrap();
    rt.remove(door).unwrap();

    let again = rt.thing("door12").unwrap();
    let when = rt.new_unsigned(1).unwrap();
    rt.emit(again, "opened", when).unwrap();
    assert_eq!(rt.get_property(again, "last_opened"), None);
}

#[test]
fn test_proxies_attach_by_name() {
    let mut rt = Runtime::default();
    let agent = rt.thing("agent12").unwrap();
    let light = rt.proxy("light12").unwrap();
    rt.attach_proxy(agent, "light", light).unwrap();

    assert_eq!(rt.get_proxy(agent, "light"), Some(light));
    assert_eq!(rt.registry().record(light.into()).unwrap().references(), 1);

    // The proxy stays registered after its reference is replaced
    let door = rt.proxy("door12").unwrap();
    rt.attach_proxy(agent, "light", door).unwrap();
    assert_eq!(rt.registry().record(light.into()).unwrap().references(), 0);
    assert_eq!(rt.registry().find_proxy("light12"), Some(light));
}

// ============================================================================
// Churn
// ============================================================================

#[test]
fn test_churn_in_small_pool() {
    let mut rt = Runtime::new(Options {
        pool_capacity: 40,
        ..Options::default()
    });
    let agent = rt.thing("agent12").unwrap();

    for round in 0..200u32 {
        let reading = rt.new_object().unwrap();
        rt.set_property(agent, "reading", reading).unwrap();
        let value = rt.new_unsigned(round).unwrap();
        rt.insert(reading, "value", value).unwrap();
        let label = rt.new_string("sample").unwrap();
        rt.insert(reading, "label", label).unwrap();
    }

    let reading = rt.get_property(agent, "reading").unwrap();
    let value = rt.get(reading, "value").unwrap();
    assert_eq!(rt.value(value), Some(Value::UnsignedInt(199)));
    assert!(rt.stats().collections > 0);
    assert!(rt.heap().validate_trees().is_ok());
    assert!(rt.context().texts.len() <= rt.options().text_capacity);
}
