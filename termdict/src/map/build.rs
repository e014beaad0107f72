//! Building maps from lists of entries.
//!
//! Each element of the list is one of `Key-Value`, `Key=Value`, `Key:Value`
//! or `Label(Value)`. The pairs are sorted by raw key order once they are in
//! the new object and a repeated key rejects the whole list.

use log::trace;

use crate::map::layout::{MapView, first_misordered, write_map};
use crate::map::{shape_error, type_error};
use crate::{Atom, Heap, Interrupt, Value, compare_keys, equal};

/// Key and value of one list element, or `None` when it has no entry shape.
fn entry_of(heap: &Heap, item: Value) -> Option<(Value, Value)> {
    let term = heap.compound(item)?;
    match term.arity() {
        2 if matches!(term.name, Atom::MINUS | Atom::EQUALS | Atom::COLON) => {
            let key = term.args[0];
            key.is_key().then_some((key, term.args[1]))
        }
        1 => Some((Value::from_atom(term.name), term.args[0])),
        _ => None,
    }
}

/// Build a map with `class` from the proper list `data`.
pub(crate) fn from_list(
    heap: &mut Heap,
    data: Value,
    class: Value,
) -> Result<Value, Interrupt> {
    let items = heap
        .list_items(data)
        .ok_or_else(|| type_error(heap, "map-data", data))?;

    let mut pairs: Vec<[Value; 2]> = Vec::with_capacity(items.len());
    for item in items {
        let (key, value) =
            entry_of(heap, item).ok_or_else(|| type_error(heap, "name-value", item))?;
        pairs.push([key, value]);
    }
    pairs.sort_unstable_by(|a, b| compare_keys(a[0], b[0]));

    let map = write_map(heap, class, pairs.as_flattened())?;
    let view = MapView::from_tag(heap, map).expect("map was just written");
    if let Some(index) = first_misordered(view.entry_slots()) {
        let duplicate = view.key(index);
        // the written object is left unreferenced
        return Err(shape_error(
            "map-data",
            format!("duplicate key {}", heap.render(duplicate)),
        )
        .into());
    }
    Ok(map)
}

/// `map` with its class replaced by `class`.
///
/// No class, an unbound class, or the class the map already has returns
/// `map` itself. Otherwise a new spine is written that shares every key and
/// value with `map`.
pub(crate) fn with_class(
    heap: &mut Heap,
    map: Value,
    class: Option<Value>,
) -> Result<Value, Interrupt> {
    let Some(class) = class.filter(|class| !class.is_unbound()) else {
        return Ok(map);
    };
    let slots = {
        let view = MapView::from_tag(heap, map).expect("caller validated the map");
        if equal(heap, view.class(), class) {
            return Ok(map);
        }
        view.entry_slots().to_vec()
    };
    trace!("reclassing map of {} entries", slots.len() / 2);
    Ok(write_map(heap, class, &slots)?)
}

/// Turn construction data into a map: valid maps pass through, proper lists
/// are built.
pub(crate) fn coerce(
    heap: &mut Heap,
    data: Value,
    class: Option<Value>,
) -> Result<Value, Interrupt> {
    if MapView::new(heap, data).is_some() {
        with_class(heap, data, class)
    } else {
        from_list(heap, data, class.unwrap_or(Value::UNBOUND))
    }
}
