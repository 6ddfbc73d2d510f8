use super::{HostCall, HostResult, ImportTable};
use crate::abi::{word_arg, Scalar};
use crate::render::render;
use crate::value::HeapValue;
use indexmap::IndexMap;

pub(super) fn register(table: &mut ImportTable) {
    table.insert("m_new", new_map);
    table.insert("rt_Map_new", new_map);
    table.insert("m_set", |call, args| {
        put(call, args);
        Ok(Scalar::Word(word_arg(args, 2)))
    });
    table.insert("rt_Map_set", |call, args| {
        put(call, args);
        Ok(Scalar::Word(word_arg(args, 0)))
    });
    table.insert("m_get", get);
    table.insert("rt_Map_get", get);
    table.insert("rt_Map_has", has);
    table.insert("m_delete", delete);
    table.insert("rt_Map_delete", delete);
    table.insert("rt_Map_size", size);
}

fn new_map(call: &mut HostCall<'_>, _args: &[Scalar]) -> HostResult {
    Ok(Scalar::Word(call.state.heap.alloc(HeapValue::Map(IndexMap::new()))))
}

/// Keys are compared by their display text, never by handle identity.
pub(super) fn key_text(call: &HostCall<'_>, args: &[Scalar]) -> String {
    render(&call.state.heap, word_arg(args, 1))
}

pub(super) fn put(call: &mut HostCall<'_>, args: &[Scalar]) {
    let key = key_text(call, args);
    let value = word_arg(args, 2);
    if let Some(entries) = call
        .state
        .heap
        .get_mut(word_arg(args, 0))
        .and_then(HeapValue::as_map_mut)
    {
        entries.insert(key, value);
    }
}

pub(super) fn get(call: &mut HostCall<'_>, args: &[Scalar]) -> HostResult {
    let key = key_text(call, args);
    let value = call
        .state
        .heap
        .get(word_arg(args, 0))
        .and_then(HeapValue::as_map)
        .and_then(|entries| entries.get(&key).copied())
        .unwrap_or(0);
    Ok(Scalar::Word(value))
}

pub(super) fn has(call: &mut HostCall<'_>, args: &[Scalar]) -> HostResult {
    let key = key_text(call, args);
    let found = call
        .state
        .heap
        .get(word_arg(args, 0))
        .and_then(HeapValue::as_map)
        .is_some_and(|entries| entries.contains_key(&key));
    Ok(Scalar::from_bool(found))
}

fn delete(call: &mut HostCall<'_>, args: &[Scalar]) -> HostResult {
    let key = key_text(call, args);
    let removed = call
        .state
        .heap
        .get_mut(word_arg(args, 0))
        .and_then(HeapValue::as_map_mut)
        .and_then(|entries| entries.shift_remove(&key))
        .is_some();
    Ok(Scalar::from_bool(removed))
}

pub(super) fn size(call: &mut HostCall<'_>, args: &[Scalar]) -> HostResult {
    let len = call
        .state
        .heap
        .get(word_arg(args, 0))
        .and_then(HeapValue::as_map)
        .map_or(0, IndexMap::len);
    Ok(Scalar::Word(len as i64))
}
