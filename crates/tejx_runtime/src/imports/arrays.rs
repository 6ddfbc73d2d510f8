use super::{HostCall, HostResult, ImportTable};
use crate::abi::{word_arg, Scalar};
use crate::value::HeapValue;
use tracing::warn;

/// Largest index a write may grow a sequence to.
pub(crate) const MAX_GROW_INDEX: usize = 1 << 24;

pub(super) fn register(table: &mut ImportTable) {
    table.insert("a_new", |call, _args| {
        Ok(Scalar::Word(call.state.heap.alloc(HeapValue::Sequence(Vec::new()))))
    });
    table.insert("Array_push", |call, args| {
        let handle = word_arg(args, 0);
        if let Some(items) = sequence_mut(call, handle) {
            items.push(word_arg(args, 1));
        }
        Ok(Scalar::Word(handle))
    });
    table.insert("a_get", get);
    table.insert("rt_array_get_fast", get);
    table.insert("a_set", set);
    table.insert("rt_array_set_fast", set);
    table.insert("a_len", |call, args| {
        Ok(Scalar::Word(sequence_len(call, word_arg(args, 0)).unwrap_or(0)))
    });
    table.insert("rt_array_length", |call, args| {
        match sequence_len(call, word_arg(args, 0)) {
            Some(len) => Ok(Scalar::Word(call.state.heap.alloc_number(len as f64))),
            None => Ok(Scalar::ZERO),
        }
    });
    table.insert("a_pop", |call, args| {
        let popped = sequence_mut(call, word_arg(args, 0)).and_then(Vec::pop);
        Ok(Scalar::Word(popped.unwrap_or(0)))
    });
    table.insert("len", |call, args| {
        let len = match call.state.heap.get(word_arg(args, 0)) {
            Some(HeapValue::Sequence(items)) => items.len(),
            Some(HeapValue::String(text)) => text.chars().count(),
            _ => return Ok(Scalar::ZERO),
        };
        Ok(Scalar::Word(call.state.heap.alloc_number(len as f64)))
    });
}

pub(super) fn sequence_mut<'c>(call: &'c mut HostCall<'_>, handle: i64) -> Option<&'c mut Vec<i64>> {
    call.state.heap.get_mut(handle).and_then(HeapValue::as_sequence_mut)
}

pub(super) fn sequence_len(call: &HostCall<'_>, handle: i64) -> Option<i64> {
    call.state
        .heap
        .get(handle)
        .and_then(HeapValue::as_sequence)
        .map(|items| items.len() as i64)
}

/// Out-of-range reads yield 0.
fn get(call: &mut HostCall<'_>, args: &[Scalar]) -> HostResult {
    let index = word_arg(args, 1);
    let value = call
        .state
        .heap
        .get(word_arg(args, 0))
        .and_then(HeapValue::as_sequence)
        .and_then(|items| usize::try_from(index).ok().and_then(|idx| items.get(idx)))
        .copied()
        .unwrap_or(0);
    Ok(Scalar::Word(value))
}

/// Writes past the end grow the sequence, filling the gap with 0. Indices
/// beyond `MAX_GROW_INDEX`, or growth the allocator refuses, leave the
/// sequence untouched.
fn set(call: &mut HostCall<'_>, args: &[Scalar]) -> HostResult {
    let value = word_arg(args, 2);
    let Ok(index) = usize::try_from(word_arg(args, 1)) else {
        return Ok(Scalar::Word(value));
    };
    let Some(items) = sequence_mut(call, word_arg(args, 0)) else {
        return Ok(Scalar::Word(value));
    };
    if index >= items.len() {
        if index > MAX_GROW_INDEX || items.try_reserve(index + 1 - items.len()).is_err() {
            warn!(index, "array write out of range, ignored");
            return Ok(Scalar::Word(value));
        }
        items.resize(index + 1, 0);
    }
    items[index] = value;
    Ok(Scalar::Word(value))
}
