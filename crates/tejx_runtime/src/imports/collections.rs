//! Built-in container classes. Each constructor receives the object word the
//! module allocated for `this` and binds the fresh container to it.

use super::arrays::{sequence_len, sequence_mut};
use super::{maps, HostCall, HostResult, ImportTable};
use crate::abi::{word_arg, Scalar};
use crate::render::render;
use crate::value::{HeapValue, Trie};
use crate::word::coerce_number;
use indexmap::{IndexMap, IndexSet};

pub(super) fn register(table: &mut ImportTable) {
    register_stack(table);
    register_queue(table);
    register_heaps(table);
    register_sets(table);
    register_ordered_map(table);
    register_trie(table);
}

fn register_stack(table: &mut ImportTable) {
    table.insert("rt_Stack_constructor", new_sequence);
    table.insert("rt_Stack_push", push);
    table.insert("rt_Stack_pop", |call, args| {
        let popped = sequence_mut(call, word_arg(args, 0)).and_then(Vec::pop);
        Ok(Scalar::Word(popped.unwrap_or(0)))
    });
    table.insert("rt_Stack_peek", |call, args| {
        let top = call
            .state
            .heap
            .get(word_arg(args, 0))
            .and_then(HeapValue::as_sequence)
            .and_then(|items| items.last().copied());
        Ok(Scalar::Word(top.unwrap_or(0)))
    });
    table.insert("rt_Stack_size", sequence_size);
    table.insert("rt_Stack_isEmpty", sequence_is_empty);
}

fn register_queue(table: &mut ImportTable) {
    table.insert("rt_Queue_constructor", new_sequence);
    table.insert("rt_Queue_enqueue", push);
    table.insert("rt_Queue_dequeue", take_front);
    table.insert("rt_Queue_size", sequence_size);
    table.insert("rt_Queue_isEmpty", sequence_is_empty);
}

// Priority structures keep their backing sequence sorted ascending and
// extract from the head.
fn register_heaps(table: &mut ImportTable) {
    for kind in ["MinHeap", "PriorityQueue"] {
        table.insert(format!("rt_{kind}_constructor"), new_sequence);
        table.insert(format!("rt_{kind}_insert"), sorted_insert);
        table.insert(format!("rt_{kind}_extractMin"), take_front);
        table.insert(format!("rt_{kind}_size"), sequence_size);
        table.insert(format!("rt_{kind}_isEmpty"), sequence_is_empty);
    }
}

fn register_sets(table: &mut ImportTable) {
    for kind in ["Set", "OrderedSet", "BloomFilter"] {
        table.insert(format!("rt_{kind}_constructor"), |call, args| {
            let handle = word_arg(args, 0);
            Ok(Scalar::Word(call.state.heap.bind(handle, HeapValue::Set(IndexSet::new()))))
        });
        table.insert(format!("rt_{kind}_add"), |call, args| {
            let handle = word_arg(args, 0);
            if let Some(items) = set_mut(call, handle) {
                items.insert(word_arg(args, 1));
            }
            Ok(Scalar::Word(handle))
        });
    }
    for name in ["rt_Set_has", "rt_OrderedSet_has", "rt_BloomFilter_contains"] {
        table.insert(name, |call, args| {
            let found = call
                .state
                .heap
                .get(word_arg(args, 0))
                .and_then(HeapValue::as_set)
                .is_some_and(|items| items.contains(&word_arg(args, 1)));
            Ok(Scalar::from_bool(found))
        });
    }
    table.insert("rt_Set_delete", |call, args| {
        let removed = set_mut(call, word_arg(args, 0))
            .is_some_and(|items| items.shift_remove(&word_arg(args, 1)));
        Ok(Scalar::from_bool(removed))
    });
    table.insert("rt_Set_values", |call, args| {
        let Some(items) = call.state.heap.get(word_arg(args, 0)).and_then(HeapValue::as_set)
        else {
            return Ok(Scalar::ZERO);
        };
        let values = items.iter().copied().collect();
        Ok(Scalar::Word(call.state.heap.alloc(HeapValue::Sequence(values))))
    });
    for kind in ["Set", "OrderedSet"] {
        table.insert(format!("rt_{kind}_size"), |call, args| {
            Ok(Scalar::Word(set_len(call, word_arg(args, 0)).unwrap_or(0)))
        });
        table.insert(format!("rt_{kind}_isEmpty"), |call, args| {
            Ok(Scalar::from_bool(set_len(call, word_arg(args, 0)) == Some(0)))
        });
    }
}

fn register_ordered_map(table: &mut ImportTable) {
    table.insert("rt_OrderedMap_constructor", |call, args| {
        let handle = word_arg(args, 0);
        Ok(Scalar::Word(call.state.heap.bind(handle, HeapValue::Map(IndexMap::new()))))
    });
    table.insert("rt_OrderedMap_put", |call, args| {
        maps::put(call, args);
        Ok(Scalar::Word(word_arg(args, 0)))
    });
    table.insert("rt_OrderedMap_at", maps::get);
    table.insert("rt_OrderedMap_has", maps::has);
    table.insert("rt_OrderedMap_size", maps::size);
    table.insert("rt_OrderedMap_isEmpty", |call, args| {
        let empty = call
            .state
            .heap
            .get(word_arg(args, 0))
            .and_then(HeapValue::as_map)
            .is_some_and(IndexMap::is_empty);
        Ok(Scalar::from_bool(empty))
    });
}

fn register_trie(table: &mut ImportTable) {
    table.insert("rt_Trie_constructor", |call, args| {
        let handle = word_arg(args, 0);
        Ok(Scalar::Word(call.state.heap.bind(handle, HeapValue::Trie(Trie::default()))))
    });
    table.insert("rt_Trie_addPath", |call, args| {
        let handle = word_arg(args, 0);
        let path = render(&call.state.heap, word_arg(args, 1));
        if let Some(HeapValue::Trie(root)) = call.state.heap.get_mut(handle) {
            root.insert(&path, word_arg(args, 2));
        }
        Ok(Scalar::Word(handle))
    });
    table.insert("rt_Trie_find", |call, args| {
        let path = render(&call.state.heap, word_arg(args, 1));
        let found = match call.state.heap.get(word_arg(args, 0)) {
            Some(HeapValue::Trie(root)) => root.find(&path),
            _ => None,
        };
        Ok(Scalar::Word(found.unwrap_or(0)))
    });
}

fn new_sequence(call: &mut HostCall<'_>, args: &[Scalar]) -> HostResult {
    let handle = word_arg(args, 0);
    Ok(Scalar::Word(call.state.heap.bind(handle, HeapValue::Sequence(Vec::new()))))
}

fn push(call: &mut HostCall<'_>, args: &[Scalar]) -> HostResult {
    let handle = word_arg(args, 0);
    if let Some(items) = sequence_mut(call, handle) {
        items.push(word_arg(args, 1));
    }
    Ok(Scalar::Word(handle))
}

fn take_front(call: &mut HostCall<'_>, args: &[Scalar]) -> HostResult {
    let front = sequence_mut(call, word_arg(args, 0))
        .filter(|items| !items.is_empty())
        .map(|items| items.remove(0));
    Ok(Scalar::Word(front.unwrap_or(0)))
}

/// Elements order by their numeric reading; ties keep insertion order.
fn sorted_insert(call: &mut HostCall<'_>, args: &[Scalar]) -> HostResult {
    let handle = word_arg(args, 0);
    let Some(mut items) = call
        .state
        .heap
        .get(handle)
        .and_then(HeapValue::as_sequence)
        .cloned()
    else {
        return Ok(Scalar::Word(handle));
    };
    items.push(word_arg(args, 1));
    let heap = &call.state.heap;
    items.sort_by(|a, b| coerce_number(heap, *a).total_cmp(&coerce_number(heap, *b)));
    call.state.heap.bind(handle, HeapValue::Sequence(items));
    Ok(Scalar::Word(handle))
}

fn sequence_size(call: &mut HostCall<'_>, args: &[Scalar]) -> HostResult {
    Ok(Scalar::Word(sequence_len(call, word_arg(args, 0)).unwrap_or(0)))
}

fn sequence_is_empty(call: &mut HostCall<'_>, args: &[Scalar]) -> HostResult {
    Ok(Scalar::from_bool(sequence_len(call, word_arg(args, 0)) == Some(0)))
}

fn set_mut<'c>(call: &'c mut HostCall<'_>, handle: i64) -> Option<&'c mut IndexSet<i64>> {
    call.state.heap.get_mut(handle).and_then(HeapValue::as_set_mut)
}

fn set_len(call: &HostCall<'_>, handle: i64) -> Option<i64> {
    call.state
        .heap
        .get(handle)
        .and_then(HeapValue::as_set)
        .map(|items| items.len() as i64)
}
