use super::{HostCall, HostResult, ImportTable};
use crate::abi::{word_arg, Scalar};
use crate::render::render;
use crate::word::format_number;
use std::cmp::Ordering;

pub(super) fn register(table: &mut ImportTable) {
    for name in ["rt_str_concat", "rt_string_concat", "rt_concat"] {
        table.insert(name, concat);
    }
    table.insert("rt_str_len", |call, args| {
        Ok(Scalar::Word(text_len(call, word_arg(args, 0))))
    });
    table.insert("rt_string_length", |call, args| {
        let len = text_len(call, word_arg(args, 0));
        Ok(Scalar::Word(call.state.heap.alloc_number(len as f64)))
    });
    table.insert("rt_str_eq", |call, args| {
        Ok(Scalar::from_bool(compare(call, args) == Ordering::Equal))
    });
    table.insert("rt_string_eq", |call, args| {
        let equal = compare(call, args) == Ordering::Equal;
        Ok(Scalar::Word(call.state.heap.alloc_bool(equal)))
    });
    table.insert("rt_str_cmp", |call, args| {
        let order = match compare(call, args) {
            Ordering::Less => -1,
            Ordering::Equal => 0,
            Ordering::Greater => 1,
        };
        Ok(Scalar::Word(order))
    });
    table.insert("rt_string_from_int", |call, args| {
        let text = word_arg(args, 0).to_string();
        Ok(Scalar::Word(call.state.heap.alloc_str(&text)))
    });
    table.insert("rt_string_from_float", string_from_float);
}

/// Concatenates the display text of both operands.
fn concat(call: &mut HostCall<'_>, args: &[Scalar]) -> HostResult {
    let mut text = render(&call.state.heap, word_arg(args, 0));
    text.push_str(&render(&call.state.heap, word_arg(args, 1)));
    Ok(Scalar::Word(call.state.heap.alloc_str(&text)))
}

fn text_len(call: &HostCall<'_>, word: i64) -> i64 {
    render(&call.state.heap, word).chars().count() as i64
}

fn compare(call: &HostCall<'_>, args: &[Scalar]) -> Ordering {
    let left = render(&call.state.heap, word_arg(args, 0));
    let right = render(&call.state.heap, word_arg(args, 1));
    left.cmp(&right)
}

// The argument carries the bits of a double in an integer word.
fn string_from_float(call: &mut HostCall<'_>, args: &[Scalar]) -> HostResult {
    let value = match args.first() {
        Some(Scalar::Float(value)) => *value,
        Some(Scalar::Word(bits)) => f64::from_bits(*bits as u64),
        None => 0.0,
    };
    let text = format_number(value);
    Ok(Scalar::Word(call.state.heap.alloc_str(&text)))
}
