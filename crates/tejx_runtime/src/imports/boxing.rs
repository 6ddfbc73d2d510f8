use super::{HostCall, HostResult, ImportTable};
use crate::abi::{float_arg, word_arg, Scalar};
use crate::render::render;
use crate::value::HeapValue;
use crate::word::{coerce_bool, coerce_number, resolve, Resolved};

pub(super) fn register(table: &mut ImportTable) {
    table.insert("rt_box_int", box_int);
    table.insert("rt_box_string", box_string);
    table.insert("rt_box_boolean", box_boolean);
    table.insert("rt_box_number", box_number);
    table.insert("rt_box_null", box_null);
    table.insert("rt_to_number", to_number);
    table.insert("rt_to_boolean", to_boolean);
    table.insert("rt_to_string", to_string);
    table.insert("rt_is_nullish", is_nullish);
    table.insert("rt_is_truthy", is_truthy);
    table.insert("rt_typeof", type_of);
    table.insert("rt_eq", |call, args| {
        let same = word_arg(args, 0) == word_arg(args, 1);
        Ok(Scalar::Word(call.state.heap.alloc_bool(same)))
    });
    table.insert("rt_ne", |call, args| {
        let differ = word_arg(args, 0) != word_arg(args, 1);
        Ok(Scalar::Word(call.state.heap.alloc_bool(differ)))
    });
    table.insert("rt_free", |call, args| {
        call.state.heap.free(word_arg(args, 0));
        Ok(Scalar::ZERO)
    });
}

fn box_int(call: &mut HostCall<'_>, args: &[Scalar]) -> HostResult {
    let value = word_arg(args, 0) as f64;
    Ok(Scalar::Word(call.state.heap.alloc_number(value)))
}

fn box_number(call: &mut HostCall<'_>, args: &[Scalar]) -> HostResult {
    let value = float_arg(args, 0);
    Ok(Scalar::Word(call.state.heap.alloc_number(value)))
}

fn box_boolean(call: &mut HostCall<'_>, args: &[Scalar]) -> HostResult {
    let value = word_arg(args, 0) != 0;
    Ok(Scalar::Word(call.state.heap.alloc_bool(value)))
}

fn box_null(call: &mut HostCall<'_>, _args: &[Scalar]) -> HostResult {
    Ok(Scalar::Word(call.state.heap.alloc(HeapValue::Null)))
}

/// Interns the string at `ptr`. An explicit length argument bounds the read;
/// otherwise the bytes run up to the first NUL.
fn box_string(call: &mut HostCall<'_>, args: &[Scalar]) -> HostResult {
    let ptr = word_arg(args, 0);
    let len = args.get(1).map(|arg| arg.word());
    let text = read_string(call.memory, ptr, len);
    Ok(Scalar::Word(call.state.heap.alloc_str(&text)))
}

pub(crate) fn read_string(memory: &[u8], ptr: i64, len: Option<i64>) -> String {
    let Ok(start) = usize::try_from(ptr) else {
        return String::new();
    };
    if start >= memory.len() {
        return String::new();
    }
    let tail = &memory[start..];
    let bytes = match len.and_then(|len| usize::try_from(len).ok()) {
        Some(len) => &tail[..len.min(tail.len())],
        None => {
            let end = tail.iter().position(|byte| *byte == 0).unwrap_or(tail.len());
            &tail[..end]
        }
    };
    String::from_utf8_lossy(bytes).into_owned()
}

fn to_number(call: &mut HostCall<'_>, args: &[Scalar]) -> HostResult {
    Ok(Scalar::Float(coerce_number(&call.state.heap, word_arg(args, 0))))
}

fn to_boolean(call: &mut HostCall<'_>, args: &[Scalar]) -> HostResult {
    Ok(Scalar::from_bool(coerce_bool(&call.state.heap, word_arg(args, 0))))
}

fn to_string(call: &mut HostCall<'_>, args: &[Scalar]) -> HostResult {
    let text = render(&call.state.heap, word_arg(args, 0));
    Ok(Scalar::Word(call.state.heap.alloc_str(&text)))
}

fn is_nullish(call: &mut HostCall<'_>, args: &[Scalar]) -> HostResult {
    let nullish = matches!(
        call.state.heap.get(word_arg(args, 0)),
        None | Some(HeapValue::Null)
    );
    Ok(Scalar::from_bool(nullish))
}

fn is_truthy(call: &mut HostCall<'_>, args: &[Scalar]) -> HostResult {
    let word = word_arg(args, 0);
    let truthy = call.state.heap.contains(word) && coerce_bool(&call.state.heap, word);
    Ok(Scalar::from_bool(truthy))
}

fn type_of(call: &mut HostCall<'_>, args: &[Scalar]) -> HostResult {
    let name = match resolve(&call.state.heap, word_arg(args, 0)) {
        Resolved::Live(value) => value.kind().type_name(),
        _ => "int32",
    };
    Ok(Scalar::Word(call.state.heap.alloc_str(name)))
}
