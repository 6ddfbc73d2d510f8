use super::{HostCall, HostResult, ImportTable};
use crate::abi::{float_arg, word_arg, Scalar};
use crate::fault::HostFault;
use crate::render::render;
use crate::word::format_number;

pub(super) fn register(table: &mut ImportTable) {
    for name in ["print_raw", "rt_print_int", "rt_print_string"] {
        table.insert(name, print_word);
    }
    table.insert("rt_print_float", |call, args| {
        call.state.emit(&format_number(float_arg(args, 0)));
        Ok(Scalar::ZERO)
    });
    table.insert("print_space", |call, _args| {
        call.state.emit(" ");
        Ok(Scalar::ZERO)
    });
    table.insert("print_newline", |call, _args| {
        call.state.emit("\n");
        Ok(Scalar::ZERO)
    });

    // Structured handlers are resolved inside the module; the host only
    // needs to end the run on an uncaught throw.
    for name in ["tejx_get_exception", "tejx_push_handler", "tejx_pop_handler"] {
        table.insert(name, |_call, _args| Ok(Scalar::ZERO));
    }
    table.insert("tejx_throw", |call, args| {
        Err(HostFault::Thrown(render(&call.state.heap, word_arg(args, 0))))
    });
    table.insert("rt_div_zero_error", |_call, _args| Err(HostFault::DivisionByZero));

    table.insert("rt_get_global", |call, args| {
        Ok(Scalar::Word(call.state.global(word_arg(args, 0))))
    });
    table.insert("rt_set_global", |call, args| {
        let value = word_arg(args, 1);
        call.state.set_global(word_arg(args, 0), value);
        Ok(Scalar::Word(value))
    });
}

fn print_word(call: &mut HostCall<'_>, args: &[Scalar]) -> HostResult {
    let text = render(&call.state.heap, word_arg(args, 0));
    call.state.emit(&text);
    Ok(Scalar::ZERO)
}
