use super::ImportTable;
use crate::abi::Scalar;
use crate::word::coerce_number;

/// A host-side elementary function, classified by arity.
#[derive(Clone, Copy)]
pub(crate) enum MathFn {
    Nullary(fn() -> f64),
    Unary(fn(f64) -> f64),
    Binary(fn(f64, f64) -> f64),
    Variadic(fn(&[f64]) -> f64),
}

impl MathFn {
    /// Missing arguments read as 0.
    pub(crate) fn apply(self, args: &[f64]) -> f64 {
        let arg = |idx: usize| args.get(idx).copied().unwrap_or(0.0);
        match self {
            MathFn::Nullary(func) => func(),
            MathFn::Unary(func) => func(arg(0)),
            MathFn::Binary(func) => func(arg(0), arg(1)),
            MathFn::Variadic(func) => func(args),
        }
    }
}

/// Resolves a script-level math function name.
pub(crate) fn lookup(name: &str) -> Option<MathFn> {
    let func = match name {
        "random" => MathFn::Nullary(|| rand::random::<f64>()),
        "sqrt" => MathFn::Unary(f64::sqrt),
        "cbrt" => MathFn::Unary(f64::cbrt),
        "abs" => MathFn::Unary(f64::abs),
        "ceil" => MathFn::Unary(f64::ceil),
        "floor" => MathFn::Unary(f64::floor),
        "round" => MathFn::Unary(round_half_up),
        "trunc" => MathFn::Unary(f64::trunc),
        "sign" => MathFn::Unary(sign),
        "sin" => MathFn::Unary(f64::sin),
        "cos" => MathFn::Unary(f64::cos),
        "tan" => MathFn::Unary(f64::tan),
        "asin" => MathFn::Unary(f64::asin),
        "acos" => MathFn::Unary(f64::acos),
        "atan" => MathFn::Unary(f64::atan),
        "exp" => MathFn::Unary(f64::exp),
        "log" => MathFn::Unary(f64::ln),
        "log2" => MathFn::Unary(f64::log2),
        "log10" => MathFn::Unary(f64::log10),
        "pow" => MathFn::Binary(f64::powf),
        "atan2" => MathFn::Binary(f64::atan2),
        "hypot" => MathFn::Variadic(hypot),
        "min" => MathFn::Variadic(min),
        "max" => MathFn::Variadic(max),
        _ => return None,
    };
    Some(func)
}

pub(super) fn register(table: &mut ImportTable) {
    for name in [
        "min", "max", "abs", "round", "floor", "ceil", "pow", "sqrt", "sin", "cos",
    ] {
        install(table, &format!("rt_{name}"), name);
    }
    for name in [
        "sqrt", "sin", "cos", "pow", "abs", "ceil", "floor", "round", "random", "min", "max",
    ] {
        install(table, &format!("std_math_{name}"), name);
    }
}

/// Registers `import` as a boxed-number wrapper around the named function.
pub(crate) fn install(table: &mut ImportTable, import: &str, name: &str) {
    let Some(func) = lookup(name) else {
        return;
    };
    table.insert(import, move |call, args| {
        let values: Vec<f64> = args
            .iter()
            .map(|arg| coerce_number(&call.state.heap, arg.word()))
            .collect();
        let result = func.apply(&values);
        Ok(Scalar::Word(call.state.heap.alloc_number(result)))
    });
}

/// Halves round toward positive infinity: 2.5 -> 3, -2.5 -> -2.
fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

fn sign(value: f64) -> f64 {
    if value.is_nan() || value == 0.0 {
        value
    } else {
        value.signum()
    }
}

fn min(values: &[f64]) -> f64 {
    values
        .iter()
        .try_fold(f64::INFINITY, |acc, &value| (!value.is_nan()).then(|| acc.min(value)))
        .unwrap_or(f64::NAN)
}

fn max(values: &[f64]) -> f64 {
    values
        .iter()
        .try_fold(f64::NEG_INFINITY, |acc, &value| (!value.is_nan()).then(|| acc.max(value)))
        .unwrap_or(f64::NAN)
}

fn hypot(values: &[f64]) -> f64 {
    values.iter().map(|value| value * value).sum::<f64>().sqrt()
}
