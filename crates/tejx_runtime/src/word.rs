//! Interpretation of the untyped 64-bit words that cross the module boundary.
//!
//! The compiled module's ABI does not tag its words. A word is either the
//! handle of a live heap entry or an encoded primitive, and the host cannot
//! tell which from the word alone. `resolve` is the only place that guesses;
//! everything else asks it. This is a known weakness of the boundary, kept
//! as-is rather than inferring intent beyond what the heap can observe.

use crate::heap::Heap;
use crate::value::HeapValue;

pub type Word = i64;

/// Words strictly inside this magnitude are read as plain integers.
pub const RAW_INT_LIMIT: Word = 1_000_000_000;

const FLOAT_MIN_MAGNITUDE: f64 = 1e-300;
const FLOAT_MAX_MAGNITUDE: f64 = 1e300;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolved<'a> {
    /// The word names a live heap entry.
    Live(&'a HeapValue),
    /// Small-magnitude integer payload.
    Int(i64),
    /// The word's bits read as a plausible finite double.
    Float(f64),
    /// None of the above; the integer itself is all we have.
    Opaque(i64),
}

pub fn resolve(heap: &Heap, word: Word) -> Resolved<'_> {
    if let Some(value) = heap.get(word) {
        return Resolved::Live(value);
    }
    if word > -RAW_INT_LIMIT && word < RAW_INT_LIMIT {
        return Resolved::Int(word);
    }
    let float = f64::from_bits(word as u64);
    let magnitude = float.abs();
    if float.is_finite() && magnitude > FLOAT_MIN_MAGNITUDE && magnitude < FLOAT_MAX_MAGNITUDE {
        return Resolved::Float(float);
    }
    Resolved::Opaque(word)
}

/// Integral values print without a fractional part; everything else uses the
/// shortest decimal form.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value}")
    }
}

/// Numeric view of a word. Values without a numeric reading become 0.
pub fn coerce_number(heap: &Heap, word: Word) -> f64 {
    match resolve(heap, word) {
        Resolved::Live(HeapValue::Number(value)) => *value,
        Resolved::Live(HeapValue::Boolean(value)) => f64::from(u8::from(*value)),
        Resolved::Live(HeapValue::String(text)) => text.trim().parse().unwrap_or(0.0),
        Resolved::Live(_) => 0.0,
        Resolved::Int(value) | Resolved::Opaque(value) => value as f64,
        Resolved::Float(value) => value,
    }
}

pub fn coerce_bool(heap: &Heap, word: Word) -> bool {
    match resolve(heap, word) {
        Resolved::Live(HeapValue::Boolean(value)) => *value,
        Resolved::Live(HeapValue::Number(value)) => *value != 0.0 && !value.is_nan(),
        Resolved::Live(HeapValue::String(text)) => !text.is_empty(),
        Resolved::Live(HeapValue::Null) => false,
        Resolved::Live(_) => true,
        Resolved::Int(value) | Resolved::Opaque(value) => value != 0,
        Resolved::Float(value) => value != 0.0,
    }
}
