//! Library functions advertised by the compiler at load time.
//!
//! The compiler may describe extra modules as `{ module: { function: hint } }`.
//! Every function not already provided by the import table gets a dispatcher
//! named `std_<module>_<function>`. Dispatch is decided by module: `math`
//! maps onto the host's elementary functions, `json` serializes and parses
//! heap values, and anything else reports once and returns 0.

use crate::abi::{word_arg, Scalar};
use crate::heap::Heap;
use crate::imports::{math, ImportTable};
use crate::render::{render, RESERVED_KEYS};
use crate::value::HeapValue;
use crate::word::{resolve, Resolved, Word, RAW_INT_LIMIT};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Number, Value};
use tracing::debug;

const MAX_JSON_DEPTH: usize = 32;

/// Module name to function name to the compiler's signature hint.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct StdlibMetadata(pub IndexMap<String, IndexMap<String, Value>>);

impl StdlibMetadata {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(text)
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(IndexMap::is_empty)
    }

    /// `(module, function)` pairs in declaration order.
    pub fn functions(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().flat_map(|(module, funcs)| {
            funcs.keys().map(move |func| (module.as_str(), func.as_str()))
        })
    }
}

/// Installs a dispatcher for every advertised function the table lacks.
/// Returns how many were added.
pub fn register_stdlib(table: &mut ImportTable, metadata: &StdlibMetadata) -> usize {
    let mut added = 0;
    for (module, func) in metadata.functions() {
        let import = format!("std_{module}_{func}");
        if table.contains(&import) {
            continue;
        }
        match (module, func) {
            ("math", name) if math::lookup(name).is_some() => {
                math::install(table, &import, name);
            }
            ("json", "stringify") => table.insert(import.as_str(), |call, args| {
                let text = to_json(&call.state.heap, word_arg(args, 0)).to_string();
                Ok(Scalar::Word(call.state.heap.alloc_str(&text)))
            }),
            ("json", "parse") => table.insert(import.as_str(), |call, args| {
                let text = render(&call.state.heap, word_arg(args, 0));
                match serde_json::from_str::<Value>(&text) {
                    Ok(value) => Ok(Scalar::Word(from_json(&mut call.state.heap, &value))),
                    Err(err) => {
                        debug!(%err, "json parse failed");
                        Ok(Scalar::ZERO)
                    }
                }
            }),
            _ => {
                let label = format!("{module}.{func}");
                table.insert(import.as_str(), move |call, _args| {
                    call.state.warn_once(
                        &format!("stdlib:{label}"),
                        format!("unhandled stdlib call: {label}"),
                    );
                    Ok(Scalar::ZERO)
                });
            }
        }
        added += 1;
    }
    added
}

/// Structural JSON view of a word.
pub fn to_json(heap: &Heap, word: Word) -> Value {
    word_to_json(heap, word, 0)
}

fn word_to_json(heap: &Heap, word: Word, depth: usize) -> Value {
    if depth > MAX_JSON_DEPTH {
        return Value::Null;
    }
    let value = match resolve(heap, word) {
        Resolved::Live(value) => value,
        Resolved::Int(raw) | Resolved::Opaque(raw) => return Value::from(raw),
        Resolved::Float(float) => return number_to_json(float),
    };
    match value {
        HeapValue::Number(number) => number_to_json(*number),
        HeapValue::Boolean(flag) => Value::Bool(*flag),
        HeapValue::String(text) => Value::String(text.clone()),
        HeapValue::Null | HeapValue::Trie(_) => Value::Null,
        HeapValue::Sequence(items) => Value::Array(
            items
                .iter()
                .map(|item| word_to_json(heap, *item, depth + 1))
                .collect(),
        ),
        HeapValue::Set(items) => Value::Array(
            items
                .iter()
                .map(|item| word_to_json(heap, *item, depth + 1))
                .collect(),
        ),
        HeapValue::Map(entries) => {
            let mut object = Map::new();
            for (key, item) in entries {
                if RESERVED_KEYS.contains(&key.as_str()) {
                    continue;
                }
                object.insert(key.clone(), word_to_json(heap, *item, depth + 1));
            }
            Value::Object(object)
        }
    }
}

fn number_to_json(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        return Value::from(value as i64);
    }
    Number::from_f64(value).map_or(Value::Null, Value::Number)
}

/// Boxes a parsed JSON value. The top level is always a fresh handle;
/// small integers nested inside containers are stored as raw words, the
/// way compiled code stores them.
pub fn from_json(heap: &mut Heap, value: &Value) -> Word {
    match value {
        Value::Number(number) => heap.alloc_number(number.as_f64().unwrap_or(0.0)),
        _ => element_from_json(heap, value),
    }
}

fn element_from_json(heap: &mut Heap, value: &Value) -> Word {
    match value {
        Value::Null => heap.alloc(HeapValue::Null),
        Value::Bool(flag) => heap.alloc_bool(*flag),
        Value::Number(number) => match number.as_i64() {
            Some(raw) if raw.abs() < RAW_INT_LIMIT => raw,
            _ => heap.alloc_number(number.as_f64().unwrap_or(0.0)),
        },
        Value::String(text) => heap.alloc_str(text),
        Value::Array(items) => {
            let words = items
                .iter()
                .map(|item| element_from_json(heap, item))
                .collect();
            heap.alloc(HeapValue::Sequence(words))
        }
        Value::Object(object) => {
            let entries = object
                .iter()
                .map(|(key, item)| (key.clone(), element_from_json(heap, item)))
                .collect();
            heap.alloc(HeapValue::Map(entries))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imports::test_support::Harness;

    fn metadata(text: &str) -> StdlibMetadata {
        StdlibMetadata::from_json(text).unwrap()
    }

    #[test]
    fn metadata_parses_nested_hints() {
        let meta = metadata(r#"{"math":{"tan":1,"hypot":"variadic"},"json":{"parse":1}}"#);
        let pairs: Vec<_> = meta.functions().collect();
        assert_eq!(pairs, [("math", "tan"), ("math", "hypot"), ("json", "parse")]);
        assert!(StdlibMetadata::from_json("  ").unwrap().is_empty());
        assert!(StdlibMetadata::from_json("[1]").is_err());
    }

    #[test]
    fn registers_only_missing_functions() {
        let mut h = Harness::new();
        let before = h.table.len();
        let meta = metadata(r#"{"math":{"sqrt":1,"tan":1}}"#);
        assert_eq!(register_stdlib(&mut h.table, &meta), 1);
        assert_eq!(h.table.len(), before + 1);
        let zero = h.call("rt_box_int", &[0]);
        let tan = h.call("std_math_tan", &[zero]);
        assert_eq!(h.render(tan), "0");
    }

    #[test]
    fn unknown_modules_warn_once_and_return_zero() {
        let mut h = Harness::new();
        let meta = metadata(r#"{"fs":{"readFile":1}}"#);
        register_stdlib(&mut h.table, &meta);
        assert_eq!(h.call("std_fs_readFile", &[1]), 0);
        assert_eq!(h.call("std_fs_readFile", &[1]), 0);
        assert_eq!(h.state.warnings(), ["unhandled stdlib call: fs.readFile"]);
    }

    #[test]
    fn json_stringify_renders_structure() {
        let mut h = Harness::new();
        register_stdlib(&mut h.table, &metadata(r#"{"json":{"stringify":1,"parse":1}}"#));
        let seq = h.call("a_new", &[]);
        let label = h.string("x");
        h.call("Array_push", &[seq, 1]);
        h.call("Array_push", &[seq, label]);
        let map = h.call("m_new", &[]);
        let key = h.string("items");
        h.call("m_set", &[map, key, seq]);
        let text = h.call("std_json_stringify", &[map]);
        assert_eq!(h.render(text), r#"{"items":[1,"x"]}"#);
    }

    #[test]
    fn json_parse_failure_is_handle_zero() {
        let mut h = Harness::new();
        register_stdlib(&mut h.table, &metadata(r#"{"json":{"parse":1}}"#));
        let bad = h.string("{not json");
        assert_eq!(h.call("std_json_parse", &[bad]), 0);
    }

    #[test]
    fn parse_then_stringify_round_trips() {
        let mut h = Harness::new();
        register_stdlib(&mut h.table, &metadata(r#"{"json":{"stringify":1,"parse":1}}"#));
        let source = r#"{"name":"Ada","tags":["a","b"],"n":3,"ratio":0.5,"ok":true,"none":null}"#;
        let input = h.string(source);
        let parsed = h.call("std_json_parse", &[input]);
        assert_eq!(
            h.render(parsed),
            "{ name: Ada, tags: [a, b], n: 3, ratio: 0.5, ok: true, none: null }"
        );
        let text = h.call("std_json_stringify", &[parsed]);
        assert_eq!(h.render(text), source);
    }

    #[test]
    fn top_level_numbers_are_boxed() {
        let mut heap = Heap::new();
        let word = from_json(&mut heap, &Value::from(7));
        assert_eq!(heap.get(word), Some(&HeapValue::Number(7.0)));
        assert_eq!(to_json(&heap, word), Value::from(7));
    }
}
