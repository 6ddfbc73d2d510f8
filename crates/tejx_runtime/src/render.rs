use crate::heap::Heap;
use crate::value::HeapValue;
use crate::word::{format_number, resolve, Resolved, Word};

/// Map keys that look like script object plumbing and are left out of output.
pub const RESERVED_KEYS: &[&str] = &["toString", "constructor"];

const MAX_DEPTH: usize = 32;

/// Display text for any word, live handle or raw payload.
pub fn render(heap: &Heap, word: Word) -> String {
    let mut out = String::new();
    render_into(heap, word, 0, &mut out);
    out
}

fn render_into(heap: &Heap, word: Word, depth: usize, out: &mut String) {
    match resolve(heap, word) {
        Resolved::Live(value) => render_value(heap, value, depth, out),
        Resolved::Int(value) | Resolved::Opaque(value) => out.push_str(&value.to_string()),
        Resolved::Float(value) => out.push_str(&format_number(value)),
    }
}

fn render_value(heap: &Heap, value: &HeapValue, depth: usize, out: &mut String) {
    match value {
        HeapValue::Number(value) => out.push_str(&format_number(*value)),
        HeapValue::Boolean(value) => out.push_str(if *value { "true" } else { "false" }),
        HeapValue::String(text) => out.push_str(text),
        HeapValue::Null => out.push_str("null"),
        HeapValue::Sequence(items) => {
            if depth >= MAX_DEPTH {
                out.push_str("[...]");
                return;
            }
            out.push('[');
            render_list(heap, items.iter().copied(), depth, out);
            out.push(']');
        }
        HeapValue::Map(entries) => {
            if depth >= MAX_DEPTH {
                out.push_str("{...}");
                return;
            }
            out.push_str("{ ");
            let mut first = true;
            for (key, value) in entries {
                if RESERVED_KEYS.contains(&key.as_str()) {
                    continue;
                }
                if !first {
                    out.push_str(", ");
                }
                first = false;
                out.push_str(key);
                out.push_str(": ");
                render_into(heap, *value, depth + 1, out);
            }
            out.push_str(" }");
        }
        HeapValue::Set(items) => {
            if depth >= MAX_DEPTH {
                out.push_str("Set(...)");
                return;
            }
            out.push_str("Set(");
            render_list(heap, items.iter().copied(), depth, out);
            out.push(')');
        }
        HeapValue::Trie(root) => {
            out.push_str(&format!("Trie({})", root.count()));
        }
    }
}

fn render_list(heap: &Heap, items: impl Iterator<Item = Word>, depth: usize, out: &mut String) {
    for (idx, item) in items.enumerate() {
        if idx > 0 {
            out.push_str(", ");
        }
        render_into(heap, item, depth + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::{IndexMap, IndexSet};

    #[test]
    fn renders_primitives() {
        let mut heap = Heap::new();
        let num = heap.alloc_number(4.0);
        let frac = heap.alloc_number(4.25);
        let yes = heap.alloc_bool(true);
        let text = heap.alloc_str("hi there");
        let null = heap.alloc(HeapValue::Null);
        assert_eq!(render(&heap, num), "4");
        assert_eq!(render(&heap, frac), "4.25");
        assert_eq!(render(&heap, yes), "true");
        assert_eq!(render(&heap, text), "hi there");
        assert_eq!(render(&heap, null), "null");
    }

    #[test]
    fn renders_raw_words() {
        let heap = Heap::new();
        assert_eq!(render(&heap, 17), "17");
        assert_eq!(render(&heap, 0), "0");
        assert_eq!(render(&heap, 1.5f64.to_bits() as i64), "1.5");
        assert_eq!(render(&heap, 3.0f64.to_bits() as i64), "3");
        let nan = f64::NAN.to_bits() as i64;
        assert_eq!(render(&heap, nan), nan.to_string());
    }

    #[test]
    fn renders_nested_sequences() {
        let mut heap = Heap::new();
        let label = heap.alloc_str("x");
        let inner = heap.alloc(HeapValue::Sequence(vec![1, label]));
        let outer = heap.alloc(HeapValue::Sequence(vec![inner, 3]));
        assert_eq!(render(&heap, outer), "[[1, x], 3]");
        let empty = heap.alloc(HeapValue::Sequence(Vec::new()));
        assert_eq!(render(&heap, empty), "[]");
    }

    #[test]
    fn renders_maps_without_reserved_keys() {
        let mut heap = Heap::new();
        let mut entries = IndexMap::new();
        entries.insert("a".to_string(), 1);
        entries.insert("constructor".to_string(), 2);
        entries.insert("b".to_string(), 5);
        let map = heap.alloc(HeapValue::Map(entries));
        assert_eq!(render(&heap, map), "{ a: 1, b: 5 }");
        let empty = heap.alloc(HeapValue::Map(IndexMap::new()));
        assert_eq!(render(&heap, empty), "{  }");
    }

    #[test]
    fn renders_sets() {
        let mut heap = Heap::new();
        let set = heap.alloc(HeapValue::Set(IndexSet::from([3, 1])));
        assert_eq!(render(&heap, set), "Set(3, 1)");
    }

    #[test]
    fn self_referencing_sequence_terminates() {
        let mut heap = Heap::new();
        let seq = heap.alloc(HeapValue::Sequence(Vec::new()));
        if let Some(items) = heap.get_mut(seq).and_then(HeapValue::as_sequence_mut) {
            items.push(seq);
        }
        let text = render(&heap, seq);
        assert!(text.starts_with("[["));
        assert!(text.contains("[...]"));
    }
}
