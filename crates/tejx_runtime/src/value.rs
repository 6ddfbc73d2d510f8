use crate::word::Word;
use indexmap::{IndexMap, IndexSet};
use std::collections::BTreeMap;

/// A tagged value owned by the heap.
///
/// Container elements are raw words: a word may name another heap entry or
/// carry an unboxed primitive, and only rendering tells the two apart.
#[derive(Debug, Clone, PartialEq)]
pub enum HeapValue {
    Number(f64),
    Boolean(bool),
    String(String),
    Null,
    Sequence(Vec<Word>),
    Map(IndexMap<String, Word>),
    Set(IndexSet<Word>),
    Trie(Trie),
}

impl HeapValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            HeapValue::Number(_) => ValueKind::Number,
            HeapValue::Boolean(_) => ValueKind::Boolean,
            HeapValue::String(_) => ValueKind::String,
            HeapValue::Null => ValueKind::Null,
            HeapValue::Sequence(_) => ValueKind::Sequence,
            HeapValue::Map(_) => ValueKind::Map,
            HeapValue::Set(_) => ValueKind::Set,
            HeapValue::Trie(_) => ValueKind::Trie,
        }
    }

    pub(crate) fn as_sequence(&self) -> Option<&Vec<Word>> {
        match self {
            HeapValue::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub(crate) fn as_sequence_mut(&mut self) -> Option<&mut Vec<Word>> {
        match self {
            HeapValue::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub(crate) fn as_map(&self) -> Option<&IndexMap<String, Word>> {
        match self {
            HeapValue::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub(crate) fn as_map_mut(&mut self) -> Option<&mut IndexMap<String, Word>> {
        match self {
            HeapValue::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub(crate) fn as_set(&self) -> Option<&IndexSet<Word>> {
        match self {
            HeapValue::Set(items) => Some(items),
            _ => None,
        }
    }

    pub(crate) fn as_set_mut(&mut self) -> Option<&mut IndexSet<Word>> {
        match self {
            HeapValue::Set(items) => Some(items),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Number,
    Boolean,
    String,
    Null,
    Sequence,
    Map,
    Set,
    Trie,
}

impl ValueKind {
    /// Name reported by `rt_typeof`.
    pub fn type_name(self) -> &'static str {
        match self {
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Boolean => "boolean",
            ValueKind::Sequence => "array",
            ValueKind::Map | ValueKind::Null | ValueKind::Set | ValueKind::Trie => "object",
        }
    }
}

/// Prefix tree over chars. Nodes live in one flat arena so that depth never
/// turns into recursion, whether walking, comparing or dropping.
#[derive(Debug, Clone, PartialEq)]
pub struct Trie {
    nodes: Vec<TrieNode>,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct TrieNode {
    children: BTreeMap<char, usize>,
    is_end: bool,
    value: Word,
}

impl Default for Trie {
    fn default() -> Self {
        Self {
            nodes: vec![TrieNode::default()],
        }
    }
}

impl Trie {
    pub fn insert(&mut self, path: &str, value: Word) {
        let mut node = 0;
        for ch in path.chars() {
            node = match self.nodes[node].children.get(&ch) {
                Some(&child) => child,
                None => {
                    let child = self.nodes.len();
                    self.nodes.push(TrieNode::default());
                    self.nodes[node].children.insert(ch, child);
                    child
                }
            };
        }
        self.nodes[node].is_end = true;
        self.nodes[node].value = value;
    }

    pub fn find(&self, path: &str) -> Option<Word> {
        let mut node = 0;
        for ch in path.chars() {
            node = *self.nodes[node].children.get(&ch)?;
        }
        let node = &self.nodes[node];
        node.is_end.then_some(node.value)
    }

    /// Number of stored paths.
    pub fn count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_end).count()
    }
}
