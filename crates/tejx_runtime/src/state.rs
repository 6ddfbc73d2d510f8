use crate::heap::Heap;
use crate::word::Word;
use std::collections::{HashMap, HashSet};
use tracing::warn;

pub type OutputListener = Box<dyn FnMut(&str) + Send>;

/// Per-run host state: the heap, global slots, captured output and warnings.
///
/// One instance lives for exactly one execution and is dropped afterwards.
pub struct RuntimeState {
    pub heap: Heap,
    globals: HashMap<i64, Word>,
    output: String,
    listener: Option<OutputListener>,
    warned: HashSet<String>,
    warnings: Vec<String>,
    pub(crate) memory: Option<wasmtime::Memory>,
}

impl Default for RuntimeState {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeState {
    pub fn new() -> Self {
        Self {
            heap: Heap::new(),
            globals: HashMap::new(),
            output: String::new(),
            listener: None,
            warned: HashSet::new(),
            warnings: Vec::new(),
            memory: None,
        }
    }

    pub fn with_listener(listener: OutputListener) -> Self {
        let mut state = Self::new();
        state.listener = Some(listener);
        state
    }

    /// Appends a fragment to the output sink. No separators are added.
    pub fn emit(&mut self, fragment: &str) {
        self.output.push_str(fragment);
        if let Some(listener) = self.listener.as_mut() {
            listener(fragment);
        }
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn global(&self, index: i64) -> Word {
        self.globals.get(&index).copied().unwrap_or(0)
    }

    pub fn set_global(&mut self, index: i64, value: Word) {
        self.globals.insert(index, value);
    }

    /// Records `message` the first time `key` is seen in this run.
    pub fn warn_once(&mut self, key: &str, message: impl Into<String>) {
        if !self.warned.insert(key.to_string()) {
            return;
        }
        let message = message.into();
        warn!(key, "{message}");
        self.warnings.push(message);
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Linear memory of the instance this state is attached to, once known.
    pub fn memory(&self) -> Option<wasmtime::Memory> {
        self.memory
    }

    pub(crate) fn into_parts(self) -> (String, Vec<String>) {
        (self.output, self.warnings)
    }
}
