use crate::value::HeapValue;
use crate::word::Word;
use std::collections::HashMap;

/// First handle handed out by a fresh heap.
///
/// Seeded well above any small integer a module is likely to pass across the
/// ABI so that a raw payload is not mistaken for a live handle.
pub const HEAP_FLOOR: Word = 200_000_000;

/// Highest handle `bind` will adopt. Larger `this` words get a fresh handle
/// so the allocation counter always has room above any bound handle.
pub const HEAP_CEILING: Word = Word::MAX / 2;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HeapStats {
    pub alloc_count: usize,
    pub interned_hits: usize,
    pub freed: usize,
    pub live: usize,
    pub peak_live: usize,
}

#[derive(Debug)]
pub struct Heap {
    values: HashMap<Word, HeapValue>,
    interned: HashMap<String, Word>,
    next: Word,
    stats: HeapStats,
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl Heap {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
            interned: HashMap::new(),
            next: HEAP_FLOOR,
            stats: HeapStats::default(),
        }
    }

    /// Boxes `value`, returning the live handle of an equal string if one exists.
    pub fn alloc(&mut self, value: HeapValue) -> Word {
        if let HeapValue::String(text) = &value {
            if let Some(&handle) = self.interned.get(text) {
                self.stats.interned_hits += 1;
                return handle;
            }
        }
        let handle = self.next;
        self.next = self.next.saturating_add(1);
        self.insert(handle, value);
        self.stats.alloc_count += 1;
        handle
    }

    pub fn alloc_str(&mut self, text: &str) -> Word {
        if let Some(&handle) = self.interned.get(text) {
            self.stats.interned_hits += 1;
            return handle;
        }
        self.alloc(HeapValue::String(text.to_string()))
    }

    pub fn alloc_number(&mut self, value: f64) -> Word {
        self.alloc(HeapValue::Number(value))
    }

    pub fn alloc_bool(&mut self, value: bool) -> Word {
        self.alloc(HeapValue::Boolean(value))
    }

    /// Rebinds `handle` to `value`, allocating a fresh handle when `handle`
    /// lies outside `HEAP_FLOOR..=HEAP_CEILING`.
    pub fn bind(&mut self, handle: Word, value: HeapValue) -> Word {
        if !(HEAP_FLOOR..=HEAP_CEILING).contains(&handle) {
            return self.alloc(value);
        }
        if let Some(old) = self.values.remove(&handle) {
            self.unindex(handle, &old);
            self.stats.live -= 1;
        }
        if handle >= self.next {
            self.next = handle + 1;
        }
        self.insert(handle, value);
        handle
    }

    pub fn get(&self, handle: Word) -> Option<&HeapValue> {
        if handle < HEAP_FLOOR {
            return None;
        }
        self.values.get(&handle)
    }

    pub fn get_mut(&mut self, handle: Word) -> Option<&mut HeapValue> {
        if handle < HEAP_FLOOR {
            return None;
        }
        match self.values.get_mut(&handle) {
            // Strings are immutable; handing out a mutable view would break interning.
            Some(HeapValue::String(_)) => None,
            other => other,
        }
    }

    pub fn contains(&self, handle: Word) -> bool {
        self.get(handle).is_some()
    }

    /// Removes `handle`. Freeing an unknown or already freed handle does nothing.
    pub fn free(&mut self, handle: Word) {
        if let Some(old) = self.values.remove(&handle) {
            self.unindex(handle, &old);
            self.stats.live -= 1;
            self.stats.freed += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn stats(&self) -> HeapStats {
        self.stats
    }

    fn insert(&mut self, handle: Word, value: HeapValue) {
        if let HeapValue::String(text) = &value {
            self.interned.entry(text.clone()).or_insert(handle);
        }
        self.values.insert(handle, value);
        self.stats.live += 1;
        if self.stats.live > self.stats.peak_live {
            self.stats.peak_live = self.stats.live;
        }
    }

    fn unindex(&mut self, handle: Word, old: &HeapValue) {
        if let HeapValue::String(text) = old {
            if self.interned.get(text) == Some(&handle) {
                self.interned.remove(text);
            }
        }
    }
}
