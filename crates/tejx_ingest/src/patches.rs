//! Host imports the repair pass knows how to declare.

use serde::Serialize;

/// A host import and the type half of its `func` declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RuntimePatch {
    pub name: &'static str,
    /// Params and results, e.g. `(param i64 i64) (result i64)`. Empty for `[] -> []`.
    pub signature: &'static str,
}

impl RuntimePatch {
    /// The `(import "env" ...)` declaration injected into a textual module.
    pub fn import_decl(&self) -> String {
        if self.signature.is_empty() {
            format!("(import \"env\" \"{0}\" (func ${0}))", self.name)
        } else {
            format!(
                "(import \"env\" \"{0}\" (func ${0} {1}))",
                self.name, self.signature
            )
        }
    }
}

const fn patch(name: &'static str, signature: &'static str) -> RuntimePatch {
    RuntimePatch { name, signature }
}

pub fn find(name: &str) -> Option<&'static RuntimePatch> {
    RUNTIME_PATCHES.iter().find(|patch| patch.name == name)
}

pub static RUNTIME_PATCHES: &[RuntimePatch] = &[
    // Map
    patch("rt_Map_new", "(result i64)"),
    patch("rt_Map_set", "(param i64 i64 i64) (result i64)"),
    patch("rt_Map_get", "(param i64 i64) (result i64)"),
    patch("rt_Map_has", "(param i64 i64) (result i32)"),
    patch("rt_Map_delete", "(param i64 i64) (result i32)"),
    patch("rt_Map_size", "(param i64) (result i32)"),
    // Conversion
    patch("rt_to_string", "(param i64) (result i64)"),
    patch("rt_to_number", "(param i64) (result f64)"),
    patch("rt_to_boolean", "(param i64) (result i32)"),
    // Object/Map accessors
    patch("m_get", "(param i64 i64) (result i64)"),
    patch("m_delete", "(param i64 i64) (result i32)"),
    // Array accessors
    patch("a_get", "(param i64 i64) (result i64)"),
    patch("a_set", "(param i64 i64 i64) (result i64)"),
    patch("a_len", "(param i64) (result i32)"),
    patch("a_pop", "(param i64) (result i64)"),
    // String
    patch("rt_str_concat", "(param i64 i64) (result i64)"),
    patch("rt_string_concat", "(param i64 i64) (result i64)"),
    patch("rt_concat", "(param i64 i64) (result i64)"),
    patch("rt_str_len", "(param i64) (result i32)"),
    patch("rt_str_eq", "(param i64 i64) (result i32)"),
    patch("rt_str_cmp", "(param i64 i64) (result i32)"),
    patch("rt_string_eq", "(param i64 i64) (result i64)"),
    patch("rt_string_length", "(param i64) (result i64)"),
    patch("rt_string_from_int", "(param i64) (result i64)"),
    patch("rt_string_from_float", "(param i64) (result i64)"),
    // Fast array ops
    patch("rt_array_get_fast", "(param i64 i64) (result i64)"),
    patch("rt_array_set_fast", "(param i64 i64 i64) (result i64)"),
    patch("rt_array_length", "(param i64) (result i64)"),
    patch("len", "(param i64) (result i64)"),
    // Print ops
    patch("rt_print_int", "(param i64)"),
    patch("rt_print_float", "(param f64)"),
    patch("rt_print_string", "(param i64)"),
    // Nullish / Truthy
    patch("rt_is_nullish", "(param i64) (result i32)"),
    patch("rt_is_truthy", "(param i64) (result i32)"),
    patch("rt_box_null", "(result i64)"),
    // Exception Handling
    patch("tejx_get_exception", "(result i64)"),
    patch("tejx_push_handler", "(param i64)"),
    patch("tejx_pop_handler", ""),
    patch("tejx_throw", "(param i64)"),
    // Comparison / typeof
    patch("rt_eq", "(param i64 i64) (result i64)"),
    patch("rt_ne", "(param i64 i64) (result i64)"),
    patch("rt_typeof", "(param i64) (result i64)"),
    // Math
    patch("rt_min", "(param i64 i64) (result i64)"),
    patch("rt_max", "(param i64 i64) (result i64)"),
    patch("rt_abs", "(param i64) (result i64)"),
    patch("rt_round", "(param i64) (result i64)"),
    patch("rt_floor", "(param i64) (result i64)"),
    patch("rt_ceil", "(param i64) (result i64)"),
    patch("rt_pow", "(param i64 i64) (result i64)"),
    patch("rt_sqrt", "(param i64) (result i64)"),
    patch("rt_sin", "(param i64) (result i64)"),
    patch("rt_cos", "(param i64) (result i64)"),
    // Globals
    patch("rt_get_global", "(param i64) (result i64)"),
    patch("rt_set_global", "(param i64 i64) (result i64)"),
    // Error
    patch("rt_div_zero_error", ""),
    // Collections - Stack
    patch("rt_Stack_constructor", "(param i64) (result i64)"),
    patch("rt_Stack_push", "(param i64 i64) (result i64)"),
    patch("rt_Stack_pop", "(param i64) (result i64)"),
    patch("rt_Stack_peek", "(param i64) (result i64)"),
    patch("rt_Stack_size", "(param i64) (result i64)"),
    patch("rt_Stack_isEmpty", "(param i64) (result i64)"),
    // Collections - Queue
    patch("rt_Queue_constructor", "(param i64) (result i64)"),
    patch("rt_Queue_enqueue", "(param i64 i64) (result i64)"),
    patch("rt_Queue_dequeue", "(param i64) (result i64)"),
    patch("rt_Queue_size", "(param i64) (result i64)"),
    patch("rt_Queue_isEmpty", "(param i64) (result i64)"),
    // Collections - MinHeap / PriorityQueue
    patch("rt_MinHeap_constructor", "(param i64) (result i64)"),
    patch("rt_MinHeap_insert", "(param i64 i64) (result i64)"),
    patch("rt_MinHeap_extractMin", "(param i64) (result i64)"),
    patch("rt_MinHeap_size", "(param i64) (result i64)"),
    patch("rt_MinHeap_isEmpty", "(param i64) (result i64)"),
    patch("rt_PriorityQueue_constructor", "(param i64) (result i64)"),
    patch("rt_PriorityQueue_insert", "(param i64 i64) (result i64)"),
    patch("rt_PriorityQueue_extractMin", "(param i64) (result i64)"),
    patch("rt_PriorityQueue_size", "(param i64) (result i64)"),
    patch("rt_PriorityQueue_isEmpty", "(param i64) (result i64)"),
    // Collections - Set
    patch("rt_Set_constructor", "(param i64) (result i64)"),
    patch("rt_Set_add", "(param i64 i64) (result i64)"),
    patch("rt_Set_has", "(param i64 i64) (result i64)"),
    patch("rt_Set_delete", "(param i64 i64) (result i64)"),
    patch("rt_Set_values", "(param i64) (result i64)"),
    patch("rt_Set_size", "(param i64) (result i64)"),
    patch("rt_Set_isEmpty", "(param i64) (result i64)"),
    // Collections - OrderedMap
    patch("rt_OrderedMap_constructor", "(param i64) (result i64)"),
    patch("rt_OrderedMap_put", "(param i64 i64 i64) (result i64)"),
    patch("rt_OrderedMap_at", "(param i64 i64) (result i64)"),
    patch("rt_OrderedMap_has", "(param i64 i64) (result i64)"),
    patch("rt_OrderedMap_size", "(param i64) (result i64)"),
    patch("rt_OrderedMap_isEmpty", "(param i64) (result i64)"),
    // Collections - OrderedSet
    patch("rt_OrderedSet_constructor", "(param i64) (result i64)"),
    patch("rt_OrderedSet_add", "(param i64 i64) (result i64)"),
    patch("rt_OrderedSet_has", "(param i64 i64) (result i64)"),
    patch("rt_OrderedSet_size", "(param i64) (result i64)"),
    patch("rt_OrderedSet_isEmpty", "(param i64) (result i64)"),
    // Collections - BloomFilter
    patch("rt_BloomFilter_constructor", "(param i64 i64 i64) (result i64)"),
    patch("rt_BloomFilter_add", "(param i64 i64) (result i64)"),
    patch("rt_BloomFilter_contains", "(param i64 i64) (result i64)"),
    // Collections - Trie
    patch("rt_Trie_constructor", "(param i64) (result i64)"),
    patch("rt_Trie_addPath", "(param i64 i64 i64) (result i64)"),
    patch("rt_Trie_find", "(param i64 i64) (result i64)"),
    // std:math
    patch("std_math_sqrt", "(param i64) (result i64)"),
    patch("std_math_sin", "(param i64) (result i64)"),
    patch("std_math_cos", "(param i64) (result i64)"),
    patch("std_math_pow", "(param i64 i64) (result i64)"),
    patch("std_math_abs", "(param i64) (result i64)"),
    patch("std_math_ceil", "(param i64) (result i64)"),
    patch("std_math_floor", "(param i64) (result i64)"),
    patch("std_math_round", "(param i64) (result i64)"),
    patch("std_math_random", "(result i64)"),
    patch("std_math_min", "(param i64 i64) (result i64)"),
    patch("std_math_max", "(param i64 i64) (result i64)"),
];
