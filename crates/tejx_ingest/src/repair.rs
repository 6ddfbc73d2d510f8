//! Injects import declarations for host functions a textual module calls but
//! never declares.

use crate::patches::{RuntimePatch, RUNTIME_PATCHES};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static MODULE_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(module(?:\s+\$[\w$.]+)?").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repair {
    pub text: String,
    pub injected: Vec<&'static str>,
}

/// Adds `(import "env" ...)` for every catalog symbol that `text` references
/// as `$name` but does not define with `(func $name`. Declarations go right
/// after the module header so they precede every definition.
pub fn repair_module_text(text: &str) -> Repair {
    let missing: Vec<&'static RuntimePatch> = RUNTIME_PATCHES
        .iter()
        .filter(|patch| references(text, patch.name) && !defines(text, patch.name))
        .collect();
    let Some(header) = MODULE_HEADER.find(text).filter(|_| !missing.is_empty()) else {
        return Repair {
            text: text.to_string(),
            injected: Vec::new(),
        };
    };
    let mut repaired = String::with_capacity(text.len() + missing.len() * 64);
    repaired.push_str(&text[..header.end()]);
    for patch in &missing {
        debug!(import = patch.name, "injecting missing import");
        repaired.push(' ');
        repaired.push_str(&patch.import_decl());
    }
    repaired.push_str(&text[header.end()..]);
    Repair {
        text: repaired,
        injected: missing.iter().map(|patch| patch.name).collect(),
    }
}

/// True when `$name` occurs as a whole identifier.
fn references(text: &str, name: &str) -> bool {
    let needle = format!("${name}");
    text.match_indices(&needle)
        .any(|(at, _)| ends_identifier(text, at + needle.len()))
}

fn defines(text: &str, name: &str) -> bool {
    let needle = format!("${name}");
    text.match_indices("(func").any(|(at, _)| {
        let rest = text[at + "(func".len()..].trim_start();
        let offset = text.len() - rest.len();
        rest.starts_with(&needle) && ends_identifier(text, offset + needle.len())
    })
}

fn ends_identifier(text: &str, at: usize) -> bool {
    match text[at..].chars().next() {
        None => true,
        Some(ch) => ch.is_whitespace() || ch == '(' || ch == ')',
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injects_missing_std_import_after_header() {
        let text = "(module $prog (func $main (drop (call $std_math_sqrt (i64.const 16)))))";
        let repair = repair_module_text(text);
        assert_eq!(repair.injected, ["std_math_sqrt"]);
        assert!(repair.text.starts_with(
            r#"(module $prog (import "env" "std_math_sqrt" (func $std_math_sqrt (param i64) (result i64)))"#
        ));
        assert!(repair.text.ends_with("(func $main (drop (call $std_math_sqrt (i64.const 16)))))"));
        assert!(wat::parse_str(&repair.text).is_ok());
    }

    #[test]
    fn locally_defined_functions_are_left_alone() {
        let text = "(module (func $a_get (param i64 i64) (result i64) (local.get 0)) \
                    (func $main (drop (call $a_get (i64.const 1) (i64.const 2)))))";
        let repair = repair_module_text(text);
        assert!(repair.injected.is_empty());
        assert_eq!(repair.text, text);
    }

    #[test]
    fn already_imported_symbols_are_not_duplicated() {
        let text = r#"(module (import "env" "rt_str_len" (func $rt_str_len (param i64) (result i32)))
            (func $main (drop (call $rt_str_len (i64.const 0)))))"#;
        assert!(repair_module_text(text).injected.is_empty());
    }

    #[test]
    fn prefix_of_a_longer_name_is_not_a_reference() {
        let text = "(module (func $len_helper) (func $main (call $len_helper)))";
        assert!(repair_module_text(text).injected.is_empty());
    }

    #[test]
    fn several_imports_are_injected_in_catalog_order() {
        let text = "(module (func $main (local $m i64) \
                    (local.set $m (call $rt_Map_new)) \
                    (drop (call $rt_Map_set (local.get $m) (i64.const 1) (i64.const 2))) \
                    (call $rt_print_int (call $rt_Map_size (local.get $m)))))";
        let repair = repair_module_text(text);
        assert_eq!(
            repair.injected,
            ["rt_Map_new", "rt_Map_set", "rt_Map_size", "rt_print_int"]
        );
    }
}
