use crate::abi::Scalar;
use crate::fault::fault_message;
use crate::imports::ImportTable;
use crate::link::{adopt_exported_memory, link_imports};
use crate::state::RuntimeState;
use anyhow::Context;
use serde::Serialize;
use tracing::{debug, info};
use wasmtime::{Engine, Linker, Module, Store, Val};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Export called after instantiation. A module without it runs only its
    /// start function.
    pub entry_point: String,
    pub initial_memory_pages: u32,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            entry_point: "main".to_string(),
            initial_memory_pages: 256,
        }
    }
}

/// Result of one execution. Output captured before a fault is kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunOutcome {
    pub output: String,
    pub fault: Option<String>,
    pub warnings: Vec<String>,
}

impl RunOutcome {
    pub fn ok(&self) -> bool {
        self.fault.is_none()
    }
}

pub fn run_module(binary: &[u8], table: &ImportTable, options: &RunOptions) -> RunOutcome {
    run_module_with(binary, table, options, RuntimeState::new())
}

/// Runs `binary` against `table` with a caller-provided state, typically one
/// carrying an output listener. The state is consumed: nothing outlives the run.
pub fn run_module_with(
    binary: &[u8],
    table: &ImportTable,
    options: &RunOptions,
    state: RuntimeState,
) -> RunOutcome {
    let engine = Engine::default();
    let mut store = Store::new(&engine, state);
    let result = execute(&engine, &mut store, binary, table, options);
    let stats = store.data().heap.stats();
    debug!(
        allocated = stats.alloc_count,
        live = stats.live,
        peak = stats.peak_live,
        "heap at exit"
    );
    let (output, warnings) = store.into_data().into_parts();
    let fault = result.err().map(|err| fault_message(&err));
    if let Some(fault) = &fault {
        info!(%fault, "run ended with a fault");
    }
    RunOutcome {
        output,
        fault,
        warnings,
    }
}

fn execute(
    engine: &Engine,
    store: &mut Store<RuntimeState>,
    binary: &[u8],
    table: &ImportTable,
    options: &RunOptions,
) -> anyhow::Result<()> {
    let module = Module::new(engine, binary).context("invalid module")?;
    let mut linker = Linker::new(engine);
    link_imports(&mut linker, store, &module, table, options.initial_memory_pages)?;
    let instance = linker.instantiate(&mut *store, &module)?;
    adopt_exported_memory(store, &instance);

    let Some(entry) = instance.get_func(&mut *store, &options.entry_point) else {
        debug!(entry = %options.entry_point, "entry point not exported");
        return Ok(());
    };
    let ty = entry.ty(&*store);
    let params: Vec<Val> = ty.params().map(|ty| Scalar::ZERO.to_val(&ty)).collect();
    let mut results: Vec<Val> = ty.results().map(|ty| Scalar::ZERO.to_val(&ty)).collect();
    entry.call(&mut *store, &params, &mut results)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn run(text: &str) -> RunOutcome {
        let binary = wat::parse_str(text).unwrap();
        run_module(&binary, &ImportTable::with_core(), &RunOptions::default())
    }

    const HELLO: &str = r#"(module
        (import "env" "memory" (memory 1))
        (import "env" "rt_box_string" (func $box (param i64) (result i64)))
        (import "env" "print_raw" (func $print (param i64)))
        (import "env" "print_newline" (func $newline))
        (data (i32.const 16) "Hello\00")
        (func (export "main")
            (call $print (call $box (i64.const 16)))
            (call $newline)))"#;

    #[test]
    fn prints_boxed_string_from_memory() {
        let outcome = run(HELLO);
        assert!(outcome.ok(), "{:?}", outcome.fault);
        assert_eq!(outcome.output, "Hello\n");
    }

    #[test]
    fn listener_sees_fragments_as_they_are_emitted() {
        let seen = Arc::new(Mutex::new(String::new()));
        let sink = Arc::clone(&seen);
        let state = RuntimeState::with_listener(Box::new(move |fragment| {
            sink.lock().unwrap().push_str(fragment);
        }));
        let binary = wat::parse_str(HELLO).unwrap();
        let outcome =
            run_module_with(&binary, &ImportTable::with_core(), &RunOptions::default(), state);
        assert_eq!(outcome.output, "Hello\n");
        assert_eq!(*seen.lock().unwrap(), "Hello\n");
    }

    #[test]
    fn sequence_built_by_module_renders() {
        let outcome = run(r#"(module
            (import "env" "a_new" (func $new (result i64)))
            (import "env" "Array_push" (func $push (param i64 i64) (result i64)))
            (import "env" "print_raw" (func $print (param i64)))
            (func (export "main") (local $seq i64)
                (local.set $seq (call $new))
                (drop (call $push (local.get $seq) (i64.const 1)))
                (drop (call $push (local.get $seq) (i64.const 2)))
                (drop (call $push (local.get $seq) (i64.const 3)))
                (drop (call $push (local.get $seq) (i64.const 42)))
                (call $print (local.get $seq))))"#);
        assert!(outcome.ok());
        assert_eq!(outcome.output, "[1, 2, 3, 42]");
    }

    #[test]
    fn integer_division_trap_is_reported() {
        let outcome = run(r#"(module
            (import "env" "rt_print_int" (func $print (param i64)))
            (func (export "main")
                (call $print (i64.const 7))
                (drop (i64.div_s (i64.const 1) (i64.const 0)))))"#);
        assert_eq!(outcome.output, "7");
        assert_eq!(outcome.fault.as_deref(), Some("Division by zero"));
    }

    #[test]
    fn thrown_exception_ends_the_run() {
        let outcome = run(r#"(module
            (import "env" "memory" (memory 1))
            (import "env" "rt_box_string" (func $box (param i64) (result i64)))
            (import "env" "tejx_throw" (func $throw (param i64)))
            (data (i32.const 0) "bad input\00")
            (func (export "main")
                (call $throw (call $box (i64.const 0)))))"#);
        assert_eq!(outcome.fault.as_deref(), Some("Exception: bad input"));
    }

    #[test]
    fn missing_import_is_stubbed_with_a_warning() {
        let outcome = run(r#"(module
            (import "env" "rt_mystery" (func $mystery (param i64) (result i64)))
            (import "env" "rt_print_int" (func $print (param i64)))
            (func (export "main")
                (call $print (call $mystery (i64.const 5)))
                (call $print (call $mystery (i64.const 6)))))"#);
        assert!(outcome.ok());
        assert_eq!(outcome.output, "00");
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("rt_mystery"));
    }

    #[test]
    fn module_without_entry_point_runs_cleanly() {
        let outcome = run(r#"(module (func (export "helper")))"#);
        assert!(outcome.ok());
        assert!(outcome.output.is_empty());
    }

    #[test]
    fn exported_memory_backs_string_boxing() {
        let outcome = run(r#"(module
            (import "env" "rt_box_string" (func $box (param i64) (result i64)))
            (import "env" "print_raw" (func $print (param i64)))
            (memory (export "memory") 1)
            (data (i32.const 8) "own\00")
            (func (export "main")
                (call $print (call $box (i64.const 8)))))"#);
        assert_eq!(outcome.output, "own");
    }

    #[test]
    fn float_results_cross_the_boundary() {
        let outcome = run(r#"(module
            (import "env" "rt_box_int" (func $box (param i64) (result i64)))
            (import "env" "rt_to_number" (func $num (param i64) (result f64)))
            (import "env" "rt_print_float" (func $print (param f64)))
            (func (export "main")
                (call $print (f64.mul (call $num (call $box (i64.const 3))) (f64.const 0.5)))))"#);
        assert_eq!(outcome.output, "1.5");
    }

    #[test]
    fn invalid_binary_is_a_fault() {
        let outcome = run_module(b"\0asm\x01", &ImportTable::with_core(), &RunOptions::default());
        assert!(!outcome.ok());
    }
}
