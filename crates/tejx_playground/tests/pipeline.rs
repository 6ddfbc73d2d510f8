use std::sync::{Arc, Mutex};
use tejx_playground::{
    Compiler, CompilerError, CompilerService, Playground, PlaygroundConfig, WasmCompiler,
};
use tejx_runtime::{StdlibMetadata, HEAP_FLOOR};

/// Hands back a canned buffer regardless of the source it is given.
struct FakeCompiler {
    buffer: Vec<u8>,
    metadata: Option<StdlibMetadata>,
    seen: Vec<(String, String, bool)>,
}

impl FakeCompiler {
    fn returning(buffer: impl Into<Vec<u8>>) -> Self {
        Self {
            buffer: buffer.into(),
            metadata: None,
            seen: Vec::new(),
        }
    }
}

impl Compiler for FakeCompiler {
    fn compile(
        &mut self,
        source: &str,
        file_name: &str,
        async_enabled: bool,
    ) -> Result<Vec<u8>, CompilerError> {
        self.seen
            .push((source.to_string(), file_name.to_string(), async_enabled));
        Ok(self.buffer.clone())
    }

    fn stdlib_metadata(&self) -> Option<&StdlibMetadata> {
        self.metadata.as_ref()
    }
}

struct BrokenCompiler;

impl Compiler for BrokenCompiler {
    fn compile(&mut self, _: &str, _: &str, _: bool) -> Result<Vec<u8>, CompilerError> {
        Err(CompilerError::NotInitialized)
    }
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

fn playground(buffer: impl Into<Vec<u8>>) -> Playground<FakeCompiler> {
    Playground::new(FakeCompiler::returning(buffer), PlaygroundConfig::default())
}

#[test]
fn hello_program_prints_one_line() {
    let mut playground = playground(HELLO);
    let result = playground.compile("print(\"Hello\")");
    assert!(result.success, "{:?}", result.output);
    assert_eq!(result.output, ["Hello"]);
    assert!(result.binary.is_some());
    assert_eq!(
        playground.compiler().seen,
        [("print(\"Hello\")".to_string(), "playground.tx".to_string(), true)]
    );
}

#[test]
fn binary_buffers_run_without_assembly() {
    let binary = wat::parse_str(HELLO).unwrap();
    let mut playground = playground(binary);
    let result = playground.compile("");
    assert_eq!(result.output, ["Hello"]);
}

#[test]
fn division_by_zero_keeps_earlier_output() {
    let mut playground = playground(
        r#"(module
            (import "env" "rt_print_int" (func $print (param i64)))
            (import "env" "print_newline" (func $newline))
            (func (export "main")
                (call $print (i64.const 7))
                (call $newline)
                (drop (i64.div_s (i64.const 1) (i64.const 0)))))"#,
    );
    let result = playground.compile("");
    assert!(!result.success);
    assert_eq!(result.output, ["7", "Error: Division by zero"]);
    assert!(result.binary.is_none());
}

#[test]
fn structured_compile_error_is_the_only_line() {
    let mut playground =
        playground(r#"{"error":true,"message":"unexpected token","line":4}"#);
    let result = playground.compile("let = ;");
    assert!(!result.success);
    assert_eq!(result.output, ["[Line 4] unexpected token"]);
}

#[test]
fn undeclared_runtime_import_is_patched_in() {
    let mut playground = playground(
        r#"(module
            (import "env" "rt_print_float" (func $print (param f64)))
            (import "env" "rt_to_number" (func $num (param i64) (result f64)))
            (func (export "main")
                (call $print (call $num (call $std_math_sqrt (i64.const 16))))))"#,
    );
    let result = playground.compile("print(Math.sqrt(16))");
    assert!(result.success, "{:?}", result.output);
    assert_eq!(result.output, ["4"]);
}

#[test]
fn text_output_without_assembler_is_rejected() {
    let config = PlaygroundConfig {
        assembler: false,
        ..PlaygroundConfig::default()
    };
    let mut playground = Playground::new(FakeCompiler::returning(HELLO), config);
    let result = playground.compile("");
    assert!(!result.success);
    assert_eq!(result.output.len(), 1);
    assert!(result.output[0].starts_with("Compiler output WAT but no assembler"));
}

#[test]
fn sequences_render_as_bracketed_lists() {
    let mut playground = playground(
        r#"(module
            (import "env" "a_new" (func $new (result i64)))
            (import "env" "Array_push" (func $push (param i64 i64) (result i64)))
            (import "env" "print_raw" (func $print (param i64)))
            (func (export "main") (local $seq i64)
                (local.set $seq (call $new))
                (drop (call $push (local.get $seq) (i64.const 1)))
                (drop (call $push (local.get $seq) (i64.const 2)))
                (drop (call $push (local.get $seq) (i64.const 3)))
                (drop (call $push (local.get $seq) (i64.const 42)))
                (call $print (local.get $seq))))"#,
    );
    assert_eq!(playground.compile("").output, ["[1, 2, 3, 42]"]);
}

#[test]
fn advertised_stdlib_functions_are_linked() {
    let mut compiler = FakeCompiler::returning(
        r#"(module
            (import "env" "std_math_hypot" (func $hypot (param i64 i64) (result i64)))
            (import "env" "std_text_shout" (func $shout (param i64) (result i64)))
            (import "env" "print_raw" (func $print (param i64)))
            (func (export "main")
                (call $print (call $hypot (i64.const 3) (i64.const 4)))
                (drop (call $shout (i64.const 1)))))"#,
    );
    compiler.metadata =
        Some(StdlibMetadata::from_json(r#"{"math":{"hypot":{}},"text":{"shout":{}}}"#).unwrap());
    let mut playground = Playground::new(compiler, PlaygroundConfig::default());
    let result = playground.compile("");
    assert!(result.success, "{:?}", result.output);
    assert_eq!(result.output, ["5"]);
}

#[test]
fn each_compile_starts_from_a_fresh_runtime() {
    let mut playground = playground(format!(
        r#"(module
            (import "env" "rt_get_global" (func $get (param i64) (result i64)))
            (import "env" "rt_set_global" (func $set (param i64 i64) (result i64)))
            (import "env" "rt_box_int" (func $box (param i64) (result i64)))
            (import "env" "rt_print_int" (func $print (param i64)))
            (import "env" "print_newline" (func $newline))
            (memory (export "memory") 1)
            (func (export "main")
                (call $print (call $get (i64.const 1)))
                (call $newline)
                (drop (call $set (i64.const 1) (i64.const 99)))
                (call $print (i64.extend_i32_u
                    (i64.eq (call $box (i64.const 5)) (i64.const {HEAP_FLOOR}))))
                (call $newline)
                (call $print (i64.extend_i32_u (i32.load (i32.const 0))))
                (call $newline)
                (i32.store (i32.const 0) (i32.const 7))))"#
    ));
    let first = playground.compile("");
    assert_eq!(first.output, ["0", "1", "0"]);
    let second = playground.compile("");
    assert_eq!(second.output, ["0", "1", "0"]);
}

#[test]
fn out_of_range_words_do_not_bring_down_the_host() {
    let mut playground = playground(
        r#"(module
            (import "env" "a_new" (func $new (result i64)))
            (import "env" "a_set" (func $set (param i64 i64 i64) (result i64)))
            (import "env" "a_len" (func $len (param i64) (result i32)))
            (import "env" "rt_Stack_constructor" (func $stack (param i64) (result i64)))
            (import "env" "rt_print_int" (func $print (param i64)))
            (func (export "main") (local $seq i64)
                (local.set $seq (call $new))
                (drop (call $set (local.get $seq) (i64.const 9223372036854775807) (i64.const 1)))
                (call $print (i64.extend_i32_u (call $len (local.get $seq))))
                (drop (call $stack (i64.const 9223372036854775807)))))"#,
    );
    let result = playground.compile("");
    assert!(result.success, "{:?}", result.output);
    assert_eq!(result.output, ["0"]);
}

#[test]
fn compiler_failure_is_reported_as_an_error_line() {
    let mut playground = Playground::new(BrokenCompiler, PlaygroundConfig::default());
    let result = playground.compile("anything");
    assert!(!result.success);
    assert_eq!(result.output, ["Error: Not initialized"]);
}

#[test]
fn streaming_listener_sees_output() {
    let seen = Arc::new(Mutex::new(String::new()));
    let sink = Arc::clone(&seen);
    let mut playground = playground(HELLO);
    let result = playground.compile_streaming(
        "",
        Box::new(move |fragment| sink.lock().unwrap().push_str(fragment)),
    );
    assert_eq!(result.output, ["Hello"]);
    assert_eq!(*seen.lock().unwrap(), "Hello\n");
}

/// A stand-in compiler artifact that logs the file name and echoes the
/// source back as its result.
fn echo_compiler(metadata: &str) -> String {
    let escaped = metadata.replace('"', "\\\"");
    format!(
        r#"(module
            (import "env" "compiler_log" (func $log (param i32 i32)))
            (import "wasi_snapshot_preview1" "fd_write" (func $fd_write (param i32 i32 i32 i32) (result i32)))
            (memory (export "memory") 1)
            (global $next (mut i32) (i32.const 1024))
            (global $len (mut i32) (i32.const 0))
            (data (i32.const 0) "{escaped}")
            (func (export "tejx_alloc") (param $size i32) (result i32) (local $ptr i32)
                (local.set $ptr (global.get $next))
                (global.set $next (i32.add (global.get $next) (local.get $size)))
                (local.get $ptr))
            (func (export "tejx_compile")
                (param $src i32) (param $src_len i32) (param $file i32) (param $file_len i32) (param $async i32)
                (result i32)
                (call $log (local.get $file) (local.get $file_len))
                (global.set $len (local.get $src_len))
                (local.get $src))
            (func (export "tejx_get_result_len") (result i32) (global.get $len))
            (func (export "tejx_get_stdlib_metadata") (result i32) (i32.const 0))
            (func (export "tejx_get_stdlib_metadata_len") (result i32) (i32.const {len})))"#,
        len = metadata.len()
    )
}

#[test]
fn wasm_compiler_round_trips_through_its_memory() {
    let artifact = wat::parse_str(echo_compiler(r#"{"math":{"hypot":{}}}"#)).unwrap();
    let mut compiler = WasmCompiler::from_bytes(&artifact).unwrap();
    let metadata = compiler.stdlib_metadata().unwrap();
    assert_eq!(metadata.functions().count(), 1);
    let buffer = compiler.compile("(module)", "main.tx", false).unwrap();
    assert_eq!(buffer, b"(module)");
    assert_eq!(compiler.logs(), ["main.tx"]);
}

#[test]
fn compiler_service_loads_lazily_and_shuts_down() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tejxc_wasm.wasm");
    std::fs::write(&path, wat::parse_str(echo_compiler("{}")).unwrap()).unwrap();

    let mut service = CompilerService::new(&path);
    assert!(!service.is_ready());
    let config = PlaygroundConfig {
        compiler_path: path.clone(),
        ..PlaygroundConfig::default()
    };
    let mut playground = Playground::new(service, config);
    let result = playground.compile(HELLO);
    assert_eq!(result.output, ["Hello"]);
    assert!(playground.compiler().is_ready());
    assert_eq!(playground.compiler().logs(), ["playground.tx"]);

    service = CompilerService::new(&path);
    service.ensure_ready().unwrap();
    service.shutdown();
    assert!(!service.is_ready());
}
