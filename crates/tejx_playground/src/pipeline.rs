use crate::compiler::Compiler;
use crate::config::PlaygroundConfig;
use serde::Serialize;
use tejx_ingest::{ingest, Assembler, NoAssembler, WatAssembler};
use tejx_runtime::{
    register_stdlib, run_module_with, ImportTable, OutputListener, RuntimeState, StdlibMetadata,
};
use tracing::{debug, error, info};

/// What the caller of a playground compile sees.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompilerResult {
    pub output: Vec<String>,
    pub success: bool,
    /// The module that ran, when ingestion got that far.
    #[serde(skip)]
    pub binary: Option<Vec<u8>>,
}

impl CompilerResult {
    fn failure(output: Vec<String>) -> Self {
        Self {
            output,
            success: false,
            binary: None,
        }
    }
}

/// Splits captured output into lines, dropping the empty line a final
/// line feed would leave behind. A run that printed nothing has no lines.
pub fn split_output(buffer: &str) -> Vec<String> {
    if buffer.is_empty() {
        return Vec::new();
    }
    let mut lines: Vec<String> = buffer.split('\n').map(str::to_string).collect();
    if buffer.ends_with('\n') {
        lines.pop();
    }
    lines
}

/// Output printed before a fault, minus blank lines, then the fault itself.
pub fn failure_output(buffer: &str, message: &str) -> Vec<String> {
    buffer
        .split('\n')
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .chain(std::iter::once(format!("Error: {message}")))
        .collect()
}

/// Ingests a compiler result buffer and runs it with a fresh runtime.
pub fn run_buffer(
    buffer: &[u8],
    metadata: Option<&StdlibMetadata>,
    config: &PlaygroundConfig,
) -> CompilerResult {
    run_buffer_with(buffer, metadata, config, RuntimeState::new())
}

pub fn run_buffer_with(
    buffer: &[u8],
    metadata: Option<&StdlibMetadata>,
    config: &PlaygroundConfig,
    state: RuntimeState,
) -> CompilerResult {
    let assembler: &dyn Assembler = if config.assembler {
        &WatAssembler
    } else {
        &NoAssembler
    };
    let ingested = match ingest(buffer, assembler) {
        Ok(ingested) => ingested,
        Err(err) => {
            info!(code = err.code(), %err, "compile rejected");
            return CompilerResult::failure(vec![err.to_string()]);
        }
    };
    let mut table = ImportTable::with_core();
    if let Some(metadata) = metadata {
        let added = register_stdlib(&mut table, metadata);
        debug!(added, "registered stdlib imports");
    }
    let outcome = run_module_with(&ingested.binary, &table, &config.run_options(), state);
    match outcome.fault {
        None => CompilerResult {
            output: split_output(&outcome.output),
            success: true,
            binary: Some(ingested.binary),
        },
        Some(fault) => CompilerResult::failure(failure_output(&outcome.output, &fault)),
    }
}

/// Source text to program output: compile, ingest, link, run.
pub struct Playground<C> {
    compiler: C,
    config: PlaygroundConfig,
}

impl<C: Compiler> Playground<C> {
    pub fn new(compiler: C, config: PlaygroundConfig) -> Self {
        Self { compiler, config }
    }

    pub fn config(&self) -> &PlaygroundConfig {
        &self.config
    }

    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    pub fn compiler_mut(&mut self) -> &mut C {
        &mut self.compiler
    }

    pub fn compile(&mut self, source: &str) -> CompilerResult {
        self.compile_with(source, RuntimeState::new())
    }

    /// Like [`Playground::compile`], also streaming each output fragment.
    pub fn compile_streaming(&mut self, source: &str, listener: OutputListener) -> CompilerResult {
        self.compile_with(source, RuntimeState::with_listener(listener))
    }

    fn compile_with(&mut self, source: &str, state: RuntimeState) -> CompilerResult {
        let buffer = match self.compiler.compile(
            source,
            &self.config.file_name,
            self.config.async_enabled,
        ) {
            Ok(buffer) => buffer,
            Err(err) => {
                error!(%err, "compiler call failed");
                return CompilerResult::failure(vec![format!("Error: {err}")]);
            }
        };
        debug!(bytes = buffer.len(), "compiler produced a result buffer");
        run_buffer_with(&buffer, self.compiler.stdlib_metadata(), &self.config, state)
    }
}
