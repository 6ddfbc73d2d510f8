//! The external compiler, loaded as a wasm artifact and driven through its
//! exported call contract.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tejx_runtime::link::{adopt_exported_memory, link_imports};
use tejx_runtime::{fault_message, HostFault, ImportTable, RuntimeState, Scalar, StdlibMetadata};
use thiserror::Error;
use tracing::{debug, info, warn};
use wasmtime::{Engine, Instance, Linker, Memory, Module, Store, Val};

const ALLOC: &str = "tejx_alloc";
const COMPILE: &str = "tejx_compile";
const RESULT_LEN: &str = "tejx_get_result_len";
const METADATA: &str = "tejx_get_stdlib_metadata";
const METADATA_LEN: &str = "tejx_get_stdlib_metadata_len";

#[derive(Debug, Error)]
pub enum CompilerError {
    #[error("Not initialized")]
    NotInitialized,
    #[error("unable to read compiler '{}': {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to instantiate compiler: {0}")]
    Instantiate(String),
    #[error("compiler does not export '{0}'")]
    MissingExport(String),
    #[error("compiler call '{name}' failed: {message}")]
    Call { name: String, message: String },
    #[error("compiler buffer {ptr}+{len} lies outside its memory")]
    OutOfBounds { ptr: i64, len: i64 },
}

/// Source text in, raw result buffer out.
pub trait Compiler {
    /// The buffer holds an error report, module text, or a binary module.
    fn compile(
        &mut self,
        source: &str,
        file_name: &str,
        async_enabled: bool,
    ) -> Result<Vec<u8>, CompilerError>;

    /// Extra library modules the compiler advertised when it was loaded.
    fn stdlib_metadata(&self) -> Option<&StdlibMetadata> {
        None
    }

    /// Lines the compiler logged during its most recent call.
    fn logs(&self) -> Vec<String> {
        Vec::new()
    }
}

/// A loaded compiler instance. Its store and memory persist across calls.
pub struct WasmCompiler {
    store: Store<RuntimeState>,
    instance: Instance,
    memory: Memory,
    metadata: Option<StdlibMetadata>,
    logs: Arc<Mutex<Vec<String>>>,
}

impl WasmCompiler {
    pub fn load(path: &Path) -> Result<Self, CompilerError> {
        let bytes = std::fs::read(path).map_err(|source| CompilerError::Load {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), bytes = bytes.len(), "loading compiler");
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CompilerError> {
        let engine = Engine::default();
        let module = Module::new(&engine, bytes).map_err(instantiate_error)?;
        let logs = Arc::new(Mutex::new(Vec::new()));
        let table = compiler_imports(Arc::clone(&logs));
        let mut store = Store::new(&engine, RuntimeState::new());
        let mut linker = Linker::new(&engine);
        link_imports(&mut linker, &mut store, &module, &table, 0).map_err(instantiate_error)?;
        let instance = linker
            .instantiate(&mut store, &module)
            .map_err(instantiate_error)?;
        adopt_exported_memory(&mut store, &instance);
        let memory = store
            .data()
            .memory()
            .ok_or_else(|| CompilerError::MissingExport("memory".to_string()))?;
        let mut compiler = Self {
            store,
            instance,
            memory,
            metadata: None,
            logs,
        };
        compiler.metadata = compiler.read_metadata();
        info!("compiler initialized");
        Ok(compiler)
    }

    fn has_export(&mut self, name: &str) -> bool {
        self.instance.get_func(&mut self.store, name).is_some()
    }

    fn read_metadata(&mut self) -> Option<StdlibMetadata> {
        if !self.has_export(METADATA) || !self.has_export(METADATA_LEN) {
            return None;
        }
        let bytes = match self.metadata_bytes() {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(%err, "unable to read stdlib metadata");
                return None;
            }
        };
        match StdlibMetadata::from_json(&String::from_utf8_lossy(&bytes)) {
            Ok(metadata) => {
                info!(modules = metadata.0.len(), "stdlib metadata loaded");
                Some(metadata)
            }
            Err(err) => {
                warn!(%err, "failed to parse stdlib metadata");
                None
            }
        }
    }

    fn metadata_bytes(&mut self) -> Result<Vec<u8>, CompilerError> {
        let ptr = self.call_export(METADATA, &[])?.word();
        let len = self.call_export(METADATA_LEN, &[])?.word();
        self.read_memory(ptr, len)
    }

    /// Calls an export, coercing arguments to its declared parameter types.
    /// Returns the first result, or zero for a void export.
    fn call_export(&mut self, name: &str, args: &[Scalar]) -> Result<Scalar, CompilerError> {
        let func = self
            .instance
            .get_func(&mut self.store, name)
            .ok_or_else(|| CompilerError::MissingExport(name.to_string()))?;
        let ty = func.ty(&self.store);
        let params: Vec<Val> = ty
            .params()
            .enumerate()
            .map(|(idx, ty)| args.get(idx).copied().unwrap_or(Scalar::ZERO).to_val(&ty))
            .collect();
        let mut results: Vec<Val> = ty.results().map(|ty| Scalar::ZERO.to_val(&ty)).collect();
        func.call(&mut self.store, &params, &mut results)
            .map_err(|err| CompilerError::Call {
                name: name.to_string(),
                message: fault_message(&err),
            })?;
        Ok(results.first().map(Scalar::from_val).unwrap_or(Scalar::ZERO))
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<i64, CompilerError> {
        let len = bytes.len() as i64;
        let ptr = self.call_export(ALLOC, &[Scalar::Word(len)])?.word();
        let start = usize::try_from(ptr).map_err(|_| CompilerError::OutOfBounds { ptr, len })?;
        self.memory
            .write(&mut self.store, start, bytes)
            .map_err(|_| CompilerError::OutOfBounds { ptr, len })?;
        Ok(ptr)
    }

    fn read_memory(&self, ptr: i64, len: i64) -> Result<Vec<u8>, CompilerError> {
        let data = self.memory.data(&self.store);
        let range = usize::try_from(ptr)
            .ok()
            .zip(usize::try_from(len).ok())
            .and_then(|(start, len)| Some(start..start.checked_add(len)?))
            .filter(|range| range.end <= data.len());
        match range {
            Some(range) => Ok(data[range].to_vec()),
            None => Err(CompilerError::OutOfBounds { ptr, len }),
        }
    }
}

impl Compiler for WasmCompiler {
    fn compile(
        &mut self,
        source: &str,
        file_name: &str,
        async_enabled: bool,
    ) -> Result<Vec<u8>, CompilerError> {
        if let Ok(mut logs) = self.logs.lock() {
            logs.clear();
        }
        let source_ptr = self.write_bytes(source.as_bytes())?;
        let file_ptr = self.write_bytes(file_name.as_bytes())?;
        let result_ptr = self
            .call_export(
                COMPILE,
                &[
                    Scalar::Word(source_ptr),
                    Scalar::Word(source.len() as i64),
                    Scalar::Word(file_ptr),
                    Scalar::Word(file_name.len() as i64),
                    Scalar::from_bool(async_enabled),
                ],
            )?
            .word();
        let len = if self.has_export(RESULT_LEN) {
            self.call_export(RESULT_LEN, &[])?.word()
        } else {
            0
        };
        debug!(ptr = result_ptr, len, "compiler returned");
        self.read_memory(result_ptr, len)
    }

    fn stdlib_metadata(&self) -> Option<&StdlibMetadata> {
        self.metadata.as_ref()
    }

    fn logs(&self) -> Vec<String> {
        self.logs.lock().map(|logs| logs.clone()).unwrap_or_default()
    }
}

fn instantiate_error(err: anyhow::Error) -> CompilerError {
    CompilerError::Instantiate(format!("{err:#}"))
}

/// Host functions the compiler artifact itself imports.
fn compiler_imports(logs: Arc<Mutex<Vec<String>>>) -> ImportTable {
    let mut table = ImportTable::new();
    table.insert("compiler_log", move |call, args| {
        let ptr = args.first().map_or(0, |arg| arg.word());
        let len = args.get(1).map_or(0, |arg| arg.word());
        let line = memory_text(call.memory, ptr, len);
        debug!(target: "tejx_compiler", "{line}");
        if let Ok(mut logs) = logs.lock() {
            logs.push(line);
        }
        Ok(Scalar::ZERO)
    });
    table.insert("longjmp", |_call, _args| {
        Err(HostFault::Thrown("longjmp".to_string()))
    });
    table.insert("__cxa_throw", |_call, _args| {
        Err(HostFault::Thrown("exception".to_string()))
    });
    table.insert("proc_exit", |_call, args| {
        let code = args.first().map_or(0, |arg| arg.word());
        info!(code, "compiler exited");
        Ok(Scalar::ZERO)
    });
    for name in [
        "setjmp",
        "__cxa_allocate_exception",
        "__cxa_free_exception",
        "fd_write",
        "fd_close",
        "fd_seek",
        "fd_read",
        "environ_sizes_get",
        "environ_get",
        "clock_time_get",
    ] {
        table.insert(name, |_call, _args| Ok(Scalar::ZERO));
    }
    table
}

fn memory_text(memory: &[u8], ptr: i64, len: i64) -> String {
    let (Ok(start), Ok(len)) = (usize::try_from(ptr), usize::try_from(len)) else {
        return String::new();
    };
    let end = start.saturating_add(len).min(memory.len());
    memory
        .get(start..end)
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
        .unwrap_or_default()
}

/// Lazily loaded, explicitly torn down owner of the compiler instance.
pub struct CompilerService {
    path: PathBuf,
    compiler: Option<WasmCompiler>,
}

impl CompilerService {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            compiler: None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.compiler.is_some()
    }

    /// Loads the compiler on first use.
    pub fn ensure_ready(&mut self) -> Result<&mut WasmCompiler, CompilerError> {
        if self.compiler.is_none() {
            self.compiler = Some(WasmCompiler::load(&self.path)?);
        }
        self.compiler.as_mut().ok_or(CompilerError::NotInitialized)
    }

    pub fn shutdown(&mut self) {
        if self.compiler.take().is_some() {
            info!("compiler shut down");
        }
    }
}

impl Compiler for CompilerService {
    fn compile(
        &mut self,
        source: &str,
        file_name: &str,
        async_enabled: bool,
    ) -> Result<Vec<u8>, CompilerError> {
        self.ensure_ready()?.compile(source, file_name, async_enabled)
    }

    fn stdlib_metadata(&self) -> Option<&StdlibMetadata> {
        self.compiler.as_ref().and_then(Compiler::stdlib_metadata)
    }

    fn logs(&self) -> Vec<String> {
        self.compiler.as_ref().map(Compiler::logs).unwrap_or_default()
    }
}
