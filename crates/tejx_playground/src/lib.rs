//! The playground pipeline: hand source to the compiler, turn its result
//! buffer into a module, and run that module against the host runtime.

pub mod compiler;
pub mod config;
pub mod pipeline;

pub use compiler::{Compiler, CompilerError, CompilerService, WasmCompiler};
pub use config::{ConfigError, PlaygroundConfig};
pub use pipeline::{
    failure_output, run_buffer, run_buffer_with, split_output, CompilerResult, Playground,
};
