//! Host side of a compiled TejX program.
//!
//! A compiled module talks to the host through bare 64-bit words. This crate
//! owns the value heap those words name, the import table the module calls
//! into, and the wasmtime plumbing that links the two and runs an entry point.

pub mod abi;
pub mod exec;
pub mod fault;
pub mod heap;
pub mod imports;
pub mod link;
pub mod render;
pub mod state;
pub mod stdlib;
pub mod value;
pub mod word;

pub use abi::Scalar;
pub use exec::{run_module, run_module_with, RunOptions, RunOutcome};
pub use fault::{fault_message, HostFault};
pub use heap::{Heap, HeapStats, HEAP_FLOOR};
pub use imports::{host_fn, HostCall, HostFn, HostResult, ImportTable};
pub use render::render;
pub use state::{OutputListener, RuntimeState};
pub use stdlib::{register_stdlib, StdlibMetadata};
pub use value::{HeapValue, Trie, ValueKind};
pub use word::{resolve, Resolved, Word};
