//! Satisfies a module's imports from an [`ImportTable`].
//!
//! Every function import is linked, known or not: names the table lacks get
//! the warn-once stub, so a module never fails to instantiate over a missing
//! host function. An imported linear memory is created on the host side.

use crate::abi::Scalar;
use crate::fault::HostFault;
use crate::imports::{HostCall, ImportTable};
use crate::state::RuntimeState;
use anyhow::Context;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::debug;
use wasmtime::{Caller, Extern, ExternType, Linker, Memory, MemoryType, Module, Store, ValType};

/// wasm page size in bytes.
pub const PAGE_SIZE: u64 = 64 * 1024;

pub fn link_imports(
    linker: &mut Linker<RuntimeState>,
    store: &mut Store<RuntimeState>,
    module: &Module,
    table: &ImportTable,
    initial_memory_pages: u32,
) -> anyhow::Result<()> {
    linker.allow_shadowing(true);
    for import in module.imports() {
        let (module_name, name) = (import.module(), import.name());
        match import.ty() {
            ExternType::Func(func_ty) => {
                let host = table.resolve(name);
                let result_types: Vec<ValType> = func_ty.results().collect();
                linker
                    .func_new(module_name, name, func_ty, move |mut caller, params, results| {
                        let args: Vec<Scalar> = params.iter().map(Scalar::from_val).collect();
                        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                            match module_memory(&mut caller) {
                                Some(memory) => {
                                    let (data, state) = memory.data_and_store_mut(&mut caller);
                                    host(&mut HostCall::new(state, data), &args)
                                }
                                None => host(&mut HostCall::new(caller.data_mut(), &[]), &args),
                            }
                        }));
                        let scalar = match outcome {
                            Ok(result) => result?,
                            Err(payload) => {
                                return Err(HostFault::Internal(panic_text(&*payload)).into())
                            }
                        };
                        for (slot, ty) in results.iter_mut().zip(&result_types) {
                            *slot = scalar.to_val(ty);
                        }
                        Ok(())
                    })
                    .with_context(|| format!("link error: {module_name}.{name}"))?;
            }
            ExternType::Memory(memory_ty) => {
                let memory = host_memory(store, &memory_ty, initial_memory_pages)?;
                linker
                    .define(&*store, module_name, name, memory)
                    .with_context(|| format!("link error: {module_name}.{name}"))?;
                store.data_mut().memory = Some(memory);
            }
            other => {
                debug!(module = module_name, name, ?other, "leaving import unlinked");
            }
        }
    }
    Ok(())
}

/// Records the module's own exported memory when no memory was imported.
pub fn adopt_exported_memory(store: &mut Store<RuntimeState>, instance: &wasmtime::Instance) {
    if store.data().memory.is_some() {
        return;
    }
    if let Some(memory) = instance.get_memory(&mut *store, "memory") {
        store.data_mut().memory = Some(memory);
    }
}

fn panic_text(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        return (*text).to_string();
    }
    if let Some(text) = payload.downcast_ref::<String>() {
        return text.clone();
    }
    "host function panicked".to_string()
}

fn module_memory(caller: &mut Caller<'_, RuntimeState>) -> Option<Memory> {
    if let Some(memory) = caller.data().memory {
        return Some(memory);
    }
    match caller.get_export("memory") {
        Some(Extern::Memory(memory)) => Some(memory),
        _ => None,
    }
}

fn host_memory(
    store: &mut Store<RuntimeState>,
    wanted: &MemoryType,
    initial_pages: u32,
) -> anyhow::Result<Memory> {
    let minimum = u32::try_from(wanted.minimum()).context("imported memory is too large")?;
    let maximum = wanted.maximum().and_then(|max| u32::try_from(max).ok());
    let mut pages = initial_pages.max(minimum);
    if let Some(maximum) = maximum {
        pages = pages.min(maximum);
    }
    debug!(pages, ?maximum, "creating host memory");
    Memory::new(&mut *store, MemoryType::new(pages, maximum)).context("failed to create memory")
}
