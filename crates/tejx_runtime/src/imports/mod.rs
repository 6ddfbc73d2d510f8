//! Host import table: every function a compiled module may call.

mod arrays;
mod boxing;
mod collections;
mod io;
mod maps;
pub(crate) mod math;
mod strings;

use crate::abi::Scalar;
use crate::fault::HostFault;
use crate::state::RuntimeState;
use std::collections::HashMap;
use std::sync::Arc;

pub type HostResult = Result<Scalar, HostFault>;

/// Shared handle to a host function.
pub type HostFn = Arc<dyn Fn(&mut HostCall<'_>, &[Scalar]) -> HostResult + Send + Sync>;

/// What a host function sees while it runs: the run's state and a read-only
/// view of the module's linear memory.
pub struct HostCall<'a> {
    pub state: &'a mut RuntimeState,
    pub memory: &'a [u8],
}

impl<'a> HostCall<'a> {
    pub fn new(state: &'a mut RuntimeState, memory: &'a [u8]) -> Self {
        Self { state, memory }
    }
}

#[derive(Clone, Default)]
pub struct ImportTable {
    entries: HashMap<String, HostFn>,
}

impl ImportTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table holding the full built-in surface.
    pub fn with_core() -> Self {
        let mut table = Self::new();
        boxing::register(&mut table);
        strings::register(&mut table);
        arrays::register(&mut table);
        maps::register(&mut table);
        collections::register(&mut table);
        io::register(&mut table);
        math::register(&mut table);
        table
    }

    pub fn insert<F>(&mut self, name: impl Into<String>, func: F)
    where
        F: Fn(&mut HostCall<'_>, &[Scalar]) -> HostResult + Send + Sync + 'static,
    {
        self.entries.insert(name.into(), Arc::new(func));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<HostFn> {
        self.entries.get(name).cloned()
    }

    /// The registered function, or a stub that warns once and returns zero.
    pub fn resolve(&self, name: &str) -> HostFn {
        self.get(name).unwrap_or_else(|| stub(name))
    }

    pub fn invoke(&self, name: &str, call: &mut HostCall<'_>, args: &[Scalar]) -> HostResult {
        let func = self.resolve(name);
        func(call, args)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn host_fn<F>(func: F) -> HostFn
where
    F: Fn(&mut HostCall<'_>, &[Scalar]) -> HostResult + Send + Sync + 'static,
{
    Arc::new(func)
}

fn stub(name: &str) -> HostFn {
    let name = name.to_string();
    host_fn(move |call, _args| {
        call.state.warn_once(
            &format!("missing:{name}"),
            format!("missing runtime import '{name}', using stub"),
        );
        Ok(Scalar::ZERO)
    })
}
