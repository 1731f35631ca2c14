//! Dependency modules loaded during invocation.

use std::collections::HashMap;

use runmod_bytecode::Module;

/// Module a frame executes in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Origin {
    /// The module passed to [`Vm::invoke`](super::Vm::invoke).
    Root,
    /// Index into the [`ModuleSet`].
    Dependency(usize),
}

/// Dependency modules by declared import name. Loaded once, kept for the
/// lifetime of the VM.
#[derive(Debug, Default)]
pub(crate) struct ModuleSet {
    loaded: Vec<Module>,
    by_name: HashMap<String, usize>,
}

impl ModuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<'a>(&'a self, root: &'a Module, origin: Origin) -> &'a Module {
        match origin {
            Origin::Root => root,
            Origin::Dependency(idx) => &self.loaded[idx],
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Origin> {
        self.by_name.get(name).copied().map(Origin::Dependency)
    }

    pub fn insert(&mut self, name: &str, module: Module) -> Origin {
        let idx = self.loaded.len();
        self.loaded.push(module);
        self.by_name.insert(name.to_owned(), idx);
        Origin::Dependency(idx)
    }

    pub fn len(&self) -> usize {
        self.loaded.len()
    }
}
