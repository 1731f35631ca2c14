//! Shared fixtures for engine tests.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use runmod_bytecode::{Module, RoutineId};

use crate::{Console, Dependency, ModuleResolver, ResolveError};

/// Assemble and load a module.
pub fn module(source: &str) -> Module {
    Module::from_bytes(runmod_asm::assemble(source).unwrap()).unwrap()
}

/// Id of the routine with the given qualified name.
pub fn routine(module: &Module, qualified: &str) -> RoutineId {
    module.find_routine(qualified).unwrap().id
}

/// Console that records everything in memory.
#[derive(Default)]
pub struct RecordingConsole {
    pub output: String,
    pub sleeps: Vec<Duration>,
    pub loaded: Vec<String>,
}

impl Console for RecordingConsole {
    fn print(&mut self, text: &str) -> io::Result<()> {
        self.output.push_str(text);
        self.output.push('\n');
        Ok(())
    }

    fn write(&mut self, text: &str) -> io::Result<()> {
        self.output.push_str(text);
        Ok(())
    }

    fn sleep(&mut self, duration: Duration) {
        self.sleeps.push(duration);
    }

    fn module_loaded(&mut self, module: &Module, _path: &Path) -> io::Result<()> {
        self.loaded.push(module.name().to_owned());
        Ok(())
    }
}

/// Resolver over assembler sources held in memory.
#[derive(Default)]
pub struct MapResolver {
    sources: HashMap<String, String>,
}

impl MapResolver {
    pub fn with(mut self, name: &str, source: &str) -> Self {
        self.sources.insert(name.to_owned(), source.to_owned());
        self
    }
}

impl ModuleResolver for MapResolver {
    fn resolve(&self, name: &str) -> Result<Dependency, ResolveError> {
        let path = PathBuf::from(format!("{name}.rmod"));
        match self.sources.get(name) {
            Some(source) => Ok(Dependency {
                module: module(source),
                path,
            }),
            None => Err(ResolveError::NotFound {
                name: name.to_owned(),
                path,
            }),
        }
    }
}
