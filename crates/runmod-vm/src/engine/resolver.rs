//! Lookup of dependency modules named by imports.

use std::path::{Path, PathBuf};

use runmod_bytecode::{Module, ModuleError};

/// Extension of compiled module files.
pub const MODULE_EXTENSION: &str = "rmod";

/// A dependency module and the file it came from.
#[derive(Debug)]
pub struct Dependency {
    pub module: Module,
    pub path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("module '{name}' not found at '{}'", path.display())]
    NotFound { name: String, path: PathBuf },
    #[error("can't load module '{name}' from '{}': {source}", path.display())]
    Rejected {
        name: String,
        path: PathBuf,
        #[source]
        source: ModuleError,
    },
}

/// Finds and loads a dependency module by name.
pub trait ModuleResolver {
    fn resolve(&self, name: &str) -> Result<Dependency, ResolveError>;
}

/// Looks up `<base_dir>/<name>.rmod`.
#[derive(Clone, Debug)]
pub struct DirectoryResolver {
    base_dir: PathBuf,
}

impl DirectoryResolver {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Path a module named `name` is expected at.
    pub fn module_path(&self, name: &str) -> PathBuf {
        self.base_dir.join(format!("{name}.{MODULE_EXTENSION}"))
    }
}

impl ModuleResolver for DirectoryResolver {
    fn resolve(&self, name: &str) -> Result<Dependency, ResolveError> {
        let path = self.module_path(name);
        tracing::debug!(module = %name, path = %path.display(), "resolving dependency");
        if !path.is_file() {
            return Err(ResolveError::NotFound {
                name: name.to_owned(),
                path,
            });
        }
        match Module::from_path(&path) {
            Ok(module) => Ok(Dependency { module, path }),
            Err(source) => Err(ResolveError::Rejected {
                name: name.to_owned(),
                path,
                source,
            }),
        }
    }
}
