//! Loading the target module.

use std::path::{Path, PathBuf};

use runmod_bytecode::{Module, ModuleError};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Module '{}' not found.", path.display())]
    NotFound { path: PathBuf },
    #[error("Can't load module '{}': {source}", path.display())]
    Rejected {
        path: PathBuf,
        #[source]
        source: ModuleError,
    },
}

/// The target module and the directory dependency lookups start from.
#[derive(Debug)]
pub struct LoadedModule {
    pub module: Module,
    pub path: PathBuf,
    pub base_dir: PathBuf,
}

pub fn load(path: &Path) -> Result<LoadedModule, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let module = Module::from_path(path).map_err(|source| LoadError::Rejected {
        path: path.to_path_buf(),
        source,
    })?;

    let full = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let base_dir = full
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    tracing::debug!(
        module = %module.name(),
        base_dir = %base_dir.display(),
        routines = module.routines().len(),
        "module loaded"
    );

    Ok(LoadedModule {
        module,
        path: full,
        base_dir,
    })
}
