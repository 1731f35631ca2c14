use std::fs;

use runmod_bytecode::ModuleError;

use super::{DirectoryResolver, ModuleResolver, ResolveError};

const HELPERS: &str = include_str!("../../../../demos/helpers.rasm");

#[test]
fn finds_module_next_to_base_dir() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Helpers.rmod");
    fs::write(&path, runmod_asm::assemble(HELPERS).unwrap()).unwrap();
    let resolver = DirectoryResolver::new(dir.path());

    let dep = resolver.resolve("Helpers").unwrap();

    assert_eq!(dep.path, path);
    assert_eq!(dep.module.name(), "Helpers");
    assert!(dep.module.find_routine("Helpers.Text.Shout").is_some());
}

#[test]
fn missing_module() {
    let dir = tempfile::tempdir().unwrap();
    let resolver = DirectoryResolver::new(dir.path());

    let err = resolver.resolve("Nowhere").unwrap_err();

    let ResolveError::NotFound { name, path } = err else {
        panic!("expected NotFound");
    };
    assert_eq!(name, "Nowhere");
    assert_eq!(path, dir.path().join("Nowhere.rmod"));
}

#[test]
fn rejected_module() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("Broken.rmod"), b"not a module").unwrap();
    let resolver = DirectoryResolver::new(dir.path());

    let err = resolver.resolve("Broken").unwrap_err();

    assert!(matches!(
        err,
        ResolveError::Rejected {
            source: ModuleError::FileTooSmall(12),
            ..
        }
    ));
    assert!(err.to_string().starts_with("can't load module 'Broken' from '"));
}

#[test]
fn module_path_uses_extension() {
    let resolver = DirectoryResolver::new("/opt/mods");

    assert_eq!(resolver.base_dir().to_str(), Some("/opt/mods"));
    assert_eq!(
        resolver.module_path("Helpers").to_str(),
        Some("/opt/mods/Helpers.rmod")
    );
}
