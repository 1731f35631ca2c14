use crate::test_utils::{library_bytes, library_module, reseal};

use super::module::{ByteStorage, Module, ModuleError};
use super::{HEADER_SIZE, Header, RoutineId, StringId, ValueType, Visibility};

fn edit_header(bytes: &mut [u8], f: impl FnOnce(&mut Header)) {
    let mut header = Header::from_bytes(&bytes[..HEADER_SIZE]);
    f(&mut header);
    bytes[..HEADER_SIZE].copy_from_slice(&header.to_bytes());
}

#[test]
fn byte_storage_from_vec() {
    let storage = ByteStorage::from_vec(vec![1, 2, 3, 4, 5]);

    assert_eq!(&*storage, &[1, 2, 3, 4, 5]);
    assert_eq!(storage.len(), 5);
    assert_eq!(storage[2], 3);
}

#[test]
fn module_error_display() {
    let err = ModuleError::InvalidMagic;
    assert_eq!(err.to_string(), "invalid magic: expected RMOD");

    let err = ModuleError::UnsupportedVersion(99);
    assert!(err.to_string().contains("99"));

    let err = ModuleError::FileTooSmall(32);
    assert!(err.to_string().contains("32"));

    let err = ModuleError::SizeMismatch {
        header: 100,
        actual: 50,
    };
    assert!(err.to_string().contains("100"));
    assert!(err.to_string().contains("50"));
}

#[test]
fn load_builds_descriptors() {
    let module = library_module();

    assert_eq!(module.name(), "TestLibrary");
    assert_eq!(module.entry(), None);
    assert_eq!(module.types().len(), 2);
    assert_eq!(module.types()[0].full_name(), "TestLibrary.ClassNumberOne");
    assert_eq!(module.types()[1].routines, vec![RoutineId(1)]);

    let r = module.routine(RoutineId(0));
    assert_eq!(r.qualified_name(), "TestLibrary.ClassNumberOne.ArgumentMoreThanFour");
    assert_eq!(r.return_type, ValueType::Boolean);
    assert_eq!(r.visibility, Visibility::Public);
    assert!(r.is_static);
    assert_eq!(r.params.len(), 1);
    assert_eq!(r.params[0].name, "args");
    assert_eq!(r.params[0].ty, ValueType::StringArray);

    let r = module.routine(RoutineId(1));
    assert_eq!(r.declaring_type(), "TestLibrary.ClassTwo");
    assert_eq!(r.return_type, ValueType::Void);
    assert!(r.first_param().is_none());
}

#[test]
fn find_routine_is_exact() {
    let module = library_module();

    let found = module.find_routine("TestLibrary.ClassTwo.DisplaySomethingOnScreen");
    assert_eq!(found.map(|r| r.id), Some(RoutineId(1)));
    assert!(module.find_routine("testlibrary.classtwo.displaysomethingonscreen").is_none());
    assert!(module.find_routine("DisplaySomethingOnScreen").is_none());
}

#[test]
fn code_slices_per_routine() {
    let module = library_module();

    // ldarg 0; len; push 4; gt; ret
    assert_eq!(module.code(RoutineId(0)).len(), 2 + 1 + 9 + 1 + 1);
    // push "Hello!"; print; retv
    assert_eq!(module.code(RoutineId(1)).len(), 3 + 1 + 1);
    assert_eq!(module.code_section().len(), 19);
}

#[test]
fn strings_view() {
    let module = library_module();
    let strings = module.strings();

    assert_eq!(strings.get_by_index(0), "");
    assert_eq!(strings.get_by_index(1), "TestLibrary");
    assert!(!strings.is_empty());
    assert_eq!(strings.try_get(StringId(1)), Some("TestLibrary"));
    assert_eq!(strings.try_get(StringId(strings.len() as u16)), None);
}

#[test]
fn from_path_reads_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("TestLibrary.rmod");
    std::fs::write(&path, library_bytes()).unwrap();

    let module = Module::from_path(&path).unwrap();
    assert_eq!(module.name(), "TestLibrary");
}

#[test]
fn from_path_missing_file() {
    let err = Module::from_path("/definitely/not/here.rmod").unwrap_err();
    assert!(matches!(err, ModuleError::Io(_)));
}

#[test]
fn rejects_short_file() {
    let err = Module::from_bytes(vec![0; 10]).unwrap_err();
    assert!(matches!(err, ModuleError::FileTooSmall(10)));
}

#[test]
fn rejects_bad_magic() {
    let mut bytes = library_bytes();
    bytes[0] = b'X';
    let err = Module::from_bytes(bytes).unwrap_err();
    assert!(matches!(err, ModuleError::InvalidMagic));
}

#[test]
fn rejects_other_version() {
    let mut bytes = library_bytes();
    edit_header(&mut bytes, |h| h.version = 7);
    let err = Module::from_bytes(bytes).unwrap_err();
    assert!(matches!(err, ModuleError::UnsupportedVersion(7)));
}

#[test]
fn rejects_truncated_file() {
    let mut bytes = library_bytes();
    bytes.pop();
    let err = Module::from_bytes(bytes).unwrap_err();
    assert!(matches!(err, ModuleError::SizeMismatch { .. }));
}

#[test]
fn rejects_corrupted_body() {
    let mut bytes = library_bytes();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    let err = Module::from_bytes(bytes).unwrap_err();
    assert!(matches!(err, ModuleError::ChecksumMismatch { .. }));
}

#[test]
fn rejects_unknown_return_type() {
    let mut bytes = library_bytes();
    let at = Header::from_bytes(&bytes[..HEADER_SIZE]).routines_offset as usize + 3;
    bytes[at] = 0x7F;
    reseal(&mut bytes);
    let err = Module::from_bytes(bytes).unwrap_err();
    assert!(matches!(err, ModuleError::InvalidValueType(0x7F)));
}

#[test]
fn rejects_code_out_of_range() {
    let mut bytes = library_bytes();
    // code_len of routine 1
    let at = Header::from_bytes(&bytes[..HEADER_SIZE]).routines_offset as usize + 16 + 12;
    bytes[at..at + 4].copy_from_slice(&1000u32.to_le_bytes());
    reseal(&mut bytes);
    let err = Module::from_bytes(bytes).unwrap_err();
    assert!(matches!(err, ModuleError::InvalidCodeRange(1)));
}

#[test]
fn rejects_dangling_string_reference() {
    let mut bytes = library_bytes();
    // name of type 0
    let at = Header::from_bytes(&bytes[..HEADER_SIZE]).types_offset as usize + 2;
    bytes[at..at + 2].copy_from_slice(&500u16.to_le_bytes());
    reseal(&mut bytes);
    let err = Module::from_bytes(bytes).unwrap_err();
    assert!(matches!(err, ModuleError::InvalidString(500)));
}

#[test]
fn rejects_missing_entry() {
    let mut bytes = library_bytes();
    edit_header(&mut bytes, |h| h.entry = 5);
    let err = Module::from_bytes(bytes).unwrap_err();
    assert!(matches!(err, ModuleError::InvalidEntry(5)));
}

#[test]
fn rejects_section_past_end() {
    let mut bytes = library_bytes();
    edit_header(&mut bytes, |h| h.code_size += 100);
    let err = Module::from_bytes(bytes).unwrap_err();
    assert!(matches!(err, ModuleError::SectionOutOfBounds("code")));
}
