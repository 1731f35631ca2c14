//! Loaded module with validated tables.
//!
//! [`Module`] checks the whole file once at load time (bounds, string
//! references, type tags, ranges, checksum) and decodes the fixed-width tables
//! into a descriptor table. After a successful load, accessors taking ids
//! obtained from the module itself never fail.

use std::io;
use std::ops::Deref;
use std::path::Path;

use super::descriptor::{ParamDescriptor, RoutineDescriptor, TypeDescriptor, Visibility};
use super::header::Header;
use super::ids::{RoutineId, StringId, TypeDefId};
use super::sections::{ImportDef, ParamDef, RoutineDef, TypeDef};
use super::{
    HEADER_SIZE, IMPORT_DEF_SIZE, NO_ENTRY, PARAM_DEF_SIZE, ROUTINE_DEF_SIZE, TYPE_DEF_SIZE,
    VERSION,
};

/// Read a little-endian u32 from bytes at the given offset.
#[inline]
fn read_u32_le(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// Storage for module bytes.
#[derive(Debug)]
pub struct ByteStorage(Vec<u8>);

impl Deref for ByteStorage {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl ByteStorage {
    /// Create from owned bytes.
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Read a file into memory.
    pub fn from_file(path: impl AsRef<Path>) -> io::Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(Self(bytes))
    }
}

/// Module load error.
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    #[error("invalid magic: expected RMOD")]
    InvalidMagic,
    #[error("unsupported version: {0} (expected {VERSION})")]
    UnsupportedVersion(u32),
    #[error("file too small: {0} bytes (minimum 64)")]
    FileTooSmall(usize),
    #[error("size mismatch: header says {header} bytes, got {actual}")]
    SizeMismatch { header: u32, actual: usize },
    #[error("checksum mismatch: header says {expected:#010x}, content hashes to {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },
    #[error("{0} section lies outside the file")]
    SectionOutOfBounds(&'static str),
    #[error("malformed string table")]
    InvalidStringTable,
    #[error("invalid string reference: {0}")]
    InvalidString(u16),
    #[error("invalid value type tag: {0}")]
    InvalidValueType(u8),
    #[error("type {0} declares routines outside the routine table or out of order")]
    InvalidTypeRange(u16),
    #[error("routine {0} has parameters outside the parameter table")]
    InvalidParamRange(u16),
    #[error("routine {0} has code outside the code section")]
    InvalidCodeRange(u16),
    #[error("entry routine {0} does not exist")]
    InvalidEntry(u16),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// A loaded module.
#[derive(Debug)]
pub struct Module {
    storage: ByteStorage,
    header: Header,
    type_defs: Vec<TypeDef>,
    routine_defs: Vec<RoutineDef>,
    param_defs: Vec<ParamDef>,
    imports: Vec<ImportDef>,
    /// Descriptor table, built once at load time.
    types: Vec<TypeDescriptor>,
    routines: Vec<RoutineDescriptor>,
}

impl Module {
    /// Load a module from owned bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ModuleError> {
        Self::from_storage(ByteStorage::from_vec(bytes))
    }

    /// Load a module from a file path.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ModuleError> {
        let storage = ByteStorage::from_file(&path)?;
        Self::from_storage(storage)
    }

    /// Load a module from storage.
    fn from_storage(storage: ByteStorage) -> Result<Self, ModuleError> {
        if storage.len() < HEADER_SIZE {
            return Err(ModuleError::FileTooSmall(storage.len()));
        }

        let header = Header::from_bytes(&storage[..HEADER_SIZE]);

        if !header.validate_magic() {
            return Err(ModuleError::InvalidMagic);
        }
        if !header.validate_version() {
            return Err(ModuleError::UnsupportedVersion(header.version));
        }
        if header.total_size as usize != storage.len() {
            return Err(ModuleError::SizeMismatch {
                header: header.total_size,
                actual: storage.len(),
            });
        }
        let actual = crc32fast::hash(&storage[HEADER_SIZE..]);
        if actual != header.checksum {
            return Err(ModuleError::ChecksumMismatch {
                expected: header.checksum,
                actual,
            });
        }

        validate_strings(&storage, &header)?;
        let str_count = header.str_table_count;
        let check_str = |id: StringId| {
            if id.0 < str_count {
                Ok(())
            } else {
                Err(ModuleError::InvalidString(id.0))
            }
        };
        check_str(header.module_name_id())?;

        let type_defs: Vec<TypeDef> = table(
            &storage,
            "types",
            header.types_offset,
            header.types_count,
            TYPE_DEF_SIZE,
        )?
        .map(TypeDef::from_bytes)
        .collect();

        let routine_defs: Vec<RoutineDef> = table(
            &storage,
            "routines",
            header.routines_offset,
            header.routines_count,
            ROUTINE_DEF_SIZE,
        )?
        .map(|b| RoutineDef::from_bytes(b).map_err(ModuleError::InvalidValueType))
        .collect::<Result<_, _>>()?;

        let param_defs: Vec<ParamDef> = table(
            &storage,
            "params",
            header.params_offset,
            header.params_count,
            PARAM_DEF_SIZE,
        )?
        .map(|b| ParamDef::from_bytes(b).map_err(ModuleError::InvalidValueType))
        .collect::<Result<_, _>>()?;

        let imports: Vec<ImportDef> = table(
            &storage,
            "imports",
            header.imports_offset,
            header.imports_count,
            IMPORT_DEF_SIZE,
        )?
        .map(ImportDef::from_bytes)
        .collect();

        section(
            &storage,
            "code",
            header.code_offset as usize,
            header.code_size as usize,
        )?;

        // Every routine belongs to exactly one type: type ranges tile the
        // routine table in order.
        let mut next_routine = 0usize;
        for (i, t) in type_defs.iter().enumerate() {
            check_str(t.namespace)?;
            check_str(t.name)?;
            if t.routine_start as usize != next_routine {
                return Err(ModuleError::InvalidTypeRange(i as u16));
            }
            next_routine += t.routine_count as usize;
        }
        if next_routine != routine_defs.len() {
            let last = type_defs.len().saturating_sub(1) as u16;
            return Err(ModuleError::InvalidTypeRange(last));
        }

        for (i, r) in routine_defs.iter().enumerate() {
            check_str(r.name)?;
            if r.param_range().end > param_defs.len() {
                return Err(ModuleError::InvalidParamRange(i as u16));
            }
            if r.code_range().end > header.code_size as usize {
                return Err(ModuleError::InvalidCodeRange(i as u16));
            }
        }
        for p in &param_defs {
            check_str(p.name)?;
        }
        for imp in &imports {
            check_str(imp.module)?;
            check_str(imp.routine)?;
        }

        if header.entry != NO_ENTRY && header.entry as usize >= routine_defs.len() {
            return Err(ModuleError::InvalidEntry(header.entry));
        }

        let mut module = Self {
            storage,
            header,
            type_defs,
            routine_defs,
            param_defs,
            imports,
            types: Vec::new(),
            routines: Vec::new(),
        };
        module.build_descriptors();
        Ok(module)
    }

    fn build_descriptors(&mut self) {
        let strings = self.strings();
        let mut types = Vec::with_capacity(self.type_defs.len());
        let mut routines = Vec::with_capacity(self.routine_defs.len());

        for (i, t) in self.type_defs.iter().enumerate() {
            let namespace = strings.get(t.namespace).to_owned();
            let type_name = strings.get(t.name).to_owned();

            for id in t.routine_ids() {
                let def = &self.routine_defs[id.index()];
                let params = self.param_defs[def.param_range()]
                    .iter()
                    .map(|p| ParamDescriptor {
                        name: strings.get(p.name).to_owned(),
                        ty: p.ty,
                    })
                    .collect();
                routines.push(RoutineDescriptor {
                    id,
                    name: strings.get(def.name).to_owned(),
                    namespace: namespace.clone(),
                    type_name: type_name.clone(),
                    return_type: def.return_type,
                    params,
                    visibility: if def.is_public() {
                        Visibility::Public
                    } else {
                        Visibility::Private
                    },
                    is_static: def.is_static(),
                });
            }

            types.push(TypeDescriptor {
                id: TypeDefId(i as u16),
                namespace,
                name: type_name,
                routines: t.routine_ids().collect(),
            });
        }

        self.types = types;
        self.routines = routines;
    }

    /// Get the parsed header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Get the raw bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.storage
    }

    /// Module name as declared by the module itself.
    pub fn name(&self) -> &str {
        self.strings().get(self.header.module_name_id())
    }

    /// Get a view into the string table.
    pub fn strings(&self) -> StringsView<'_> {
        let table_start = self.header.str_table_offset as usize;
        let count = self.header.str_table_count as usize;
        StringsView {
            blob: &self.storage[self.header.str_blob_offset as usize..],
            table: &self.storage[table_start..table_start + (count + 1) * 4],
        }
    }

    /// Intrinsic entry routine, if declared.
    pub fn entry(&self) -> Option<RoutineId> {
        self.header.entry_routine()
    }

    /// Type descriptors in declaration order.
    pub fn types(&self) -> &[TypeDescriptor] {
        &self.types
    }

    /// Routine descriptors in type-declaration order, then per-type
    /// declaration order (which is also routine id order).
    pub fn routines(&self) -> &[RoutineDescriptor] {
        &self.routines
    }

    /// Static routines in enumeration order.
    pub fn static_routines(&self) -> impl Iterator<Item = &RoutineDescriptor> {
        self.routines.iter().filter(|r| r.is_static)
    }

    /// Descriptor of a routine.
    pub fn routine(&self, id: RoutineId) -> &RoutineDescriptor {
        &self.routines[id.index()]
    }

    /// Raw routine record.
    pub fn routine_def(&self, id: RoutineId) -> &RoutineDef {
        &self.routine_defs[id.index()]
    }

    /// Find a routine by exact qualified name (`Namespace.Type.Routine`).
    pub fn find_routine(&self, qualified: &str) -> Option<&RoutineDescriptor> {
        self.routines.iter().find(|r| r.qualified_name() == qualified)
    }

    /// Raw type records.
    pub fn type_defs(&self) -> &[TypeDef] {
        &self.type_defs
    }

    /// Raw routine records.
    pub fn routine_defs(&self) -> &[RoutineDef] {
        &self.routine_defs
    }

    /// Import records.
    pub fn imports(&self) -> &[ImportDef] {
        &self.imports
    }

    /// Code bytes of a routine.
    pub fn code(&self, id: RoutineId) -> &[u8] {
        let code = self.code_section();
        &code[self.routine_defs[id.index()].code_range()]
    }

    /// Whole code section.
    pub fn code_section(&self) -> &[u8] {
        let start = self.header.code_offset as usize;
        &self.storage[start..start + self.header.code_size as usize]
    }
}

/// Check a section range lies within the file, after the header.
fn section(
    storage: &[u8],
    name: &'static str,
    offset: usize,
    len: usize,
) -> Result<(), ModuleError> {
    let end = offset.checked_add(len);
    match end {
        Some(end) if offset >= HEADER_SIZE && end <= storage.len() => Ok(()),
        _ if len == 0 && offset <= storage.len() => Ok(()),
        _ => Err(ModuleError::SectionOutOfBounds(name)),
    }
}

/// Bounds-check a fixed-width table and iterate over its records.
fn table<'a>(
    storage: &'a [u8],
    name: &'static str,
    offset: u32,
    count: u16,
    record: usize,
) -> Result<std::slice::ChunksExact<'a, u8>, ModuleError> {
    let offset = offset as usize;
    let len = count as usize * record;
    section(storage, name, offset, len)?;
    Ok(storage[offset..offset + len].chunks_exact(record))
}

fn validate_strings(storage: &[u8], header: &Header) -> Result<(), ModuleError> {
    let count = header.str_table_count as usize;
    if count == 0 {
        return Err(ModuleError::InvalidStringTable);
    }
    let table_offset = header.str_table_offset as usize;
    section(storage, "string table", table_offset, (count + 1) * 4)?;
    let blob_offset = header.str_blob_offset as usize;
    section(storage, "string blob", blob_offset, 0)?;
    let blob = &storage[blob_offset..];

    let mut prev = 0usize;
    for i in 0..=count {
        let off = read_u32_le(storage, table_offset + i * 4) as usize;
        if off < prev || off > blob.len() {
            return Err(ModuleError::InvalidStringTable);
        }
        if i > 0 && std::str::from_utf8(&blob[prev..off]).is_err() {
            return Err(ModuleError::InvalidString((i - 1) as u16));
        }
        prev = off;
    }

    // String 0 is reserved for the empty string.
    if read_u32_le(storage, table_offset + 4) != 0 {
        return Err(ModuleError::InvalidStringTable);
    }
    Ok(())
}

/// View into the string table for lazy string lookup.
pub struct StringsView<'a> {
    blob: &'a [u8],
    table: &'a [u8],
}

impl<'a> StringsView<'a> {
    /// Get a string by its ID.
    pub fn get(&self, id: StringId) -> &'a str {
        self.get_by_index(id.get() as usize)
    }

    /// Get a string by its ID, or `None` if the table has no such entry.
    ///
    /// Code operands are not checked at load time, so ids taken from
    /// instructions go through here.
    pub fn try_get(&self, id: StringId) -> Option<&'a str> {
        let idx = id.get() as usize;
        (idx < self.len()).then(|| self.get_by_index(idx))
    }

    /// Get a string by raw index.
    ///
    /// The string table contains sequential u32 offsets. To get string i:
    /// `start = table[i]`, `end = table[i+1]`.
    pub fn get_by_index(&self, idx: usize) -> &'a str {
        let start = read_u32_le(self.table, idx * 4) as usize;
        let end = read_u32_le(self.table, (idx + 1) * 4) as usize;
        // Validated at load time.
        std::str::from_utf8(&self.blob[start..end]).unwrap_or_default()
    }

    /// Number of strings.
    pub fn len(&self) -> usize {
        self.table.len() / 4 - 1
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
