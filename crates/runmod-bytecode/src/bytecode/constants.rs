//! Module format constants.

/// Magic bytes identifying a runmod module file.
pub const MAGIC: [u8; 4] = *b"RMOD";

/// Current module format version.
pub const VERSION: u32 = 1;

/// Header size in bytes.
pub const HEADER_SIZE: usize = 64;

/// Entry slot value meaning "no intrinsic entry routine".
pub const NO_ENTRY: u16 = 0xFFFF;

/// Record sizes of the fixed-width tables.
pub const TYPE_DEF_SIZE: usize = 8;
pub const ROUTINE_DEF_SIZE: usize = 16;
pub const PARAM_DEF_SIZE: usize = 4;
pub const IMPORT_DEF_SIZE: usize = 4;
