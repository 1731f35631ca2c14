//! Module file header (64 bytes).

use super::ids::{RoutineId, StringId};
use super::{MAGIC, NO_ENTRY, VERSION};

/// File header - first 64 bytes of the module file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(C, align(64))]
pub struct Header {
    /// Magic bytes: b"RMOD"
    pub magic: [u8; 4],
    /// Format version (currently 1)
    pub version: u32,
    /// CRC32 checksum of everything after the header
    pub checksum: u32,
    /// Total file size in bytes
    pub total_size: u32,

    // Section offsets (absolute byte offsets)
    pub str_blob_offset: u32,
    pub str_table_offset: u32,
    pub types_offset: u32,
    pub routines_offset: u32,
    pub params_offset: u32,
    pub imports_offset: u32,
    pub code_offset: u32,
    /// Code section size in bytes.
    pub code_size: u32,

    // Element counts
    pub str_table_count: u16,
    pub types_count: u16,
    pub routines_count: u16,
    pub params_count: u16,
    pub imports_count: u16,
    /// Intrinsic entry routine, or [`NO_ENTRY`].
    pub entry: u16,
    /// Module name (StringId).
    pub module_name: u16,
    pub(crate) _pad: u16,
}

const _: () = assert!(std::mem::size_of::<Header>() == 64);

impl Default for Header {
    fn default() -> Self {
        Self {
            magic: MAGIC,
            version: VERSION,
            checksum: 0,
            total_size: 0,
            str_blob_offset: 0,
            str_table_offset: 0,
            types_offset: 0,
            routines_offset: 0,
            params_offset: 0,
            imports_offset: 0,
            code_offset: 0,
            code_size: 0,
            str_table_count: 0,
            types_count: 0,
            routines_count: 0,
            params_count: 0,
            imports_count: 0,
            entry: NO_ENTRY,
            module_name: 0,
            _pad: 0,
        }
    }
}

#[inline]
fn u32_at(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

#[inline]
fn u16_at(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

impl Header {
    /// Decode header from 64 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        assert!(bytes.len() >= 64, "header too short");

        Self {
            magic: [bytes[0], bytes[1], bytes[2], bytes[3]],
            version: u32_at(bytes, 4),
            checksum: u32_at(bytes, 8),
            total_size: u32_at(bytes, 12),
            str_blob_offset: u32_at(bytes, 16),
            str_table_offset: u32_at(bytes, 20),
            types_offset: u32_at(bytes, 24),
            routines_offset: u32_at(bytes, 28),
            params_offset: u32_at(bytes, 32),
            imports_offset: u32_at(bytes, 36),
            code_offset: u32_at(bytes, 40),
            code_size: u32_at(bytes, 44),
            str_table_count: u16_at(bytes, 48),
            types_count: u16_at(bytes, 50),
            routines_count: u16_at(bytes, 52),
            params_count: u16_at(bytes, 54),
            imports_count: u16_at(bytes, 56),
            entry: u16_at(bytes, 58),
            module_name: u16_at(bytes, 60),
            _pad: u16_at(bytes, 62),
        }
    }

    /// Encode header to 64 bytes.
    pub fn to_bytes(&self) -> [u8; 64] {
        let mut bytes = [0u8; 64];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4..8].copy_from_slice(&self.version.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.checksum.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.total_size.to_le_bytes());
        bytes[16..20].copy_from_slice(&self.str_blob_offset.to_le_bytes());
        bytes[20..24].copy_from_slice(&self.str_table_offset.to_le_bytes());
        bytes[24..28].copy_from_slice(&self.types_offset.to_le_bytes());
        bytes[28..32].copy_from_slice(&self.routines_offset.to_le_bytes());
        bytes[32..36].copy_from_slice(&self.params_offset.to_le_bytes());
        bytes[36..40].copy_from_slice(&self.imports_offset.to_le_bytes());
        bytes[40..44].copy_from_slice(&self.code_offset.to_le_bytes());
        bytes[44..48].copy_from_slice(&self.code_size.to_le_bytes());
        bytes[48..50].copy_from_slice(&self.str_table_count.to_le_bytes());
        bytes[50..52].copy_from_slice(&self.types_count.to_le_bytes());
        bytes[52..54].copy_from_slice(&self.routines_count.to_le_bytes());
        bytes[54..56].copy_from_slice(&self.params_count.to_le_bytes());
        bytes[56..58].copy_from_slice(&self.imports_count.to_le_bytes());
        bytes[58..60].copy_from_slice(&self.entry.to_le_bytes());
        bytes[60..62].copy_from_slice(&self.module_name.to_le_bytes());
        bytes[62..64].copy_from_slice(&self._pad.to_le_bytes());
        bytes
    }

    pub fn validate_magic(&self) -> bool {
        self.magic == MAGIC
    }

    pub fn validate_version(&self) -> bool {
        self.version == VERSION
    }

    /// The intrinsic entry routine, if the module declares one.
    pub fn entry_routine(&self) -> Option<RoutineId> {
        (self.entry != NO_ENTRY).then_some(RoutineId(self.entry))
    }

    pub fn set_entry_routine(&mut self, entry: Option<RoutineId>) {
        self.entry = entry.map_or(NO_ENTRY, |id| id.0);
    }

    pub fn module_name_id(&self) -> StringId {
        StringId(self.module_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_size() {
        assert_eq!(std::mem::size_of::<Header>(), 64);
    }

    #[test]
    fn header_default() {
        let h = Header::default();
        assert!(h.validate_magic());
        assert!(h.validate_version());
        assert_eq!(h.total_size, 0);
        assert_eq!(h.entry_routine(), None);
    }

    #[test]
    fn header_roundtrip() {
        let mut h = Header {
            checksum: 0x12345678,
            total_size: 1024,
            str_blob_offset: 64,
            str_table_offset: 128,
            types_offset: 192,
            routines_offset: 256,
            params_offset: 320,
            imports_offset: 384,
            code_offset: 448,
            code_size: 576,
            str_table_count: 10,
            types_count: 2,
            routines_count: 5,
            params_count: 3,
            imports_count: 1,
            module_name: 4,
            ..Default::default()
        };
        h.set_entry_routine(Some(RoutineId(2)));

        let bytes = h.to_bytes();
        assert_eq!(bytes.len(), 64);

        let decoded = Header::from_bytes(&bytes);
        assert_eq!(decoded, h);
        assert_eq!(decoded.entry_routine(), Some(RoutineId(2)));
        assert_eq!(decoded.module_name_id(), StringId(4));
    }

    #[test]
    fn header_entry_cleared() {
        let mut h = Header::default();
        h.set_entry_routine(Some(RoutineId(0)));
        assert_eq!(h.entry_routine(), Some(RoutineId(0)));

        h.set_entry_routine(None);
        assert_eq!(h.entry, NO_ENTRY);
    }
}
