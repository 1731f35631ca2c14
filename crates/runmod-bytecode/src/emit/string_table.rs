//! String table builder.

use indexmap::IndexSet;

use crate::bytecode::StringId;

use super::EmitError;

/// Interns strings in first-use order. Index 0 is always the empty string.
#[derive(Debug)]
pub struct StringTableBuilder {
    strings: IndexSet<String>,
}

impl Default for StringTableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StringTableBuilder {
    pub fn new() -> Self {
        let mut strings = IndexSet::new();
        strings.insert(String::new());
        Self { strings }
    }

    /// Intern a string, returning its id.
    pub fn intern(&mut self, s: &str) -> Result<StringId, EmitError> {
        if let Some(idx) = self.strings.get_index_of(s) {
            return Ok(StringId::new(idx as u16));
        }
        let idx = self.strings.len();
        if idx > u16::MAX as usize {
            return Err(EmitError::TooManyStrings(idx + 1));
        }
        self.strings.insert(s.to_owned());
        Ok(StringId::new(idx as u16))
    }

    /// Look up an interned string.
    pub fn get_str(&self, id: StringId) -> &str {
        self.strings
            .get_index(id.get() as usize)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Serialize into `(blob, table)`. The table holds `len() + 1` offsets,
    /// the last one being the blob length.
    pub fn emit(&self) -> (Vec<u8>, Vec<u8>) {
        let mut blob = Vec::new();
        let mut table = Vec::with_capacity((self.strings.len() + 1) * 4);
        for s in &self.strings {
            table.extend_from_slice(&(blob.len() as u32).to_le_bytes());
            blob.extend_from_slice(s.as_bytes());
        }
        table.extend_from_slice(&(blob.len() as u32).to_le_bytes());
        (blob, table)
    }
}
