//! Module index newtypes.

/// Index into the String Table.
///
/// Index 0 is always the empty string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
#[repr(transparent)]
pub struct StringId(pub u16);

impl StringId {
    pub const EMPTY: Self = Self(0);

    #[inline]
    pub fn new(idx: u16) -> Self {
        Self(idx)
    }

    #[inline]
    pub fn get(self) -> u16 {
        self.0
    }
}

/// Index into the TypeDefs table.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
#[repr(transparent)]
pub struct TypeDefId(pub u16);

/// Index into the RoutineDefs table, module-wide.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, PartialOrd, Ord)]
#[repr(transparent)]
pub struct RoutineId(pub u16);

impl RoutineId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index into the ImportDefs table.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
#[repr(transparent)]
pub struct ImportId(pub u16);

impl ImportId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}
