//! Value type tags used in routine signatures.

/// Type of a parameter or return value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(u8)]
pub enum ValueType {
    Void = 0,
    Boolean = 1,
    Int64 = 2,
    String = 3,
    StringArray = 4,
}

impl ValueType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Void),
            1 => Some(Self::Boolean),
            2 => Some(Self::Int64),
            3 => Some(Self::String),
            4 => Some(Self::StringArray),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Display name used in signatures and result reports.
    pub fn name(self) -> &'static str {
        match self {
            Self::Void => "Void",
            Self::Boolean => "Boolean",
            Self::Int64 => "Int64",
            Self::String => "String",
            Self::StringArray => "String[]",
        }
    }

    /// Keyword used by the assembler source format.
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Void => "void",
            Self::Boolean => "bool",
            Self::Int64 => "int",
            Self::String => "string",
            Self::StringArray => "string[]",
        }
    }

    /// Parse an assembler keyword (`string[]` is spelled with its brackets).
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "void" => Some(Self::Void),
            "bool" => Some(Self::Boolean),
            "int" => Some(Self::Int64),
            "string" => Some(Self::String),
            "string[]" => Some(Self::StringArray),
            _ => None,
        }
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_decode() {
        for ty in [
            ValueType::Void,
            ValueType::Boolean,
            ValueType::Int64,
            ValueType::String,
            ValueType::StringArray,
        ] {
            assert_eq!(ValueType::from_u8(ty.to_u8()), Some(ty));
            assert_eq!(ValueType::from_keyword(ty.keyword()), Some(ty));
        }
        assert_eq!(ValueType::from_u8(5), None);
    }

    #[test]
    fn display_names() {
        assert_eq!(ValueType::StringArray.to_string(), "String[]");
        assert_eq!(ValueType::Boolean.name(), "Boolean");
        assert_eq!(ValueType::from_keyword("float"), None);
    }
}
