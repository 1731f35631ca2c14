//! Runtime values.

use std::fmt;

use runmod_bytecode::ValueType;

/// A value on the operand stack, in an argument or local slot, or returned
/// from an invocation.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    StrArray(Vec<String>),
}

impl Value {
    /// Runtime type of the value. `None` for null.
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            Self::Null => None,
            Self::Bool(_) => Some(ValueType::Boolean),
            Self::Int(_) => Some(ValueType::Int64),
            Self::Str(_) => Some(ValueType::String),
            Self::StrArray(_) => Some(ValueType::StringArray),
        }
    }

    /// Type name for messages: the value type's display name, or `null`.
    pub fn type_name(&self) -> &'static str {
        self.value_type().map_or("null", ValueType::name)
    }

    /// Whether the value may occupy a slot declared as `ty`.
    ///
    /// Strings and string arrays are references and also accept null.
    pub fn fits(&self, ty: ValueType) -> bool {
        match self {
            Self::Null => matches!(ty, ValueType::String | ValueType::StringArray),
            v => v.value_type() == Some(ty),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Self::StrArray(v)
    }
}

/// Text form used by `print`, `write` and `tostr`. Null is the empty string.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => f.write_str(s),
            Self::StrArray(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item:?}")?;
                }
                f.write_str("]")
            }
        }
    }
}
