//! Owned descriptors of a module's types and routines.
//!
//! Built once by [`Module`](super::Module) at load time; this is the
//! introspection surface the runner works against.

use runmod_core::names;

use super::ids::{RoutineId, TypeDefId};
use super::value_type::ValueType;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParamDescriptor {
    pub name: String,
    pub ty: ValueType,
}

/// A declared type and the ids of its routines, in declaration order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub id: TypeDefId,
    pub namespace: String,
    pub name: String,
    pub routines: Vec<RoutineId>,
}

impl TypeDescriptor {
    /// `Namespace.Type`, or just `Type` without a namespace.
    pub fn full_name(&self) -> String {
        names::type_full_name(&self.namespace, &self.name)
    }
}

/// Metadata of a routine: everything needed to select, display and invoke it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoutineDescriptor {
    pub id: RoutineId,
    pub name: String,
    /// Namespace of the declaring type.
    pub namespace: String,
    /// Name of the declaring type.
    pub type_name: String,
    pub return_type: ValueType,
    pub params: Vec<ParamDescriptor>,
    pub visibility: Visibility,
    pub is_static: bool,
}

impl RoutineDescriptor {
    /// Full name of the declaring type.
    pub fn declaring_type(&self) -> String {
        names::type_full_name(&self.namespace, &self.type_name)
    }

    /// `Namespace.Type.Routine`.
    pub fn qualified_name(&self) -> String {
        names::qualified_name(&self.namespace, &self.type_name, &self.name)
    }

    /// First parameter, if any.
    pub fn first_param(&self) -> Option<&ParamDescriptor> {
        self.params.first()
    }
}
