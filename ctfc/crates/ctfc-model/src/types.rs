//! In-memory CTF type representation.
//!
//! Decoding the real on-disk CTF type encoding is out of scope here: a
//! production linker gets `TypeKind` values handed to it by a decoder
//! it does not own. This module defines the minimal shape the merger
//! needs to do structural-duplicate detection and to support a
//! handful of representative shapes (`int`, `*int`,
//! `struct S { int a; }`).

use crate::ids::TypeRef;
use ctfc_util::StrAtom;

/// One field of a struct or union.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    pub name: StrAtom,
    pub ty: TypeRef,
    pub bit_offset: u64,
}

/// The shape of a single CTF type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeKind {
    Integer { name: StrAtom, bits: u8, signed: bool },
    Pointer { target: TypeRef },
    Array { element: TypeRef, count: u64 },
    Struct { name: Option<StrAtom>, fields: Vec<Field> },
    Union { name: Option<StrAtom>, fields: Vec<Field> },
    Enum { name: Option<StrAtom>, variants: Vec<(StrAtom, i64)> },
    Function { return_ty: TypeRef, params: Vec<TypeRef>, variadic: bool },
    Typedef { name: StrAtom, target: TypeRef },
    Forward { name: StrAtom },
}

impl TypeKind {
    /// The type's own name, if it has one. Anonymous structs, unions,
    /// and enums return `None`.
    pub fn name(&self) -> Option<StrAtom> {
        match self {
            TypeKind::Integer { name, .. } => Some(*name),
            TypeKind::Struct { name, .. } => *name,
            TypeKind::Union { name, .. } => *name,
            TypeKind::Enum { name, .. } => *name,
            TypeKind::Typedef { name, .. } => Some(*name),
            TypeKind::Forward { name } => Some(*name),
            TypeKind::Pointer { .. } | TypeKind::Array { .. } | TypeKind::Function { .. } => None,
        }
    }

    fn discriminant(&self) -> u8 {
        match self {
            TypeKind::Integer { .. } => 0,
            TypeKind::Pointer { .. } => 1,
            TypeKind::Array { .. } => 2,
            TypeKind::Struct { .. } => 3,
            TypeKind::Union { .. } => 4,
            TypeKind::Enum { .. } => 5,
            TypeKind::Function { .. } => 6,
            TypeKind::Typedef { .. } => 7,
            TypeKind::Forward { .. } => 8,
        }
    }

    pub fn same_kind(&self, other: &TypeKind) -> bool {
        self.discriminant() == other.discriminant()
    }
}

/// A single entry in a container's type table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeDef {
    pub kind: TypeKind,
}

impl TypeDef {
    pub fn new(kind: TypeKind) -> Self {
        TypeDef { kind }
    }

    pub fn name(&self) -> Option<StrAtom> {
        self.kind.name()
    }
}
