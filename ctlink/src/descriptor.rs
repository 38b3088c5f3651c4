//! JSON description of the input archives a `link` invocation should
//! consume.
//!
//! Opening an object file and decoding its on-disk CTF section are
//! left to whatever produced the link request; this module only
//! builds `ctfc_model::Container`s from an already-decoded, literal
//! description of each member's types and variables, so the CLI has
//! something concrete to hand the link engine end to end.

use std::rc::Rc;

use serde::Deserialize;

use ctfc_model::{
    AddTypeOutcome, Container, Field as ModelField, InMemoryArchiveSource, TypeDef, TypeIndex, TypeKind, TypeRef,
};
use ctfc_util::StringInterner;

use crate::error::{CliError, Result};

#[derive(Debug, Deserialize)]
pub struct LinkRequest {
    pub inputs: Vec<ArchiveDescription>,
    #[serde(default)]
    pub external_strings: Vec<(String, u32)>,
    #[serde(default)]
    pub share_mode: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ArchiveDescription {
    pub name: String,
    pub members: Vec<MemberDescription>,
}

#[derive(Debug, Deserialize)]
pub struct MemberDescription {
    pub name: String,
    #[serde(default)]
    pub types: Vec<TypeDescription>,
    #[serde(default)]
    pub variables: Vec<VariableDescription>,
}

#[derive(Debug, Deserialize)]
pub struct VariableDescription {
    pub name: String,
    #[serde(rename = "type")]
    pub type_ref: TypeRefDescription,
}

/// A reference into a member's own `types` list. `index` is 1-based
/// (0 means "no type"), matching `TypeIndex`'s own convention.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TypeRefDescription {
    #[serde(default)]
    pub parent_scoped: bool,
    pub index: u32,
}

#[derive(Debug, Deserialize)]
pub struct FieldDescription {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRefDescription,
    #[serde(default)]
    pub bit_offset: u64,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeDescription {
    Integer { name: String, bits: u8, signed: bool },
    Pointer { target: TypeRefDescription },
    Array { element: TypeRefDescription, count: u64 },
    Struct { name: Option<String>, #[serde(default)] fields: Vec<FieldDescription> },
    Union { name: Option<String>, #[serde(default)] fields: Vec<FieldDescription> },
    Enum { name: Option<String>, #[serde(default)] variants: Vec<(String, i64)> },
    Function { return_ty: TypeRefDescription, #[serde(default)] params: Vec<TypeRefDescription>, #[serde(default)] variadic: bool },
    Typedef { name: String, target: TypeRefDescription },
    Forward { name: String },
}

fn to_type_ref(d: TypeRefDescription) -> TypeRef {
    if d.index == 0 {
        TypeRef::NONE
    } else if d.parent_scoped {
        TypeRef::parent(TypeIndex::from_one_based(d.index))
    } else {
        TypeRef::child(TypeIndex::from_one_based(d.index))
    }
}

fn to_field(c: &Container, f: &FieldDescription) -> ModelField {
    ModelField { name: c.intern(&f.name), ty: to_type_ref(f.ty), bit_offset: f.bit_offset }
}

fn to_type_kind(c: &Container, d: &TypeDescription) -> TypeKind {
    match d {
        TypeDescription::Integer { name, bits, signed } => {
            TypeKind::Integer { name: c.intern(name), bits: *bits, signed: *signed }
        }
        TypeDescription::Pointer { target } => TypeKind::Pointer { target: to_type_ref(*target) },
        TypeDescription::Array { element, count } => TypeKind::Array { element: to_type_ref(*element), count: *count },
        TypeDescription::Struct { name, fields } => {
            TypeKind::Struct { name: name.as_ref().map(|n| c.intern(n)), fields: fields.iter().map(|f| to_field(c, f)).collect() }
        }
        TypeDescription::Union { name, fields } => {
            TypeKind::Union { name: name.as_ref().map(|n| c.intern(n)), fields: fields.iter().map(|f| to_field(c, f)).collect() }
        }
        TypeDescription::Enum { name, variants } => TypeKind::Enum {
            name: name.as_ref().map(|n| c.intern(n)),
            variants: variants.iter().map(|(n, v)| (c.intern(n), *v)).collect(),
        },
        TypeDescription::Function { return_ty, params, variadic } => TypeKind::Function {
            return_ty: to_type_ref(*return_ty),
            params: params.iter().map(|p| to_type_ref(*p)).collect(),
            variadic: *variadic,
        },
        TypeDescription::Typedef { name, target } => TypeKind::Typedef { name: c.intern(name), target: to_type_ref(*target) },
        TypeDescription::Forward { name } => TypeKind::Forward { name: c.intern(name) },
    }
}

/// Build one member's container by inserting its types and variables
/// in file order. Insertion order is assumed to already put a forward
/// declaration before anything that points at it, matching the link
/// engine's own best-effort reference-retargeting assumption.
///
/// A type whose name collides with a different shape already in this
/// member, or a variable rebound to a conflicting type, is rejected
/// rather than silently dropped.
fn build_member(interner: &Rc<StringInterner>, desc: &MemberDescription) -> Result<Container> {
    let mut container = Container::new(interner.clone());
    for type_desc in &desc.types {
        let kind = to_type_kind(&container, type_desc);
        match container.add_type(None, TypeDef::new(kind)) {
            AddTypeOutcome::Added(_) => {}
            AddTypeOutcome::Conflict => {
                return Err(CliError::Validation(format!(
                    "member '{}' has a duplicate type name with a conflicting shape",
                    desc.name
                )))
            }
            AddTypeOutcome::OutOfMemory => {
                return Err(CliError::Validation(format!("member '{}' ran out of memory growing its type table", desc.name)))
            }
        }
    }
    for variable in &desc.variables {
        let name = container.intern(&variable.name);
        container.add_variable(name, to_type_ref(variable.type_ref)).map_err(|_| {
            CliError::Validation(format!("member '{}' rebinds variable '{}' to a conflicting type", desc.name, variable.name))
        })?;
    }
    Ok(container)
}

pub fn build_archive_source(interner: &Rc<StringInterner>, desc: &ArchiveDescription) -> Result<InMemoryArchiveSource> {
    let members = desc
        .members
        .iter()
        .map(|m| build_member(interner, m).map(|c| (m.name.clone(), c)))
        .collect::<Result<Vec<_>>>()?;
    Ok(InMemoryArchiveSource::new(members))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctfc_model::ArchiveSource;

    #[test]
    fn parses_a_minimal_request() {
        let json = r#"{
            "inputs": [{
                "name": "a.o",
                "members": [{
                    "name": ".ctf",
                    "types": [{"kind": "integer", "name": "int", "bits": 32, "signed": true}],
                    "variables": [{"name": "g", "type": {"index": 1}}]
                }]
            }]
        }"#;
        let request: LinkRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.inputs.len(), 1);
        assert_eq!(request.inputs[0].members[0].types.len(), 1);
    }

    #[test]
    fn builds_a_container_with_one_integer_and_one_variable() {
        let interner = Rc::new(StringInterner::new());
        let desc = ArchiveDescription {
            name: "a.o".to_string(),
            members: vec![MemberDescription {
                name: ".ctf".to_string(),
                types: vec![TypeDescription::Integer { name: "int".to_string(), bits: 32, signed: true }],
                variables: vec![VariableDescription { name: "g".to_string(), type_ref: TypeRefDescription { parent_scoped: false, index: 1 } }],
            }],
        };
        let source = build_archive_source(&interner, &desc).unwrap();
        let main = source.members()[0].1.clone();
        assert_eq!(main.type_count(), 1);
        assert_eq!(main.variables().count(), 1);
    }

    #[test]
    fn struct_with_a_pointer_field_builds_without_panicking() {
        let interner = Rc::new(StringInterner::new());
        let desc = ArchiveDescription {
            name: "a.o".to_string(),
            members: vec![MemberDescription {
                name: ".ctf".to_string(),
                types: vec![
                    TypeDescription::Forward { name: "Node".to_string() },
                    TypeDescription::Pointer { target: TypeRefDescription { parent_scoped: false, index: 1 } },
                    TypeDescription::Struct {
                        name: Some("Node".to_string()),
                        fields: vec![FieldDescription {
                            name: "next".to_string(),
                            ty: TypeRefDescription { parent_scoped: false, index: 2 },
                            bit_offset: 0,
                        }],
                    },
                ],
                variables: vec![],
            }],
        };
        let source = build_archive_source(&interner, &desc).unwrap();
        let main = &source.members()[0].1;
        assert_eq!(main.type_count(), 3);
    }

    #[test]
    fn conflicting_same_named_types_in_one_member_are_rejected() {
        let interner = Rc::new(StringInterner::new());
        let desc = ArchiveDescription {
            name: "a.o".to_string(),
            members: vec![MemberDescription {
                name: ".ctf".to_string(),
                types: vec![
                    TypeDescription::Integer { name: "S".to_string(), bits: 32, signed: true },
                    TypeDescription::Integer { name: "S".to_string(), bits: 64, signed: false },
                ],
                variables: vec![],
            }],
        };
        let result = build_archive_source(&interner, &desc);
        assert!(matches!(result, Err(CliError::Validation(_))));
    }

    #[test]
    fn variable_rebound_to_a_conflicting_type_is_rejected() {
        let interner = Rc::new(StringInterner::new());
        let desc = ArchiveDescription {
            name: "a.o".to_string(),
            members: vec![MemberDescription {
                name: ".ctf".to_string(),
                types: vec![TypeDescription::Integer { name: "int".to_string(), bits: 32, signed: true }],
                variables: vec![
                    VariableDescription { name: "g".to_string(), type_ref: TypeRefDescription { parent_scoped: false, index: 1 } },
                    VariableDescription { name: "g".to_string(), type_ref: TypeRefDescription { parent_scoped: false, index: 0 } },
                ],
            }],
        };
        let result = build_archive_source(&interner, &desc);
        assert!(matches!(result, Err(CliError::Validation(_))));
    }
}
