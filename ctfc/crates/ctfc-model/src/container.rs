//! The CTF container: a type table, a variable table, string atoms, and
//! (on link outputs) a type-mapping index.

use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use ctfc_util::{StrAtom, StringInterner};

use crate::ids::{ContainerId, TypeIndex, TypeRef};
use crate::types::{Field, TypeDef, TypeKind};

static NEXT_CONTAINER_ID: AtomicU32 = AtomicU32::new(0);

fn fresh_container_id() -> ContainerId {
    ContainerId::from_u32(NEXT_CONTAINER_ID.fetch_add(1, Ordering::Relaxed))
}

/// Outcome of [`Container::add_type`].
#[derive(Debug)]
pub enum AddTypeOutcome {
    /// The type was newly inserted (or an identical type already
    /// existed and its reference is returned).
    Added(TypeRef),
    /// A type of the same name already exists with a different shape.
    /// The merger treats this as the signal to fall back
    /// to a per-CU output container.
    Conflict,
    /// Allocation failed while growing the type table.
    OutOfMemory,
}

/// A CTF type universe: types, variables, string atoms, and (for link
/// outputs) a type-mapping index.
///
/// A container is owned by its creator until handed to
/// the link engine; per-CU output containers are created and owned by
/// the engine, keyed by CU name, and always have the shared output as
/// their parent (never deeper than one level).
#[derive(Clone)]
pub struct Container {
    id: ContainerId,
    cu_name: Option<String>,
    has_parent: bool,
    types: Vec<TypeDef>,
    variables: IndexMap<StrAtom, TypeRef>,
    external: FxHashMap<u32, String>,
    dirty: bool,
    interner: Rc<StringInterner>,
}

impl Container {
    /// Create a new, empty, parentless container.
    pub fn new(interner: Rc<StringInterner>) -> Self {
        Container {
            id: fresh_container_id(),
            cu_name: None,
            has_parent: false,
            types: Vec::new(),
            variables: IndexMap::new(),
            external: FxHashMap::default(),
            dirty: false,
            interner,
        }
    }

    /// Create a per-CU output container whose parent is the shared output.
    pub fn new_child(interner: Rc<StringInterner>, cu_name: impl Into<String>) -> Self {
        let mut c = Self::new(interner);
        c.has_parent = true;
        c.cu_name = Some(cu_name.into());
        c
    }

    pub fn id(&self) -> ContainerId {
        self.id
    }

    pub fn has_parent(&self) -> bool {
        self.has_parent
    }

    pub fn cu_name(&self) -> Option<&str> {
        self.cu_name.as_deref()
    }

    pub fn set_cu_name(&mut self, name: impl Into<String>) {
        self.cu_name = Some(name.into());
    }

    pub fn interner(&self) -> &Rc<StringInterner> {
        &self.interner
    }

    pub fn intern(&self, s: &str) -> StrAtom {
        self.interner.intern(s)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Materialize dirty type/variable buffers into final form. In this
    /// engine there is no on-disk encoding step to run (decoding/encoding
    /// the on-disk CTF format is a non-goal), so finalizing is just
    /// clearing the dirty flag; a production container would rebuild its
    /// serialized type section here.
    pub fn update(&mut self) -> Result<(), crate::error::LinkError> {
        self.dirty = false;
        Ok(())
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn get_type(&self, index: TypeIndex) -> Option<&TypeDef> {
        index.as_slot().and_then(|slot| self.types.get(slot))
    }

    pub fn types(&self) -> impl Iterator<Item = (TypeIndex, &TypeDef)> {
        self.types.iter().enumerate().map(|(slot, t)| (TypeIndex::from(slot), t))
    }

    pub fn variables(&self) -> impl Iterator<Item = (StrAtom, TypeRef)> + '_ {
        self.variables.iter().map(|(k, v)| (*k, *v))
    }

    pub fn get_variable(&self, name: StrAtom) -> Option<TypeRef> {
        self.variables.get(&name).copied()
    }

    /// Resolve `r` within this container, following into `parent` when
    /// `r` is parent-scoped.
    pub fn resolve<'a>(&'a self, r: TypeRef, parent: Option<&'a Container>) -> Option<&'a TypeDef> {
        if r.is_parent_scoped() {
            parent.and_then(|p| p.get_type(r.index()))
        } else {
            self.get_type(r.index())
        }
    }

    /// Find an existing type in this container's own table matching
    /// `candidate`'s name (composites only; unnamed types never match
    /// by name).
    fn find_by_name(&self, name: StrAtom) -> Option<(TypeIndex, &TypeDef)> {
        self.types().find(|(_, t)| t.name() == Some(name))
    }

    /// Add a type to this container, performing structural-duplicate
    /// detection against existing destination types.
    ///
    /// `parent` must be this container's actual parent (or `None`);
    /// it is needed to resolve parent-scoped type references reached
    /// while comparing structural equality.
    pub fn add_type(&mut self, parent: Option<&Container>, candidate: TypeDef) -> AddTypeOutcome {
        if let Some(name) = candidate.name() {
            if let Some((existing_idx, existing)) = self.find_by_name(name) {
                if types_equal(existing, self, parent, &candidate.kind, self, parent) {
                    return AddTypeOutcome::Added(TypeRef::child(existing_idx));
                }
                return AddTypeOutcome::Conflict;
            }
        } else {
            // Unnamed types: best-effort structural dedup only, a known,
            // preserved limitation. We scan linearly and compare structurally;
            // field order still matters, so a permutation of an
            // identical anonymous struct is *not* caught here.
            for (idx, existing) in self.types() {
                if existing.name().is_none()
                    && existing.kind.same_kind(&candidate.kind)
                    && types_equal(existing, self, parent, &candidate.kind, self, parent)
                {
                    return AddTypeOutcome::Added(TypeRef::child(idx));
                }
            }
        }

        if self.types.try_reserve(1).is_err() {
            return AddTypeOutcome::OutOfMemory;
        }
        self.types.push(candidate);
        self.dirty = true;
        AddTypeOutcome::Added(TypeRef::child(TypeIndex::from(self.types.len() - 1)))
    }

    /// Add a variable binding. Rebinding a name to a different type in
    /// the same container is rejected; rebinding to the same type is a
    /// no-op.
    pub fn add_variable(&mut self, name: StrAtom, ty: TypeRef) -> Result<(), VariableConflict> {
        match self.variables.get(&name) {
            Some(existing) if *existing == ty => Ok(()),
            Some(_) => Err(VariableConflict),
            None => {
                self.variables.insert(name, ty);
                self.dirty = true;
                Ok(())
            }
        }
    }

    /// Add one external string mapping, fanning it into this
    /// container's external table.
    pub fn add_external_string(&mut self, content: &str, offset: u32) {
        self.external.insert(offset, content.to_string());
        self.dirty = true;
    }

    pub fn external_strings(&self) -> impl Iterator<Item = (u32, &str)> {
        self.external.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

/// A variable name is already bound to a different type in this container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableConflict;

/// One-level structural equality between two types, each resolved
/// within its own (container, parent) scope.
///
/// Nested composite types (struct/union/enum/forward reached through a
/// pointer, array, field, or function signature) are compared by kind
/// and name only, never recursed into — this keeps the comparison
/// total on self-referential shapes (e.g. a linked-list node pointing
/// to itself through a pointer field) without a visited-set, at the
/// cost of not distinguishing two identically-named-but-differently-
/// shaped types reached only through one level of nesting. That
/// coarseness is an intentional, acknowledged limitation of
/// duplicate-structure detection here.
pub fn types_equal(
    a: &TypeDef,
    a_container: &Container,
    a_parent: Option<&Container>,
    b: &TypeKind,
    b_container: &Container,
    b_parent: Option<&Container>,
) -> bool {
    kinds_equal_top(&a.kind, a_container, a_parent, b, b_container, b_parent)
}

fn kinds_equal_top(
    a: &TypeKind,
    ac: &Container,
    ap: Option<&Container>,
    b: &TypeKind,
    bc: &Container,
    bp: Option<&Container>,
) -> bool {
    if !a.same_kind(b) {
        return false;
    }
    match (a, b) {
        (
            TypeKind::Integer { name: an, bits: ab, signed: asig },
            TypeKind::Integer { name: bn, bits: bb, signed: bsig },
        ) => same_name(*an, ac, *bn, bc) && ab == bb && asig == bsig,
        (TypeKind::Pointer { target: at }, TypeKind::Pointer { target: bt }) => {
            refs_equal_shallow(*at, ac, ap, *bt, bc, bp)
        }
        (
            TypeKind::Array { element: ae, count: acnt },
            TypeKind::Array { element: be, count: bcnt },
        ) => acnt == bcnt && refs_equal_shallow(*ae, ac, ap, *be, bc, bp),
        (
            TypeKind::Struct { name: an, fields: af },
            TypeKind::Struct { name: bn, fields: bf },
        )
        | (TypeKind::Union { name: an, fields: af }, TypeKind::Union { name: bn, fields: bf }) => {
            same_opt_name(*an, ac, *bn, bc) && fields_equal(af, ac, ap, bf, bc, bp)
        }
        (
            TypeKind::Enum { name: an, variants: av },
            TypeKind::Enum { name: bn, variants: bv },
        ) => {
            same_opt_name(*an, ac, *bn, bc)
                && av.len() == bv.len()
                && av.iter().zip(bv.iter()).all(|((avn, avv), (bvn, bvv))| {
                    avv == bvv && atom_eq(*avn, ac, *bvn, bc)
                })
        }
        (
            TypeKind::Function { return_ty: ar, params: aparams, variadic: avar },
            TypeKind::Function { return_ty: br, params: bparams, variadic: bvar },
        ) => {
            avar == bvar
                && refs_equal_shallow(*ar, ac, ap, *br, bc, bp)
                && aparams.len() == bparams.len()
                && aparams
                    .iter()
                    .zip(bparams.iter())
                    .all(|(ap_, bp_)| refs_equal_shallow(*ap_, ac, ap, *bp_, bc, bp))
        }
        (TypeKind::Typedef { name: an, target: at }, TypeKind::Typedef { name: bn, target: bt }) => {
            atom_eq(*an, ac, *bn, bc) && refs_equal_shallow(*at, ac, ap, *bt, bc, bp)
        }
        (TypeKind::Forward { name: an }, TypeKind::Forward { name: bn }) => atom_eq(*an, ac, *bn, bc),
        _ => false,
    }
}

fn fields_equal(
    a: &[Field],
    ac: &Container,
    ap: Option<&Container>,
    b: &[Field],
    bc: &Container,
    bp: Option<&Container>,
) -> bool {
    a.len() == b.len()
        && a.iter().zip(b.iter()).all(|(af, bf)| {
            af.bit_offset == bf.bit_offset
                && atom_eq(af.name, ac, bf.name, bc)
                && refs_equal_shallow(af.ty, ac, ap, bf.ty, bc, bp)
        })
}

/// Compare two type references without recursing past one level: if
/// either resolves to a named composite or forward declaration, compare
/// by (kind, name) only.
fn refs_equal_shallow(
    a: TypeRef,
    ac: &Container,
    ap: Option<&Container>,
    b: TypeRef,
    bc: &Container,
    bp: Option<&Container>,
) -> bool {
    if a.is_none() || b.is_none() {
        return a.is_none() && b.is_none();
    }
    let a_def = ac.resolve(a, ap);
    let b_def = bc.resolve(b, bp);
    match (a_def, b_def) {
        (Some(ad), Some(bd)) => match (&ad.kind, &bd.kind) {
            (
                TypeKind::Struct { name: an, .. } | TypeKind::Union { name: an, .. } | TypeKind::Enum { name: an, .. },
                TypeKind::Struct { name: bn, .. } | TypeKind::Union { name: bn, .. } | TypeKind::Enum { name: bn, .. },
            ) => ad.kind.same_kind(&bd.kind) && same_opt_name(*an, ac, *bn, bc),
            (TypeKind::Forward { name: an }, TypeKind::Forward { name: bn }) => atom_eq(*an, ac, *bn, bc),
            _ => kinds_equal_top(&ad.kind, ac, ap, &bd.kind, bc, bp),
        },
        (None, None) => true,
        _ => false,
    }
}

fn atom_eq(a: StrAtom, ac: &Container, b: StrAtom, bc: &Container) -> bool {
    match (ac.interner.resolve(a), bc.interner.resolve(b)) {
        (Some(sa), Some(sb)) => sa == sb,
        _ => a == b,
    }
}

fn same_name(a: StrAtom, ac: &Container, b: StrAtom, bc: &Container) -> bool {
    atom_eq(a, ac, b, bc)
}

fn same_opt_name(a: Option<StrAtom>, ac: &Container, b: Option<StrAtom>, bc: &Container) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => atom_eq(a, ac, b, bc),
        (None, None) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interner() -> Rc<StringInterner> {
        Rc::new(StringInterner::new())
    }

    fn int_type(c: &Container, name: &str, bits: u8) -> TypeDef {
        TypeDef::new(TypeKind::Integer { name: c.intern(name), bits, signed: true })
    }

    #[test]
    fn adding_identical_named_type_twice_dedups() {
        let mut c = Container::new(interner());
        let a = c.add_type(None, int_type(&c, "int", 32));
        let b = c.add_type(None, int_type(&c, "int", 32));
        match (a, b) {
            (AddTypeOutcome::Added(ra), AddTypeOutcome::Added(rb)) => assert_eq!(ra, rb),
            _ => panic!("expected both adds to succeed and dedup"),
        }
        assert_eq!(c.type_count(), 1);
    }

    #[test]
    fn conflicting_same_name_type_reports_conflict() {
        let mut c = Container::new(interner());
        let int_name = c.intern("S");
        let s1 = TypeDef::new(TypeKind::Struct {
            name: Some(int_name),
            fields: vec![Field { name: c.intern("a"), ty: TypeRef::NONE, bit_offset: 0 }],
        });
        let s2 = TypeDef::new(TypeKind::Struct {
            name: Some(int_name),
            fields: vec![Field { name: c.intern("b"), ty: TypeRef::NONE, bit_offset: 0 }],
        });
        assert!(matches!(c.add_type(None, s1), AddTypeOutcome::Added(_)));
        assert!(matches!(c.add_type(None, s2), AddTypeOutcome::Conflict));
    }

    #[test]
    fn pointer_to_conflicting_struct_does_not_recurse_infinitely() {
        let mut c = Container::new(interner());
        let node_name = c.intern("Node");
        // struct Node { Node *next; }
        let forward = c.add_type(None, TypeDef::new(TypeKind::Forward { name: node_name }));
        let forward_ref = match forward {
            AddTypeOutcome::Added(r) => r,
            _ => panic!(),
        };
        let ptr = c.add_type(None, TypeDef::new(TypeKind::Pointer { target: forward_ref }));
        let ptr_ref = match ptr {
            AddTypeOutcome::Added(r) => r,
            _ => panic!(),
        };
        let node = TypeDef::new(TypeKind::Struct {
            name: Some(node_name),
            fields: vec![Field { name: c.intern("next"), ty: ptr_ref, bit_offset: 0 }],
        });
        // Self-referential struct must not hang the comparator.
        assert!(matches!(c.add_type(None, node), AddTypeOutcome::Conflict | AddTypeOutcome::Added(_)));
    }

    #[test]
    fn variable_rebinding_same_type_is_a_noop() {
        let mut c = Container::new(interner());
        let name = c.intern("g");
        let ty = TypeRef::child(TypeIndex::from_one_based(1));
        assert!(c.add_variable(name, ty).is_ok());
        assert!(c.add_variable(name, ty).is_ok());
        assert_eq!(c.variables().count(), 1);
    }

    #[test]
    fn variable_rebinding_different_type_conflicts() {
        let mut c = Container::new(interner());
        let name = c.intern("g");
        let ty1 = TypeRef::child(TypeIndex::from_one_based(1));
        let ty2 = TypeRef::child(TypeIndex::from_one_based(2));
        assert!(c.add_variable(name, ty1).is_ok());
        assert!(c.add_variable(name, ty2).is_err());
    }
}
