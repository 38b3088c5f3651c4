//! Type-mapping index: destination-side record of which
//! source `(container, type index)` pairs now live at which destination
//! type index.

use ctfc_model::{ContainerId, TypeIndex, TypeRef};
use rustc_hash::FxHashMap;

/// A normalized source key: the container that actually *owns* the
/// type (after walking a parent-scoped reference to its parent) paired
/// with the type's bare index in that container.
pub type SourceKey = (ContainerId, TypeIndex);

/// Records, per destination container, `source key -> destination bare
/// index`. One table per destination, built incrementally as types are
/// added to that destination.
#[derive(Default)]
pub struct TypeMapIndex {
    tables: FxHashMap<ContainerId, FxHashMap<SourceKey, TypeIndex>>,
}

impl TypeMapIndex {
    pub fn new() -> Self {
        TypeMapIndex::default()
    }

    /// Normalize `(container, type_ref)` to a bare source key by
    /// walking to `parent_of` when `type_ref` is parent-scoped.
    pub fn normalize(container: ContainerId, type_ref: TypeRef, parent_of: Option<ContainerId>) -> SourceKey {
        if type_ref.is_parent_scoped() {
            (parent_of.unwrap_or(container), type_ref.index())
        } else {
            (container, type_ref.index())
        }
    }

    /// Record that `src` is now represented by `dst_bare` in `dst_c`.
    pub fn record(&mut self, src: SourceKey, dst_c: ContainerId, dst_bare: TypeIndex) {
        self.tables.entry(dst_c).or_default().insert(src, dst_bare);
    }

    /// Look up where `src` lives relative to `dst_hint`, falling back to
    /// `dst_hint`'s parent (one level only, per the container model).
    ///
    /// Returns the container the mapping was actually found in, and a
    /// `TypeRef` scoped as if referenced from a container whose parent
    /// is that resolved container's own parent-or-none — i.e.
    /// parent-scoped when the resolved container itself has a parent,
    /// child-scoped otherwise. Callers that need a reference scoped
    /// from some other vantage point (e.g. the shared output itself)
    /// adjust the locality bit themselves; see `merge::retarget_ref`.
    pub fn lookup(
        &self,
        src: SourceKey,
        dst_hint: ContainerId,
        dst_hint_has_parent: bool,
        dst_parent: Option<ContainerId>,
    ) -> Option<(ContainerId, TypeRef)> {
        if let Some(table) = self.tables.get(&dst_hint) {
            if let Some(&bare) = table.get(&src) {
                let r = if dst_hint_has_parent { TypeRef::parent(bare) } else { TypeRef::child(bare) };
                return Some((dst_hint, r));
            }
        }
        if dst_hint_has_parent {
            if let Some(parent_id) = dst_parent {
                if let Some(table) = self.tables.get(&parent_id) {
                    if let Some(&bare) = table.get(&src) {
                        // One-level invariant: the parent has no parent of its own.
                        return Some((parent_id, TypeRef::child(bare)));
                    }
                }
            }
        }
        None
    }
}
