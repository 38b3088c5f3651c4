//! Thread-safe string interning.
//!
//! CTF string atoms (identifiers, member names, CU names) recur heavily
//! inside a single container and across the containers being merged.
//! `StringInterner` gives each distinct string a stable, compact
//! [`StrAtom`] handle so containers can compare and hash strings in
//! O(1) instead of carrying owned `String`s everywhere.
//!
//! The interner is `Sync` (backed by `DashMap`) even though the link
//! engine itself runs single-threaded: upstream compilation units are
//! typically produced in parallel, and a process shared by several
//! CU-producing threads still wants one global string table.

use dashmap::DashMap;
use std::hash::{BuildHasherDefault, Hash, Hasher};
use std::sync::atomic::{AtomicU32, Ordering};

type AHashBuilder = BuildHasherDefault<ahash::AHasher>;

/// A compact, interned string handle.
///
/// Two atoms compare equal iff the strings they were interned from are
/// equal; comparison is a single `u32` comparison.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct StrAtom(u32);

impl StrAtom {
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

/// Global table of interned strings, backed by a lock-free concurrent map.
pub struct StringInterner {
    by_hash: DashMap<u64, (&'static str, u32), AHashBuilder>,
    strings: DashMap<u32, &'static str, AHashBuilder>,
    next: AtomicU32,
}

impl StringInterner {
    pub fn new() -> Self {
        Self {
            by_hash: DashMap::with_hasher(AHashBuilder::default()),
            strings: DashMap::with_hasher(AHashBuilder::default()),
            next: AtomicU32::new(0),
        }
    }

    fn hash_of(s: &str) -> u64 {
        let mut hasher = ahash::AHasher::default();
        s.hash(&mut hasher);
        hasher.finish()
    }

    /// Intern `s`, returning its atom. Interning the same content twice
    /// returns the same atom.
    pub fn intern(&self, s: &str) -> StrAtom {
        let hash = Self::hash_of(s);
        if let Some(entry) = self.by_hash.get(&hash) {
            if entry.0 == s {
                return StrAtom(entry.1);
            }
        }
        let leaked: &'static str = Box::leak(s.to_string().into_boxed_str());
        let idx = self.next.fetch_add(1, Ordering::Relaxed);
        self.by_hash.insert(hash, (leaked, idx));
        self.strings.insert(idx, leaked);
        StrAtom(idx)
    }

    /// Resolve an atom back to its string content.
    pub fn resolve(&self, atom: StrAtom) -> Option<&'static str> {
        self.strings.get(&atom.0).map(|r| *r)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_same_string_twice_yields_same_atom() {
        let interner = StringInterner::new();
        let a = interner.intern("foo");
        let b = interner.intern("foo");
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_strings_get_distinct_atoms() {
        let interner = StringInterner::new();
        let a = interner.intern("foo");
        let b = interner.intern("bar");
        assert_ne!(a, b);
    }

    #[test]
    fn resolve_roundtrips() {
        let interner = StringInterner::new();
        let atom = interner.intern("struct S");
        assert_eq!(interner.resolve(atom), Some("struct S"));
    }

    #[test]
    fn unknown_atom_resolves_to_none() {
        let interner = StringInterner::new();
        let atom = interner.intern("known");
        let bogus = StrAtom(atom.as_u32() + 1000);
        assert_eq!(interner.resolve(bogus), None);
    }
}
