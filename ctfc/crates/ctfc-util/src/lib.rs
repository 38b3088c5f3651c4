//! ctfc-util - Core utilities for the CTF link engine
//!
//! Foundation types shared by every other `ctfc-*` crate: a string
//! interner for CTF identifiers and a couple of hash-map aliases tuned
//! for the small, hot key spaces a link engine works over.
//!
//! None of this is specific to CTF; it is the same kind of toolkit a
//! small compiler's utility crate carries, generalized for a linker
//! instead of a front end.

pub mod interner;

pub use interner::{StrAtom, StringInterner};

pub use rustc_hash::{FxHashMap, FxHashSet};
