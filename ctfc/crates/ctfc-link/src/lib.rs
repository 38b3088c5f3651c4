//! ctfc-link - the CTF link engine core
//!
//! Four cooperating pieces, leaves first: the type-mapping index
//! ([`typemap`]), the type/variable merger ([`merge`]), external string
//! interning ([`strtab`]), and the [`linker::Linker`] façade that ties
//! them to the CLI's programmatic surface.

pub mod linker;
pub mod merge;
pub mod strtab;
pub mod typemap;

pub use linker::Linker;
pub use merge::ShareMode;
pub use typemap::TypeMapIndex;
