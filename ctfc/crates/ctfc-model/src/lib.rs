//! ctfc-model - the CTF link engine's data model
//!
//! This crate defines the shapes the core link engine (`ctfc-link`)
//! operates on: [`Container`], [`TypeRef`], the in-memory [`TypeDef`]
//! representation, [`Archive`], and the shared [`LinkError`] taxonomy.
//! It also defines the trait boundary to the "external collaborators"
//! that a real CTF linker relies on but that this repository does not
//! implement: opening an archive from an object file, decoding the
//! on-disk CTF type encoding, and writing compressed archive members.

pub mod archive;
pub mod container;
pub mod debug;
pub mod error;
pub mod ids;
pub mod types;

pub use archive::{
    Archive, ArchiveMember, ArchiveSource, ArchiveWriter, InMemoryArchive, InMemoryArchiveSource,
    CTF_MAIN,
};
pub use container::{AddTypeOutcome, Container};
pub use error::{LinkError, Result};
pub use ids::{ContainerId, TypeIndex, TypeRef};
pub use types::{Field, TypeDef, TypeKind};
