//! ctfc-archive - the concrete archive writer/reader pair
//!
//! Opening an archive from an object file and decoding its raw CTF
//! section are both left to whatever hands containers to the link
//! engine; this crate owns the format actually written to disk:
//! ordered named members, the default member first under the reserved
//! name, and a per-member compress-above-threshold flag (the decision
//! is recorded; actually compressing a member is out of scope, see
//! `DESIGN.md`).

pub mod error;
pub mod payload;
pub mod reader;
pub mod writer;

pub use error::ArchiveError;
pub use payload::{decode_container_summary, encode_container, ContainerSummary};
pub use reader::{read, ParsedMember};
pub use writer::CtfArchiveWriter;
