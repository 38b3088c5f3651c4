//! Archive traits and an in-memory implementation.
//!
//! Opening an archive from an on-disk object file, and decoding a raw
//! CTF member into [`crate::TypeDef`]s, are both out of scope for this
//! repository — a real deployment plugs those in. What this module
//! owns is the *shape* of an archive the link engine consumes and
//! produces: a named collection of byte-blob members, one of which may
//! be the reserved default member.

use crate::container::Container;
use crate::error::{LinkError, Result};

/// The name reserved for an archive's default (shared) CTF member.
pub const CTF_MAIN: &str = ".ctf";

/// An already-opened, already-decoded input archive: a named sequence
/// of containers in archive-defined order.
///
/// Opening an archive from an ELF/BFD object, and decoding its raw CTF
/// section into these containers, both happen upstream of this trait;
/// `ArchiveSource` is the seam the link engine actually consumes.
pub trait ArchiveSource {
    fn members(&self) -> &[(String, Container)];

    fn find(&self, name: &str) -> Option<&Container> {
        self.members().iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }

    fn main(&self) -> Option<&Container> {
        self.find(CTF_MAIN)
    }
}

/// An `ArchiveSource` backed by a plain in-memory vector of containers,
/// in the order they should be walked.
pub struct InMemoryArchiveSource {
    members: Vec<(String, Container)>,
}

impl InMemoryArchiveSource {
    pub fn new(members: Vec<(String, Container)>) -> Self {
        InMemoryArchiveSource { members }
    }
}

impl ArchiveSource for InMemoryArchiveSource {
    fn members(&self) -> &[(String, Container)] {
        &self.members
    }
}

/// One named, opaque byte blob inside an archive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveMember {
    pub name: String,
    pub data: Vec<u8>,
}

impl ArchiveMember {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        ArchiveMember { name: name.into(), data }
    }
}

/// Read access to an archive of CTF members, as handed to the link
/// engine by whatever opened the underlying object file.
pub trait Archive {
    fn members(&self) -> &[ArchiveMember];

    fn get(&self, name: &str) -> Option<&ArchiveMember> {
        self.members().iter().find(|m| m.name == name)
    }

    fn has_main(&self) -> bool {
        self.get(CTF_MAIN).is_some()
    }
}

/// Write access for assembling an output archive.
///
/// Compressing members above a size threshold is out of scope;
/// implementations of this trait are expected to *record* that a
/// member exceeded the threshold (see
/// [`InMemoryArchive::oversized_members`]) without actually compressing
/// it.
pub trait ArchiveWriter {
    fn add_member(&mut self, member: ArchiveMember) -> Result<()>;
    fn finish(self: Box<Self>) -> Result<Vec<u8>>;
}

/// A simple in-memory archive: good enough to be both a test double for
/// [`Archive`] and the default [`ArchiveWriter`], serialized by
/// `ctfc-archive` for on-disk round trips.
#[derive(Default, Debug, Clone)]
pub struct InMemoryArchive {
    members: Vec<ArchiveMember>,
    oversized: Vec<String>,
    size_threshold: Option<usize>,
}

impl InMemoryArchive {
    pub fn new() -> Self {
        InMemoryArchive::default()
    }

    pub fn from_members(members: Vec<ArchiveMember>) -> Self {
        InMemoryArchive { members, oversized: Vec::new(), size_threshold: None }
    }

    /// Set the size (in bytes) above which a member is flagged as a
    /// compression candidate instead of actually being compressed.
    pub fn with_size_threshold(mut self, threshold: usize) -> Self {
        self.size_threshold = Some(threshold);
        self
    }

    /// Names of members that exceeded the configured size threshold.
    pub fn oversized_members(&self) -> &[String] {
        &self.oversized
    }
}

impl Archive for InMemoryArchive {
    fn members(&self) -> &[ArchiveMember] {
        &self.members
    }
}

impl ArchiveWriter for InMemoryArchive {
    fn add_member(&mut self, member: ArchiveMember) -> Result<()> {
        if self.members.iter().any(|m| m.name == member.name) {
            return Err(LinkError::Format {
                stage: "archive-assembly".to_string(),
                detail: format!("duplicate member name: {}", member.name),
            });
        }
        if let Some(threshold) = self.size_threshold {
            if member.data.len() > threshold {
                self.oversized.push(member.name.clone());
            }
        }
        self.members.push(member);
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<Vec<u8>> {
        ctfc_archive_frame(&self.members)
    }
}

/// A minimal length-prefixed framing used when an `InMemoryArchive` is
/// asked to serialize itself directly (no external archive format
/// dependency is warranted for this; see `ctfc-archive` for the richer
/// reader/writer pair used by the CLI).
fn ctfc_archive_frame(members: &[ArchiveMember]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    out.extend_from_slice(&(members.len() as u32).to_le_bytes());
    for m in members {
        let name_bytes = m.name.as_bytes();
        out.extend_from_slice(&(name_bytes.len() as u32).to_le_bytes());
        out.extend_from_slice(name_bytes);
        out.extend_from_slice(&(m.data.len() as u32).to_le_bytes());
        out.extend_from_slice(&m.data);
    }
    Ok(out)
}
