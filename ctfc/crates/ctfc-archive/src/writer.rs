//! Archive-level framing: ordered named members, default member first,
//! a compress-above-threshold decision recorded but not acted on —
//! actually compressing a member is out of scope.

use ctfc_model::{ArchiveMember, ArchiveWriter as ArchiveWriterTrait, CTF_MAIN};

use crate::error::Result as ArchiveResult;

const MAGIC: &[u8; 4] = b"CTFL";
const VERSION: u32 = 1;

/// Marks a member as flagged-for-compression in the frame without
/// compressing it.
const FLAG_OVERSIZED: u8 = 1;

/// The concrete `ArchiveWriter` the CLI wires the link engine's output
/// through: `ctfc_model::InMemoryArchive` is a minimal in-memory test
/// double, this is the format actually written to disk.
pub struct CtfArchiveWriter {
    threshold: usize,
    members: Vec<ArchiveMember>,
    oversized: Vec<String>,
}

impl CtfArchiveWriter {
    pub fn new(compression_threshold: usize) -> Self {
        CtfArchiveWriter { threshold: compression_threshold, members: Vec::new(), oversized: Vec::new() }
    }

    pub fn oversized_members(&self) -> &[String] {
        &self.oversized
    }
}

impl ArchiveWriterTrait for CtfArchiveWriter {
    fn add_member(&mut self, member: ArchiveMember) -> ctfc_model::Result<()> {
        if self.members.iter().any(|m| m.name == member.name) {
            return Err(ctfc_model::LinkError::Format {
                stage: "archive-assembly".to_string(),
                detail: format!("duplicate member name: {}", member.name),
            });
        }
        if member.data.len() > self.threshold {
            self.oversized.push(member.name.clone());
        }
        self.members.push(member);
        Ok(())
    }

    fn finish(self: Box<Self>) -> ctfc_model::Result<Vec<u8>> {
        encode(&self.members, &self.oversized).map_err(|e| ctfc_model::LinkError::Format {
            stage: "archive writing".to_string(),
            detail: e.to_string(),
        })
    }
}

/// Build the final byte buffer: magic, version, member count, then each
/// member as `name-len name data-len data flag`. The default member
/// (named `CTF_MAIN`) is expected to be first in `members`; this
/// function does not reorder.
fn encode(members: &[ArchiveMember], oversized: &[String]) -> ArchiveResult<Vec<u8>> {
    let mut out = Vec::new();
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&VERSION.to_le_bytes());
    out.extend_from_slice(&(members.len() as u32).to_le_bytes());
    for member in members {
        let name_bytes = member.name.as_bytes();
        out.extend_from_slice(&(name_bytes.len() as u32).to_le_bytes());
        out.extend_from_slice(name_bytes);
        out.extend_from_slice(&(member.data.len() as u32).to_le_bytes());
        out.extend_from_slice(&member.data);
        let flag = if oversized.iter().any(|n| n == &member.name) { FLAG_OVERSIZED } else { 0 };
        out.push(flag);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_members_in_given_order() {
        let members = vec![
            ArchiveMember::new(CTF_MAIN, vec![1, 2, 3, 4, 5, 6, 7, 8]),
            ArchiveMember::new(".ctf.b.o", vec![0; 8]),
        ];
        let bytes = encode(&members, &[]).unwrap();
        assert!(bytes.starts_with(MAGIC));
    }

    #[test]
    fn oversized_member_is_flagged_in_the_frame() {
        let members = vec![ArchiveMember::new(CTF_MAIN, vec![0; 16])];
        let bytes = encode(&members, &[CTF_MAIN.to_string()]).unwrap();
        assert_eq!(*bytes.last().unwrap(), FLAG_OVERSIZED);
    }
}
