//! Reads back a buffer written by [`crate::writer::CtfArchiveWriter`].

use crate::error::{ArchiveError, Result};
use crate::payload::decode_container_summary;

const MAGIC: &[u8; 4] = b"CTFL";

/// One member as read back from an emitted archive buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedMember {
    pub name: String,
    pub type_count: u32,
    pub variable_count: u32,
    pub oversized: bool,
}

/// Parse an archive buffer into its ordered member list. Used by the
/// `inspect` CLI command and by round-trip tests.
pub fn read(bytes: &[u8]) -> Result<Vec<ParsedMember>> {
    let mut cursor = Cursor::new(bytes);
    let magic = cursor.take(4)?;
    if magic != MAGIC {
        return Err(ArchiveError::BadMagic);
    }
    let version = u32::from_le_bytes(cursor.take(4)?.try_into().unwrap());
    if version != 1 {
        return Err(ArchiveError::UnsupportedVersion(version));
    }
    let count = u32::from_le_bytes(cursor.take(4)?.try_into().unwrap());

    let mut members = Vec::with_capacity(count as usize);
    let mut seen = std::collections::HashSet::new();
    for _ in 0..count {
        let name_len = u32::from_le_bytes(cursor.take(4)?.try_into().unwrap()) as usize;
        let name = String::from_utf8(cursor.take(name_len)?.to_vec()).map_err(|_| ArchiveError::InvalidName)?;
        if !seen.insert(name.clone()) {
            return Err(ArchiveError::DuplicateMember(name));
        }
        let data_len = u32::from_le_bytes(cursor.take(4)?.try_into().unwrap()) as usize;
        let data = cursor.take(data_len)?;
        let summary = decode_container_summary(data)?;
        let flag = cursor.take(1)?[0];
        members.push(ParsedMember {
            name,
            type_count: summary.type_count,
            variable_count: summary.variable_count,
            oversized: flag != 0,
        });
    }
    Ok(members)
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Cursor { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.pos + n > self.bytes.len() {
            return Err(ArchiveError::Truncated { offset: self.pos });
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }
}
