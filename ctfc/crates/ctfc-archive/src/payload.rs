//! Per-member payload codec.
//!
//! Decoding the real on-disk CTF type encoding is out of scope here;
//! what this module encodes is only the small summary the emission
//! path and the `inspect` CLI command need: how many types and
//! variables a finalized container carries. Emission produces the
//! whole buffer at once rather than a faithful CTF binary format.

use ctfc_model::Container;

use crate::error::{ArchiveError, Result};

/// Type/variable counts extracted from a finalized container's payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContainerSummary {
    pub type_count: u32,
    pub variable_count: u32,
}

pub fn encode_container(container: &Container) -> Vec<u8> {
    let mut buf = Vec::with_capacity(8);
    buf.extend_from_slice(&(container.type_count() as u32).to_le_bytes());
    buf.extend_from_slice(&(container.variables().count() as u32).to_le_bytes());
    buf
}

pub fn decode_container_summary(bytes: &[u8]) -> Result<ContainerSummary> {
    if bytes.len() < 8 {
        return Err(ArchiveError::Truncated { offset: bytes.len() });
    }
    let type_count = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
    let variable_count = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
    Ok(ContainerSummary { type_count, variable_count })
}
