use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive buffer is truncated at byte offset {offset}")]
    Truncated { offset: usize },

    #[error("archive buffer has an unrecognized magic number")]
    BadMagic,

    #[error("archive buffer has unsupported format version {0}")]
    UnsupportedVersion(u32),

    #[error("member name is not valid UTF-8")]
    InvalidName,

    #[error("duplicate member name: {0}")]
    DuplicateMember(String),
}

pub type Result<T> = std::result::Result<T, ArchiveError>;
