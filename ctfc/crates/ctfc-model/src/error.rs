//! The link engine's error taxonomy.

use thiserror::Error;

/// Errors the link engine can report to its caller.
///
/// `Conflict` never escapes the merger: a type-shape conflict is
/// resolved internally by falling back to a per-CU output container,
/// not surfaced as a failure, so it is not a variant here;
/// see [`crate::container::AddTypeOutcome::Conflict`] for that internal
/// signal instead.
#[derive(Debug, Error)]
pub enum LinkError {
    /// A type or variable was added to a container after it was
    /// finalized: once a container's type-mapping index has been
    /// built, further additions are rejected rather than silently
    /// invalidating it.
    #[error("cannot add to container {container} after it has been finalized")]
    LateAdd { container: String },

    /// The requested behavior is recognized by the CLI surface but not
    /// implemented by this engine (e.g. `share-duplicated` mode).
    #[error("not yet implemented: {0}")]
    NotYetImplemented(String),

    /// A table could not grow to hold a new entry.
    #[error("out of memory while growing {0}")]
    OutOfMemory(&'static str),

    /// A named archive member was requested but does not exist.
    #[error("archive member not found: {0}")]
    MemberNotFound(String),

    /// A type-mapping index lookup found a mapping with a type index
    /// outside either endpoint's table bounds.
    #[error("invalid type mapping: index {index} out of bounds for container {container}")]
    InvalidMapping { container: String, index: u32 },

    /// An archive or other CTF artifact was malformed at some pipeline stage.
    #[error("malformed input at {stage}: {detail}")]
    Format { stage: String, detail: String },
}

pub type Result<T> = std::result::Result<T, LinkError>;
