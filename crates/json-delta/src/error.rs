//! Error types for the diff crate.

use json_delta_path::PathError;

/// Errors surfaced by json-delta.
///
/// An identity or index that does not resolve in a tree is not an error;
/// those lookups return `None`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DeltaError {
    /// A path string did not parse or had the wrong dialect.
    #[error("malformed path: {0}")]
    Path(#[from] PathError),

    /// An identity key string (`id`, `a+b`) was empty or had an empty part.
    #[error("invalid identity key: {0:?}")]
    InvalidIdentityKey(String),

    /// A detector threshold was out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Convenience alias for json-delta results.
pub type DeltaResult<T> = Result<T, DeltaError>;
