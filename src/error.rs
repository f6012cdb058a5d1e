//! Error taxonomy for facade operations.
//!
//! Every failure is a distinct, inspectable variant; nothing is swallowed
//! and nothing is retried, since native calls are not assumed idempotent.

use thiserror::Error;

use crate::types::TypeTag;

/// Result type for facade operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the facade.
///
/// Validation variants (`UnknownMethod`, `Arity`, `CharLength`, `IntRange`,
/// `TypeMismatch`) are raised before any native interaction and are
/// recoverable by correcting inputs. `NativeCall` carries the bridge's
/// message verbatim, uninterpreted.
#[derive(Debug, Error)]
pub enum Error {
    /// Method name absent from the handle's method table.
    #[error("method '{0}' is not defined")]
    UnknownMethod(String),

    /// Argument count does not match the signature's arity.
    #[error("expected {expected} params, but found {actual}")]
    Arity { expected: usize, actual: usize },

    /// Character argument was text of the wrong length.
    #[error("expected char to be of 1 byte, but got {actual} instead")]
    CharLength { actual: usize },

    /// Integer argument does not fit its declared native width.
    #[error("value {value} is out of range for {tag}")]
    IntRange { value: i128, tag: TypeTag },

    /// Argument value has the wrong shape for its declared tag.
    #[error("cannot pass {got} for a {tag} parameter")]
    TypeMismatch { tag: TypeTag, got: &'static str },

    /// The bridge could not load the library file.
    #[error("failed to load library '{path}': {reason}")]
    LoadFailure { path: String, reason: String },

    /// The running platform has no resolvable artifact.
    #[error("unsupported platform '{0}'")]
    UnsupportedPlatform(String),

    /// Artifact retrieval failed.
    #[error("failed to retrieve '{url}': {reason}")]
    Fetch { url: String, reason: String },

    /// Filesystem error while caching an artifact.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Descriptor serialization failed.
    #[error("failed to serialize descriptor: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The bridge reported an explicit error envelope.
    #[error("native call failed: {0}")]
    NativeCall(String),

    /// The handle's resource was already released.
    #[error("library was already closed")]
    UseAfterClose,

    /// The bridge's success payload did not match the declared return type.
    #[error("malformed bridge response: {0}")]
    MalformedResponse(String),

    /// A pointer return or memory read produced the wrong number of bytes.
    #[error("expected {expected} bytes, but got {actual} instead")]
    ReturnLength { expected: usize, actual: usize },
}
