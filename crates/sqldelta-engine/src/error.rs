//! Error types for the diff engine.
//!
//! Recoverable conditions (missing inheritance parents, undroppable
//! objects) are not errors: they are logged and skipped, and their
//! absence is safe by construction. Everything here either aborts the
//! run with context for the end user, or reports cooperative
//! cancellation.

use sqldelta_model::{ObjectId, ObjectKind, QualifiedName};

/// Errors that can occur while diffing and assembling a script.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// An object of a kind excluded by the allowed-objects filter was
    /// encountered while `stop_on_not_allowed` is set.
    #[error("object type {kind} is not allowed: {name}")]
    DisallowedObject {
        /// Kind of the offending object.
        kind: ObjectKind,
        /// Qualified name of the offending object.
        name: QualifiedName,
    },

    /// A caller-supplied ordering pair references an object that
    /// exists in neither snapshot.
    #[error("forced ordering references unknown object: {0}")]
    UnknownOrderingTarget(ObjectId),

    /// An ignore rule carries a pattern that does not compile.
    #[error("invalid ignore pattern '{pattern}'")]
    InvalidIgnorePattern {
        /// The offending pattern text.
        pattern: String,
        /// Compilation failure.
        #[source]
        source: regex::Error,
    },

    /// The operation was cancelled through its token. No partial
    /// script is returned.
    #[error("operation cancelled")]
    Cancelled,
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
