//! Error types for the Wardline engine.

use crate::DocumentId;
use thiserror::Error;

/// All possible errors from the Wardline engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Path errors
    #[error("invalid collection path: {0}")]
    InvalidPath(String),

    // Document errors
    #[error("document not found: {0}")]
    DocumentNotFound(DocumentId),

    #[error("document already exists: {0}")]
    DocumentExists(DocumentId),

    #[error("document body is not a JSON object")]
    NotAnObject,

    // Write errors
    #[error("field '{0}' is not an array")]
    FieldNotArray(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::DocumentNotFound("note-1".into());
        assert_eq!(err.to_string(), "document not found: note-1");

        let err = Error::InvalidPath("a/b".into());
        assert_eq!(err.to_string(), "invalid collection path: a/b");

        let err = Error::FieldNotArray("notes".into());
        assert_eq!(err.to_string(), "field 'notes' is not an array");
    }
}
