//! Error types for the collab engine.

use crate::{DocumentId, Namespace};
use thiserror::Error;

/// All possible errors from the collab engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Schema errors
    #[error("root element must be an object, got {found}")]
    RootNotObject { found: String },

    // Naming errors
    #[error("invalid collection name: {0}")]
    InvalidCollection(String),

    // Payload errors
    #[error("unknown content type: {0}")]
    UnknownContentType(String),

    // Store errors
    #[error("document already exists: {namespace}/{id}")]
    DocumentAlreadyExists {
        namespace: Namespace,
        id: DocumentId,
    },
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::RootNotObject {
            found: "array".into(),
        };
        assert_eq!(err.to_string(), "root element must be an object, got array");

        let err = Error::InvalidCollection("".into());
        assert_eq!(err.to_string(), "invalid collection name: ");

        let err = Error::DocumentAlreadyExists {
            namespace: Namespace::for_collection("notes").unwrap(),
            id: "note-1".into(),
        };
        assert_eq!(
            err.to_string(),
            "document already exists: collab_data_notes/note-1"
        );
    }
}
