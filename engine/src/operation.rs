//! Change operations emitted by a document store.
//!
//! Every successful create or delete produces one operation. Backends forward
//! these to subscribers so their views stay current.

use crate::{ContentType, DocumentId, Namespace, Timestamp, Version};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A document was created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOp {
    /// Target namespace
    pub namespace: Namespace,
    /// Created document
    pub id: DocumentId,
    /// Content type of the new document
    pub content_type: ContentType,
    /// Initial content
    pub data: Value,
    /// Version after the create
    pub version: Version,
    /// Timestamp of operation
    pub timestamp: Timestamp,
}

/// A document was deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOp {
    /// Target namespace
    pub namespace: Namespace,
    /// Deleted document
    pub id: DocumentId,
    /// Version after the delete
    pub version: Version,
    /// Timestamp of operation
    pub timestamp: Timestamp,
}

/// An operation applied by a document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Operation {
    Create(CreateOp),
    Delete(DeleteOp),
}

impl Operation {
    /// Get the namespace this operation targets.
    pub fn namespace(&self) -> &Namespace {
        match self {
            Operation::Create(op) => &op.namespace,
            Operation::Delete(op) => &op.namespace,
        }
    }

    /// Get the document ID this operation targets.
    pub fn document_id(&self) -> &DocumentId {
        match self {
            Operation::Create(op) => &op.id,
            Operation::Delete(op) => &op.id,
        }
    }

    /// Get the version the document reached.
    pub fn version(&self) -> Version {
        match self {
            Operation::Create(op) => op.version,
            Operation::Delete(op) => op.version,
        }
    }

    /// Whether this operation targets the given document.
    pub fn targets(&self, namespace: &Namespace, id: &str) -> bool {
        self.namespace() == namespace && self.document_id() == id
    }
}
