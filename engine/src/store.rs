//! Store - in-memory document state.
//!
//! The store keeps one [`Document`] per `(namespace, id)` and applies the
//! create/delete contract the synchronization backends follow:
//! - a create on an existing document is rejected
//! - a delete on a missing document is a no-op

use crate::{
    error::Result, CreateOp, DeleteOp, Document, DocumentId, DocumentPayload, Error, Namespace,
    Operation, Timestamp, Version,
};
use std::collections::HashMap;

/// Result of a delete.
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    /// The document existed and is now cleared
    Deleted(Operation),
    /// There was nothing to delete
    Missing,
}

/// All documents, grouped by namespace.
#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    namespaces: HashMap<Namespace, HashMap<DocumentId, Document>>,
}

impl DocumentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            namespaces: HashMap::new(),
        }
    }

    /// Current state of a document, uninitialized if never seen.
    pub fn fetch(&self, namespace: &Namespace, id: &str) -> Document {
        self.namespaces
            .get(namespace)
            .and_then(|docs| docs.get(id))
            .cloned()
            .unwrap_or_else(|| Document::uninitialized(namespace.clone(), id))
    }

    /// Get an existing document.
    pub fn get(&self, namespace: &Namespace, id: &str) -> Option<&Document> {
        self.namespaces
            .get(namespace)
            .and_then(|docs| docs.get(id))
            .filter(|doc| doc.exists())
    }

    /// Create a document.
    ///
    /// Fails if the document already exists. A previously deleted document
    /// can be created again and continues its version sequence.
    pub fn create(
        &mut self,
        namespace: &Namespace,
        id: &str,
        payload: DocumentPayload,
        timestamp: Timestamp,
    ) -> Result<Operation> {
        let doc = self
            .namespaces
            .entry(namespace.clone())
            .or_default()
            .entry(id.to_string())
            .or_insert_with(|| Document::uninitialized(namespace.clone(), id));

        if doc.exists() {
            return Err(Error::DocumentAlreadyExists {
                namespace: namespace.clone(),
                id: id.to_string(),
            });
        }

        let content_type = payload.content_type;
        doc.initialize(payload, timestamp);

        Ok(Operation::Create(CreateOp {
            namespace: namespace.clone(),
            id: id.to_string(),
            content_type,
            data: doc.data.clone(),
            version: doc.version,
            timestamp,
        }))
    }

    /// Delete a document.
    pub fn delete(&mut self, namespace: &Namespace, id: &str, timestamp: Timestamp) -> DeleteOutcome {
        let Some(doc) = self
            .namespaces
            .get_mut(namespace)
            .and_then(|docs| docs.get_mut(id))
            .filter(|doc| doc.exists())
        else {
            return DeleteOutcome::Missing;
        };

        doc.clear(timestamp);

        DeleteOutcome::Deleted(Operation::Delete(DeleteOp {
            namespace: namespace.clone(),
            id: id.to_string(),
            version: doc.version,
            timestamp,
        }))
    }

    /// Current version of a document (0 if never seen).
    pub fn version(&self, namespace: &Namespace, id: &str) -> Version {
        self.namespaces
            .get(namespace)
            .and_then(|docs| docs.get(id))
            .map_or(0, |doc| doc.version)
    }

    /// Count of existing documents in a namespace.
    pub fn len(&self, namespace: &Namespace) -> usize {
        self.namespaces
            .get(namespace)
            .map_or(0, |docs| docs.values().filter(|doc| doc.exists()).count())
    }

    /// Check if a namespace has no existing documents.
    pub fn is_empty(&self, namespace: &Namespace) -> bool {
        self.len(namespace) == 0
    }

    /// Existing documents in a namespace.
    pub fn documents(&self, namespace: &Namespace) -> impl Iterator<Item = &Document> {
        self.namespaces
            .get(namespace)
            .into_iter()
            .flat_map(|docs| docs.values())
            .filter(|doc| doc.exists())
    }
}
