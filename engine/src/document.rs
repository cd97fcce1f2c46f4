//! Observed document state.

use crate::{ContentType, DocumentId, DocumentPayload, Namespace, Operation, Timestamp, Version};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A document as seen by a reader at some version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Document identifier within its namespace
    pub id: DocumentId,
    /// Namespace the document belongs to
    pub namespace: Namespace,
    /// Content type, `None` while the document does not exist
    pub doc_type: Option<ContentType>,
    /// Incremented on every create and delete
    pub version: Version,
    /// Current content (`null` while the document does not exist)
    pub data: Value,
    /// Last create or delete (milliseconds since epoch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

impl Document {
    /// A document that has never been created.
    pub fn uninitialized(namespace: Namespace, id: impl Into<DocumentId>) -> Self {
        Self {
            id: id.into(),
            namespace,
            doc_type: None,
            version: 0,
            data: Value::Null,
            updated_at: None,
        }
    }

    /// Whether the document currently exists.
    pub fn exists(&self) -> bool {
        self.doc_type.is_some()
    }

    /// Initialize the document with a payload.
    pub fn initialize(&mut self, payload: DocumentPayload, timestamp: Timestamp) {
        self.doc_type = Some(payload.content_type);
        self.data = payload.data;
        self.version += 1;
        self.updated_at = Some(timestamp);
    }

    /// Return the document to the uninitialized state, keeping its version history.
    pub fn clear(&mut self, timestamp: Timestamp) {
        self.doc_type = None;
        self.data = Value::Null;
        self.version += 1;
        self.updated_at = Some(timestamp);
    }

    /// Apply a change observed from the store.
    ///
    /// Operations for other documents, or at or below the current version,
    /// are ignored. Returns whether the document changed.
    pub fn apply(&mut self, op: &Operation) -> bool {
        if !op.targets(&self.namespace, &self.id) || op.version() <= self.version {
            return false;
        }

        match op {
            Operation::Create(create) => {
                self.doc_type = Some(create.content_type);
                self.data = create.data.clone();
                self.updated_at = Some(create.timestamp);
            }
            Operation::Delete(delete) => {
                self.doc_type = None;
                self.data = Value::Null;
                self.updated_at = Some(delete.timestamp);
            }
        }
        self.version = op.version();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn notes() -> Namespace {
        Namespace::for_collection("notes").unwrap()
    }

    #[test]
    fn uninitialized_document() {
        let doc = Document::uninitialized(notes(), "note-1");

        assert_eq!(doc.id, "note-1");
        assert_eq!(doc.version, 0);
        assert_eq!(doc.doc_type, None);
        assert_eq!(doc.data, Value::Null);
        assert!(!doc.exists());
    }

    #[test]
    fn initialize_then_clear() {
        let mut doc = Document::uninitialized(notes(), "note-1");

        doc.initialize(DocumentPayload::rich_text("hi"), 1000);
        assert!(doc.exists());
        assert_eq!(doc.doc_type, Some(ContentType::RichText));
        assert_eq!(doc.version, 1);
        assert_eq!(doc.updated_at, Some(1000));

        doc.clear(2000);
        assert!(!doc.exists());
        assert_eq!(doc.data, Value::Null);
        assert_eq!(doc.version, 2);
        assert_eq!(doc.updated_at, Some(2000));
    }

    #[test]
    fn apply_follows_store_operations() {
        use crate::{CreateOp, DeleteOp};

        let mut doc = Document::uninitialized(notes(), "note-1");
        let create = Operation::Create(CreateOp {
            namespace: notes(),
            id: "note-1".into(),
            content_type: ContentType::Json0,
            data: json!("hello"),
            version: 1,
            timestamp: 1000,
        });
        let delete = Operation::Delete(DeleteOp {
            namespace: notes(),
            id: "note-1".into(),
            version: 2,
            timestamp: 2000,
        });

        assert!(doc.apply(&create));
        assert_eq!(doc.data, json!("hello"));

        // Replays are ignored
        assert!(!doc.apply(&create));

        assert!(doc.apply(&delete));
        assert!(!doc.exists());
        assert_eq!(doc.version, 2);
        assert!(!doc.apply(&create));
    }

    #[test]
    fn apply_ignores_other_documents() {
        use crate::DeleteOp;

        let mut doc = Document::uninitialized(notes(), "note-1");
        let other = Operation::Delete(DeleteOp {
            namespace: notes(),
            id: "note-2".into(),
            version: 5,
            timestamp: 1000,
        });

        assert!(!doc.apply(&other));
        assert_eq!(doc.version, 0);
    }

    #[test]
    fn serializes_camel_case() {
        let mut doc = Document::uninitialized(notes(), "note-1");
        doc.initialize(DocumentPayload::plain(json!({"a": 1})), 1000);

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "note-1",
                "namespace": "collab_data_notes",
                "docType": "json0",
                "version": 1,
                "data": {"a": 1},
                "updatedAt": 1000
            })
        );

        let parsed: Document = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, doc);
    }
}
