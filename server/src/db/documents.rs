//! Database operations for the documents table.
//!
//! A row with a `NULL` `doc_type` is a document that was deleted. It keeps its
//! version so a later create continues the sequence.

use collab_engine::{ContentType, Document, DocumentPayload, Namespace};
use sqlx::{PgPool, Row};

/// A stored document row from the database.
#[derive(Debug)]
pub struct StoredDocument {
    pub namespace: String,
    pub doc_id: String,
    pub doc_type: Option<String>,
    pub version: i64,
    pub data: Option<serde_json::Value>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredDocument {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredDocument {
            namespace: row.try_get("namespace")?,
            doc_id: row.try_get("doc_id")?,
            doc_type: row.try_get("doc_type")?,
            version: row.try_get("version")?,
            data: row.try_get("data")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl StoredDocument {
    /// Convert database row to a collab-engine Document.
    pub fn to_document(&self, namespace: &Namespace) -> Result<Document, collab_engine::Error> {
        let doc_type = self
            .doc_type
            .as_deref()
            .map(str::parse::<ContentType>)
            .transpose()?;

        Ok(Document {
            id: self.doc_id.clone(),
            namespace: namespace.clone(),
            doc_type,
            version: self.version as u64,
            data: self.data.clone().unwrap_or(serde_json::Value::Null),
            updated_at: Some(self.updated_at.timestamp_millis() as u64),
        })
    }
}

/// Get a document row by namespace and ID.
pub async fn get_document(
    pool: &PgPool,
    namespace: &str,
    doc_id: &str,
) -> Result<Option<StoredDocument>, sqlx::Error> {
    sqlx::query_as::<_, StoredDocument>(
        r#"
        SELECT namespace, doc_id, doc_type, version, data, updated_at
        FROM documents
        WHERE namespace = $1 AND doc_id = $2
        "#,
    )
    .bind(namespace)
    .bind(doc_id)
    .fetch_optional(pool)
    .await
}

/// Create a document unless it already exists.
///
/// Returns `None` when a live document is already stored under this ID.
pub async fn insert_document(
    pool: &PgPool,
    namespace: &str,
    doc_id: &str,
    payload: &DocumentPayload,
) -> Result<Option<StoredDocument>, sqlx::Error> {
    sqlx::query_as::<_, StoredDocument>(
        r#"
        INSERT INTO documents (namespace, doc_id, doc_type, version, data, created_at, updated_at)
        VALUES ($1, $2, $3, 1, $4, NOW(), NOW())
        ON CONFLICT (namespace, doc_id) DO UPDATE SET
            doc_type = EXCLUDED.doc_type,
            version = documents.version + 1,
            data = EXCLUDED.data,
            updated_at = EXCLUDED.updated_at
        WHERE documents.doc_type IS NULL
        RETURNING namespace, doc_id, doc_type, version, data, updated_at
        "#,
    )
    .bind(namespace)
    .bind(doc_id)
    .bind(payload.content_type.as_str())
    .bind(&payload.data)
    .fetch_optional(pool)
    .await
}

/// Clear a live document.
///
/// Returns `None` when there was no live document to delete.
pub async fn clear_document(
    pool: &PgPool,
    namespace: &str,
    doc_id: &str,
) -> Result<Option<StoredDocument>, sqlx::Error> {
    sqlx::query_as::<_, StoredDocument>(
        r#"
        UPDATE documents
        SET doc_type = NULL, data = NULL, version = version + 1, updated_at = NOW()
        WHERE namespace = $1 AND doc_id = $2 AND doc_type IS NOT NULL
        RETURNING namespace, doc_id, doc_type, version, data, updated_at
        "#,
    )
    .bind(namespace)
    .bind(doc_id)
    .fetch_optional(pool)
    .await
}

