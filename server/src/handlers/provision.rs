//! Provisioning handlers - create, read and remove documents for clients.

use crate::backend::{Connection, DocHandle};
use crate::error::Result;
use crate::provisioner::{DocumentProvisioner, ProvisionOutcome, Provisioning, RemoveOutcome};
use collab_engine::{Document, Namespace, Version};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body for a plain document.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocumentRequest {
    /// Initial data (empty string when absent)
    #[serde(default)]
    pub data: Option<Value>,
}

/// Request body for a rich-text document.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRichTextRequest {
    /// Initial text
    #[serde(default)]
    pub text: String,
}

/// Request body for a form document.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFormRequest {
    /// Form schema (an empty object when absent, which is rejected)
    #[serde(default = "empty_schema")]
    pub schema: Value,
}

fn empty_schema() -> Value {
    Value::Object(Default::default())
}

/// Response for the create routes.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionResponse {
    /// Whether this request created the document
    pub created: bool,
    /// State observed once provisioning finished
    pub document: Document,
}

/// Response for removal.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveResponse {
    pub namespace: Namespace,
    pub id: String,
    /// Whether a live document was deleted
    pub deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
}

/// Ensure a plain document exists.
pub async fn handle_create<C: Connection>(
    connection: C,
    collection: &str,
    id: &str,
    request: CreateDocumentRequest,
) -> Result<ProvisionResponse> {
    let provisioner = DocumentProvisioner::new(connection, collection)?;
    let provisioning = match request.data {
        Some(data) => provisioner.create(id, data),
        None => provisioner.create_empty(id),
    };
    finish(provisioning).await
}

/// Ensure a rich-text document exists.
pub async fn handle_create_rich_text<C: Connection>(
    connection: C,
    collection: &str,
    id: &str,
    request: CreateRichTextRequest,
) -> Result<ProvisionResponse> {
    let provisioner = DocumentProvisioner::new(connection, collection)?;
    finish(provisioner.create_rich_text(id, request.text)).await
}

/// Ensure a form document exists.
pub async fn handle_create_form<C: Connection>(
    connection: C,
    collection: &str,
    id: &str,
    request: CreateFormRequest,
) -> Result<ProvisionResponse> {
    let provisioner = DocumentProvisioner::new(connection, collection)?;
    finish(provisioner.create_form(id, request.schema)).await
}

/// Remove a document.
pub async fn handle_remove<C: Connection>(
    connection: C,
    collection: &str,
    id: &str,
) -> Result<RemoveResponse> {
    let provisioner = DocumentProvisioner::new(connection, collection)?;
    let outcome = provisioner.remove(id).await?;

    let (deleted, version) = match outcome {
        RemoveOutcome::Deleted { version } => (true, Some(version)),
        RemoveOutcome::Missing => (false, None),
    };

    Ok(RemoveResponse {
        namespace: provisioner.namespace().clone(),
        id: id.to_string(),
        deleted,
        version,
    })
}

/// Read the current state of a document.
pub async fn handle_get<C: Connection>(
    connection: C,
    collection: &str,
    id: &str,
) -> Result<Document> {
    let provisioner = DocumentProvisioner::new(connection, collection)?;
    provisioner.fetch(id).await
}

async fn finish<H: DocHandle>(provisioning: Provisioning<H>) -> Result<ProvisionResponse> {
    let (handle, pending) = provisioning.into_parts();

    match pending.await? {
        ProvisionOutcome::Rejected(e) => Err(e.into()),
        outcome => Ok(ProvisionResponse {
            created: outcome.is_created(),
            document: handle.snapshot(),
        }),
    }
}
