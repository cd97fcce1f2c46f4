//! Document provisioning routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use collab_engine::Document;

use crate::error::Result;
use crate::handlers::{
    handle_create, handle_create_form, handle_create_rich_text, handle_get, handle_remove,
    CreateDocumentRequest, CreateFormRequest, CreateRichTextRequest, ProvisionResponse,
    RemoveResponse,
};
use crate::AppState;

/// Create document routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/collections/{collection}/documents/{id}",
            get(get_handler).post(create_handler).delete(remove_handler),
        )
        .route(
            "/collections/{collection}/rich-text/{id}",
            post(create_rich_text_handler),
        )
        .route("/collections/{collection}/forms/{id}", post(create_form_handler))
}

/// 201 when this request created the document, 200 when it already existed.
fn created_status(response: &ProvisionResponse) -> StatusCode {
    if response.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    }
}

/// GET /collections/{collection}/documents/{id} - Read a document.
async fn get_handler(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<Document>> {
    let document = handle_get(state.connection, &collection, &id).await?;
    Ok(Json(document))
}

/// POST /collections/{collection}/documents/{id} - Ensure a plain document exists.
async fn create_handler(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
    Json(request): Json<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<ProvisionResponse>)> {
    let response = handle_create(state.connection, &collection, &id, request).await?;
    Ok((created_status(&response), Json(response)))
}

/// POST /collections/{collection}/rich-text/{id} - Ensure a rich-text document exists.
async fn create_rich_text_handler(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
    Json(request): Json<CreateRichTextRequest>,
) -> Result<(StatusCode, Json<ProvisionResponse>)> {
    let response = handle_create_rich_text(state.connection, &collection, &id, request).await?;
    Ok((created_status(&response), Json(response)))
}

/// POST /collections/{collection}/forms/{id} - Ensure a form document exists.
async fn create_form_handler(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
    Json(request): Json<CreateFormRequest>,
) -> Result<(StatusCode, Json<ProvisionResponse>)> {
    let response = handle_create_form(state.connection, &collection, &id, request).await?;
    Ok((created_status(&response), Json(response)))
}

/// DELETE /collections/{collection}/documents/{id} - Remove a document.
async fn remove_handler(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<RemoveResponse>> {
    let response = handle_remove(state.connection, &collection, &id).await?;
    Ok(Json(response))
}
