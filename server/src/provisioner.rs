//! Document provisioning.
//!
//! A [`DocumentProvisioner`] guarantees that a document exists under an ID
//! without clobbering existing content. Every create variant binds a handle,
//! returns it at once, and runs the store calls in a spawned task:
//!
//! 1. `fetch` the current state
//! 2. if the document does not exist, build the payload and `create` it
//!
//! The create is never issued before the fetch has completed. Nothing stops two
//! concurrent provisioning calls for the same ID from both seeing an empty
//! document; the store rejects the second create, and that call fails.
//!
//! Store failures end the task with an error, which is also logged, so a
//! caller that drops the [`Pending`] still leaves a trace. A payload that
//! cannot be built (a form schema whose root is not an object) is the only
//! recoverable failure: it is handed to the caller's error callback and the
//! task resolves to [`ProvisionOutcome::Rejected`].

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use collab_engine::{Document, DocumentPayload, FormSchema, Namespace, Version};
use futures::FutureExt;
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::backend::{Connection, DocHandle};
use crate::error::{AppError, Result};

/// What a create variant did.
#[derive(Debug, Clone, PartialEq)]
pub enum ProvisionOutcome {
    /// The document did not exist and was created
    Created { version: Version },
    /// The document already existed and was left untouched
    Existing { version: Version },
    /// The payload was rejected and nothing was created
    Rejected(collab_engine::Error),
}

impl ProvisionOutcome {
    /// Whether this call issued the create.
    pub fn is_created(&self) -> bool {
        matches!(self, ProvisionOutcome::Created { .. })
    }
}

/// What a removal did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// The document existed and is now deleted
    Deleted { version: Version },
    /// There was no document to delete
    Missing,
}

/// Store calls running in the background.
///
/// Await it for the typed result. Dropping it detaches the task, which still
/// runs to completion.
#[derive(Debug)]
#[must_use = "dropping a Pending detaches the task and only logs its failures"]
pub struct Pending<T> {
    task: JoinHandle<Result<T>>,
}

impl<T: Send + 'static> Pending<T> {
    fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        Self {
            task: tokio::spawn(future),
        }
    }
}

impl<T> Future for Pending<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.task.poll_unpin(cx).map(|joined| match joined {
            Ok(result) => result,
            Err(e) => Err(AppError::Task(e)),
        })
    }
}

/// A handle returned before its document is known to exist.
#[derive(Debug)]
pub struct Provisioning<H> {
    handle: H,
    pending: Pending<ProvisionOutcome>,
}

impl<H> Provisioning<H> {
    /// The handle, usable right away.
    pub fn handle(&self) -> &H {
        &self.handle
    }

    /// Keep the handle and let the store calls finish on their own.
    pub fn into_handle(self) -> H {
        self.handle
    }

    /// Split into the handle and the running store calls.
    pub fn into_parts(self) -> (H, Pending<ProvisionOutcome>) {
        (self.handle, self.pending)
    }

    /// Wait for the store calls to finish.
    pub async fn ready(self) -> Result<ProvisionOutcome> {
        self.pending.await
    }
}

/// Creates and removes documents in one namespace.
#[derive(Debug, Clone)]
pub struct DocumentProvisioner<C> {
    connection: C,
    namespace: Namespace,
}

impl<C: Connection> DocumentProvisioner<C> {
    /// Create a provisioner for a collection over an open connection.
    pub fn new(connection: C, collection: &str) -> Result<Self> {
        Ok(Self {
            connection,
            namespace: Namespace::for_collection(collection)?,
        })
    }

    /// The namespace documents are created in.
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Bind a handle without touching the store.
    pub fn handle(&self, id: &str) -> C::Handle {
        self.connection.get(&self.namespace, id)
    }

    /// Ensure a plain document exists, seeded with `data`.
    pub fn create(&self, id: &str, data: impl Into<Value>) -> Provisioning<C::Handle> {
        let payload = DocumentPayload::plain(data);
        self.provision(id, move || Ok(payload), |_| {})
    }

    /// Ensure a plain document exists, seeded with an empty string.
    pub fn create_empty(&self, id: &str) -> Provisioning<C::Handle> {
        self.create(id, "")
    }

    /// Ensure a rich-text document exists, seeded with one insertion of `text`.
    pub fn create_rich_text(&self, id: &str, text: impl Into<String>) -> Provisioning<C::Handle> {
        let payload = DocumentPayload::rich_text(text);
        self.provision(id, move || Ok(payload), |_| {})
    }

    /// Ensure a form document exists, seeded with defaults compiled from `schema`.
    pub fn create_form(&self, id: &str, schema: Value) -> Provisioning<C::Handle> {
        self.create_form_with(id, schema, |_| {})
    }

    /// Like [`create_form`](Self::create_form), reporting a rejected schema to `on_error`.
    ///
    /// The schema is only checked when the document does not exist yet.
    pub fn create_form_with<F>(&self, id: &str, schema: Value, on_error: F) -> Provisioning<C::Handle>
    where
        F: FnOnce(collab_engine::Error) + Send + 'static,
    {
        self.provision(
            id,
            move || FormSchema::parse(schema).map(FormSchema::into_payload),
            on_error,
        )
    }

    /// Subscribe to a document, then delete it.
    ///
    /// Existence is not checked first. If the delete found nothing to clear,
    /// including when another client deleted the document after the
    /// subscribe, this resolves to [`RemoveOutcome::Missing`].
    pub fn remove(&self, id: &str) -> Pending<RemoveOutcome> {
        let handle = self.handle(id);

        Pending::spawn(async move {
            let result = remove_document(&handle).await;
            if let Err(e) = &result {
                tracing::error!(namespace = %handle.namespace(), doc_id = %handle.id(), error = %e, "Document removal failed");
            }
            result
        })
    }

    /// Current state of a document.
    pub async fn fetch(&self, id: &str) -> Result<Document> {
        let handle = self.handle(id);
        handle.fetch().await?;
        Ok(handle.snapshot())
    }

    fn provision<B, E>(&self, id: &str, build: B, on_error: E) -> Provisioning<C::Handle>
    where
        B: FnOnce() -> collab_engine::error::Result<DocumentPayload> + Send + 'static,
        E: FnOnce(collab_engine::Error) + Send + 'static,
    {
        let handle = self.handle(id);
        let task_handle = handle.clone();

        let pending = Pending::spawn(async move {
            let result = provision_document(&task_handle, build, on_error).await;
            if let Err(e) = &result {
                tracing::error!(namespace = %task_handle.namespace(), doc_id = %task_handle.id(), error = %e, "Document provisioning failed");
            }
            result
        });

        Provisioning { handle, pending }
    }
}

async fn provision_document<H, B, E>(handle: &H, build: B, on_error: E) -> Result<ProvisionOutcome>
where
    H: DocHandle,
    B: FnOnce() -> collab_engine::error::Result<DocumentPayload>,
    E: FnOnce(collab_engine::Error),
{
    handle.fetch().await?;

    let current = handle.snapshot();
    if current.exists() {
        tracing::debug!(namespace = %handle.namespace(), doc_id = %handle.id(), version = current.version, "Document already exists");
        return Ok(ProvisionOutcome::Existing {
            version: current.version,
        });
    }

    let payload = match build() {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(namespace = %handle.namespace(), doc_id = %handle.id(), error = %e, "Document payload rejected");
            on_error(e.clone());
            return Ok(ProvisionOutcome::Rejected(e));
        }
    };

    handle.create(payload).await?;

    let version = handle.snapshot().version;
    tracing::info!(namespace = %handle.namespace(), doc_id = %handle.id(), version, "Document created");
    Ok(ProvisionOutcome::Created { version })
}

async fn remove_document<H: DocHandle>(handle: &H) -> Result<RemoveOutcome> {
    handle.subscribe().await?;

    if handle.del().await? {
        let version = handle.snapshot().version;
        tracing::info!(namespace = %handle.namespace(), doc_id = %handle.id(), version, "Document removed");
        Ok(RemoveOutcome::Deleted { version })
    } else {
        tracing::debug!(namespace = %handle.namespace(), doc_id = %handle.id(), "Nothing to remove");
        Ok(RemoveOutcome::Missing)
    }
}
