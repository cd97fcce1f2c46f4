//! Contract with the document synchronization service.
//!
//! The provisioner only ever talks to these traits. A [`SyncService`] hands out
//! a [`Connection`]; a connection binds [`DocHandle`]s to `(namespace, id)`
//! pairs without doing any IO; a handle performs the actual store calls and
//! keeps a local view of the document it last observed.

mod memory;
mod postgres;

pub use memory::{CallKind, MemoryConnection, MemoryHandle, MemoryService, StoreCall};
pub use postgres::{PgConnection, PgHandle, PgService};

use crate::error::Result;
use async_trait::async_trait;
use collab_engine::{ContentType, Document, DocumentPayload, Namespace};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A synchronization backend that can open sessions.
#[async_trait]
pub trait SyncService: Send + Sync {
    type Connection: Connection;

    /// Open a session with the backend.
    async fn connect(&self) -> Result<Self::Connection>;
}

/// An open session with a synchronization backend.
pub trait Connection: Clone + Send + Sync + 'static {
    type Handle: DocHandle;

    /// Bind a handle to a document. Performs no IO.
    fn get(&self, namespace: &Namespace, id: &str) -> Self::Handle;
}

/// A reference to one document's synchronized state.
///
/// Clones share the same local view.
#[async_trait]
pub trait DocHandle: Clone + Send + Sync + 'static {
    /// Namespace the handle is bound to.
    fn namespace(&self) -> &Namespace;

    /// Document ID the handle is bound to.
    fn id(&self) -> &str;

    /// The last observed state.
    fn snapshot(&self) -> Document;

    /// Content type of the last observed state; `None` means the document does
    /// not exist (or has not been fetched yet).
    fn doc_type(&self) -> Option<ContentType> {
        self.snapshot().doc_type
    }

    /// Populate the local view from the store.
    async fn fetch(&self) -> Result<()>;

    /// Persist initial content. Fails if the document already exists.
    async fn create(&self, payload: DocumentPayload) -> Result<()>;

    /// Attach to live updates and refresh the local view.
    async fn subscribe(&self) -> Result<()>;

    /// Delete the document. Deleting a missing document is not an error.
    ///
    /// Returns whether this call cleared a live document.
    async fn del(&self) -> Result<bool>;
}

/// Shared, lockable view of a document held by a handle and its clones.
#[derive(Debug, Clone)]
pub(crate) struct LocalView(Arc<Mutex<Document>>);

impl LocalView {
    pub(crate) fn new(namespace: &Namespace, id: &str) -> Self {
        Self(Arc::new(Mutex::new(Document::uninitialized(
            namespace.clone(),
            id,
        ))))
    }

    pub(crate) fn get(&self) -> Document {
        lock(&self.0).clone()
    }

    pub(crate) fn set(&self, document: Document) {
        *lock(&self.0) = document;
    }

    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut Document) -> R) -> R {
        f(&mut lock(&self.0))
    }
}

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Connection to whichever backend the server was configured with.
#[derive(Debug, Clone)]
pub enum AnyConnection {
    Memory(MemoryConnection),
    Postgres(PgConnection),
}

/// Handle produced by an [`AnyConnection`].
#[derive(Debug, Clone)]
pub enum AnyHandle {
    Memory(MemoryHandle),
    Postgres(PgHandle),
}

impl Connection for AnyConnection {
    type Handle = AnyHandle;

    fn get(&self, namespace: &Namespace, id: &str) -> AnyHandle {
        match self {
            AnyConnection::Memory(conn) => AnyHandle::Memory(conn.get(namespace, id)),
            AnyConnection::Postgres(conn) => AnyHandle::Postgres(conn.get(namespace, id)),
        }
    }
}

#[async_trait]
impl DocHandle for AnyHandle {
    fn namespace(&self) -> &Namespace {
        match self {
            AnyHandle::Memory(h) => h.namespace(),
            AnyHandle::Postgres(h) => h.namespace(),
        }
    }

    fn id(&self) -> &str {
        match self {
            AnyHandle::Memory(h) => h.id(),
            AnyHandle::Postgres(h) => h.id(),
        }
    }

    fn snapshot(&self) -> Document {
        match self {
            AnyHandle::Memory(h) => h.snapshot(),
            AnyHandle::Postgres(h) => h.snapshot(),
        }
    }

    async fn fetch(&self) -> Result<()> {
        match self {
            AnyHandle::Memory(h) => h.fetch().await,
            AnyHandle::Postgres(h) => h.fetch().await,
        }
    }

    async fn create(&self, payload: DocumentPayload) -> Result<()> {
        match self {
            AnyHandle::Memory(h) => h.create(payload).await,
            AnyHandle::Postgres(h) => h.create(payload).await,
        }
    }

    async fn subscribe(&self) -> Result<()> {
        match self {
            AnyHandle::Memory(h) => h.subscribe().await,
            AnyHandle::Postgres(h) => h.subscribe().await,
        }
    }

    async fn del(&self) -> Result<bool> {
        match self {
            AnyHandle::Memory(h) => h.del().await,
            AnyHandle::Postgres(h) => h.del().await,
        }
    }
}
