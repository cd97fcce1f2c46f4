//! In-memory synchronization service.
//!
//! Backs documents with a [`DocumentStore`] behind a mutex and fans every
//! applied operation out over a broadcast channel, so subscribed handles see
//! changes made through other handles. A subscription lasts until the last
//! clone of its handle is dropped. Every store call is recorded, which lets
//! tests assert exactly which calls a provisioning step made.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use collab_engine::{
    DeleteOutcome, Document, DocumentId, DocumentPayload, DocumentStore, Namespace, Operation,
};
use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::{lock, Connection, DocHandle, LocalView, SyncService};
use crate::error::{AppError, Result};

/// Capacity of the change channel before slow subscribers start lagging.
const CHANGE_CAPACITY: usize = 256;

/// Kinds of store calls a handle can make.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Fetch,
    Create,
    Subscribe,
    Delete,
}

/// A recorded store call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCall {
    pub kind: CallKind,
    pub namespace: Namespace,
    pub id: DocumentId,
}

#[derive(Debug)]
struct Shared {
    store: Mutex<DocumentStore>,
    calls: Mutex<Vec<StoreCall>>,
    /// Failures to report on the next call of a kind
    faults: DashMap<CallKind, String>,
    /// Subscribed handles per document
    subscribers: DashMap<(Namespace, DocumentId), usize>,
    changes: broadcast::Sender<Operation>,
}

/// An in-process synchronization service.
#[derive(Debug, Clone)]
pub struct MemoryService {
    shared: Arc<Shared>,
}

impl MemoryService {
    /// Create an empty service.
    pub fn new() -> Self {
        Self::with_capacity(CHANGE_CAPACITY)
    }

    /// Create an empty service whose change channel buffers `capacity` operations.
    pub fn with_capacity(capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(capacity);
        Self {
            shared: Arc::new(Shared {
                store: Mutex::new(DocumentStore::new()),
                calls: Mutex::new(Vec::new()),
                faults: DashMap::new(),
                subscribers: DashMap::new(),
                changes,
            }),
        }
    }

    /// All store calls made so far, in order.
    pub fn calls(&self) -> Vec<StoreCall> {
        lock(&self.shared.calls).clone()
    }

    /// Number of calls of `kind` made against one document.
    pub fn count_calls(&self, kind: CallKind, namespace: &Namespace, id: &str) -> usize {
        lock(&self.shared.calls)
            .iter()
            .filter(|call| call.kind == kind && &call.namespace == namespace && call.id == id)
            .count()
    }

    /// Make the next call of `kind` fail with `message`.
    pub fn fail_next(&self, kind: CallKind, message: impl Into<String>) {
        self.shared.faults.insert(kind, message.into());
    }

    /// Number of handles subscribed to a document.
    pub fn subscriber_count(&self, namespace: &Namespace, id: &str) -> usize {
        self.shared
            .subscribers
            .get(&(namespace.clone(), id.to_string()))
            .map_or(0, |count| *count)
    }

    /// Number of open change receivers, subscribed handles included.
    pub fn receiver_count(&self) -> usize {
        self.shared.changes.receiver_count()
    }

    /// Receive every operation applied from now on.
    pub fn changes(&self) -> broadcast::Receiver<Operation> {
        self.shared.changes.subscribe()
    }

    /// Authoritative state of a document.
    pub fn document(&self, namespace: &Namespace, id: &str) -> Document {
        lock(&self.shared.store).fetch(namespace, id)
    }
}

impl Default for MemoryService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SyncService for MemoryService {
    type Connection = MemoryConnection;

    async fn connect(&self) -> Result<MemoryConnection> {
        tracing::debug!("Opened in-memory connection");
        Ok(MemoryConnection {
            shared: self.shared.clone(),
        })
    }
}

/// A session with a [`MemoryService`].
#[derive(Debug, Clone)]
pub struct MemoryConnection {
    shared: Arc<Shared>,
}

impl MemoryConnection {
    /// The service this connection belongs to.
    pub fn service(&self) -> MemoryService {
        MemoryService {
            shared: self.shared.clone(),
        }
    }
}

impl Connection for MemoryConnection {
    type Handle = MemoryHandle;

    fn get(&self, namespace: &Namespace, id: &str) -> MemoryHandle {
        MemoryHandle {
            shared: self.shared.clone(),
            namespace: namespace.clone(),
            id: id.to_string(),
            view: LocalView::new(namespace, id),
            follower: Arc::new(Mutex::new(None)),
        }
    }
}

/// A document handle on a [`MemoryConnection`].
#[derive(Debug, Clone)]
pub struct MemoryHandle {
    shared: Arc<Shared>,
    namespace: Namespace,
    id: DocumentId,
    view: LocalView,
    /// Shared by all clones; dropped with the last one
    follower: Arc<Mutex<Option<Follower>>>,
}

/// A running subscription. Dropping it stops the task and unregisters it.
#[derive(Debug)]
struct Follower {
    shared: Arc<Shared>,
    key: (Namespace, DocumentId),
    task: JoinHandle<()>,
}

impl Drop for Follower {
    fn drop(&mut self) {
        self.task.abort();

        let remaining = self.shared.subscribers.get_mut(&self.key).map(|mut count| {
            *count = count.saturating_sub(1);
            *count
        });
        if remaining == Some(0) {
            self.shared.subscribers.remove_if(&self.key, |_, count| *count == 0);
        }

        tracing::trace!(namespace = %self.key.0, doc_id = %self.key.1, "Subscription closed");
    }
}

impl MemoryHandle {
    /// Record a call and report an injected failure, if any.
    fn begin(&self, kind: CallKind) -> Result<()> {
        lock(&self.shared.calls).push(StoreCall {
            kind,
            namespace: self.namespace.clone(),
            id: self.id.clone(),
        });

        match self.shared.faults.remove(&kind) {
            Some((_, message)) => Err(AppError::Backend(message)),
            None => Ok(()),
        }
    }

    fn refresh(&self) {
        let document = lock(&self.shared.store).fetch(&self.namespace, &self.id);
        self.view.set(document);
    }

    fn publish(&self, op: Operation) {
        // No receivers is fine
        let _ = self.shared.changes.send(op);
    }

    /// Keep the local view in step with operations from other handles.
    fn follow_changes(&self) -> Follower {
        let mut changes = self.shared.changes.subscribe();
        let shared = self.shared.clone();
        let view = self.view.clone();
        let namespace = self.namespace.clone();
        let id = self.id.clone();

        let task = tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(op) => {
                        if view.update(|doc| doc.apply(&op)) {
                            tracing::trace!(namespace = %namespace, doc_id = %id, version = op.version(), "View updated");
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(namespace = %namespace, doc_id = %id, skipped, "Subscriber lagged behind, reloading");
                        let document = lock(&shared.store).fetch(&namespace, &id);
                        view.set(document);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        let key = (self.namespace.clone(), self.id.clone());
        *self.shared.subscribers.entry(key.clone()).or_insert(0) += 1;

        Follower {
            shared: self.shared.clone(),
            key,
            task,
        }
    }
}

#[async_trait]
impl DocHandle for MemoryHandle {
    fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn snapshot(&self) -> Document {
        self.view.get()
    }

    async fn fetch(&self) -> Result<()> {
        self.begin(CallKind::Fetch)?;
        tokio::task::yield_now().await;

        self.refresh();
        Ok(())
    }

    async fn create(&self, payload: DocumentPayload) -> Result<()> {
        self.begin(CallKind::Create)?;
        tokio::task::yield_now().await;

        let (op, document) = {
            let mut store = lock(&self.shared.store);
            let op = store.create(&self.namespace, &self.id, payload, now_millis())?;
            (op, store.fetch(&self.namespace, &self.id))
        };

        tracing::debug!(namespace = %self.namespace, doc_id = %self.id, version = op.version(), "Document created");
        self.view.set(document);
        self.publish(op);
        Ok(())
    }

    async fn subscribe(&self) -> Result<()> {
        self.begin(CallKind::Subscribe)?;
        tokio::task::yield_now().await;

        {
            let mut follower = lock(&self.follower);
            if follower.is_none() {
                *follower = Some(self.follow_changes());
            }
        }

        self.refresh();
        Ok(())
    }

    async fn del(&self) -> Result<bool> {
        self.begin(CallKind::Delete)?;
        tokio::task::yield_now().await;

        let outcome = lock(&self.shared.store).delete(&self.namespace, &self.id, now_millis());
        self.refresh();
        match outcome {
            DeleteOutcome::Deleted(op) => {
                tracing::debug!(namespace = %self.namespace, doc_id = %self.id, version = op.version(), "Document deleted");
                self.publish(op);
                Ok(true)
            }
            DeleteOutcome::Missing => {
                tracing::debug!(namespace = %self.namespace, doc_id = %self.id, "Delete of missing document ignored");
                Ok(false)
            }
        }
    }
}

fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use collab_engine::ContentType;
    use serde_json::json;

    fn notes() -> Namespace {
        Namespace::for_collection("notes").unwrap()
    }

    #[tokio::test]
    async fn get_performs_no_calls() {
        let service = MemoryService::new();
        let conn = service.connect().await.unwrap();

        let handle = conn.get(&notes(), "n1");
        assert!(service.calls().is_empty());
        assert_eq!(handle.doc_type(), None);
        assert_eq!(handle.id(), "n1");
    }

    #[tokio::test]
    async fn fetch_create_fetch() {
        let service = MemoryService::new();
        let conn = service.connect().await.unwrap();
        let handle = conn.get(&notes(), "n1");

        handle.fetch().await.unwrap();
        assert_eq!(handle.doc_type(), None);

        handle.create(DocumentPayload::plain("hi")).await.unwrap();
        assert_eq!(handle.doc_type(), Some(ContentType::Json0));

        let other = conn.get(&notes(), "n1");
        other.fetch().await.unwrap();
        assert_eq!(other.snapshot().data, json!("hi"));

        let kinds: Vec<_> = service.calls().into_iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![CallKind::Fetch, CallKind::Create, CallKind::Fetch]
        );
    }

    #[tokio::test]
    async fn duplicate_create_rejected() {
        let service = MemoryService::new();
        let conn = service.connect().await.unwrap();
        let first = conn.get(&notes(), "n1");
        let second = conn.get(&notes(), "n1");

        // Both observe an uninitialized document before either creates
        first.fetch().await.unwrap();
        second.fetch().await.unwrap();

        first.create(DocumentPayload::plain("a")).await.unwrap();
        let result = second.create(DocumentPayload::plain("b")).await;

        assert!(matches!(
            result,
            Err(AppError::Engine(collab_engine::Error::DocumentAlreadyExists { .. }))
        ));
        assert_eq!(service.document(&notes(), "n1").data, json!("a"));
    }

    #[tokio::test]
    async fn injected_fault_fails_once() {
        let service = MemoryService::new();
        let conn = service.connect().await.unwrap();
        let handle = conn.get(&notes(), "n1");

        service.fail_next(CallKind::Fetch, "store offline");
        assert!(matches!(handle.fetch().await, Err(AppError::Backend(m)) if m == "store offline"));
        assert!(handle.fetch().await.is_ok());
    }

    #[tokio::test]
    async fn subscribed_handle_sees_remote_changes() {
        let service = MemoryService::new();
        let conn = service.connect().await.unwrap();
        let watcher = conn.get(&notes(), "n1");
        let writer = conn.get(&notes(), "n1");

        let mut changes = service.changes();
        watcher.subscribe().await.unwrap();
        watcher.subscribe().await.unwrap();
        assert_eq!(service.subscriber_count(&notes(), "n1"), 1);

        writer.fetch().await.unwrap();
        writer.create(DocumentPayload::rich_text("x")).await.unwrap();

        let op = changes.recv().await.unwrap();
        assert!(op.targets(&notes(), "n1"));

        // Let the follower task catch up
        for _ in 0..10 {
            if watcher.doc_type().is_some() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(watcher.doc_type(), Some(ContentType::RichText));
    }

    #[tokio::test]
    async fn delete_missing_is_ok() {
        let service = MemoryService::new();
        let conn = service.connect().await.unwrap();
        let handle = conn.get(&notes(), "ghost");

        assert!(!handle.del().await.unwrap());
        assert_eq!(handle.snapshot().version, 0);
    }

    #[tokio::test]
    async fn del_reports_whether_it_cleared() {
        let service = MemoryService::new();
        let conn = service.connect().await.unwrap();
        let first = conn.get(&notes(), "n1");
        let second = conn.get(&notes(), "n1");

        first.fetch().await.unwrap();
        first.create(DocumentPayload::plain("x")).await.unwrap();

        assert!(first.del().await.unwrap());
        assert!(!second.del().await.unwrap());
        assert_eq!(service.document(&notes(), "n1").version, 2);
    }

    #[tokio::test]
    async fn subscription_ends_with_last_clone() {
        let service = MemoryService::new();
        let conn = service.connect().await.unwrap();
        let handle = conn.get(&notes(), "n1");
        let clone = handle.clone();

        handle.subscribe().await.unwrap();
        clone.subscribe().await.unwrap();
        assert_eq!(service.subscriber_count(&notes(), "n1"), 1);
        assert_eq!(service.receiver_count(), 1);

        drop(handle);
        assert_eq!(service.subscriber_count(&notes(), "n1"), 1);

        drop(clone);
        assert_eq!(service.subscriber_count(&notes(), "n1"), 0);
        assert!(service.shared.subscribers.is_empty());

        // Aborted tasks are reaped on the next scheduler tick
        for _ in 0..100 {
            if service.receiver_count() == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(service.receiver_count(), 0);
    }

    #[tokio::test]
    async fn separate_handles_count_separately() {
        let service = MemoryService::new();
        let conn = service.connect().await.unwrap();
        let a = conn.get(&notes(), "n1");
        let b = conn.get(&notes(), "n1");

        a.subscribe().await.unwrap();
        b.subscribe().await.unwrap();
        assert_eq!(service.subscriber_count(&notes(), "n1"), 2);

        drop(a);
        assert_eq!(service.subscriber_count(&notes(), "n1"), 1);
        drop(b);
        assert_eq!(service.subscriber_count(&notes(), "n1"), 0);
    }

    #[tokio::test]
    async fn lagging_subscriber_reloads_view() {
        let service = MemoryService::with_capacity(1);
        let conn = service.connect().await.unwrap();
        let watcher = conn.get(&notes(), "n1");
        watcher.subscribe().await.unwrap();

        // Three operations without yielding overflow the follower's buffer
        for id in ["n1", "n2", "n3"] {
            let op = lock(&service.shared.store)
                .create(&notes(), id, DocumentPayload::plain(id), 1)
                .unwrap();
            service.shared.changes.send(op).unwrap();
        }

        for _ in 0..100 {
            if watcher.doc_type().is_some() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(watcher.doc_type(), Some(ContentType::Json0));
        assert_eq!(watcher.snapshot().data, json!("n1"));
    }
}
