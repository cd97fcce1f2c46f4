//! PostgreSQL-backed synchronization service.
//!
//! Documents live in the `documents` table. The conditional insert in
//! [`db::insert_document`] makes a duplicate create fail instead of
//! overwriting. There is no push channel, so `subscribe` only refreshes the
//! local view.

use async_trait::async_trait;
use collab_engine::{Document, DocumentId, DocumentPayload, Namespace};

use super::{Connection, DocHandle, LocalView, SyncService};
use crate::db::{self, Pool};
use crate::error::Result;

/// Connects to PostgreSQL and runs migrations.
#[derive(Debug, Clone)]
pub struct PgService {
    database_url: String,
    max_connections: u32,
}

impl PgService {
    /// Create a service for a database URL.
    pub fn new(database_url: impl Into<String>, max_connections: u32) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections,
        }
    }
}

#[async_trait]
impl SyncService for PgService {
    type Connection = PgConnection;

    async fn connect(&self) -> Result<PgConnection> {
        let pool = db::create_pool(&self.database_url, self.max_connections).await?;

        tracing::info!("Running database migrations...");
        db::run_migrations(&pool).await?;

        Ok(PgConnection { pool })
    }
}

/// A session backed by a connection pool.
#[derive(Debug, Clone)]
pub struct PgConnection {
    pool: Pool,
}

impl Connection for PgConnection {
    type Handle = PgHandle;

    fn get(&self, namespace: &Namespace, id: &str) -> PgHandle {
        PgHandle {
            pool: self.pool.clone(),
            namespace: namespace.clone(),
            id: id.to_string(),
            view: LocalView::new(namespace, id),
        }
    }
}

/// A document handle on a [`PgConnection`].
#[derive(Debug, Clone)]
pub struct PgHandle {
    pool: Pool,
    namespace: Namespace,
    id: DocumentId,
    view: LocalView,
}

impl PgHandle {
    async fn load(&self) -> Result<Document> {
        let stored = db::get_document(&self.pool, self.namespace.as_str(), &self.id).await?;
        match stored {
            Some(row) => Ok(row.to_document(&self.namespace)?),
            None => Ok(Document::uninitialized(self.namespace.clone(), &self.id)),
        }
    }
}

#[async_trait]
impl DocHandle for PgHandle {
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
        let document = self.load().await?;
        self.view.set(document);
        Ok(())
    }

    async fn create(&self, payload: DocumentPayload) -> Result<()> {
        let row = db::insert_document(&self.pool, self.namespace.as_str(), &self.id, &payload)
            .await?
            .ok_or_else(|| collab_engine::Error::DocumentAlreadyExists {
                namespace: self.namespace.clone(),
                id: self.id.clone(),
            })?;

        let document = row.to_document(&self.namespace)?;
        tracing::debug!(namespace = %self.namespace, doc_id = %self.id, version = document.version, "Document created");
        self.view.set(document);
        Ok(())
    }

    async fn subscribe(&self) -> Result<()> {
        self.fetch().await
    }

    async fn del(&self) -> Result<bool> {
        match db::clear_document(&self.pool, self.namespace.as_str(), &self.id).await? {
            Some(row) => {
                let document = row.to_document(&self.namespace)?;
                tracing::debug!(namespace = %self.namespace, doc_id = %self.id, version = document.version, "Document deleted");
                self.view.set(document);
                Ok(true)
            }
            None => {
                tracing::debug!(namespace = %self.namespace, doc_id = %self.id, "Delete of missing document ignored");
                self.fetch().await?;
                Ok(false)
            }
        }
    }
}
