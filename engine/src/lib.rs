//! # Collab Engine
//!
//! Provisioning core for collaborative documents.
//!
//! This crate holds the pure, IO-free pieces of document provisioning: how a
//! collection name becomes a storage namespace, how a form schema compiles into
//! default data, what the persisted payloads look like, and an in-memory
//! document store that follows the same create/delete contract as the real
//! synchronization backends.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine never talks to a network or a database
//! - **Deterministic**: schema compilation is a pure function of its input
//! - **Closed types**: content types and property kinds are enums, not strings
//!
//! ## Core Concepts
//!
//! ### Namespaces
//!
//! Every document lives in a [`Namespace`] derived from a collection name by
//! prefixing it with [`NAMESPACE_PREFIX`].
//!
//! ### Documents
//!
//! A [`Document`] is the observed state of one `(namespace, id)` pair. Its
//! `doc_type` is `None` until the document is created, and again after it is
//! deleted. That field is the only existence signal.
//!
//! ### Payloads
//!
//! A [`DocumentPayload`] is the initial content handed to a create:
//! - [`DocumentPayload::plain`] - arbitrary JSON, [`ContentType::Json0`]
//! - [`DocumentPayload::rich_text`] - a single insert, [`ContentType::RichText`]
//! - [`FormSchema::into_payload`] - `{schema, data}` with compiled defaults
//!
//! ## Quick Start
//!
//! ```rust
//! use collab_engine::{compile_defaults, DocumentStore, FormSchema, Namespace};
//! use serde_json::json;
//!
//! let schema = json!({
//!     "type": "object",
//!     "properties": {
//!         "title": {"type": "string"},
//!         "done": {"type": "boolean", "default": true},
//!         "priority": {"type": "integer"}
//!     }
//! });
//!
//! let defaults = compile_defaults(&schema);
//! assert_eq!(
//!     serde_json::Value::Object(defaults),
//!     json!({"title": "", "done": true, "priority": 0})
//! );
//!
//! let namespace = Namespace::for_collection("tasks").unwrap();
//! let mut store = DocumentStore::new();
//!
//! let payload = FormSchema::parse(schema).unwrap().into_payload();
//! store.create(&namespace, "task-1", payload, 1706745600000).unwrap();
//!
//! assert!(store.fetch(&namespace, "task-1").exists());
//! ```

pub mod document;
pub mod error;
pub mod namespace;
pub mod operation;
pub mod payload;
pub mod schema;
pub mod store;

// Re-export main types at crate root
pub use document::Document;
pub use error::Error;
pub use namespace::{Namespace, NAMESPACE_PREFIX};
pub use operation::{CreateOp, DeleteOp, Operation};
pub use payload::{ContentType, DocumentPayload};
pub use schema::{compile_defaults, property_default, FormSchema, PropertyKind};
pub use store::{DeleteOutcome, DocumentStore};

/// Type aliases for clarity
pub type DocumentId = String;
pub type Version = u64;
pub type Timestamp = u64;
