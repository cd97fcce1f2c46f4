//! Initial document payloads.
//!
//! A payload is the content handed to a create, paired with the content type
//! that tells the store which merge semantics to apply.

use crate::{error::Result, Error};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

/// Content types understood by the synchronization store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentType {
    /// Plain JSON documents (the store default)
    #[default]
    Json0,
    /// Rich text as a sequence of insert operations
    RichText,
}

impl ContentType {
    /// The tag stored alongside the document.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Json0 => "json0",
            ContentType::RichText => "rich-text",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "json0" => Ok(ContentType::Json0),
            "rich-text" => Ok(ContentType::RichText),
            other => Err(Error::UnknownContentType(other.to_string())),
        }
    }
}

/// Initial content for a document create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPayload {
    /// Content type tag
    pub content_type: ContentType,
    /// Initial data
    pub data: Value,
}

impl DocumentPayload {
    /// Plain data stored as-is.
    pub fn plain(data: impl Into<Value>) -> Self {
        Self {
            content_type: ContentType::Json0,
            data: data.into(),
        }
    }

    /// Rich text wrapped as a single insertion.
    pub fn rich_text(text: impl Into<String>) -> Self {
        Self {
            content_type: ContentType::RichText,
            data: json!([{ "insert": text.into() }]),
        }
    }
}
