//! Storage namespaces.
//!
//! Every logical kind of document shares one backend, so collection names are
//! prefixed before they reach the store.

use crate::{error::Result, Error};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix applied to every collection name.
pub const NAMESPACE_PREFIX: &str = "collab_data_";

/// A storage partition for one kind of document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Namespace(String);

impl Namespace {
    /// Derive the namespace for a collection.
    ///
    /// Rejects empty names, which would collapse onto the bare prefix.
    pub fn for_collection(collection: &str) -> Result<Self> {
        if collection.trim().is_empty() {
            return Err(Error::InvalidCollection(collection.to_string()));
        }
        Ok(Self(format!("{NAMESPACE_PREFIX}{collection}")))
    }

    /// The full namespace string as stored.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The collection name this namespace was derived from.
    pub fn collection(&self) -> &str {
        self.0.strip_prefix(NAMESPACE_PREFIX).unwrap_or(&self.0)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Namespace {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_collection_name() {
        let ns = Namespace::for_collection("forms").unwrap();
        assert_eq!(ns.as_str(), "collab_data_forms");
        assert_eq!(ns.collection(), "forms");
        assert_eq!(ns.to_string(), "collab_data_forms");
    }

    #[test]
    fn derivation_is_deterministic() {
        assert_eq!(
            Namespace::for_collection("notes").unwrap(),
            Namespace::for_collection("notes").unwrap()
        );
        assert_ne!(
            Namespace::for_collection("notes").unwrap(),
            Namespace::for_collection("forms").unwrap()
        );
    }

    #[test]
    fn rejects_blank_collection() {
        assert!(matches!(
            Namespace::for_collection(""),
            Err(Error::InvalidCollection(_))
        ));
        assert!(Namespace::for_collection("   ").is_err());
    }

    #[test]
    fn serializes_as_plain_string() {
        let ns = Namespace::for_collection("notes").unwrap();
        assert_eq!(serde_json::to_string(&ns).unwrap(), "\"collab_data_notes\"");
    }
}
