//! Form schemas and default data compilation.
//!
//! A form schema is a JSON-Schema-like object with a root `type: "object"` and
//! a `properties` mapping. Compiling it yields one default value per property,
//! chosen from the property's declared type. Nested object and array schemas
//! are not descended into: they receive their own `default` or `null`.

use crate::{error::Result, DocumentPayload, Error};
use serde_json::{json, Map, Value};

/// Property kinds that have a type-specific default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    String,
    Boolean,
    /// `integer` or `number`
    Number,
    /// Objects, arrays, unknown or missing types
    Other,
}

impl PropertyKind {
    /// Classify a property descriptor by its `type` field.
    pub fn of(descriptor: &Value) -> Self {
        match descriptor.get("type").and_then(Value::as_str) {
            Some("string") => PropertyKind::String,
            Some("boolean") => PropertyKind::Boolean,
            Some("integer") | Some("number") => PropertyKind::Number,
            _ => PropertyKind::Other,
        }
    }

    /// Value used when the descriptor has no `default`.
    pub fn fallback(self) -> Value {
        match self {
            PropertyKind::String => Value::String(String::new()),
            PropertyKind::Boolean => Value::Bool(false),
            PropertyKind::Number => json!(0),
            PropertyKind::Other => Value::Null,
        }
    }
}

/// Default value for a single property descriptor.
///
/// A present `default` wins verbatim, even when it is `null`.
pub fn property_default(descriptor: &Value) -> Value {
    match descriptor.get("default") {
        Some(value) => value.clone(),
        None => PropertyKind::of(descriptor).fallback(),
    }
}

/// Compile a schema into its default data mapping.
///
/// Keys follow the order of `properties`. A schema without an object-valued
/// `properties` compiles to an empty mapping.
pub fn compile_defaults(schema: &Value) -> Map<String, Value> {
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Map::new();
    };

    properties
        .iter()
        .map(|(name, descriptor)| (name.clone(), property_default(descriptor)))
        .collect()
}

/// A schema whose root has been checked to be an object.
#[derive(Debug, Clone, PartialEq)]
pub struct FormSchema {
    schema: Value,
}

impl FormSchema {
    /// Validate the root of a schema.
    pub fn parse(schema: Value) -> Result<Self> {
        match schema.get("type") {
            Some(Value::String(t)) if t == "object" => Ok(Self { schema }),
            Some(Value::String(t)) => Err(Error::RootNotObject { found: t.clone() }),
            Some(other) => Err(Error::RootNotObject {
                found: other.to_string(),
            }),
            None => Err(Error::RootNotObject {
                found: "no type".to_string(),
            }),
        }
    }

    /// The schema as given.
    pub fn as_value(&self) -> &Value {
        &self.schema
    }

    /// Compiled default data.
    pub fn defaults(&self) -> Map<String, Value> {
        compile_defaults(&self.schema)
    }

    /// The `{schema, data}` payload persisted for a new form document.
    pub fn into_payload(self) -> DocumentPayload {
        let data = Value::Object(self.defaults());
        DocumentPayload::plain(json!({
            "schema": self.schema,
            "data": data,
        }))
    }
}
