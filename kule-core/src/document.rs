//! Schemaless document representation and identifier handling.
//!
//! Documents travel through the gateway as ordered BSON documents ([`RawDocument`]) so
//! field order survives a round trip to the store. Every document carries a primary key
//! under [`ID_FIELD`], which is the store's native ObjectId wrapped in [`DocumentId`].
//!
//! The helpers [`json_to_document`] and [`document_to_json`] translate between the JSON
//! bodies exchanged over HTTP and the stored form.

use std::{fmt, str::FromStr};

use bson::{Bson, oid::ObjectId};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// An ordered, schemaless document as stored by a backend.
pub type RawDocument = bson::Document;

/// Name of the primary key field present on every stored document.
pub const ID_FIELD: &str = "_id";

/// Opaque primary key of a stored document.
///
/// Identifiers arrive as strings in request paths and are converted to the
/// store's native key type before any lookup happens.
///
/// # Example
///
/// ```ignore
/// use kule_core::document::DocumentId;
///
/// let id: DocumentId = "5f1d7a3c9d1e8a0b4c2f6e11".parse()?;
/// assert_eq!(id.to_string(), "5f1d7a3c9d1e8a0b4c2f6e11");
/// assert!("not-an-id".parse::<DocumentId>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(ObjectId);

impl DocumentId {
    /// Generates a fresh identifier.
    pub fn new() -> Self {
        Self(ObjectId::new())
    }

    /// Parses a path token into an identifier.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidId`] when the token is not a 24 character hex string.
    pub fn parse(token: &str) -> DocumentStoreResult<Self> {
        ObjectId::parse_str(token)
            .map(Self)
            .map_err(|_| DocumentStoreError::InvalidId(token.to_string()))
    }

    /// Returns the native ObjectId.
    pub fn as_object_id(&self) -> &ObjectId {
        &self.0
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for DocumentId {
    type Err = DocumentStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_hex())
    }
}

impl From<ObjectId> for DocumentId {
    fn from(oid: ObjectId) -> Self {
        Self(oid)
    }
}

impl From<DocumentId> for ObjectId {
    fn from(id: DocumentId) -> Self {
        id.0
    }
}

impl From<DocumentId> for Bson {
    fn from(id: DocumentId) -> Self {
        Bson::ObjectId(id.0)
    }
}

impl Serialize for DocumentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_hex())
    }
}

impl<'de> Deserialize<'de> for DocumentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        Self::parse(&token).map_err(serde::de::Error::custom)
    }
}

/// Reads the primary key of a stored document, if it has a native one.
pub fn document_id(document: &RawDocument) -> Option<DocumentId> {
    match document.get(ID_FIELD) {
        Some(Bson::ObjectId(oid)) => Some(DocumentId(*oid)),
        _ => None,
    }
}

/// Converts a JSON object into a document suitable for the store.
///
/// Integers that fit in 32 bits become `Int32`, larger ones `Int64`, and all other
/// numbers `Double`. An object of the form `{"$oid": "<hex>"}` becomes a native ObjectId.
///
/// # Errors
///
/// Returns [`DocumentStoreError::InvalidDocument`] if `value` is not a JSON object.
pub fn json_to_document(value: Value) -> DocumentStoreResult<RawDocument> {
    match json_to_bson(value) {
        Bson::Document(document) => Ok(document),
        other => Err(DocumentStoreError::InvalidDocument(format!(
            "expected a JSON object, got {}",
            bson_type_name(&other)
        ))),
    }
}

/// Converts a stored document into its JSON representation.
///
/// ObjectIds are rendered as hex strings and datetimes as RFC 3339 strings.
pub fn document_to_json(document: &RawDocument) -> Value {
    Value::Object(
        document
            .iter()
            .map(|(key, value)| (key.clone(), bson_to_json(value)))
            .collect::<Map<_, _>>(),
    )
}

/// Converts a single JSON value into BSON.
pub fn json_to_bson(value: Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(b),
        Value::Number(n) => number_to_bson(&n),
        Value::String(s) => Bson::String(s),
        Value::Array(items) => Bson::Array(items.into_iter().map(json_to_bson).collect()),
        Value::Object(map) => {
            if let Some(oid) = extended_object_id(&map) {
                return Bson::ObjectId(oid);
            }

            Bson::Document(
                map.into_iter()
                    .map(|(key, value)| (key, json_to_bson(value)))
                    .collect(),
            )
        }
    }
}

/// Converts a single BSON value into JSON.
pub fn bson_to_json(value: &Bson) -> Value {
    match value {
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Boolean(b) => Value::Bool(*b),
        Bson::Int32(i) => Value::from(*i),
        Bson::Int64(i) => Value::from(*i),
        Bson::Double(f) => Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Bson::String(s) => Value::String(s.clone()),
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(dt) => Value::String(dt.to_chrono().to_rfc3339()),
        Bson::Array(items) => Value::Array(items.iter().map(bson_to_json).collect()),
        Bson::Document(document) => document_to_json(document),
        other => Value::String(other.to_string()),
    }
}

fn number_to_bson(n: &Number) -> Bson {
    if let Some(i) = n.as_i64() {
        return i32::try_from(i)
            .map(Bson::Int32)
            .unwrap_or(Bson::Int64(i));
    }

    n.as_f64()
        .map(Bson::Double)
        .unwrap_or(Bson::Null)
}

fn extended_object_id(map: &Map<String, Value>) -> Option<ObjectId> {
    if map.len() != 1 {
        return None;
    }

    match map.get("$oid") {
        Some(Value::String(hex)) => ObjectId::parse_str(hex).ok(),
        _ => None,
    }
}

fn bson_type_name(value: &Bson) -> &'static str {
    match value {
        Bson::Null => "null",
        Bson::Boolean(_) => "boolean",
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) => "number",
        Bson::String(_) => "string",
        Bson::Array(_) => "array",
        _ => "value",
    }
}
