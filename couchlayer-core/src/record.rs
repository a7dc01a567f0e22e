//! Records and the typed model trait.
//!
//! A [`Record`] is the JSON object persisted in a bucket. Two implicit fields are
//! written on every create and upsert:
//!
//! - [`DOCUMENT_ID_FIELD`] (`documentId`) - the key the record is stored under
//! - [`DOCUMENT_TYPE_FIELD`] (`documentType`) - the logical model name, so several
//!   models can share one bucket
//!
//! # Example
//!
//! ```ignore
//! use couchlayer::record::{Model, Record};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! #[serde(rename_all = "camelCase")]
//! pub struct Ticket {
//!     #[serde(default, skip_serializing_if = "Option::is_none")]
//!     pub document_id: Option<String>,
//!     pub status: String,
//! }
//!
//! impl Model for Ticket {
//!     fn model_name() -> &'static str {
//!         "Ticket"
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, from_value, to_value};
use uuid::Uuid;

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// Name of the implicit field holding the document key.
pub const DOCUMENT_ID_FIELD: &str = "documentId";

/// Name of the implicit field holding the model name.
pub const DOCUMENT_TYPE_FIELD: &str = "documentType";

/// A stored JSON document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Returns the document ID, if one is set and is a string.
    pub fn document_id(&self) -> Option<&str> {
        self.0.get(DOCUMENT_ID_FIELD).and_then(Value::as_str)
    }

    /// Returns the document type, if one is set and is a string.
    pub fn document_type(&self) -> Option<&str> {
        self.0.get(DOCUMENT_TYPE_FIELD).and_then(Value::as_str)
    }

    /// Reads the document ID the caller supplied, generating a UUID v4 when it is
    /// missing, `null` or empty.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidDocument`] if `documentId` holds a
    /// non-string value.
    pub fn resolve_document_id(&self) -> DocumentStoreResult<String> {
        match self.0.get(DOCUMENT_ID_FIELD) {
            Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
            None | Some(Value::Null) | Some(Value::String(_)) => {
                let id = Uuid::new_v4().to_string();
                tracing::debug!(document_id = %id, "no document id supplied, generated one");
                Ok(id)
            }
            Some(other) => Err(DocumentStoreError::InvalidDocument(format!(
                "the document key `{other}` from the `{DOCUMENT_ID_FIELD}` field must be a string"
            ))),
        }
    }

    /// Writes both implicit fields, replacing whatever was there.
    pub fn with_identity(mut self, document_id: &str, model: &str) -> Self {
        self.0.insert(DOCUMENT_ID_FIELD.to_string(), Value::String(document_id.to_string()));
        self.0.insert(DOCUMENT_TYPE_FIELD.to_string(), Value::String(model.to_string()));
        self
    }

    /// Returns the value of a top-level field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Sets a top-level field, returning the previous value.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    /// Borrows the underlying JSON object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consumes the record, returning the underlying JSON object.
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Consumes the record, returning it as a JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        record.into_value()
    }
}

impl TryFrom<Value> for Record {
    type Error = DocumentStoreError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(DocumentStoreError::InvalidDocument(format!(
                "expected a JSON object, got `{other}`"
            ))),
        }
    }
}

/// A typed model persisted through the adapter.
///
/// The model name becomes the `documentType` of every record written for it.
pub trait Model: Serialize + for<'de> Deserialize<'de> + Send + Sync + Clone + 'static {
    /// Returns the logical model name (e.g. `"Ticket"`).
    fn model_name() -> &'static str;
}

/// Conversion helpers between models and records.
///
/// Automatically implemented for every [`Model`].
pub trait ModelExt: Model {
    /// Converts this model into a record.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the model does not serialize to an object.
    fn to_record(&self) -> DocumentStoreResult<Record>;

    /// Creates a model from a record.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    fn from_record(record: Record) -> DocumentStoreResult<Self>;

    /// Creates a model from a raw query row.
    fn from_value(value: Value) -> DocumentStoreResult<Self>;
}

impl<M: Model> ModelExt for M {
    fn to_record(&self) -> DocumentStoreResult<Record> {
        Record::try_from(to_value(self)?)
    }

    fn from_record(record: Record) -> DocumentStoreResult<Self> {
        Ok(from_value(record.into_value())?)
    }

    fn from_value(value: Value) -> DocumentStoreResult<Self> {
        Ok(from_value(value)?)
    }
}
