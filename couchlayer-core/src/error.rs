//! Error types and result types for adapter and store operations.
//!
//! Every fallible operation in this workspace returns [`DocumentStoreResult<T>`].
//! Backend failures keep their original error as the `source` so callers can
//! inspect the driver-level cause.

use serde_json::Error as SerdeJsonError;
use std::{error::Error as StdError, fmt};
use thiserror::Error;

/// Represents all possible errors that can occur when talking to a document store.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// The filter handed to the compiler is malformed.
    #[error(transparent)]
    InvalidFilter(#[from] InvalidFilterError),
    /// The store could not be reached or the connection could not be set up.
    #[error("Connection error: {0}")]
    Connection(String),
    /// A document with the given ID already exists.
    /// The first argument is the document ID, the second is the bucket name.
    #[error("Document {0} already exists in bucket {1}")]
    DocumentAlreadyExists(String, String),
    /// The requested document was not found.
    /// The first argument is the document ID, the second is the bucket name.
    #[error("Document not found {0} in bucket {1}")]
    DocumentNotFound(String, String),
    /// The operation is deliberately not supported by this adapter.
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),
    /// The record has an invalid structure (e.g. a non-string document ID).
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// Serialization/deserialization error when converting between records and models.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// An error raised by the underlying store, passed through unchanged.
    #[error("Backend error: {0}")]
    Backend(#[source] Box<dyn StdError + Send + Sync + 'static>),
}

/// A specialized `Result` type for document store operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl DocumentStoreError {
    /// Wraps a backend error, keeping it as the error source.
    pub fn backend<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        DocumentStoreError::Backend(Box::new(err))
    }

    /// Returns `true` if this is a missing-key error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DocumentStoreError::DocumentNotFound(..))
    }
}

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

/// A malformed filter, reported with the offending field and operator when known.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct InvalidFilterError {
    /// Field path the error relates to.
    pub field: Option<String>,
    /// Operator the error relates to.
    pub operator: Option<String>,
    /// What went wrong.
    pub reason: String,
}

impl InvalidFilterError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { field: None, operator: None, reason: reason.into() }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = Some(operator.into());
        self
    }
}

impl fmt::Display for InvalidFilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid filter: {}", self.reason)?;
        if let Some(field) = &self.field {
            write!(f, " (field `{field}`")?;
            if let Some(op) = &self.operator {
                write!(f, ", operator `{op}`")?;
            }
            write!(f, ")")?;
        } else if let Some(op) = &self.operator {
            write!(f, " (operator `{op}`)")?;
        }
        Ok(())
    }
}
