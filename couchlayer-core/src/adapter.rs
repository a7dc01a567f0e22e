//! Lifecycle adapter between model-level CRUD verbs and a [`DocumentStore`].
//!
//! [`StoreAdapter`] owns one store connection and one bucket. Point operations go
//! straight to the store's key-value calls; `find_all` and `count` go through the
//! [`FilterCompiler`]. Every write injects the two implicit fields
//! (`documentId`, `documentType`).
//!
//! # Example
//!
//! ```ignore
//! use couchlayer::{adapter::StoreAdapter, memory::InMemoryStore, record::Record};
//! use serde_json::json;
//!
//! let adapter = StoreAdapter::new(InMemoryStore::new(), "tickets");
//! let created = adapter
//!     .create("Ticket", Record::try_from(json!({ "status": "open" }))?)
//!     .await?;
//! let id = created.document_id().unwrap();
//! assert!(adapter.exists("Ticket", id).await?);
//! ```

use serde_json::Value;

use crate::{
    backend::DocumentStore,
    compiler::{COUNT_ALIAS, FilterCompiler},
    error::{DocumentStoreError, DocumentStoreResult},
    handle::ModelHandle,
    query::Filter,
    record::{Model, Record},
};

/// Adapter bound to a store and a bucket.
///
/// # Type Parameters
///
/// * `S` - The store implementation
#[derive(Debug)]
pub struct StoreAdapter<S: DocumentStore> {
    store: S,
    bucket: String,
}

impl<S: DocumentStore> StoreAdapter<S> {
    /// Creates an adapter over an open store.
    pub fn new(store: S, bucket: impl Into<String>) -> Self {
        Self { store, bucket: bucket.into() }
    }

    /// The bucket every operation targets.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Borrows the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns a typed handle for model `M`.
    pub fn model<'a, M: Model>(&'a self) -> ModelHandle<'a, S, M> {
        ModelHandle::new(self)
    }

    /// Creates a record.
    ///
    /// A missing or empty `documentId` is replaced with a generated UUID. The
    /// write fails if the key is already taken.
    ///
    /// # Returns
    ///
    /// The record as stored, including both implicit fields.
    ///
    /// # Errors
    ///
    /// - [`DocumentStoreError::InvalidDocument`] if `documentId` is not a string
    /// - [`DocumentStoreError::DocumentAlreadyExists`] if the key exists
    pub async fn create(&self, model: &str, record: Record) -> DocumentStoreResult<Record> {
        let id = record.resolve_document_id()?;
        let record = record.with_identity(&id, model);
        tracing::debug!(bucket = %self.bucket, model, document_id = %id, "create");

        self.store
            .insert(&self.bucket, &id, record.clone())
            .await
            .inspect_err(|err| tracing::warn!(model, document_id = %id, error = %err, "create failed"))?;

        Ok(record)
    }

    /// Fetches a record by document ID.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::DocumentNotFound`] if the key is absent.
    pub async fn find_by_id(&self, model: &str, id: &str) -> DocumentStoreResult<Record> {
        tracing::debug!(bucket = %self.bucket, model, document_id = %id, "find_by_id");

        self.store.get(&self.bucket, id).await
    }

    /// Reports whether a record is stored under `id`.
    ///
    /// A missing key yields `Ok(false)`; every other failure propagates.
    pub async fn exists(&self, model: &str, id: &str) -> DocumentStoreResult<bool> {
        tracing::debug!(bucket = %self.bucket, model, document_id = %id, "exists");

        match self.store.get(&self.bucket, id).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Writes a record unconditionally (update-or-create).
    ///
    /// The key comes from the record's `documentId`, generated when missing.
    pub async fn upsert(&self, model: &str, record: Record) -> DocumentStoreResult<Record> {
        let id = record.resolve_document_id()?;
        self.write(model, &id, record).await
    }

    /// Replaces the record stored under `id` (creating it if absent).
    ///
    /// `id` wins over any `documentId` carried by `record`.
    pub async fn update_attributes(
        &self,
        model: &str,
        id: &str,
        record: Record,
    ) -> DocumentStoreResult<Record> {
        self.write(model, id, record).await
    }

    async fn write(&self, model: &str, id: &str, record: Record) -> DocumentStoreResult<Record> {
        let record = record.with_identity(id, model);
        tracing::debug!(bucket = %self.bucket, model, document_id = %id, "upsert");

        self.store
            .upsert(&self.bucket, id, record.clone())
            .await
            .inspect_err(|err| tracing::warn!(model, document_id = %id, error = %err, "upsert failed"))?;

        Ok(record)
    }

    /// Deletes a record by document ID.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::DocumentNotFound`] if the key is absent.
    pub async fn delete_by_id(&self, model: &str, id: &str) -> DocumentStoreResult<()> {
        tracing::debug!(bucket = %self.bucket, model, document_id = %id, "delete_by_id");

        self.store.remove(&self.bucket, id).await
    }

    /// Returns the raw rows of every record of `model` matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidFilter`] before any I/O if the filter
    /// does not compile.
    pub async fn find_all(&self, model: &str, filter: &Filter) -> DocumentStoreResult<Vec<Value>> {
        let clause = FilterCompiler::compile_select(&self.bucket, model, filter)?;
        tracing::debug!(model, statement = %clause, "find_all");

        self.store.run_query(&self.bucket, &clause).await
    }

    /// Counts the records of `model` matching `filter`'s predicate.
    ///
    /// Returns 0 when the store yields no row.
    pub async fn count(&self, model: &str, filter: &Filter) -> DocumentStoreResult<u64> {
        let clause = FilterCompiler::compile_count(&self.bucket, model, filter)?;
        tracing::debug!(model, statement = %clause, "count");

        let rows = self.store.run_query(&self.bucket, &clause).await?;

        Ok(rows
            .first()
            .and_then(|row| row.get(COUNT_ALIAS))
            .and_then(Value::as_u64)
            .unwrap_or(0))
    }

    /// Bulk deletion is not supported.
    pub async fn delete_all(&self, model: &str) -> DocumentStoreResult<()> {
        tracing::warn!(model, "delete_all is not supported");

        Err(DocumentStoreError::Unsupported("delete_all"))
    }

    /// Full-record save is not supported; use [`StoreAdapter::upsert`].
    pub async fn save(&self, model: &str, _record: Record) -> DocumentStoreResult<Record> {
        tracing::warn!(model, "save is not supported");

        Err(DocumentStoreError::Unsupported("save"))
    }

    /// Closes the underlying store.
    pub async fn close(self) -> DocumentStoreResult<()> {
        tracing::debug!(bucket = %self.bucket, "closing store");

        self.store.close().await
    }
}

impl<S: DocumentStore + 'static> StoreAdapter<S> {
    /// Erases the store type, for selecting a backend at runtime.
    pub fn into_dyn(self) -> StoreAdapter<Box<dyn crate::backend::DynDocumentStore>> {
        StoreAdapter {
            store: Box::new(self.store),
            bucket: self.bucket,
        }
    }
}
