//! Document store abstraction consumed by the adapter.
//!
//! This module defines the traits that abstract over the physical store, so the
//! adapter works unchanged against the Couchbase query service or an in-memory
//! store.
//!
//! # Traits
//!
//! - [`DocumentStore`]: key-value and query operations against a bucket
//! - [`DynDocumentStore`]: a trait for dynamic dispatch over store implementations
//! - [`DocumentStoreBuilder`]: opens a connection and yields a store
//!
//! # Missing keys
//!
//! Implementations must report an absent key from [`DocumentStore::get`] and
//! [`DocumentStore::remove`] as
//! [`DocumentStoreError::DocumentNotFound`](crate::error::DocumentStoreError::DocumentNotFound),
//! translated from whatever signal the underlying driver uses. No other error
//! may be mapped to that variant: the adapter's `exists` relies on it.

use async_trait::async_trait;
use serde_json::Value;
use std::{any::Any, fmt::Debug};

use crate::{compiler::CompiledClause, error::DocumentStoreResult, record::Record};

/// Abstract interface for the physical document store.
///
/// Every method is a single request/response exchange that completes with
/// exactly one outcome. Implementations must be thread-safe.
#[async_trait]
pub trait DocumentStore: Send + Sync + Debug {
    /// Fetches the record stored under `key`.
    ///
    /// Returns `DocumentNotFound` if the key is absent.
    async fn get(&self, bucket: &str, key: &str) -> DocumentStoreResult<Record>;

    /// Stores `record` under `key`, failing with `DocumentAlreadyExists` if the
    /// key is taken.
    async fn insert(&self, bucket: &str, key: &str, record: Record) -> DocumentStoreResult<()>;

    /// Stores `record` under `key`, replacing any existing record.
    async fn upsert(&self, bucket: &str, key: &str, record: Record) -> DocumentStoreResult<()>;

    /// Removes the record stored under `key`.
    ///
    /// Returns `DocumentNotFound` if the key is absent.
    async fn remove(&self, bucket: &str, key: &str) -> DocumentStoreResult<()>;

    /// Executes a compiled statement and returns its rows.
    async fn run_query(
        &self,
        bucket: &str,
        clause: &CompiledClause,
    ) -> DocumentStoreResult<Vec<Value>>;

    /// Releases the connection. The default implementation is a no-op.
    async fn close(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// Object-safe twin of [`DocumentStore`], blanket-implemented for every store.
#[async_trait]
pub trait DynDocumentStore: Send + Sync + Debug {
    async fn get(&self, bucket: &str, key: &str) -> DocumentStoreResult<Record>;
    async fn insert(&self, bucket: &str, key: &str, record: Record) -> DocumentStoreResult<()>;
    async fn upsert(&self, bucket: &str, key: &str, record: Record) -> DocumentStoreResult<()>;
    async fn remove(&self, bucket: &str, key: &str) -> DocumentStoreResult<()>;
    async fn run_query(
        &self,
        bucket: &str,
        clause: &CompiledClause,
    ) -> DocumentStoreResult<Vec<Value>>;
    async fn close_boxed(self: Box<Self>) -> DocumentStoreResult<()>;

    fn as_any(&self) -> &dyn Any;
}

#[async_trait]
impl<S: DocumentStore + 'static> DynDocumentStore for S {
    async fn get(&self, bucket: &str, key: &str) -> DocumentStoreResult<Record> {
        DocumentStore::get(self, bucket, key).await
    }

    async fn insert(&self, bucket: &str, key: &str, record: Record) -> DocumentStoreResult<()> {
        DocumentStore::insert(self, bucket, key, record).await
    }

    async fn upsert(&self, bucket: &str, key: &str, record: Record) -> DocumentStoreResult<()> {
        DocumentStore::upsert(self, bucket, key, record).await
    }

    async fn remove(&self, bucket: &str, key: &str) -> DocumentStoreResult<()> {
        DocumentStore::remove(self, bucket, key).await
    }

    async fn run_query(
        &self,
        bucket: &str,
        clause: &CompiledClause,
    ) -> DocumentStoreResult<Vec<Value>> {
        DocumentStore::run_query(self, bucket, clause).await
    }

    async fn close_boxed(self: Box<Self>) -> DocumentStoreResult<()> {
        DocumentStore::close(*self).await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A boxed store selected at runtime is itself a store.
#[async_trait]
impl DocumentStore for Box<dyn DynDocumentStore> {
    async fn get(&self, bucket: &str, key: &str) -> DocumentStoreResult<Record> {
        DynDocumentStore::get(&**self, bucket, key).await
    }

    async fn insert(&self, bucket: &str, key: &str, record: Record) -> DocumentStoreResult<()> {
        DynDocumentStore::insert(&**self, bucket, key, record).await
    }

    async fn upsert(&self, bucket: &str, key: &str, record: Record) -> DocumentStoreResult<()> {
        DynDocumentStore::upsert(&**self, bucket, key, record).await
    }

    async fn remove(&self, bucket: &str, key: &str) -> DocumentStoreResult<()> {
        DynDocumentStore::remove(&**self, bucket, key).await
    }

    async fn run_query(
        &self,
        bucket: &str,
        clause: &CompiledClause,
    ) -> DocumentStoreResult<Vec<Value>> {
        DynDocumentStore::run_query(&**self, bucket, clause).await
    }

    async fn close(self) -> DocumentStoreResult<()> {
        DynDocumentStore::close_boxed(self).await
    }
}

/// Opens a connection to a store.
#[async_trait]
pub trait DocumentStoreBuilder {
    type Store: DocumentStore;

    async fn connect(self) -> DocumentStoreResult<Self::Store>;
}
