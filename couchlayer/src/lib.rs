//! Main couchlayer crate: a thin persistence adapter for model records stored
//! in Couchbase.
//!
//! This crate is the primary entry point. It re-exports the core types from
//! the sub-crates and provides access to the storage backends.
//!
//! # Features
//!
//! - **Filter compiler** - LoopBack-style JSON filters (or typed ones) compiled into parameterized N1QL
//! - **Lifecycle operations** - create, find, exists, upsert, delete, count and list records of a model
//! - **Shared buckets** - Every record carries `documentType`, so many models can share one bucket
//! - **Multiple backends** - The Couchbase query service, or an in-memory store for development and tests
//!
//! # Quick Start
//!
//! ```ignore
//! use couchlayer::{prelude::*, memory::InMemoryStore};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), DocumentStoreError> {
//!     let adapter = StoreAdapter::new(InMemoryStore::new(), "tickets");
//!
//!     let ticket = adapter
//!         .create("Ticket", Record::try_from(json!({ "status": "open", "priority": 4 }))?)
//!         .await?;
//!     assert!(adapter.exists("Ticket", ticket.document_id().unwrap()).await?);
//!
//!     let filter = Filter::from_json(&json!({
//!         "where": { "status": "open", "priority": { "gt": 3 } },
//!         "order": "priority DESC",
//!         "limit": 10
//!     }))?;
//!     let rows = adapter.find_all("Ticket", &filter).await?;
//!     println!("open tickets: {rows:?}");
//!
//!     adapter.close().await
//! }
//! ```
//!
//! # Typed models
//!
//! ```ignore
//! use couchlayer::{prelude::*, memory::InMemoryStore};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! #[serde(rename_all = "camelCase")]
//! pub struct Ticket {
//!     #[serde(skip_serializing_if = "Option::is_none")]
//!     pub document_id: Option<String>,
//!     pub status: String,
//! }
//!
//! impl Model for Ticket {
//!     fn model_name() -> &'static str { "Ticket" }
//! }
//!
//! let adapter = StoreAdapter::new(InMemoryStore::new(), "tickets");
//! let tickets = adapter.model::<Ticket>();
//! let created = tickets.create(&Ticket { document_id: None, status: "open".into() }).await?;
//! ```
//!
//! # Dynamic Dispatch
//!
//! [`StoreAdapter::into_dyn`](adapter::StoreAdapter::into_dyn) erases the store
//! type, so the backend can be picked at runtime.
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - `couchbase` - The Couchbase N1QL query service (requires the `couchbase` feature)

pub mod prelude;

pub use couchlayer_core::{adapter, backend, compiler, config, decode, error, escape, handle, query, record};

/// In-memory storage backend implementations.
pub mod memory {
    pub use couchlayer_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// Couchbase storage backend implementations.
///
/// This module is only available when the `couchbase` feature is enabled.
#[cfg(feature = "couchbase")]
pub mod couchbase {
    pub use couchlayer_couchbase::{
        CouchbaseStore, CouchbaseStoreBuilder,
        response::{QueryError, ServiceError},
    };

    use couchlayer_core::{
        adapter::StoreAdapter, backend::DocumentStoreBuilder, config::CouchbaseSettings,
        error::DocumentStoreResult,
    };

    /// Connects to the cluster and returns an adapter bound to the configured bucket.
    pub async fn connect(settings: CouchbaseSettings) -> DocumentStoreResult<StoreAdapter<CouchbaseStore>> {
        let bucket = settings.bucket.clone();
        let store = CouchbaseStore::builder(settings).connect().await?;

        Ok(StoreAdapter::new(store, bucket))
    }
}
