//! In-memory document store for couchlayer.
//!
//! This crate provides a thread-safe, in-memory implementation of the
//! `DocumentStore` trait. It uses async-aware read-write locks for concurrent
//! access and is meant for development and tests, where a Couchbase cluster is
//! not available.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Key-value semantics** - Duplicate inserts and missing keys fail like they do on a bucket
//! - **Query support** - Compiled select and count clauses, with filtering, ordering, paging and projection
//!
//! # Quick Start
//!
//! ```ignore
//! use couchlayer::{adapter::StoreAdapter, memory::InMemoryStore, query::Filter, record::Record};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let adapter = StoreAdapter::new(InMemoryStore::new(), "tickets");
//!
//!     adapter.create("Ticket", Record::try_from(json!({ "status": "open" }))?).await?;
//!     assert_eq!(adapter.count("Ticket", &Filter::default()).await?, 1);
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as couchlayer_memory;

pub mod store;
mod evaluator;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
