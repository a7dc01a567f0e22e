//! A thin persistence adapter for model records stored in Couchbase.
//!
//! This crate is the core of the couchlayer project and provides:
//!
//! - **Records and models** ([`record`]) - Stored JSON records, the implicit identity fields and the typed model trait
//! - **Filters** ([`query`], [`decode`]) - Typed predicate trees, ordering and pagination, plus decoding of JSON filter objects
//! - **Filter compiler** ([`compiler`]) - Translation of filters into parameterized N1QL statements
//! - **Store abstraction** ([`backend`]) - Traits implemented by the physical stores
//! - **Adapter** ([`adapter`], [`handle`]) - Lifecycle operations (create, find, exists, upsert, delete, count, list)
//! - **Settings** ([`config`]) - Datasource settings with their defaults
//! - **Error handling** ([`error`]) - Error and result types
//!
//! # Example
//!
//! ```ignore
//! use couchlayer::{prelude::*, memory::InMemoryStore};
//! use serde_json::json;
//!
//! let adapter = StoreAdapter::new(InMemoryStore::new(), "tickets");
//! adapter.create("Ticket", Record::try_from(json!({ "status": "open", "priority": 4 }))?).await?;
//!
//! let filter = Filter::from_json(&json!({ "where": { "priority": { "gt": 3 } } }))?;
//! assert_eq!(adapter.count("Ticket", &filter).await?, 1);
//! ```

#[allow(unused_extern_crates)]
extern crate self as couchlayer_core;

pub mod adapter;
pub mod backend;
pub mod compiler;
pub mod config;
pub mod decode;
pub mod error;
pub mod escape;
pub mod handle;
pub mod query;
pub mod record;
