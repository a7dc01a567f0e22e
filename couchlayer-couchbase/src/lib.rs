//! Couchbase backend implementation for couchlayer.
//!
//! This crate implements the `DocumentStore` trait over the Couchbase N1QL
//! query service (REST). Compiled filters are posted as parameterized
//! statements; point operations use `USE KEYS` and `INSERT`/`UPSERT`
//! statements against the same endpoint.
//!
//! To use this backend, include the `couchbase` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! couchlayer = { version = "x.y.z", features = ["couchbase"] }
//! ```
//!
//! # Connection
//!
//! The builder takes [`CouchbaseSettings`](couchlayer_core::config::CouchbaseSettings).
//! Connecting pings the query service once and fails with a connection error
//! if it cannot be reached within the connection timeout.
//!
//! # Example
//!
//! ```ignore
//! use couchlayer::{backend::DocumentStoreBuilder, config::CouchbaseSettings, couchbase::CouchbaseStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = CouchbaseSettings::builder()
//!         .host("db.internal")
//!         .bucket("tickets")
//!         .credentials("app", "secret")
//!         .build();
//!     let store = CouchbaseStore::builder(settings).connect().await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as couchlayer_couchbase;

pub mod response;
mod statement;
pub mod store;

pub use store::{CouchbaseStore, CouchbaseStoreBuilder};
