//! Convenient re-exports of commonly used types from couchlayer.
//!
//! ```ignore
//! use couchlayer::prelude::*;
//! ```
//!
//! This provides access to:
//! - The adapter and typed model handles
//! - Records and the model trait
//! - Filter construction and the N1QL compiler
//! - Store traits and datasource settings
//! - Error types

pub use couchlayer_core::{
    adapter::StoreAdapter,
    handle::ModelHandle,
    record::{Model, ModelExt, Record, DOCUMENT_ID_FIELD, DOCUMENT_TYPE_FIELD},
    query::{Condition, Field, Filter, FilterBuilder, Operator, Order, SortDirection, Where, WhereVisitor},
    compiler::{ClauseKind, CompiledClause, FilterCompiler},
    backend::{DocumentStore, DocumentStoreBuilder},
    config::CouchbaseSettings,
    error::{DocumentStoreError, DocumentStoreResult, InvalidFilterError},
};
