//! Typed access to the records of one model.
//!
//! A [`ModelHandle`] mirrors the verbs of
//! [`StoreAdapter`](crate::adapter::StoreAdapter) for a concrete [`Model`] type,
//! converting between the model and its stored [`Record`](crate::record::Record).
//!
//! # Example
//!
//! ```ignore
//! let tickets = adapter.model::<Ticket>();
//! let ticket = tickets.create(&Ticket { document_id: None, status: "open".into() }).await?;
//! let open = tickets
//!     .find_all(&Filter::builder().filter(Field::new("status").eq("open")).build())
//!     .await?;
//! ```

use std::marker::PhantomData;

use crate::{
    adapter::StoreAdapter,
    backend::DocumentStore,
    error::DocumentStoreResult,
    query::Filter,
    record::{Model, ModelExt},
};

#[derive(Debug)]
pub struct ModelHandle<'a, S: DocumentStore, M: Model> {
    adapter: &'a StoreAdapter<S>,
    _marker: PhantomData<M>,
}

impl<'a, S: DocumentStore, M: Model> ModelHandle<'a, S, M> {
    pub(crate) fn new(adapter: &'a StoreAdapter<S>) -> Self {
        Self { adapter, _marker: PhantomData }
    }

    /// Returns the model name used as `documentType`.
    pub fn name(&self) -> &'static str {
        M::model_name()
    }

    /// Creates a record from `model`, returning the stored model.
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentStoreError`](crate::error::DocumentStoreError) if
    /// serialization or insertion fails.
    pub async fn create(&self, model: &M) -> DocumentStoreResult<M> {
        M::from_record(self.adapter.create(M::model_name(), model.to_record()?).await?)
    }

    /// Fetches a model by document ID.
    pub async fn find_by_id(&self, id: &str) -> DocumentStoreResult<M> {
        M::from_record(self.adapter.find_by_id(M::model_name(), id).await?)
    }

    pub async fn exists(&self, id: &str) -> DocumentStoreResult<bool> {
        self.adapter.exists(M::model_name(), id).await
    }

    /// Writes `model` unconditionally, returning the stored model.
    pub async fn upsert(&self, model: &M) -> DocumentStoreResult<M> {
        M::from_record(self.adapter.upsert(M::model_name(), model.to_record()?).await?)
    }

    /// Replaces the record stored under `id` with `model`.
    pub async fn update_attributes(&self, id: &str, model: &M) -> DocumentStoreResult<M> {
        M::from_record(
            self.adapter
                .update_attributes(M::model_name(), id, model.to_record()?)
                .await?,
        )
    }

    pub async fn delete_by_id(&self, id: &str) -> DocumentStoreResult<()> {
        self.adapter.delete_by_id(M::model_name(), id).await
    }

    /// Finds the models matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if a row does not deserialize into `M`
    /// (e.g. because the filter projects away required fields).
    pub async fn find_all(&self, filter: &Filter) -> DocumentStoreResult<Vec<M>> {
        self.adapter
            .find_all(M::model_name(), filter)
            .await?
            .into_iter()
            .map(M::from_value)
            .collect()
    }

    pub async fn count(&self, filter: &Filter) -> DocumentStoreResult<u64> {
        self.adapter.count(M::model_name(), filter).await
    }
}
