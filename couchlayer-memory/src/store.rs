//! In-memory storage implementation for document stores.
//!
//! Buckets map document keys to [`Record`]s behind an async-safe read-write
//! lock. Compiled clauses are answered by evaluating the filter they were
//! compiled from, so query results match what the N1QL statement selects.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};
use async_trait::async_trait;
use mea::rwlock::RwLock;
use serde_json::{Map, Value};

use couchlayer_core::{
    backend::{DocumentStore, DocumentStoreBuilder},
    compiler::{COUNT_ALIAS, ClauseKind, CompiledClause},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Filter, SortDirection},
    record::Record,
};

use crate::evaluator::{Comparable, DocumentEvaluator, lookup};

type BucketMap = BTreeMap<String, Record>;
type StoreMap = HashMap<String, BucketMap>;

/// Thread-safe in-memory document store.
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, so
/// clones share the same buckets. Buckets are created on first write.
///
/// Queries scan every record of the bucket (no indexing). Records are visited
/// in key order, which makes unordered results deterministic.
///
/// # Example
///
/// ```ignore
/// use couchlayer_memory::InMemoryStore;
/// use couchlayer::{backend::DocumentStore, record::Record};
/// use serde_json::json;
///
/// let store = InMemoryStore::new();
/// store.insert("tickets", "t1", Record::try_from(json!({ "status": "open" }))?).await?;
/// assert!(store.get("tickets", "t1").await.is_ok());
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// bucket -> (document key -> record)
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder
    }

    /// Number of records held in `bucket`.
    pub async fn len(&self, bucket: &str) -> usize {
        self.store
            .read()
            .await
            .get(bucket)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }

    fn select(filter: &Filter, mut records: Vec<&Record>) -> Vec<Value> {
        if !filter.order.is_empty() {
            records.sort_by(|a, b| {
                filter
                    .order
                    .iter()
                    .map(|order| {
                        let left = Comparable::from(lookup(a.as_map(), &order.field));
                        let right = Comparable::from(lookup(b.as_map(), &order.field));

                        match order.direction {
                            SortDirection::Asc => left.collate(&right),
                            SortDirection::Desc => right.collate(&left),
                        }
                    })
                    .find(|ordering| ordering.is_ne())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }

        let skip = filter.skip.map_or(0, saturating_usize);
        let limit = filter.limit.map_or(usize::MAX, saturating_usize);

        records
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|record| match filter.fields.as_deref() {
                Some(fields) if !fields.is_empty() => project(record, fields),
                _ => record.as_map().clone().into(),
            })
            .collect()
    }
}

fn saturating_usize(n: u64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}

/// Keeps the projected paths, keyed by their last segment like N1QL does.
fn project(record: &Record, fields: &[String]) -> Value {
    let mut row = Map::new();

    for field in fields {
        if let Some(value) = lookup(record.as_map(), field) {
            let name = field.rsplit('.').next().unwrap_or(field);
            row.insert(name.to_string(), value.clone());
        }
    }

    Value::Object(row)
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn get(&self, bucket: &str, key: &str) -> DocumentStoreResult<Record> {
        self.store
            .read()
            .await
            .get(bucket)
            .and_then(|records| records.get(key))
            .cloned()
            .ok_or_else(|| DocumentStoreError::DocumentNotFound(key.to_string(), bucket.to_string()))
    }

    async fn insert(&self, bucket: &str, key: &str, record: Record) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;
        let records = store.entry(bucket.to_string()).or_default();

        if records.contains_key(key) {
            return Err(DocumentStoreError::DocumentAlreadyExists(key.to_string(), bucket.to_string()));
        }

        records.insert(key.to_string(), record);

        Ok(())
    }

    async fn upsert(&self, bucket: &str, key: &str, record: Record) -> DocumentStoreResult<()> {
        self.store
            .write()
            .await
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), record);

        Ok(())
    }

    async fn remove(&self, bucket: &str, key: &str) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;

        store
            .get_mut(bucket)
            .and_then(|records| records.remove(key))
            .map(|_| ())
            .ok_or_else(|| DocumentStoreError::DocumentNotFound(key.to_string(), bucket.to_string()))
    }

    async fn run_query(
        &self,
        bucket: &str,
        clause: &CompiledClause,
    ) -> DocumentStoreResult<Vec<Value>> {
        tracing::debug!(bucket, statement = %clause, "evaluating clause in memory");

        let store = self.store.read().await;
        let filter = clause.filter();

        let matched = store
            .get(bucket)
            .into_iter()
            .flat_map(BTreeMap::values)
            .filter(|record| record.document_type() == Some(clause.model()))
            .filter(|record| {
                filter
                    .where_clause
                    .as_ref()
                    .is_none_or(|expr| DocumentEvaluator::new(record.as_map()).evaluate(expr))
            })
            .collect::<Vec<_>>();

        Ok(match clause.kind() {
            ClauseKind::Count => {
                let mut row = Map::new();
                row.insert(COUNT_ALIAS.to_string(), Value::from(matched.len()));
                vec![Value::Object(row)]
            }
            ClauseKind::Select => Self::select(filter, matched),
        })
    }
}

/// Builder for [`InMemoryStore`] instances. Connecting always succeeds.
#[derive(Default, Debug)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl DocumentStoreBuilder for InMemoryStoreBuilder {
    type Store = InMemoryStore;

    async fn connect(self) -> DocumentStoreResult<Self::Store> {
        Ok(InMemoryStore::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use couchlayer_core::{
        compiler::FilterCompiler,
        query::Field,
    };
    use serde_json::json;

    fn ticket(id: &str, status: &str, priority: i64) -> Record {
        Record::try_from(json!({ "status": status, "priority": priority }))
            .unwrap()
            .with_identity(id, "Ticket")
    }

    async fn seeded() -> InMemoryStore {
        let store = InMemoryStore::builder().connect().await.unwrap();
        for (id, status, priority) in [("t1", "open", 4), ("t2", "open", 1), ("t3", "closed", 5)] {
            store.insert("tickets", id, ticket(id, status, priority)).await.unwrap();
        }
        store
            .insert(
                "tickets",
                "u1",
                Record::try_from(json!({ "status": "open" })).unwrap().with_identity("u1", "User"),
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn key_value_operations() {
        let store = InMemoryStore::new();

        store.insert("b", "k", ticket("k", "open", 1)).await.unwrap();
        assert!(matches!(
            store.insert("b", "k", ticket("k", "open", 2)).await,
            Err(DocumentStoreError::DocumentAlreadyExists(..))
        ));

        store.upsert("b", "k", ticket("k", "closed", 2)).await.unwrap();
        let record = store.get("b", "k").await.unwrap();
        assert_eq!(record.get("status"), Some(&json!("closed")));

        store.remove("b", "k").await.unwrap();
        assert!(store.get("b", "k").await.unwrap_err().is_not_found());
        assert!(store.remove("b", "k").await.unwrap_err().is_not_found());
        assert!(store.get("other", "k").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn queries_are_scoped_to_the_model() {
        let store = seeded().await;
        let filter = Filter::builder().filter(Field::new("status").eq("open")).build();

        let clause = FilterCompiler::compile_count("tickets", "Ticket", &filter).unwrap();
        let rows = store.run_query("tickets", &clause).await.unwrap();
        assert_eq!(rows, vec![json!({ "cnt": 2 })]);

        let clause = FilterCompiler::compile_count("tickets", "User", &Filter::default()).unwrap();
        let rows = store.run_query("tickets", &clause).await.unwrap();
        assert_eq!(rows, vec![json!({ "cnt": 1 })]);
    }

    #[tokio::test]
    async fn select_sorts_pages_and_projects() {
        let store = seeded().await;
        let filter = Filter::builder()
            .order("priority", SortDirection::Desc)
            .skip(1)
            .limit(1)
            .fields(["priority", "documentId"])
            .build();

        let clause = FilterCompiler::compile_select("tickets", "Ticket", &filter).unwrap();
        let rows = store.run_query("tickets", &clause).await.unwrap();

        assert_eq!(rows, vec![json!({ "priority": 4, "documentId": "t1" })]);
    }

    #[tokio::test]
    async fn oversized_paging_saturates() {
        let store = seeded().await;

        let everything = Filter::builder().limit(u64::MAX).build();
        let clause = FilterCompiler::compile_select("tickets", "Ticket", &everything).unwrap();
        assert_eq!(store.run_query("tickets", &clause).await.unwrap().len(), 3);

        let past_the_end = Filter::builder().skip(u64::MAX).build();
        let clause = FilterCompiler::compile_select("tickets", "Ticket", &past_the_end).unwrap();
        assert!(store.run_query("tickets", &clause).await.unwrap().is_empty());

        assert_eq!(saturating_usize(7), 7);
    }

    #[tokio::test]
    async fn empty_bucket_counts_zero() {
        let store = InMemoryStore::new();
        let clause = FilterCompiler::compile_count("nothing", "Ticket", &Filter::default()).unwrap();

        assert_eq!(
            store.run_query("nothing", &clause).await.unwrap(),
            vec![json!({ "cnt": 0 })]
        );
        assert_eq!(store.len("nothing").await, 0);
    }

    #[tokio::test]
    async fn clones_share_state() {
        let store = InMemoryStore::new();
        let clone = store.clone();

        store.upsert("b", "k", ticket("k", "open", 1)).await.unwrap();

        assert_eq!(clone.len("b").await, 1);
    }
}
