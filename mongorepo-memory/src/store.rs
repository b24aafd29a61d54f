//! In-memory storage implementation.
//!
//! Documents live in per-collection vectors behind an async-aware read-write lock.
//! Vectors keep insertion order, which is the order unsorted finds return.

use async_trait::async_trait;
use bson::{Bson, Document};
use mea::rwlock::RwLock;
use std::{collections::HashMap, sync::Arc};
use tracing::trace;

use mongorepo_core::{
    backend::{StoreBackend, StoreBackendBuilder, describe_id},
    error::{RecordStoreError, RecordStoreResult},
    id::ID_FIELD,
    query::{Query, SortDirection},
};

use crate::evaluator::{Comparable, DocumentEvaluator, lookup};

type CollectionDocs = Vec<(Bson, Document)>;
type StoreMap = HashMap<String, CollectionDocs>;

/// Thread-safe in-memory storage backend.
///
/// Clones share the same underlying data. Queries scan the whole collection, so this
/// is meant for tests and development rather than large datasets.
///
/// # Example
///
/// ```ignore
/// use mongorepo::{connection::Connection, memory::InMemoryStore};
///
/// let connection = Connection::new(InMemoryStore::new());
/// let users = connection.repository::<User>();
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection name -> (`_id`, document) in insertion order
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

    /// Names of the collections that have received at least one document.
    pub async fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.store.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}

fn with_id(id: &Bson, mut document: Document) -> Document {
    document.insert(ID_FIELD, id.clone());
    document
}

fn not_found(id: &Bson, collection: &str) -> RecordStoreError {
    RecordStoreError::NotFound(describe_id(id), collection.to_string())
}

fn sort_documents(documents: &mut [Document], field: &str, direction: SortDirection) {
    documents.sort_by(|a, b| {
        let null = Bson::Null;
        let left = Comparable::from(lookup(a, field).unwrap_or(&null));
        let right = Comparable::from(lookup(b, field).unwrap_or(&null));

        match direction {
            SortDirection::Asc => left.sort_cmp(&right),
            SortDirection::Desc => right.sort_cmp(&left),
        }
    });
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn insert_document(
        &self,
        collection: &str,
        id: Bson,
        document: Document,
    ) -> RecordStoreResult<()> {
        let mut store = self.store.write().await;
        let documents = store.entry(collection.to_string()).or_default();

        if documents.iter().any(|(existing, _)| existing == &id) {
            return Err(RecordStoreError::Storage(format!(
                "duplicate key: {} already exists in collection {collection}",
                describe_id(&id)
            )));
        }

        trace!(collection, id = %describe_id(&id), "stored document");
        let document = with_id(&id, document);
        documents.push((id, document));

        Ok(())
    }

    async fn find_documents(
        &self,
        collection: &str,
        query: Query,
    ) -> RecordStoreResult<Vec<Document>> {
        let store = self.store.read().await;
        let Some(documents) = store.get(collection) else {
            return Ok(Vec::new());
        };

        let mut found = Vec::new();
        for (_, document) in documents {
            let keep = match &query.filter {
                Some(filter) => DocumentEvaluator::matches(document, filter)?,
                None => true,
            };
            if keep {
                found.push(document.clone());
            }
        }

        if let Some(sort) = &query.sort {
            sort_documents(&mut found, &sort.field, sort.direction);
        }

        Ok(found
            .into_iter()
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.filter(|&limit| limit > 0).unwrap_or(usize::MAX))
            .collect())
    }

    async fn replace_document(
        &self,
        collection: &str,
        id: Bson,
        document: Document,
    ) -> RecordStoreResult<()> {
        let mut store = self.store.write().await;
        let slot = store
            .get_mut(collection)
            .and_then(|documents| documents.iter_mut().find(|(existing, _)| existing == &id));

        match slot {
            Some((_, stored)) => {
                *stored = with_id(&id, document);
                Ok(())
            }
            None => Err(not_found(&id, collection)),
        }
    }

    async fn delete_document(&self, collection: &str, id: Bson) -> RecordStoreResult<()> {
        let mut store = self.store.write().await;
        let documents = store
            .get_mut(collection)
            .ok_or_else(|| not_found(&id, collection))?;

        let position = documents
            .iter()
            .position(|(existing, _)| existing == &id)
            .ok_or_else(|| not_found(&id, collection))?;

        documents.remove(position);
        Ok(())
    }

    async fn count_documents(&self, collection: &str) -> RecordStoreResult<u64> {
        Ok(self
            .store
            .read()
            .await
            .get(collection)
            .map_or(0, |documents| documents.len() as u64))
    }
}

/// Builder for [`InMemoryStore`]; always succeeds.
#[derive(Debug, Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    async fn build(self) -> RecordStoreResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{doc, oid::ObjectId};
    use mongorepo_core::query::Filter;

    async fn seeded() -> InMemoryStore {
        let store = InMemoryStore::new();

        for (name, age) in [("Carol", 41), ("Alice", 31), ("Bob", 25)] {
            let id = Bson::ObjectId(ObjectId::new());
            store
                .insert_document("people", id, doc! { "name": name, "age": age })
                .await
                .unwrap();
        }

        store
    }

    fn names(documents: &[Document]) -> Vec<&str> {
        documents
            .iter()
            .map(|d| d.get_str("name").unwrap())
            .collect()
    }

    #[tokio::test]
    async fn insert_forces_the_id_and_rejects_duplicates() {
        let store = InMemoryStore::new();
        let id = Bson::ObjectId(ObjectId::new());

        store
            .insert_document("people", id.clone(), doc! { "_id": "stale", "name": "Ann" })
            .await
            .unwrap();
        let err = store
            .insert_document("people", id.clone(), doc! { "name": "Ann" })
            .await
            .unwrap_err();

        assert!(matches!(err, RecordStoreError::Storage(_)));

        let found = store.find_documents("people", Query::all()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get(ID_FIELD), Some(&id));
    }

    #[tokio::test]
    async fn find_filters_sorts_and_pages() {
        let store = seeded().await;

        let all = store.find_documents("people", Query::all()).await.unwrap();
        assert_eq!(names(&all), ["Carol", "Alice", "Bob"]);

        let query = Query::builder()
            .filter(Filter::gte("age", 30))
            .sort("name", SortDirection::Asc)
            .build();
        let adults = store.find_documents("people", query).await.unwrap();
        assert_eq!(names(&adults), ["Alice", "Carol"]);

        let query = Query::builder()
            .sort("age", SortDirection::Desc)
            .offset(1)
            .limit(1)
            .build();
        let second_oldest = store.find_documents("people", query).await.unwrap();
        assert_eq!(names(&second_oldest), ["Alice"]);
    }

    #[tokio::test]
    async fn zero_limit_means_no_limit() {
        let store = seeded().await;

        let query = Query::builder().limit(0).build();
        let found = store.find_documents("people", query).await.unwrap();

        assert_eq!(found.len(), 3);
    }

    #[tokio::test]
    async fn replace_and_delete_report_missing_ids() {
        let store = seeded().await;
        let missing = Bson::ObjectId(ObjectId::new());

        assert!(store
            .replace_document("people", missing.clone(), doc! {})
            .await
            .unwrap_err()
            .is_not_found());
        assert!(store
            .delete_document("nobody", missing)
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn replace_overwrites_the_whole_document() {
        let store = seeded().await;
        let first = store.find_documents("people", Query::all()).await.unwrap().remove(0);
        let id = first.get(ID_FIELD).cloned().unwrap();

        store
            .replace_document("people", id.clone(), doc! { "name": "Caroline" })
            .await
            .unwrap();

        let found = store
            .find_documents("people", Filter::eq("name", "Caroline").into())
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get(ID_FIELD), Some(&id));
        assert!(!found[0].contains_key("age"));

        store.delete_document("people", id).await.unwrap();
        assert_eq!(store.count_documents("people").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn clones_share_data() {
        let store = InMemoryStore::builder().build().await.unwrap();
        let clone = store.clone();

        assert_eq!(store.count_documents("people").await.unwrap(), 0);
        clone
            .insert_document("people", Bson::Int32(1), doc! { "name": "Dan" })
            .await
            .unwrap();

        assert_eq!(store.count_documents("people").await.unwrap(), 1);
        assert_eq!(store.collection_names().await, ["people"]);
    }
}
