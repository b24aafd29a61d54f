//! Untyped, BSON-level access to a single collection.
//!
//! A [`Collection`] is borrowed from a [`Session`](crate::connection::Session) and
//! forwards each call to the backend. Typed repositories are built on top of it.
//!
//! # Example
//!
//! ```ignore
//! use mongorepo::bson::doc;
//! use mongorepo::query::Filter;
//!
//! let session = connection.session();
//! let users = session.collection("users");
//!
//! let id = users.insert(doc! { "name": "Alice" }).await?;
//! let found = users.find(Filter::eq("name", "Alice")).await?;
//! ```

use bson::{Bson, Document, oid::ObjectId};
use tracing::debug;

use crate::{backend::StoreBackend, error::RecordStoreResult, id::ID_FIELD, query::Query};

/// An untyped collection with a reference to a storage backend.
#[derive(Debug)]
pub struct Collection<'a, B: StoreBackend> {
    name: String,
    backend: &'a B,
}

impl<'a, B: StoreBackend> Collection<'a, B> {
    pub(crate) fn new(name: String, backend: &'a B) -> Self {
        Self { name, backend }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inserts a document, generating an ObjectId when it carries no `_id`.
    ///
    /// Returns the identifier the document was stored under.
    pub async fn insert(&self, mut document: Document) -> RecordStoreResult<Bson> {
        let id = match document.get(ID_FIELD) {
            Some(id) => id.clone(),
            None => {
                let id = Bson::ObjectId(ObjectId::new());
                document.insert(ID_FIELD, id.clone());
                id
            }
        };

        self.insert_with_id(id.clone(), document).await?;
        Ok(id)
    }

    /// Inserts a document under an explicit identifier.
    pub async fn insert_with_id(&self, id: Bson, document: Document) -> RecordStoreResult<()> {
        debug!(collection = %self.name, "inserting document");

        self.backend.insert_document(&self.name, id, document).await
    }

    /// Returns the documents matching a filter or query.
    pub async fn find(&self, query: impl Into<Query>) -> RecordStoreResult<Vec<Document>> {
        let query = query.into();
        debug!(collection = %self.name, ?query, "finding documents");

        self.backend.find_documents(&self.name, query).await
    }

    /// Replaces the document stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`NotFound`](crate::error::RecordStoreError::NotFound) when no document
    /// has that identifier.
    pub async fn replace(&self, id: Bson, document: Document) -> RecordStoreResult<()> {
        debug!(collection = %self.name, "replacing document");

        self.backend
            .replace_document(&self.name, id, document)
            .await
    }

    /// Deletes the document stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`NotFound`](crate::error::RecordStoreError::NotFound) when no document
    /// has that identifier.
    pub async fn delete(&self, id: Bson) -> RecordStoreResult<()> {
        debug!(collection = %self.name, "deleting document");

        self.backend.delete_document(&self.name, id).await
    }

    /// Counts every document in the collection.
    pub async fn count(&self) -> RecordStoreResult<u64> {
        debug!(collection = %self.name, "counting documents");

        self.backend.count_documents(&self.name).await
    }
}
