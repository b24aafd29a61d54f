//! Storage backend abstraction for repositories.
//!
//! A backend is the thin adapter between the repository layer and the actual driver.
//! Each method maps to exactly one driver call; identifier assignment, timestamps and
//! (de)serialization happen above this seam, in the repository.
//!
//! # Traits
//!
//! - [`StoreBackend`]: the per-collection document operations
//! - [`StoreBackendBuilder`]: factory used to connect a backend
//!
//! # Examples
//!
//! ```ignore
//! use mongorepo::backend::StoreBackend;
//! use mongorepo::bson::{doc, oid::ObjectId, Bson};
//!
//! let id = ObjectId::new();
//! backend
//!     .insert_document("User", Bson::ObjectId(id), doc! { "_id": id, "name": "Alice" })
//!     .await?;
//! ```

use async_trait::async_trait;
use bson::{Bson, Document};
use std::fmt::Debug;

use crate::{error::RecordStoreResult, query::Query};

/// Abstract interface for document storage backends.
///
/// Documents are addressed by the value stored under `_id`. Implementations must be
/// thread-safe; the connection shares one backend across every session.
///
/// # Error Handling
///
/// Missing documents on replace and delete are reported as
/// [`RecordStoreError::NotFound`](crate::error::RecordStoreError::NotFound).
/// Driver failures map to `Connection` or `Storage`.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Inserts a new document.
    ///
    /// The backend writes `id` under `_id`, replacing whatever the document carried
    /// there. Inserting an `_id` that already exists is a
    /// [`Storage`](crate::error::RecordStoreError::Storage) error.
    async fn insert_document(
        &self,
        collection: &str,
        id: Bson,
        document: Document,
    ) -> RecordStoreResult<()>;

    /// Returns the documents matching `query`, honoring its sort, offset and limit.
    async fn find_documents(&self, collection: &str, query: Query)
    -> RecordStoreResult<Vec<Document>>;

    /// Replaces the whole document stored under `id`.
    ///
    /// Returns `NotFound` when no document has that identifier.
    async fn replace_document(
        &self,
        collection: &str,
        id: Bson,
        document: Document,
    ) -> RecordStoreResult<()>;

    /// Removes the document stored under `id`.
    ///
    /// Returns `NotFound` when no document has that identifier.
    async fn delete_document(&self, collection: &str, id: Bson) -> RecordStoreResult<()>;

    /// Counts every document in a collection. Unknown collections count as empty.
    async fn count_documents(&self, collection: &str) -> RecordStoreResult<u64>;

    /// Cleanly shuts down the backend, releasing all resources.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(self) -> RecordStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> RecordStoreResult<Self::Backend>;
}

/// Renders an identifier for error messages: hex for ObjectIds, the plain value otherwise.
pub fn describe_id(id: &Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::oid::ObjectId;

    #[test]
    fn describe_id_prefers_hex() {
        let oid = ObjectId::new();

        assert_eq!(describe_id(&Bson::ObjectId(oid)), oid.to_hex());
        assert_eq!(describe_id(&Bson::String("abc".into())), "abc");
        assert_eq!(describe_id(&Bson::Int32(7)), "7");
    }
}
