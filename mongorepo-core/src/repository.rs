//! Typed record operations: insert, find, update, delete and count.
//!
//! Each call acquires a session from the connection, resolves the collection from
//! the record type, performs one backend call per record and releases the session
//! when it returns.

use bson::DateTime;
use std::marker::PhantomData;
use tracing::debug;

use crate::{
    backend::StoreBackend,
    connection::Connection,
    error::{RecordStoreError, RecordStoreResult},
    id::RecordId,
    query::{Expr, Filter, Query},
    record::{Record, RecordExt},
};

/// A destination for find results.
///
/// A single record receives the first match and fails with `NotFound` when there
/// is none; a `Vec` is replaced with every match.
pub trait FindTarget<R: Record>: Send {
    /// Whether only the first match is wanted.
    const SINGLE: bool;

    /// Stores the results of a find.
    fn fill(&mut self, found: Vec<R>, collection: &str) -> RecordStoreResult<()>;
}

impl<R: Record> FindTarget<R> for R {
    const SINGLE: bool = true;

    fn fill(&mut self, found: Vec<R>, collection: &str) -> RecordStoreResult<()> {
        match found.into_iter().next() {
            Some(record) => {
                *self = record;
                Ok(())
            }
            None => Err(RecordStoreError::NotFound(
                "matching filter".into(),
                collection.to_string(),
            )),
        }
    }
}

impl<R: Record> FindTarget<R> for Vec<R> {
    const SINGLE: bool = false;

    fn fill(&mut self, found: Vec<R>, _collection: &str) -> RecordStoreResult<()> {
        *self = found;
        Ok(())
    }
}

/// Typed access to the collection of one record type.
#[derive(Debug)]
pub struct Repository<B: StoreBackend, R: Record> {
    connection: Connection<B>,
    _marker: PhantomData<fn() -> R>,
}

impl<B: StoreBackend, R: Record> Clone for Repository<B, R> {
    fn clone(&self) -> Self {
        Self::new(self.connection.clone())
    }
}

impl<B: StoreBackend, R: Record> Repository<B, R> {
    pub fn new(connection: Connection<B>) -> Self {
        Self { connection, _marker: PhantomData }
    }

    /// Returns the collection this repository reads and writes.
    pub fn collection_name(&self) -> &'static str {
        R::collection_name()
    }

    /// Inserts records in order.
    ///
    /// Each record gets an identifier if it has none and both timestamps set to the
    /// time of the call. Stops at the first failure; records after it are left
    /// untouched and earlier ones stay inserted.
    pub async fn insert(&self, records: &mut [R]) -> RecordStoreResult<()> {
        let session = self.connection.session();
        let collection = session.collection(R::collection_name());
        let now = DateTime::now();

        debug!(collection = %collection.name(), count = records.len(), "inserting records");

        for record in records.iter_mut() {
            record.prepare_insert(now);

            let document = record.to_document()?;
            let id = record.id().to_bson()?;

            collection.insert_with_id(id, document).await?;
        }

        Ok(())
    }

    pub async fn insert_one(&self, record: &mut R) -> RecordStoreResult<()> {
        self.insert(std::slice::from_mut(record)).await
    }

    /// Returns every record matching a filter or query.
    pub async fn find(&self, query: impl Into<Query>) -> RecordStoreResult<Vec<R>> {
        let session = self.connection.session();

        session
            .collection(R::collection_name())
            .find(query)
            .await?
            .into_iter()
            .map(R::from_document)
            .collect()
    }

    /// Returns the first record matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::NotFound`] when nothing matches.
    pub async fn find_one(&self, filter: Expr) -> RecordStoreResult<R> {
        let mut found = self
            .find(Query { limit: Some(1), ..Query::from(filter) })
            .await?
            .into_iter();

        found.next().ok_or_else(|| {
            RecordStoreError::NotFound("matching filter".into(), R::collection_name().to_string())
        })
    }

    /// Finds into an existing record or vector.
    ///
    /// ```ignore
    /// let mut admins: Vec<User> = Vec::new();
    /// users.find_into(&mut admins, Filter::eq("role", "admin")).await?;
    ///
    /// let mut alice = User::default();
    /// users.find_into(&mut alice, Filter::eq("name", "Alice")).await?;
    /// ```
    pub async fn find_into<T>(
        &self,
        target: &mut T,
        query: impl Into<Query>,
    ) -> RecordStoreResult<()>
    where
        T: FindTarget<R>,
    {
        let mut query = query.into();
        if T::SINGLE {
            query.limit = Some(1);
        }

        let found = self.find(query).await?;
        target.fill(found, R::collection_name())
    }

    /// Returns the record with the given hex identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::InvalidArgument`] for malformed hex and
    /// [`RecordStoreError::NotFound`] when no record has that identifier.
    pub async fn find_by_id(&self, id: &str) -> RecordStoreResult<R> {
        self.find_one(Filter::id_hex(id)?)
            .await
            .map_err(|err| match err {
                RecordStoreError::NotFound(..) => {
                    RecordStoreError::NotFound(id.to_string(), R::collection_name().to_string())
                }
                other => other,
            })
    }

    /// Finds by hex identifier into an existing record or vector.
    pub async fn find_by_id_into<T>(&self, target: &mut T, id: &str) -> RecordStoreResult<()>
    where
        T: FindTarget<R>,
    {
        self.find_into(target, Filter::id_hex(id)?).await
    }

    /// Replaces the stored record with the same identifier.
    ///
    /// Sets `updated_at` and leaves `created_at` as it is.
    pub async fn update(&self, record: &mut R) -> RecordStoreResult<()> {
        let id = record.id().to_bson()?;
        record.prepare_update(DateTime::now());

        let document = record.to_document()?;
        let session = self.connection.session();
        let collection = session.collection(R::collection_name());

        collection.replace(id, document).await
    }

    /// Deletes the stored record with the same identifier.
    pub async fn delete(&self, record: &R) -> RecordStoreResult<()> {
        let id = record.id().to_bson()?;
        let session = self.connection.session();

        session.collection(R::collection_name()).delete(id).await
    }

    /// Counts every record of this type.
    pub async fn count(&self) -> RecordStoreResult<u64> {
        let session = self.connection.session();

        session.collection(R::collection_name()).count().await
    }
}
