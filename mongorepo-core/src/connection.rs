//! Caller-owned connection handle and scoped sessions.
//!
//! A [`Connection`] wraps one backend in an `Arc`. Cloning it is cheap and every
//! clone talks to the same driver. Each repository operation acquires a [`Session`]
//! for its duration and releases it on scope exit, error paths included.
//!
//! # Example
//!
//! ```ignore
//! use mongorepo::mongodb::configure;
//!
//! let connection = configure("localhost:27017", "app").await?;
//! let users = connection.repository::<User>();
//!
//! users.insert_one(&mut user).await?;
//! println!("{} users", connection.count::<User>().await?);
//!
//! connection.shutdown().await?;
//! ```

use std::sync::Arc;

use tracing::{info, trace, warn};

use crate::{
    backend::{StoreBackend, StoreBackendBuilder},
    collection::Collection,
    error::RecordStoreResult,
    record::Record,
    repository::Repository,
};

/// Shared handle around a storage backend.
#[derive(Debug)]
pub struct Connection<B: StoreBackend> {
    backend: Arc<B>,
}

impl<B: StoreBackend> Clone for Connection<B> {
    fn clone(&self) -> Self {
        Self { backend: Arc::clone(&self.backend) }
    }
}

impl<B: StoreBackend> Connection<B> {
    /// Wraps an already connected backend.
    pub fn new(backend: B) -> Self {
        Self { backend: Arc::new(backend) }
    }

    /// Builds the backend and wraps it.
    pub async fn connect<T>(builder: T) -> RecordStoreResult<Self>
    where
        T: StoreBackendBuilder<Backend = B>,
    {
        let backend = builder.build().await?;
        info!(?backend, "connected");

        Ok(Self::new(backend))
    }

    /// Returns the backend this connection wraps.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Acquires a session; it is released when dropped.
    pub fn session(&self) -> Session<B> {
        trace!("session acquired");

        Session { backend: Arc::clone(&self.backend) }
    }

    /// Returns the repository for a record type.
    pub fn repository<R: Record>(&self) -> Repository<B, R> {
        Repository::new(self.clone())
    }

    /// Counts the documents in the collection of `R`.
    pub async fn count<R: Record>(&self) -> RecordStoreResult<u64> {
        self.repository::<R>().count().await
    }

    /// Shuts the backend down.
    ///
    /// The driver is only closed when this is the last handle; otherwise the other
    /// holders keep it alive and a warning is logged.
    pub async fn shutdown(self) -> RecordStoreResult<()> {
        match Arc::try_unwrap(self.backend) {
            Ok(backend) => {
                backend.shutdown().await?;
                info!("connection shut down");
            }
            Err(shared) => {
                warn!(
                    handles = Arc::strong_count(&shared) - 1,
                    "connection still in use elsewhere, leaving the backend open"
                );
            }
        }

        Ok(())
    }
}

/// A scoped handle on the backend, held for the duration of one operation.
#[derive(Debug)]
pub struct Session<B: StoreBackend> {
    backend: Arc<B>,
}

impl<B: StoreBackend> Session<B> {
    /// Returns an untyped handle on the named collection.
    pub fn collection(&self, name: &str) -> Collection<'_, B> {
        Collection::new(name.to_string(), &self.backend)
    }
}

impl<B: StoreBackend> Drop for Session<B> {
    fn drop(&mut self) {
        trace!("session released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bson::{Bson, Document};
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::query::Query;

    #[derive(Debug, Default)]
    struct Probe {
        shutdowns: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl StoreBackend for Probe {
        async fn insert_document(&self, _: &str, _: Bson, _: Document) -> RecordStoreResult<()> {
            Ok(())
        }

        async fn find_documents(&self, _: &str, _: Query) -> RecordStoreResult<Vec<Document>> {
            Ok(Vec::new())
        }

        async fn replace_document(&self, _: &str, _: Bson, _: Document) -> RecordStoreResult<()> {
            Ok(())
        }

        async fn delete_document(&self, _: &str, _: Bson) -> RecordStoreResult<()> {
            Ok(())
        }

        async fn count_documents(&self, _: &str) -> RecordStoreResult<u64> {
            Ok(0)
        }

        async fn shutdown(self) -> RecordStoreResult<()> {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct ProbeBuilder(Arc<AtomicUsize>);

    #[async_trait]
    impl StoreBackendBuilder for ProbeBuilder {
        type Backend = Probe;

        async fn build(self) -> RecordStoreResult<Probe> {
            Ok(Probe { shutdowns: self.0 })
        }
    }

    #[tokio::test]
    async fn shutdown_waits_for_the_last_handle() {
        let shutdowns = Arc::new(AtomicUsize::new(0));
        let connection = Connection::connect(ProbeBuilder(shutdowns.clone()))
            .await
            .unwrap();
        let other = connection.clone();

        connection.shutdown().await.unwrap();
        assert_eq!(shutdowns.load(Ordering::SeqCst), 0);

        other.shutdown().await.unwrap();
        assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn sessions_release_their_handle() {
        let connection = Connection::new(Probe::default());

        {
            let session = connection.session();
            assert_eq!(session.collection("users").name(), "users");
            assert_eq!(Arc::strong_count(&connection.backend), 2);
        }

        assert_eq!(Arc::strong_count(&connection.backend), 1);
    }
}
