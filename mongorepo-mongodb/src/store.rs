use async_trait::async_trait;
use bson::{Bson, Document, doc};
use futures::TryStreamExt;
use mongodb::{
    Client, Collection as MongoCollection, Database,
    error::{Error as DriverError, ErrorKind},
    options::ClientOptions,
};
use std::time::Duration;
use tracing::{debug, info};

use mongorepo_core::{
    backend::{StoreBackend, StoreBackendBuilder, describe_id},
    config::ConnectionConfig,
    error::{RecordStoreError, RecordStoreResult},
    id::ID_FIELD,
    query::Query,
};

use crate::query::MongoQueryTranslator;

/// Maps driver failures onto repository errors.
///
/// Network and server-selection failures are connection errors; everything else the
/// driver reports (write errors, duplicate keys, command failures) is a storage error.
pub(crate) fn storage_error(err: DriverError) -> RecordStoreError {
    match *err.kind {
        ErrorKind::Io(_) | ErrorKind::ServerSelection { .. } | ErrorKind::DnsResolve { .. } => {
            RecordStoreError::Connection(err.to_string())
        }
        _ => RecordStoreError::Storage(err.to_string()),
    }
}

fn connection_error(err: DriverError) -> RecordStoreError {
    RecordStoreError::Connection(err.to_string())
}

#[derive(Debug, Clone)]
pub struct MongoDbStore {
    client: Client,
    database: Database,
}

impl MongoDbStore {
    pub fn new(client: Client, database: &str) -> Self {
        let database = client.database(database);
        Self { client, database }
    }

    pub fn builder(servers: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(servers, database)
    }

    /// The underlying driver client, for operations this crate does not wrap.
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn database_name(&self) -> &str {
        self.database.name()
    }

    fn collection(&self, name: &str) -> MongoCollection<Document> {
        self.database.collection(name)
    }
}

fn with_id(id: Bson, mut document: Document) -> Document {
    document.insert(ID_FIELD, id);
    document
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn insert_document(
        &self,
        collection: &str,
        id: Bson,
        document: Document,
    ) -> RecordStoreResult<()> {
        self.collection(collection)
            .insert_one(with_id(id, document))
            .await
            .map_err(storage_error)?;

        Ok(())
    }

    async fn find_documents(
        &self,
        collection: &str,
        query: Query,
    ) -> RecordStoreResult<Vec<Document>> {
        let filter = MongoQueryTranslator::filter(&query)?;
        let options = MongoQueryTranslator::options(&query);

        debug!(collection, %filter, "mongodb find");

        self.collection(collection)
            .find(filter)
            .with_options(options)
            .await
            .map_err(storage_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(storage_error)
    }

    async fn replace_document(
        &self,
        collection: &str,
        id: Bson,
        document: Document,
    ) -> RecordStoreResult<()> {
        let result = self
            .collection(collection)
            .replace_one(doc! { ID_FIELD: id.clone() }, with_id(id.clone(), document))
            .await
            .map_err(storage_error)?;

        if result.matched_count == 0 {
            return Err(RecordStoreError::NotFound(describe_id(&id), collection.to_string()));
        }

        Ok(())
    }

    async fn delete_document(&self, collection: &str, id: Bson) -> RecordStoreResult<()> {
        let result = self
            .collection(collection)
            .delete_one(doc! { ID_FIELD: id.clone() })
            .await
            .map_err(storage_error)?;

        if result.deleted_count == 0 {
            return Err(RecordStoreError::NotFound(describe_id(&id), collection.to_string()));
        }

        Ok(())
    }

    async fn count_documents(&self, collection: &str) -> RecordStoreResult<u64> {
        self.collection(collection)
            .count_documents(doc! {})
            .await
            .map_err(storage_error)
    }

    async fn shutdown(self) -> RecordStoreResult<()> {
        self.client.shutdown().await;
        info!(database = %self.database.name(), "mongodb client shut down");

        Ok(())
    }
}

/// Connects a [`MongoDbStore`] from connection settings.
///
/// Building parses the address, applies pool and timeout settings, and pings the
/// server so unreachable deployments fail here rather than on first use.
#[derive(Debug, Clone)]
pub struct MongoDbStoreBuilder {
    config: ConnectionConfig,
}

impl MongoDbStoreBuilder {
    pub fn new(servers: &str, database: &str) -> Self {
        Self::from_config(ConnectionConfig::new(servers, database))
    }

    pub fn from_config(config: ConnectionConfig) -> Self {
        Self { config }
    }

    pub fn app_name(mut self, app_name: impl Into<String>) -> Self {
        self.config.app_name = Some(app_name.into());
        self
    }

    pub fn max_pool_size(mut self, size: u32) -> Self {
        self.config.max_pool_size = Some(size);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    async fn client_options(&self) -> RecordStoreResult<ClientOptions> {
        let mut options = ClientOptions::parse(self.config.connection_uri().as_str())
            .await
            .map_err(connection_error)?;

        let timeout = Duration::from_millis(self.config.connect_timeout_ms);
        options.connect_timeout = Some(timeout);
        options.server_selection_timeout = Some(timeout);

        if let Some(app_name) = &self.config.app_name {
            options.app_name = Some(app_name.clone());
        }
        if let Some(size) = self.config.max_pool_size {
            options.max_pool_size = Some(size);
        }
        if let Some(size) = self.config.min_pool_size {
            options.min_pool_size = Some(size);
        }

        Ok(options)
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> RecordStoreResult<Self::Backend> {
        self.config.validate()?;

        let options = self.client_options().await?;
        let hosts = options.hosts.len();
        let client = Client::with_options(options).map_err(connection_error)?;
        let store = MongoDbStore::new(client, &self.config.database);

        store
            .database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(connection_error)?;

        info!(database = %self.config.database, hosts, "connected to mongodb");
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn client_options_follow_config() {
        let config = ConnectionConfig::new("h1:27017,h2:27018", "app")
            .with_app_name("billing")
            .with_max_pool_size(7)
            .with_connect_timeout_ms(1_500);

        let options = MongoDbStoreBuilder::from_config(config)
            .client_options()
            .await
            .unwrap();

        assert_eq!(options.hosts.len(), 2);
        assert_eq!(options.app_name.as_deref(), Some("billing"));
        assert_eq!(options.max_pool_size, Some(7));
        assert_eq!(options.connect_timeout, Some(Duration::from_millis(1_500)));
    }

    #[tokio::test]
    async fn malformed_addresses_fail_to_connect() {
        let err = MongoDbStore::builder("mongodb://", "app")
            .build()
            .await
            .unwrap_err();

        assert!(matches!(err, RecordStoreError::Connection(_)));
    }

    #[tokio::test]
    async fn empty_database_is_rejected_before_dialing() {
        let err = MongoDbStore::builder("localhost", " ")
            .build()
            .await
            .unwrap_err();

        assert!(matches!(err, RecordStoreError::Configuration(_)));
    }
}
