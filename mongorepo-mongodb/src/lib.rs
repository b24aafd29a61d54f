//! MongoDB backend for mongorepo.
//!
//! Wraps the official `mongodb` driver. Pooling, topology discovery, authentication
//! and query execution stay with the driver; this crate only maps the backend seam
//! onto single driver calls.
//!
//! Enable it through the facade's `mongodb` feature:
//!
//! ```toml
//! [dependencies]
//! mongorepo = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Example
//!
//! ```ignore
//! use mongorepo::mongodb::configure;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let connection = configure("localhost:27017", "app").await?;
//!     let users = connection.repository::<User>();
//!
//!     println!("{} users", users.count().await?);
//!     connection.shutdown().await?;
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as mongorepo_mongodb;

mod query;
pub mod store;

use mongorepo_core::{config::ConnectionConfig, connection::Connection, error::RecordStoreResult};

pub use store::{MongoDbStore, MongoDbStoreBuilder};

/// Connects to `servers` and binds the connection to `database`.
///
/// `servers` is either a host list (`"localhost"`, `"h1:27017,h2:27017"`) or a full
/// `mongodb://` / `mongodb+srv://` URI.
///
/// # Errors
///
/// Returns `Connection` when the address cannot be parsed or the servers do not
/// answer a ping, and `Configuration` when either argument is empty.
pub async fn configure(
    servers: &str,
    database: &str,
) -> RecordStoreResult<Connection<MongoDbStore>> {
    Connection::connect(MongoDbStoreBuilder::new(servers, database)).await
}

/// Like [`configure`], with pool, timeout and application-name settings.
pub async fn configure_with(
    config: &ConnectionConfig,
) -> RecordStoreResult<Connection<MongoDbStore>> {
    Connection::connect(MongoDbStoreBuilder::from_config(config.clone())).await
}
