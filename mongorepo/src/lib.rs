//! Typed repositories over MongoDB.
//!
//! This crate is the primary entry point for users of mongorepo. It re-exports the
//! core types from the sub-crates and gives access to the storage backends.
//!
//! A record is any serde struct that derives [`Record`]. Its repository offers
//! insert, find, find-by-id, update, delete and count without per-type code. Inserts
//! assign an ObjectId when the record has none and stamp `created_at` / `updated_at`;
//! updates stamp `updated_at` only.
//!
//! # Quick Start
//!
//! ```ignore
//! use mongorepo::prelude::*;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Record)]
//! pub struct User {
//!     #[serde(rename = "_id")]
//!     pub id: Option<ObjectId>,
//!     pub name: String,
//!     pub created_at: Option<DateTime>,
//!     pub updated_at: Option<DateTime>,
//! }
//!
//! #[tokio::main]
//! async fn main() -> RecordStoreResult<()> {
//!     let connection = mongorepo::mongodb::configure("localhost:27017", "app").await?;
//!     let users = connection.repository::<User>();
//!
//!     let mut alice = User { id: None, name: "Alice".into(), created_at: None, updated_at: None };
//!     users.insert_one(&mut alice).await?;
//!
//!     let found = users.find_by_id(&alice.id.to_hex()?).await?;
//!     assert_eq!(found.name, "Alice");
//!
//!     alice.name = "Alice Liddell".into();
//!     users.update(&mut alice).await?;
//!
//!     let named: Vec<User> = users.find(Filter::eq("name", "Alice Liddell")).await?;
//!     assert_eq!(named.len(), 1);
//!
//!     users.delete(&alice).await?;
//!     connection.shutdown().await
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-process storage for tests and development
//! - [`mongodb`] - The MongoDB driver (requires the `mongodb` feature)

#[allow(unused_extern_crates)]
extern crate self as mongorepo;

pub mod prelude;

pub use mongorepo_core::{
    backend, collection, config, connection, error, id, query, record, repository,
};
pub use mongorepo_macros::Record;

pub use bson;
pub use chrono;

/// In-memory storage backend.
pub mod memory {
    pub use mongorepo_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use mongorepo_mongodb::{MongoDbStore, MongoDbStoreBuilder, configure, configure_with};
}
