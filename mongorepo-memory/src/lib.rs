//! In-memory storage backend for mongorepo.
//!
//! Implements the same semantics as the MongoDB backend (duplicate `_id` on insert is
//! a storage error, replacing or deleting a missing id is `NotFound`, unknown
//! collections count as empty) and evaluates filters locally. Useful for tests and
//! for developing without a running server.
//!
//! # Quick Start
//!
//! ```ignore
//! use mongorepo::prelude::*;
//! use mongorepo::memory::InMemoryStore;
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Record)]
//! pub struct User {
//!     #[serde(rename = "_id")]
//!     pub id: Option<ObjectId>,
//!     pub name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> RecordStoreResult<()> {
//!     let connection = Connection::new(InMemoryStore::new());
//!     let users = connection.repository::<User>();
//!
//!     let mut user = User { id: None, name: "Alice".into() };
//!     users.insert_one(&mut user).await?;
//!
//!     assert_eq!(connection.count::<User>().await?, 1);
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as mongorepo_memory;

pub mod evaluator;
pub mod store;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
