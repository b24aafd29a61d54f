//! A typed repository layer over document databases.
//!
//! This crate is the core of the mongorepo project and provides:
//!
//! - **Records** ([`record`]) - The trait a storable type implements, plus timestamp injection
//! - **Identifiers** ([`id`]) - Codecs between identifier fields and BSON ObjectIds
//! - **Queries** ([`query`]) - Backend-neutral filter expressions
//! - **Backends** ([`backend`]) - The seam every storage driver implements
//! - **Connections** ([`connection`]) - The shared handle, scoped sessions and untyped collections
//! - **Repositories** ([`repository`]) - Insert, find, update, delete and count for one record type
//! - **Configuration** ([`config`]) - Connection settings from code, TOML or the environment
//! - **Errors** ([`error`]) - The error and result types
//!
//! # Example
//!
//! ```ignore
//! use mongorepo::prelude::*;
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
//! let users = connection.repository::<User>();
//! users.insert_one(&mut user).await?;
//! let again = users.find_by_id(&user.id.to_hex()?).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as mongorepo_core;

pub mod backend;
pub mod collection;
pub mod config;
pub mod connection;
pub mod error;
pub mod id;
pub mod query;
pub mod record;
pub mod repository;
