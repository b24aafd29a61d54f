//! Commonly used types and traits.
//!
//! ```ignore
//! use mongorepo::prelude::*;
//! ```
//!
//! Brings in the `Record` trait together with its derive, the identifier and
//! timestamp types, filters and queries, the connection and repository types, and
//! the error types.

pub use bson::{DateTime, oid::ObjectId};
pub use mongorepo_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    collection::Collection,
    config::ConnectionConfig,
    connection::{Connection, Session},
    error::{RecordStoreError, RecordStoreResult},
    id::{HexId, RecordId},
    query::{Expr, Filter, Query, QueryBuilder, Sort, SortDirection},
    record::{Record, RecordExt, Timestamp},
    repository::{FindTarget, Repository},
};
pub use mongorepo_macros::Record;
