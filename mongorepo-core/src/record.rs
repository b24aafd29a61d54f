//! Core traits for records stored through a repository.
//!
//! A record is any serde-serializable struct that names its collection and exposes
//! its identifier and (optionally) its `created_at` / `updated_at` timestamps.
//! The repository uses those accessors to fill in the identifier and timestamps
//! before a write, so callers never have to do it by hand.

use bson::{Bson, DateTime, Document, de::deserialize_from_bson, ser::serialize_to_bson};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, from_value, to_value};

use crate::{
    error::{RecordStoreError, RecordStoreResult},
    id::{ID_FIELD, RecordId},
};

/// Core trait that every record stored through a repository must implement.
///
/// Usually derived with `#[derive(Record)]`, which binds the collection name to the
/// type name and picks up the `id`, `created_at` and `updated_at` fields.
///
/// The identifier must serialize under the `_id` key, so the field needs
/// `#[serde(rename = "_id")]`.
///
/// # Example
///
/// ```ignore
/// use mongorepo::{record::{Record, Timestamp}, bson::{oid::ObjectId, DateTime}};
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct User {
///     #[serde(rename = "_id")]
///     pub id: Option<ObjectId>,
///     pub name: String,
///     pub created_at: Option<DateTime>,
/// }
///
/// impl Record for User {
///     type Id = Option<ObjectId>;
///
///     fn collection_name() -> &'static str {
///         "User"
///     }
///
///     fn id(&self) -> &Self::Id {
///         &self.id
///     }
///
///     fn id_mut(&mut self) -> &mut Self::Id {
///         &mut self.id
///     }
///
///     fn created_at_mut(&mut self) -> Option<&mut dyn Timestamp> {
///         Some(&mut self.created_at)
///     }
/// }
/// ```
pub trait Record: Serialize + for<'de> Deserialize<'de> + Send + Sync + Clone + 'static {
    /// The identifier codec used by this record.
    type Id: RecordId;

    /// Returns the name of the collection this record is stored in.
    fn collection_name() -> &'static str;

    /// Returns a reference to this record's identifier.
    fn id(&self) -> &Self::Id;

    /// Returns a mutable reference to this record's identifier.
    fn id_mut(&mut self) -> &mut Self::Id;

    /// Returns the creation timestamp field, if the record has one.
    fn created_at_mut(&mut self) -> Option<&mut dyn Timestamp> {
        None
    }

    /// Returns the last-update timestamp field, if the record has one.
    fn updated_at_mut(&mut self) -> Option<&mut dyn Timestamp> {
        None
    }
}

/// A field that can be set to "now" by the repository.
///
/// Implemented for [`bson::DateTime`], [`chrono::DateTime<Utc>`] and `Option`s of both.
pub trait Timestamp: Send + Sync {
    /// Overwrites the field with the given instant.
    fn stamp(&mut self, now: DateTime);
}

impl Timestamp for DateTime {
    fn stamp(&mut self, now: DateTime) {
        *self = now;
    }
}

impl Timestamp for Option<DateTime> {
    fn stamp(&mut self, now: DateTime) {
        *self = Some(now);
    }
}

impl Timestamp for chrono::DateTime<Utc> {
    fn stamp(&mut self, now: DateTime) {
        *self = now.to_chrono();
    }
}

impl Timestamp for Option<chrono::DateTime<Utc>> {
    fn stamp(&mut self, now: DateTime) {
        *self = Some(now.to_chrono());
    }
}

/// Extension trait with the field injection and conversion helpers used by repositories.
///
/// Automatically implemented for all types that implement [`Record`].
pub trait RecordExt: Record {
    /// Prepares a record for its first write.
    ///
    /// Assigns an identifier if none is set and stamps both `created_at` and
    /// `updated_at` (when present) with the same instant.
    fn prepare_insert(&mut self, now: DateTime);

    /// Prepares a record for a replacement write. Only `updated_at` is touched.
    fn prepare_update(&mut self, now: DateTime);

    /// Converts this record to the BSON document written to storage.
    ///
    /// An assigned identifier is written under `_id` in its ObjectId form,
    /// whatever its Rust-side shape.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::InvalidArgument`] if the record does not serialize
    /// to a document (e.g. a newtype around a string), or a serialization error.
    fn to_document(&self) -> RecordStoreResult<Document>;

    /// Creates a record from a stored BSON document.
    fn from_document(document: Document) -> RecordStoreResult<Self>;

    /// Converts this record to a JSON value.
    fn to_json(&self) -> RecordStoreResult<Value>;

    /// Creates a record from a JSON value.
    fn from_json(value: Value) -> RecordStoreResult<Self>;
}

impl<R: Record> RecordExt for R {
    fn prepare_insert(&mut self, now: DateTime) {
        self.id_mut().ensure_assigned();

        if let Some(created_at) = self.created_at_mut() {
            created_at.stamp(now);
        }
        if let Some(updated_at) = self.updated_at_mut() {
            updated_at.stamp(now);
        }
    }

    fn prepare_update(&mut self, now: DateTime) {
        if let Some(updated_at) = self.updated_at_mut() {
            updated_at.stamp(now);
        }
    }

    fn to_document(&self) -> RecordStoreResult<Document> {
        let mut document = match serialize_to_bson(self)? {
            Bson::Document(document) => document,
            other => {
                return Err(RecordStoreError::InvalidArgument(format!(
                    "records of {} must serialize to a document, got {:?}",
                    R::collection_name(),
                    other.element_type()
                )));
            }
        };

        if self.id().is_assigned() {
            document.insert(ID_FIELD, self.id().to_bson()?);
        }

        Ok(document)
    }

    fn from_document(document: Document) -> RecordStoreResult<Self> {
        Ok(deserialize_from_bson(Bson::Document(document))?)
    }

    fn to_json(&self) -> RecordStoreResult<Value> {
        Ok(to_value(self)?)
    }

    fn from_json(value: Value) -> RecordStoreResult<Self> {
        Ok(from_value(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::HexId;
    use bson::oid::ObjectId;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        #[serde(rename = "_id")]
        id: HexId,
        body: String,
        created_at: Option<DateTime>,
        updated_at: chrono::DateTime<Utc>,
    }

    impl Record for Note {
        type Id = HexId;

        fn collection_name() -> &'static str {
            "Note"
        }

        fn id(&self) -> &HexId {
            &self.id
        }

        fn id_mut(&mut self) -> &mut HexId {
            &mut self.id
        }

        fn created_at_mut(&mut self) -> Option<&mut dyn Timestamp> {
            Some(&mut self.created_at)
        }

        fn updated_at_mut(&mut self) -> Option<&mut dyn Timestamp> {
            Some(&mut self.updated_at)
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(transparent)]
    struct Bare(String);

    impl Record for Bare {
        type Id = Option<ObjectId>;

        fn collection_name() -> &'static str {
            "Bare"
        }

        fn id(&self) -> &Self::Id {
            &None
        }

        fn id_mut(&mut self) -> &mut Self::Id {
            unreachable!("bare records never reach the injector in these tests")
        }
    }

    fn note() -> Note {
        Note {
            id: HexId::default(),
            body: "hello".into(),
            created_at: None,
            updated_at: chrono::DateTime::<Utc>::MIN_UTC,
        }
    }

    #[test]
    fn prepare_insert_assigns_id_and_both_timestamps() {
        let now = DateTime::now();
        let mut record = note();

        record.prepare_insert(now);

        assert!(record.id.is_valid());
        assert_eq!(record.created_at, Some(now));
        assert_eq!(record.updated_at, now.to_chrono());
    }

    #[test]
    fn prepare_insert_keeps_existing_id() {
        let id = HexId::from(ObjectId::new());
        let mut record = Note { id: id.clone(), ..note() };

        record.prepare_insert(DateTime::now());

        assert_eq!(record.id, id);
    }

    #[test]
    fn prepare_update_only_touches_updated_at() {
        let created = DateTime::from_millis(1_000);
        let now = DateTime::from_millis(2_000);
        let mut record = Note { created_at: Some(created), ..note() };

        record.prepare_update(now);

        assert_eq!(record.created_at, Some(created));
        assert_eq!(record.updated_at, now.to_chrono());
    }

    #[test]
    fn non_document_records_are_invalid_arguments() {
        let err = Bare("just text".into()).to_document().unwrap_err();

        assert!(matches!(err, RecordStoreError::InvalidArgument(_)));
    }

    #[test]
    fn documents_round_trip() {
        let mut record = note();
        record.prepare_insert(DateTime::now());

        let document = record.to_document().unwrap();
        assert!(matches!(document.get("_id"), Some(Bson::ObjectId(_))));

        assert_eq!(Note::from_document(document).unwrap(), record);
        assert_eq!(record.to_json().unwrap()["body"], "hello");
        assert_eq!(record.to_json().unwrap()["_id"], record.id.as_str());
    }
}
