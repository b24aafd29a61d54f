//! Identifier codecs for records.
//!
//! Every record stores its identifier under the `_id` key as a BSON ObjectId.
//! The Rust-side field can take one of several shapes, each of which implements
//! [`RecordId`]:
//!
//! - [`ObjectId`] - the native binary identifier; the all-zero id counts as unassigned
//! - `Option<ObjectId>` - `None` until the record is first inserted
//! - [`HexId`] - a string alias holding the 24-character hex form, handy when the
//!   identifier is passed around as text (URLs, JSON payloads, templates)
//!
//! The shape is chosen per record type when implementing [`Record`](crate::record::Record),
//! so there is no runtime detection of the field's type.

use bson::{Bson, oid::ObjectId};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as DeError};
use std::{fmt, str::FromStr};

use crate::error::{RecordStoreError, RecordStoreResult};

/// The document key every record identifier is stored under.
pub const ID_FIELD: &str = "_id";

/// Codec between a record's identifier field and the canonical ObjectId.
pub trait RecordId: Clone + fmt::Debug + Send + Sync + 'static {
    /// Produces a fresh, unique identifier.
    fn generate() -> Self;

    /// Returns `true` when the identifier holds a usable value.
    fn is_assigned(&self) -> bool;

    /// Converts the identifier to its canonical binary form.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::InvalidArgument`] if no identifier was assigned, or
    /// [`RecordStoreError::TypeMismatch`] if the stored value is not an ObjectId.
    fn to_object_id(&self) -> RecordStoreResult<ObjectId>;

    /// Converts the identifier to the BSON value stored under `_id`.
    fn to_bson(&self) -> RecordStoreResult<Bson> {
        Ok(Bson::ObjectId(self.to_object_id()?))
    }

    /// Returns the 24-character hex form of the identifier.
    fn to_hex(&self) -> RecordStoreResult<String> {
        Ok(self.to_object_id()?.to_hex())
    }

    /// Replaces an unassigned identifier with a generated one.
    ///
    /// Returns `true` if a new identifier was assigned.
    fn ensure_assigned(&mut self) -> bool {
        if self.is_assigned() {
            return false;
        }

        *self = Self::generate();
        true
    }
}

impl RecordId for ObjectId {
    fn generate() -> Self {
        ObjectId::new()
    }

    fn is_assigned(&self) -> bool {
        self.bytes() != [0; 12]
    }

    fn to_object_id(&self) -> RecordStoreResult<ObjectId> {
        if !self.is_assigned() {
            return Err(RecordStoreError::InvalidArgument(
                "record identifier is not assigned".into(),
            ));
        }

        Ok(*self)
    }
}

impl RecordId for Option<ObjectId> {
    fn generate() -> Self {
        Some(ObjectId::new())
    }

    fn is_assigned(&self) -> bool {
        self.as_ref().is_some_and(RecordId::is_assigned)
    }

    fn to_object_id(&self) -> RecordStoreResult<ObjectId> {
        match self {
            Some(id) => id.to_object_id(),
            None => Err(RecordStoreError::InvalidArgument(
                "record identifier is not assigned".into(),
            )),
        }
    }
}

/// Parses the hex form of an ObjectId supplied by a caller.
///
/// # Errors
///
/// Returns [`RecordStoreError::InvalidArgument`] if `hex` is not a valid ObjectId.
pub fn parse_object_id(hex: &str) -> RecordStoreResult<ObjectId> {
    ObjectId::parse_str(hex)
        .map_err(|e| RecordStoreError::InvalidArgument(format!("invalid identifier {hex:?}: {e}")))
}

/// A string identifier holding the hex form of an ObjectId.
///
/// It serializes as plain lowercase hex text, so JSON payloads and templates see
/// the string form. Records write it under `_id` as a real ObjectId (see
/// [`RecordExt::to_document`](crate::record::RecordExt::to_document)), which keeps
/// it interchangeable with records that use [`ObjectId`] directly. Reading accepts
/// either a stored ObjectId or a hex string.
///
/// # Example
///
/// ```ignore
/// use mongorepo::id::HexId;
///
/// let id: HexId = "6553f1c2a1b2c3d4e5f60718".parse()?;
/// assert_eq!(id.as_str(), "6553f1c2a1b2c3d4e5f60718");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HexId(String);

impl HexId {
    /// Wraps a string without validating it.
    ///
    /// The text is lowercased to match the form read back from storage. Invalid
    /// values are reported when the identifier is used against storage.
    pub fn new_unchecked(value: impl Into<String>) -> Self {
        let mut value = value.into();
        value.make_ascii_lowercase();
        Self(value)
    }

    /// Returns the hex text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the text is a valid 24-character ObjectId.
    pub fn is_valid(&self) -> bool {
        ObjectId::parse_str(&self.0).is_ok()
    }
}

impl RecordId for HexId {
    fn generate() -> Self {
        Self(ObjectId::new().to_hex())
    }

    fn is_assigned(&self) -> bool {
        self.is_valid()
    }

    fn to_object_id(&self) -> RecordStoreResult<ObjectId> {
        if self.0.is_empty() {
            return Err(RecordStoreError::InvalidArgument(
                "record identifier is not assigned".into(),
            ));
        }

        ObjectId::parse_str(&self.0).map_err(|_| {
            RecordStoreError::TypeMismatch(format!(
                "identifier {:?} is not a hex ObjectId",
                self.0
            ))
        })
    }
}

impl fmt::Display for HexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for HexId {
    type Err = RecordStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_object_id(s).map(HexId::from)
    }
}

impl From<ObjectId> for HexId {
    fn from(id: ObjectId) -> Self {
        Self(id.to_hex())
    }
}

impl TryFrom<&HexId> for ObjectId {
    type Error = RecordStoreError;

    fn try_from(id: &HexId) -> Result<Self, Self::Error> {
        id.to_object_id()
    }
}

impl Serialize for HexId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for HexId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Bson::deserialize(deserializer)? {
            Bson::ObjectId(id) => Ok(HexId::from(id)),
            Bson::String(text) => ObjectId::parse_str(&text)
                .map(HexId::from)
                .map_err(|_| D::Error::custom(format!("invalid hex ObjectId {text:?}"))),
            other => Err(D::Error::custom(format!(
                "expected an ObjectId, found {:?}",
                other.element_type()
            ))),
        }
    }
}
