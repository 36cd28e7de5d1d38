//! Canonical 12-byte document identifiers.
//!
//! A [`DocumentId`] is laid out like a BSON ObjectId: four big-endian bytes of Unix
//! seconds, five bytes unique to the process, and a three byte counter. Identifiers
//! therefore sort roughly by creation time. The canonical textual form is 24 lowercase
//! hexadecimal characters.
//!
//! # Example
//!
//! ```ignore
//! use doclink::id::DocumentId;
//!
//! let id = DocumentId::new();
//! let parsed = DocumentId::parse_hex(&id.to_hex())?;
//! assert_eq!(id, parsed);
//! ```

use bson::{Bson, oid::ObjectId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// Number of bytes in a [`DocumentId`].
pub const ID_LEN: usize = 12;

/// A globally unique, time-ordered document identifier.
///
/// Serializes transparently as a BSON ObjectId, so a field of this type maps onto the
/// store's native `_id` representation.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(ObjectId);

impl DocumentId {
    /// Generates a fresh identifier stamped with the current time.
    pub fn new() -> Self {
        DocumentId(ObjectId::new())
    }

    /// Generates a fresh identifier whose temporal component is `t` instead of now.
    ///
    /// The process-unique and counter bytes are still freshly generated, so two calls
    /// with the same `t` yield distinct identifiers. Times before the Unix epoch or past
    /// the 32-bit seconds range are clamped to the nearest representable second.
    pub fn from_timestamp(t: DateTime<Utc>) -> Self {
        let seconds = t.timestamp().clamp(0, u32::MAX as i64) as u32;
        let mut bytes = ObjectId::new().bytes();
        bytes[..4].copy_from_slice(&seconds.to_be_bytes());

        DocumentId(ObjectId::from_bytes(bytes))
    }

    /// Builds an identifier from its raw bytes.
    pub fn from_bytes(bytes: [u8; ID_LEN]) -> Self {
        DocumentId(ObjectId::from_bytes(bytes))
    }

    /// Decodes a hexadecimal identifier.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidIdentifier`] if `s` is not hexadecimal or does
    /// not decode to exactly 12 bytes.
    pub fn parse_hex(s: &str) -> DocumentStoreResult<Self> {
        let decoded = hex::decode(s)
            .map_err(|e| DocumentStoreError::InvalidIdentifier(format!("{s:?}: {e}")))?;
        let bytes: [u8; ID_LEN] = decoded.try_into().map_err(|raw: Vec<u8>| {
            DocumentStoreError::InvalidIdentifier(format!(
                "{s:?}: expected {ID_LEN} bytes, got {}",
                raw.len()
            ))
        })?;

        Ok(DocumentId::from_bytes(bytes))
    }

    /// Returns whether `s` is a valid hexadecimal identifier.
    pub fn is_valid_hex(s: &str) -> bool {
        s.len() == ID_LEN * 2 && hex::decode(s).is_ok()
    }

    /// Encodes this identifier as 24 lowercase hexadecimal characters.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.bytes())
    }

    /// Returns the raw bytes of this identifier.
    pub fn bytes(&self) -> [u8; ID_LEN] {
        self.0.bytes()
    }

    /// Returns the second-precision time embedded in this identifier.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.0.timestamp().to_chrono()
    }

    /// Returns the underlying BSON ObjectId.
    pub fn as_object_id(&self) -> &ObjectId {
        &self.0
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        DocumentId::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DocumentId").field(&self.to_hex()).finish()
    }
}

impl FromStr for DocumentId {
    type Err = DocumentStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocumentId::parse_hex(s)
    }
}

impl From<ObjectId> for DocumentId {
    fn from(oid: ObjectId) -> Self {
        DocumentId(oid)
    }
}

impl From<DocumentId> for ObjectId {
    fn from(id: DocumentId) -> Self {
        id.0
    }
}

impl From<DocumentId> for Bson {
    fn from(id: DocumentId) -> Self {
        Bson::ObjectId(id.0)
    }
}

impl TryFrom<Bson> for DocumentId {
    type Error = DocumentStoreError;

    fn try_from(value: Bson) -> Result<Self, Self::Error> {
        match value {
            Bson::ObjectId(oid) => Ok(DocumentId(oid)),
            Bson::String(s) => DocumentId::parse_hex(&s),
            other => Err(DocumentStoreError::InvalidIdentifier(format!(
                "expected an ObjectId, found {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    #[test]
    fn test_hex_round_trip() {
        for _ in 0..100 {
            let id = DocumentId::new();
            assert_eq!(DocumentId::parse_hex(&id.to_hex()).unwrap(), id);
        }
    }

    #[test]
    fn test_to_hex_is_lowercase_and_padded() {
        let id = DocumentId::from_bytes([0, 0, 0, 1, 0xAB, 0, 0, 0, 0, 0, 0, 0x0F]);
        assert_eq!(id.to_hex(), "00000001ab0000000000000f");
        assert_eq!(id.to_string(), id.to_hex());
    }

    #[test]
    fn test_parse_accepts_uppercase() {
        let id = DocumentId::parse_hex("5F2B6C1D9E8A7B6C5D4E3F2A").unwrap();
        assert_eq!(id.to_hex(), "5f2b6c1d9e8a7b6c5d4e3f2a");
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        for s in ["", "abcd", "5f2b6c1d9e8a7b6c5d4e3f", "5f2b6c1d9e8a7b6c5d4e3f2a00"] {
            let err = DocumentId::parse_hex(s).unwrap_err();
            assert!(matches!(err, DocumentStoreError::InvalidIdentifier(_)), "{s}");
        }
    }

    #[test]
    fn test_parse_rejects_non_hex() {
        let err = DocumentId::parse_hex("zz2b6c1d9e8a7b6c5d4e3f2a").unwrap_err();
        assert!(matches!(err, DocumentStoreError::InvalidIdentifier(_)));
    }

    #[test]
    fn test_is_valid_hex() {
        assert!(DocumentId::is_valid_hex(&DocumentId::new().to_hex()));
        assert!(!DocumentId::is_valid_hex(""));
        assert!(!DocumentId::is_valid_hex("5f2b6c1d9e8a7b6c5d4e3f2"));
        assert!(!DocumentId::is_valid_hex("5f2b6c1d9e8a7b6c5d4e3f2a0"));
        assert!(!DocumentId::is_valid_hex("5f2b6c1d9e8a7b6c5d4e3f2g"));
        assert!(!DocumentId::is_valid_hex("é5f2b6c1d9e8a7b6c5d4e3f"));
    }

    #[test]
    fn test_is_valid_hex_rejects_every_odd_length() {
        for len in (0..48).filter(|len| *len != 24) {
            assert!(!DocumentId::is_valid_hex(&"a".repeat(len)), "length {len}");
        }
    }

    #[test]
    fn test_uniqueness() {
        let ids: HashSet<DocumentId> = (0..1000).map(|_| DocumentId::new()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_from_timestamp() {
        let t = Utc.with_ymd_and_hms(2021, 6, 1, 12, 30, 0).unwrap();
        let a = DocumentId::from_timestamp(t);
        let b = DocumentId::from_timestamp(t);

        assert_eq!(a.timestamp(), t);
        assert_eq!(&a.bytes()[..4], &(t.timestamp() as u32).to_be_bytes());
        assert_ne!(a, b);
    }

    #[test]
    fn test_from_timestamp_clamps_before_epoch() {
        let t = Utc.with_ymd_and_hms(1960, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(&DocumentId::from_timestamp(t).bytes()[..4], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_ordering_follows_time() {
        let earlier = DocumentId::from_timestamp(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());
        let later = DocumentId::from_timestamp(Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap());
        assert!(earlier < later);
    }

    #[test]
    fn test_bson_conversion() {
        let id = DocumentId::new();
        let bson = Bson::from(id);
        assert_eq!(bson, Bson::ObjectId(*id.as_object_id()));
        assert_eq!(DocumentId::try_from(bson).unwrap(), id);
        assert_eq!(DocumentId::try_from(Bson::String(id.to_hex())).unwrap(), id);
        assert!(DocumentId::try_from(Bson::Int32(7)).is_err());
    }

    #[test]
    fn test_serializes_as_object_id() {
        let id = DocumentId::new();
        let bson = bson::ser::serialize_to_bson(&id).unwrap();
        assert_eq!(bson, Bson::ObjectId(*id.as_object_id()));
    }
}
