//! Insert-time metadata stamping.
//!
//! Before a record is persisted it receives a fresh [`DocumentId`] and a creation/update
//! timestamp pair. Records opt into each of the three fields through the [`Stamped`]
//! trait; fields a record does not carry are skipped without error.
//!
//! The trait is normally derived:
//!
//! ```ignore
//! use doclink::{Stamped, bson::DateTime, id::DocumentId};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Serialize, Deserialize, Stamped)]
//! pub struct Article {
//!     #[serde(rename = "_id")]
//!     pub id: Option<DocumentId>,
//!     pub title: String,
//!     #[stamp(created)]
//!     pub published: Option<DateTime>,
//!     pub updated_at: Option<DateTime>,
//! }
//! ```

use bson::{Bson, DateTime, Document, ser::serialize_to_document};
use serde::Serialize;

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    id::DocumentId,
};

/// Field under which stores keep a document's identifier.
pub const ID_FIELD: &str = "_id";

/// A record that can receive insert-time metadata.
///
/// Every method defaults to doing nothing, so a record only implements the fields it has.
pub trait Stamped {
    /// Receives the identifier generated for this insert.
    fn stamp_id(&mut self, _id: DocumentId) {}

    /// Receives the creation time of this insert.
    fn stamp_created(&mut self, _at: DateTime) {}

    /// Receives the update time of this insert. Equal to the creation time.
    fn stamp_updated(&mut self, _at: DateTime) {}
}

impl<S: Stamped + ?Sized> Stamped for &mut S {
    fn stamp_id(&mut self, id: DocumentId) {
        (**self).stamp_id(id)
    }

    fn stamp_created(&mut self, at: DateTime) {
        (**self).stamp_created(at)
    }

    fn stamp_updated(&mut self, at: DateTime) {
        (**self).stamp_updated(at)
    }
}

impl<S: Stamped + ?Sized> Stamped for Box<S> {
    fn stamp_id(&mut self, id: DocumentId) {
        (**self).stamp_id(id)
    }

    fn stamp_created(&mut self, at: DateTime) {
        (**self).stamp_created(at)
    }

    fn stamp_updated(&mut self, at: DateTime) {
        (**self).stamp_updated(at)
    }
}

// Raw documents carry no typed metadata fields; their `_id` is filled in by `prepare_insert`.
impl Stamped for Document {}

/// Stamps `record` in place and encodes it for persistence.
///
/// The record receives a new identifier and one timestamp used for both creation and update.
/// If the encoded document has no `_id` field, the generated identifier is placed there, so
/// the identifier the store reports always belongs to this insert.
///
/// # Errors
///
/// Returns [`DocumentStoreError::Serialization`] if the record cannot be encoded as a document.
pub fn prepare_insert<R>(record: &mut R) -> DocumentStoreResult<Document>
where
    R: Stamped + Serialize,
{
    let id = DocumentId::new();
    let now = DateTime::now();

    record.stamp_id(id);
    record.stamp_created(now);
    record.stamp_updated(now);

    let encoded = serialize_to_document(record)?;
    if encoded.contains_key(ID_FIELD) {
        return Ok(encoded);
    }

    let mut document = Document::new();
    document.insert(ID_FIELD, Bson::from(id));
    for (key, value) in encoded {
        document.insert(key, value);
    }

    Ok(document)
}

/// Stamps and encodes every record of a batch, each with its own identifier and timestamps.
pub fn prepare_insert_many<R>(records: &mut [R]) -> DocumentStoreResult<Vec<Document>>
where
    R: Stamped + Serialize,
{
    records.iter_mut().map(prepare_insert).collect()
}

/// Encodes a partial update payload as the field set of a merge.
///
/// # Errors
///
/// Returns [`DocumentStoreError::InvalidDocument`] if `patch` does not encode to a document,
/// for example a bare number or a sequence.
pub fn prepare_patch<P>(patch: &P) -> DocumentStoreResult<Document>
where
    P: Serialize,
{
    match bson::ser::serialize_to_bson(patch)? {
        Bson::Document(document) => Ok(document),
        other => Err(DocumentStoreError::InvalidDocument(format!(
            "update payload must encode to a document, found {:?}",
            other.element_type()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use serde::Serialize;

    #[derive(Debug, Default, Serialize)]
    struct Account {
        #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
        id: Option<DocumentId>,
        owner: String,
        created_at: Option<DateTime>,
        updated_at: Option<DateTime>,
    }

    impl Stamped for Account {
        fn stamp_id(&mut self, id: DocumentId) {
            self.id = Some(id);
        }

        fn stamp_created(&mut self, at: DateTime) {
            self.created_at = Some(at);
        }

        fn stamp_updated(&mut self, at: DateTime) {
            self.updated_at = Some(at);
        }
    }

    #[derive(Debug, Serialize)]
    struct Note {
        body: String,
        updated_at: Option<DateTime>,
    }

    impl Stamped for Note {
        fn stamp_updated(&mut self, at: DateTime) {
            self.updated_at = Some(at);
        }
    }

    #[test]
    fn test_stamps_all_fields() {
        let mut account = Account { owner: "ada".into(), ..Default::default() };
        let document = prepare_insert(&mut account).unwrap();

        let id = account.id.expect("id should be stamped");
        assert_eq!(account.created_at, account.updated_at);
        assert!(account.created_at.is_some());
        assert_eq!(account.owner, "ada");
        assert_eq!(document.get_object_id(ID_FIELD).unwrap(), *id.as_object_id());
        assert_eq!(document.get_str("owner").unwrap(), "ada");
    }

    #[test]
    fn test_missing_fields_are_skipped() {
        let mut note = Note { body: "hi".into(), updated_at: None };
        let document = prepare_insert(&mut note).unwrap();

        assert!(note.updated_at.is_some());
        assert!(document.contains_key(ID_FIELD), "generated id is still persisted");
        assert!(!document.contains_key("created_at"));
        assert_eq!(document.keys().next().map(String::as_str), Some(ID_FIELD));
    }

    #[test]
    fn test_raw_document_gets_id() {
        let mut raw = doc! { "kind": "event" };
        let document = prepare_insert(&mut raw).unwrap();

        assert!(document.get_object_id(ID_FIELD).is_ok());
        assert_eq!(document.get_str("kind").unwrap(), "event");
    }

    #[test]
    fn test_raw_document_keeps_existing_id() {
        let mut raw = doc! { "_id": "custom", "kind": "event" };
        let document = prepare_insert(&mut raw).unwrap();
        assert_eq!(document.get_str(ID_FIELD).unwrap(), "custom");
    }

    #[test]
    fn test_batch_items_get_distinct_ids() {
        let mut accounts: Vec<Account> = (0..5)
            .map(|i| Account { owner: format!("owner-{i}"), ..Default::default() })
            .collect();
        let documents = prepare_insert_many(&mut accounts).unwrap();

        assert_eq!(documents.len(), 5);
        let mut ids: Vec<_> = accounts.iter().map(|a| a.id.unwrap()).collect();
        for (account, document) in accounts.iter().zip(&documents) {
            assert_eq!(document.get_object_id(ID_FIELD).unwrap(), *account.id.unwrap().as_object_id());
        }
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 5);
    }

    #[test]
    fn test_patch_must_be_document() {
        #[derive(Serialize)]
        struct Rename<'a> {
            owner: &'a str,
        }

        assert_eq!(prepare_patch(&Rename { owner: "grace" }).unwrap(), doc! { "owner": "grace" });

        let err = prepare_patch(&vec![1, 2, 3]).unwrap_err();
        assert!(matches!(err, DocumentStoreError::InvalidDocument(_)));
    }

    #[test]
    fn test_non_document_record_fails() {
        struct Bare(i32);

        impl Serialize for Bare {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_i32(self.0)
            }
        }

        impl Stamped for Bare {}

        let err = prepare_insert(&mut Bare(1)).unwrap_err();
        assert!(matches!(err, DocumentStoreError::Serialization(_)));
    }
}
