//! In-memory store driver.
//!
//! Collections are insertion-ordered maps from a document's `_id` to the document, held
//! behind an async read-write lock. Natural (unsorted) find order is insertion order.

use async_trait::async_trait;
use bson::{Bson, Document, oid::ObjectId};
use indexmap::IndexMap;
use mea::rwlock::RwLock;
use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::Arc,
};
use thiserror::Error;
use tracing::trace;

use doclink_core::{
    driver::{BoxCursor, DocumentCursor, StoreDriver, StoreDriverBuilder, UpdateOutcome},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, FindOptions, Projection},
    stamp::ID_FIELD,
};

use crate::evaluator::{DocumentEvaluator, compare_documents, lookup};

type CollectionMap = IndexMap<String, Document>;
type StoreMap = HashMap<String, CollectionMap>;

/// Store-level failures of the in-memory driver.
///
/// These travel to callers as the source of [`DocumentStoreError::Store`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InMemoryError {
    #[error("duplicate key {id} in collection {collection}")]
    DuplicateKey { collection: String, id: String },
    #[error("update would change the immutable _id of {id} in collection {collection}")]
    ImmutableId { collection: String, id: String },
}

impl From<InMemoryError> for DocumentStoreError {
    fn from(err: InMemoryError) -> Self {
        DocumentStoreError::store(err)
    }
}

fn key_of(id: &Bson) -> String {
    id.to_string()
}

/// Thread-safe in-memory store driver.
///
/// Cloning shares the underlying data, so a clone kept by a test can observe writes made
/// through a [`Client`](doclink_core::client::Client).
///
/// Finds scan the whole collection; there are no indexes.
///
/// # Example
///
/// ```ignore
/// use doclink::{client::Client, memory::InMemoryDriver};
///
/// let client = Client::new(InMemoryDriver::new());
/// let users = client.collection("users");
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryDriver {
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryDriver {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> InMemoryDriverBuilder {
        InMemoryDriverBuilder::default()
    }

    /// Returns the number of documents in `collection`, `0` if it does not exist.
    pub async fn count(&self, collection: &str) -> usize {
        self.store
            .read()
            .await
            .get(collection)
            .map_or(0, IndexMap::len)
    }

    /// Lists the collections that have received at least one write.
    pub async fn list_collections(&self) -> Vec<String> {
        self.store.read().await.keys().cloned().collect()
    }
}

fn insert_into(map: &mut CollectionMap, collection: &str, document: Document) -> DocumentStoreResult<Bson> {
    let document = match document.get(ID_FIELD) {
        Some(_) => document,
        None => {
            let mut with_id = Document::new();
            with_id.insert(ID_FIELD, ObjectId::new());
            for (key, value) in document {
                with_id.insert(key, value);
            }
            with_id
        }
    };

    let id = document.get(ID_FIELD).cloned().unwrap_or(Bson::Null);
    let key = key_of(&id);
    if map.contains_key(&key) {
        return Err(InMemoryError::DuplicateKey { collection: collection.to_string(), id: key }.into());
    }

    map.insert(key, document);
    Ok(id)
}

/// Writes `value` at a dotted `path`, creating intermediate documents as needed.
///
/// Returns whether the document changed.
fn set_path(document: &mut Document, path: &str, value: Bson) -> bool {
    match path.split_once('.') {
        None => {
            if document.get(path) == Some(&value) {
                return false;
            }
            document.insert(path, value);
            true
        }
        Some((head, rest)) => {
            if !matches!(document.get(head), Some(Bson::Document(_))) {
                document.insert(head, Document::new());
            }
            match document.get_mut(head) {
                Some(Bson::Document(inner)) => set_path(inner, rest, value),
                _ => false,
            }
        }
    }
}

fn apply_patch(
    collection: &str,
    document: &mut Document,
    patch: &Document,
) -> DocumentStoreResult<bool> {
    if let Some(new_id) = patch.get(ID_FIELD) {
        if document.get(ID_FIELD) != Some(new_id) {
            let id = document.get(ID_FIELD).map(key_of).unwrap_or_default();
            return Err(InMemoryError::ImmutableId { collection: collection.to_string(), id }.into());
        }
    }

    let mut modified = false;
    for (path, value) in patch {
        modified |= set_path(document, path, value.clone());
    }
    Ok(modified)
}

fn project(document: Document, projection: &Projection) -> Document {
    match projection {
        Projection::Include(fields) => {
            let mut projected = Document::new();
            if let Some(id) = document.get(ID_FIELD) {
                projected.insert(ID_FIELD, id.clone());
            }
            for field in fields {
                if let Some(value) = lookup(&document, field) {
                    set_path(&mut projected, field, value.clone());
                }
            }
            projected
        }
        Projection::Exclude(fields) => {
            let mut projected = document;
            for field in fields {
                remove_path(&mut projected, field);
            }
            projected
        }
    }
}

fn remove_path(document: &mut Document, path: &str) {
    match path.split_once('.') {
        None => {
            document.remove(path);
        }
        Some((head, rest)) => {
            if let Some(Bson::Document(inner)) = document.get_mut(head) {
                remove_path(inner, rest);
            }
        }
    }
}

impl InMemoryDriver {
    async fn update(
        &self,
        collection: &str,
        filter: Option<&Expr>,
        patch: Document,
        many: bool,
    ) -> DocumentStoreResult<UpdateOutcome> {
        let mut store = self.store.write().await;
        let Some(map) = store.get_mut(collection) else {
            return Ok(UpdateOutcome::default());
        };

        let mut outcome = UpdateOutcome::default();
        for document in map.values_mut() {
            if !DocumentEvaluator::matches(document, filter)? {
                continue;
            }

            outcome.matched += 1;
            if apply_patch(collection, document, &patch)? {
                outcome.modified += 1;
            }
            if !many {
                break;
            }
        }

        trace!(collection, matched = outcome.matched, modified = outcome.modified, "update");
        Ok(outcome)
    }
}

#[async_trait]
impl StoreDriver for InMemoryDriver {
    async fn find(
        &self,
        collection: &str,
        filter: Option<&Expr>,
        options: &FindOptions,
    ) -> DocumentStoreResult<BoxCursor> {
        let mut matched = {
            let store = self.store.read().await;
            let mut matched = Vec::new();
            if let Some(map) = store.get(collection) {
                for document in map.values() {
                    if DocumentEvaluator::matches(document, filter)? {
                        matched.push(document.clone());
                    }
                }
            }
            matched
        };

        if !options.sort.is_empty() {
            matched.sort_by(|a, b| compare_documents(a, b, &options.sort));
        }

        let pending: VecDeque<Document> = matched
            .into_iter()
            .skip(options.skip.unwrap_or(0))
            .take(options.limit.filter(|&limit| limit > 0).unwrap_or(usize::MAX))
            .map(|document| match &options.projection {
                Some(projection) => project(document, projection),
                None => document,
            })
            .collect();

        trace!(collection, count = pending.len(), "find");
        Ok(Box::new(InMemoryCursor::new(pending)))
    }

    async fn insert_one(&self, collection: &str, document: Document) -> DocumentStoreResult<Bson> {
        let mut store = self.store.write().await;
        let map = store.entry(collection.to_string()).or_default();

        let id = insert_into(map, collection, document)?;
        trace!(collection, id = %id, "insert_one");
        Ok(id)
    }

    /// Inserts in order and stops at the first duplicate. Items before it stay persisted.
    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> DocumentStoreResult<Vec<Bson>> {
        let mut store = self.store.write().await;
        let map = store.entry(collection.to_string()).or_default();

        let mut ids = Vec::with_capacity(documents.len());
        for document in documents {
            ids.push(insert_into(map, collection, document)?);
        }

        trace!(collection, count = ids.len(), "insert_many");
        Ok(ids)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Option<&Expr>,
        patch: Document,
    ) -> DocumentStoreResult<UpdateOutcome> {
        self.update(collection, filter, patch, false).await
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: Option<&Expr>,
        patch: Document,
    ) -> DocumentStoreResult<UpdateOutcome> {
        self.update(collection, filter, patch, true).await
    }

    async fn delete_many(&self, collection: &str, filter: Option<&Expr>) -> DocumentStoreResult<u64> {
        let mut store = self.store.write().await;
        let Some(map) = store.get_mut(collection) else {
            return Ok(0);
        };

        let mut doomed = HashSet::new();
        for (key, document) in map.iter() {
            if DocumentEvaluator::matches(document, filter)? {
                doomed.insert(key.clone());
            }
        }

        map.retain(|key, _| !doomed.contains(key));
        trace!(collection, count = doomed.len(), "delete_many");
        Ok(doomed.len() as u64)
    }
}

/// Cursor over a snapshot of matched documents.
#[derive(Debug)]
pub struct InMemoryCursor {
    pending: VecDeque<Document>,
    current: Option<Document>,
}

impl InMemoryCursor {
    fn new(pending: VecDeque<Document>) -> Self {
        Self { pending, current: None }
    }
}

#[async_trait]
impl DocumentCursor for InMemoryCursor {
    async fn advance(&mut self) -> DocumentStoreResult<bool> {
        self.current = self.pending.pop_front();
        Ok(self.current.is_some())
    }

    fn current(&self) -> DocumentStoreResult<Document> {
        self.current
            .clone()
            .ok_or_else(|| DocumentStoreError::store("cursor is not positioned on a document"))
    }

    async fn close(&mut self) -> DocumentStoreResult<()> {
        self.pending.clear();
        self.current = None;
        Ok(())
    }
}

/// Builder for [`InMemoryDriver`]. Building never fails.
#[derive(Debug, Default)]
pub struct InMemoryDriverBuilder {
    seed: Vec<(String, Document)>,
}

impl InMemoryDriverBuilder {
    /// Preloads `document` into `collection`.
    pub fn with_document(mut self, collection: impl Into<String>, document: Document) -> Self {
        self.seed.push((collection.into(), document));
        self
    }
}

#[async_trait]
impl StoreDriverBuilder for InMemoryDriverBuilder {
    type Driver = InMemoryDriver;

    async fn build(self) -> DocumentStoreResult<Self::Driver> {
        let mut store = StoreMap::new();
        for (collection, document) in self.seed {
            let map = store.entry(collection.clone()).or_default();
            insert_into(map, &collection, document)?;
        }

        Ok(InMemoryDriver { store: Arc::new(RwLock::new(store)) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use doclink_core::query::{Filter, SortDirection};
    use std::error::Error as _;

    async fn drain(mut cursor: BoxCursor) -> Vec<Document> {
        let mut out = Vec::new();
        while cursor.advance().await.unwrap() {
            out.push(cursor.current().unwrap());
        }
        cursor.close().await.unwrap();
        out
    }

    async fn seeded() -> InMemoryDriver {
        let driver = InMemoryDriver::new();
        let docs = vec![
            doc! { "_id": 1, "name": "carol", "team": "red", "score": 7 },
            doc! { "_id": 2, "name": "alice", "team": "blue", "score": 9 },
            doc! { "_id": 3, "name": "bob", "team": "red", "score": 9 },
            doc! { "_id": 4, "name": "dave", "team": "blue", "score": 2 },
        ];
        driver.insert_many("players", docs).await.unwrap();
        driver
    }

    fn names(docs: &[Document]) -> Vec<&str> {
        docs.iter().map(|d| d.get_str("name").unwrap()).collect()
    }

    #[tokio::test]
    async fn test_find_in_insertion_order() {
        let driver = seeded().await;
        let docs = drain(driver.find("players", None, &FindOptions::default()).await.unwrap()).await;
        assert_eq!(names(&docs), vec!["carol", "alice", "bob", "dave"]);
    }

    #[tokio::test]
    async fn test_find_missing_collection_is_empty() {
        let driver = InMemoryDriver::new();
        let docs = drain(driver.find("nothing", None, &FindOptions::default()).await.unwrap()).await;
        assert!(docs.is_empty());
    }

    #[tokio::test]
    async fn test_multi_key_sort_skip_limit() {
        let driver = seeded().await;
        let options = FindOptions::builder()
            .sort("score", SortDirection::Desc)
            .sort("name", SortDirection::Asc)
            .skip(1)
            .limit(2)
            .build();

        let docs = drain(driver.find("players", None, &options).await.unwrap()).await;
        assert_eq!(names(&docs), vec!["bob", "carol"]);
    }

    #[tokio::test]
    async fn test_sort_places_nan_below_numbers() {
        let driver = InMemoryDriver::new();
        let docs: Vec<Document> = (0..60_i32)
            .map(|i| match i % 3 {
                0 => doc! { "_id": i, "v": f64::NAN },
                _ => doc! { "_id": i, "v": (i * 37) % 101 },
            })
            .collect();
        driver.insert_many("samples", docs).await.unwrap();

        let options = FindOptions::builder().sort("v", SortDirection::Asc).build();
        let sorted = drain(driver.find("samples", None, &options).await.unwrap()).await;

        let (nans, numbers): (Vec<&Document>, Vec<&Document>) = sorted
            .iter()
            .partition(|d| d.get_f64("v").is_ok_and(f64::is_nan));
        assert_eq!(nans.len(), 20);
        assert!(sorted[..20].iter().all(|d| d.get_f64("v").is_ok_and(f64::is_nan)));

        let values: Vec<i32> = numbers.iter().map(|d| d.get_i32("v").unwrap()).collect();
        assert_eq!(values.len(), 40);
        assert!(values.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[tokio::test]
    async fn test_zero_limit_is_unbounded() {
        let driver = seeded().await;
        let options = FindOptions { limit: Some(0), ..FindOptions::default() };

        let docs = drain(driver.find("players", None, &options).await.unwrap()).await;
        assert_eq!(docs.len(), 4);
    }

    #[tokio::test]
    async fn test_projection() {
        let driver = seeded().await;
        let include = FindOptions::builder().projection(Projection::include(["name"])).build();
        let filter = Filter::eq("name", "bob");

        let docs = drain(driver.find("players", Some(&filter), &include).await.unwrap()).await;
        assert_eq!(docs, vec![doc! { "_id": 3, "name": "bob" }]);

        let exclude = FindOptions::builder().projection(Projection::exclude(["team", "score"])).build();
        let docs = drain(driver.find("players", Some(&filter), &exclude).await.unwrap()).await;
        assert_eq!(docs, vec![doc! { "_id": 3, "name": "bob" }]);
    }

    #[tokio::test]
    async fn test_insert_assigns_object_id() {
        let driver = InMemoryDriver::new();
        let id = driver.insert_one("events", doc! { "kind": "login" }).await.unwrap();

        assert!(matches!(id, Bson::ObjectId(_)));
        let docs = drain(driver.find("events", None, &FindOptions::default()).await.unwrap()).await;
        assert_eq!(docs[0].get(ID_FIELD), Some(&id));
        assert_eq!(docs[0].keys().next().map(String::as_str), Some(ID_FIELD));
    }

    #[tokio::test]
    async fn test_duplicate_key_stops_batch() {
        let driver = seeded().await;
        let batch = vec![doc! { "_id": 10, "name": "erin" }, doc! { "_id": 1, "name": "dup" }, doc! { "_id": 11 }];

        let err = driver.insert_many("players", batch).await.unwrap_err();

        let source = err.source().and_then(|s| s.downcast_ref::<InMemoryError>()).cloned();
        assert!(matches!(source, Some(InMemoryError::DuplicateKey { .. })));
        assert_eq!(driver.count("players").await, 5, "items before the duplicate stay persisted");
    }

    #[tokio::test]
    async fn test_update_merges_and_counts() {
        let driver = seeded().await;
        let red = Filter::eq("team", "red");

        let outcome = driver.update_many("players", Some(&red), doc! { "score": 9 }).await.unwrap();
        assert_eq!(outcome, UpdateOutcome { matched: 2, modified: 1 });

        let outcome = driver
            .update_one("players", Some(&red), doc! { "stats.wins": 3 })
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome { matched: 1, modified: 1 });

        let docs = drain(driver.find("players", Some(&Filter::eq("stats.wins", 3)), &FindOptions::default()).await.unwrap()).await;
        assert_eq!(names(&docs), vec!["carol"]);
        assert_eq!(docs[0].get_str("team").unwrap(), "red", "unpatched fields are kept");
    }

    #[tokio::test]
    async fn test_update_rejects_id_change() {
        let driver = seeded().await;
        let err = driver
            .update_one("players", Some(&Filter::eq("name", "bob")), doc! { "_id": 99 })
            .await
            .unwrap_err();
        assert!(err.source().and_then(|s| s.downcast_ref::<InMemoryError>()).is_some());
    }

    #[tokio::test]
    async fn test_delete_many() {
        let driver = seeded().await;
        let deleted = driver.delete_many("players", Some(&Filter::gte("score", 9))).await.unwrap();

        assert_eq!(deleted, 2);
        let docs = drain(driver.find("players", None, &FindOptions::default()).await.unwrap()).await;
        assert_eq!(names(&docs), vec!["carol", "dave"]);
        assert_eq!(driver.delete_many("missing", None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_builder_seeds_documents() {
        let driver = InMemoryDriver::builder()
            .with_document("config", doc! { "_id": "flags", "dark_mode": true })
            .build()
            .await
            .unwrap();

        assert_eq!(driver.count("config").await, 1);
        assert_eq!(driver.list_collections().await, vec!["config".to_string()]);
    }
}
