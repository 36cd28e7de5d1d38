//! Store driver abstraction consumed by the collection client.
//!
//! A driver is the narrow seam between this crate and a concrete document store. It
//! speaks in raw [`bson::Document`]s; encoding records and decoding results into caller
//! types happens above it, in [`crate::collection`].
//!
//! # Traits
//!
//! - [`StoreDriver`]: CRUD round trips against named collections
//! - [`DocumentCursor`]: ordered, explicitly closed stream of find results
//! - [`StoreDriverBuilder`]: async factory for driver instances
//!
//! Both [`StoreDriver`] and [`DocumentCursor`] are object safe, so
//! `Arc<dyn StoreDriver>` and [`BoxCursor`] can be passed around where the concrete
//! store is chosen at runtime.

use async_trait::async_trait;
use bson::{Bson, Document};
use std::fmt::Debug;

use crate::{
    error::DocumentStoreResult,
    query::{Expr, FindOptions},
};

/// A boxed cursor as returned by [`StoreDriver::find`].
pub type BoxCursor = Box<dyn DocumentCursor>;

/// Outcome of an update round trip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// Documents matched by the filter.
    pub matched: u64,
    /// Documents whose content actually changed.
    pub modified: u64,
}

/// An ordered stream of documents produced by a find.
///
/// The cursor starts before the first document. Each successful [`advance`](Self::advance)
/// that returns `true` positions it on the next document, which [`current`](Self::current)
/// then returns. Callers must call [`close`](Self::close) once they are done, on success
/// and failure alike.
#[async_trait]
pub trait DocumentCursor: Send {
    /// Moves to the next document, fetching more from the store if needed.
    ///
    /// Returns `Ok(false)` once the stream is exhausted.
    async fn advance(&mut self) -> DocumentStoreResult<bool>;

    /// Returns the document the cursor is positioned on.
    ///
    /// # Errors
    ///
    /// Fails if the cursor is not positioned on a document or the raw bytes cannot be
    /// parsed as a document.
    fn current(&self) -> DocumentStoreResult<Document>;

    /// Releases server-side resources held by this cursor.
    ///
    /// The default implementation does nothing, which is correct for cursors whose
    /// resources are released on drop.
    async fn close(&mut self) -> DocumentStoreResult<()> {
        Ok(())
    }
}

/// Round trips against a document store.
///
/// Implementations must be safe to share between tasks. Connection pooling, retries and
/// backoff belong to the implementation's transport, never to callers of this trait.
///
/// Filters are passed as `Option<&Expr>`; `None` matches every document.
#[async_trait]
pub trait StoreDriver: Send + Sync + Debug {
    /// Opens a cursor over the documents of `collection` matching `filter`.
    async fn find(
        &self,
        collection: &str,
        filter: Option<&Expr>,
        options: &FindOptions,
    ) -> DocumentStoreResult<BoxCursor>;

    /// Persists one document and returns its `_id`.
    ///
    /// If `document` has no `_id`, the store assigns one.
    async fn insert_one(&self, collection: &str, document: Document) -> DocumentStoreResult<Bson>;

    /// Persists a batch in order and returns the `_id`s in input order.
    ///
    /// When the store rejects an item mid-batch, whether the items before it stay
    /// persisted is store-defined; the store's error is returned either way.
    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> DocumentStoreResult<Vec<Bson>>;

    /// Merges `patch` into the first document matching `filter`.
    ///
    /// Only the fields present in `patch` are written; all other fields are kept.
    async fn update_one(
        &self,
        collection: &str,
        filter: Option<&Expr>,
        patch: Document,
    ) -> DocumentStoreResult<UpdateOutcome>;

    /// Merges `patch` into every document matching `filter`.
    async fn update_many(
        &self,
        collection: &str,
        filter: Option<&Expr>,
        patch: Document,
    ) -> DocumentStoreResult<UpdateOutcome>;

    /// Removes every document matching `filter` and returns how many were removed.
    async fn delete_many(&self, collection: &str, filter: Option<&Expr>) -> DocumentStoreResult<u64>;

    /// Closes connections held by the driver.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(&self) -> DocumentStoreResult<()> {
        Ok(())
    }
}

/// Async factory for a [`StoreDriver`].
#[async_trait]
pub trait StoreDriverBuilder {
    type Driver: StoreDriver;

    async fn build(self) -> DocumentStoreResult<Self::Driver>;
}
