//! Collection handles and the typed operations they expose.
//!
//! A [`Collection`] binds a collection name to the driver of the [`Client`](crate::client::Client)
//! it was obtained from. Handles are cheap to clone and hold no state of their own, so they
//! can be created per request or shared between tasks.
//!
//! Records are encoded with serde before they reach the driver, and find results are
//! decoded into caller-owned vectors by [`crate::materialize`].
//!
//! # Example
//!
//! ```ignore
//! use doclink::prelude::*;
//!
//! let users = client.collection("users");
//! let ctx = Context::new();
//!
//! let mut alice = User { name: "Alice".into(), ..Default::default() };
//! let id = users.insert_one(&ctx, &mut alice).await?;
//!
//! let mut adults: Vec<User> = Vec::new();
//! users.find_all(&ctx, Filter::gte("age", 18), FindOptions::default(), &mut adults).await?;
//! ```

use bson::Bson;
use serde::{Serialize, de::DeserializeOwned};
use std::{any::Any, sync::Arc};
use tracing::debug;

use crate::{
    context::Context,
    driver::StoreDriver,
    error::{DocumentStoreError, DocumentStoreResult},
    id::DocumentId,
    materialize::{downcast_container, materialize},
    query::{Expr, Filter, FindOptions},
    stamp::{ID_FIELD, Stamped, prepare_insert, prepare_insert_many, prepare_patch},
};

/// A named collection bound to a store driver.
#[derive(Debug)]
pub struct Collection<D: StoreDriver + ?Sized> {
    name: String,
    driver: Arc<D>,
}

impl<D: StoreDriver + ?Sized> Clone for Collection<D> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            driver: self.driver.clone(),
        }
    }
}

impl<D: StoreDriver + ?Sized> Collection<D> {
    pub(crate) fn new(name: String, driver: Arc<D>) -> Self {
        Self { name, driver }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the first document matching `filter`, decoded into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::NotFound`] carrying the collection name when nothing
    /// matches, [`DocumentStoreError::Decode`] when the match does not fit `T`.
    pub async fn find_one<T>(&self, ctx: &Context, filter: impl Into<Option<Expr>>) -> DocumentStoreResult<T>
    where
        T: DeserializeOwned,
    {
        let filter = filter.into();
        let options = FindOptions::builder().limit(1).build();
        debug!(collection = %self.name, "find_one");

        let cursor = ctx.run(self.driver.find(&self.name, filter.as_ref(), &options)).await?;
        let mut found: Vec<T> = Vec::with_capacity(1);
        materialize(ctx, cursor, &mut found).await?;

        found
            .pop()
            .ok_or_else(|| DocumentStoreError::NotFound(self.name.clone()))
    }

    /// Returns the document whose `_id` is `id`, decoded into `T`.
    pub async fn find_by_id<T>(&self, ctx: &Context, id: DocumentId) -> DocumentStoreResult<T>
    where
        T: DeserializeOwned,
    {
        self.find_one(ctx, Filter::eq(ID_FIELD, id)).await
    }

    /// Decodes every document matching `filter` into `dest` and returns how many there were.
    ///
    /// `dest` is overwritten: on success it holds exactly the matched documents in cursor
    /// order. On failure it holds the documents decoded before the failure.
    pub async fn find_all<T>(
        &self,
        ctx: &Context,
        filter: impl Into<Option<Expr>>,
        options: FindOptions,
        dest: &mut Vec<T>,
    ) -> DocumentStoreResult<usize>
    where
        T: DeserializeOwned,
    {
        let filter = filter.into();
        debug!(
            collection = %self.name,
            limit = ?options.limit,
            skip = ?options.skip,
            "find_all"
        );

        let cursor = ctx.run(self.driver.find(&self.name, filter.as_ref(), &options)).await?;
        let count = materialize(ctx, cursor, dest).await?;

        debug!(collection = %self.name, count, "find_all decoded");
        Ok(count)
    }

    /// [`find_all`](Self::find_all) for a destination whose type is only known at runtime.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidContainer`] without contacting the store when
    /// `dest` is not a `Vec<T>`.
    pub async fn find_all_any<T>(
        &self,
        ctx: &Context,
        filter: impl Into<Option<Expr>>,
        options: FindOptions,
        dest: &mut dyn Any,
    ) -> DocumentStoreResult<usize>
    where
        T: DeserializeOwned + 'static,
    {
        let dest = downcast_container::<T>(dest)?;
        self.find_all(ctx, filter, options, dest).await
    }

    /// Stamps `record` with a new identifier and timestamps, then persists it.
    ///
    /// Returns the `_id` the store reports for the new document.
    pub async fn insert_one<R>(&self, ctx: &Context, record: &mut R) -> DocumentStoreResult<Bson>
    where
        R: Stamped + Serialize,
    {
        let document = prepare_insert(record)?;
        debug!(collection = %self.name, "insert_one");

        ctx.run(self.driver.insert_one(&self.name, document)).await
    }

    /// Stamps every record and persists the batch in one round trip.
    ///
    /// Returns the `_id`s in input order. An empty batch never reaches the store.
    pub async fn insert_many<R>(&self, ctx: &Context, records: &mut [R]) -> DocumentStoreResult<Vec<Bson>>
    where
        R: Stamped + Serialize,
    {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let documents = prepare_insert_many(records)?;
        debug!(collection = %self.name, count = documents.len(), "insert_many");

        ctx.run(self.driver.insert_many(&self.name, documents)).await
    }

    /// Merges the fields of `patch` into the first document matching `filter`.
    ///
    /// Returns the number of documents matched, `0` or `1`.
    pub async fn update_one<P>(
        &self,
        ctx: &Context,
        filter: impl Into<Option<Expr>>,
        patch: &P,
    ) -> DocumentStoreResult<u64>
    where
        P: Serialize,
    {
        let filter = filter.into();
        let patch = prepare_patch(patch)?;
        debug!(collection = %self.name, "update_one");

        let outcome = ctx.run(self.driver.update_one(&self.name, filter.as_ref(), patch)).await?;
        Ok(outcome.matched)
    }

    /// Merges the fields of `patch` into every document matching `filter`.
    ///
    /// Returns the number of documents matched.
    pub async fn update_many<P>(
        &self,
        ctx: &Context,
        filter: impl Into<Option<Expr>>,
        patch: &P,
    ) -> DocumentStoreResult<u64>
    where
        P: Serialize,
    {
        let filter = filter.into();
        let patch = prepare_patch(patch)?;

        let outcome = ctx.run(self.driver.update_many(&self.name, filter.as_ref(), patch)).await?;
        debug!(
            collection = %self.name,
            matched = outcome.matched,
            modified = outcome.modified,
            "update_many"
        );
        Ok(outcome.matched)
    }

    /// Removes every document matching `filter` and returns how many were removed.
    pub async fn delete(&self, ctx: &Context, filter: impl Into<Option<Expr>>) -> DocumentStoreResult<u64> {
        let filter = filter.into();

        let deleted = ctx.run(self.driver.delete_many(&self.name, filter.as_ref())).await?;
        debug!(collection = %self.name, count = deleted, "delete");
        Ok(deleted)
    }
}
