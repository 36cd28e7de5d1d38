use async_trait::async_trait;
use bson::{Bson, Document, doc};
use mongodb::{
    Client, Collection as MongoCollection, Cursor,
    options::{ClientOptions, FindOptions as MongoFindOptions},
};
use std::time::Duration;
use tracing::trace;

use doclink_core::{
    driver::{BoxCursor, DocumentCursor, StoreDriver, StoreDriverBuilder, UpdateOutcome},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, FindOptions},
};

use crate::query::{translate_filter, translate_projection, translate_sort};

/// Store driver backed by a pooled MongoDB client.
///
/// The client is cheap to clone and manages its own connection pool, retries and
/// server selection.
#[derive(Debug, Clone)]
pub struct MongoDbDriver {
    client: Client,
    database: String,
}

impl MongoDbDriver {
    pub fn new(client: Client, database: impl Into<String>) -> Self {
        Self { client, database: database.into() }
    }

    pub fn builder(uri: &str, database: &str) -> MongoDbDriverBuilder {
        MongoDbDriverBuilder::new(uri, database)
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    fn get_collection(&self, collection: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(collection)
    }

    async fn update(
        &self,
        collection: &str,
        filter: Option<&Expr>,
        patch: Document,
        many: bool,
    ) -> DocumentStoreResult<UpdateOutcome> {
        let filter = translate_filter(filter)?;
        let update = doc! { "$set": patch };
        let target = self.get_collection(collection);

        let result = if many {
            target.update_many(filter, update).await
        } else {
            target.update_one(filter, update).await
        }
        .map_err(DocumentStoreError::store)?;

        trace!(
            collection,
            matched = result.matched_count,
            modified = result.modified_count,
            "update"
        );
        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }
}

fn find_options(options: &FindOptions) -> DocumentStoreResult<MongoFindOptions> {
    let mut mongo = MongoFindOptions::default();

    if let Some(limit) = options.limit.filter(|&limit| limit > 0) {
        mongo.limit = Some(i64::try_from(limit).map_err(|_| {
            DocumentStoreError::InvalidFilter(format!("limit {limit} is out of range"))
        })?);
    }
    if let Some(skip) = options.skip {
        mongo.skip = Some(skip as u64);
    }
    mongo.sort = translate_sort(&options.sort);
    mongo.projection = translate_projection(options.projection.as_ref());

    Ok(mongo)
}

#[async_trait]
impl StoreDriver for MongoDbDriver {
    async fn find(
        &self,
        collection: &str,
        filter: Option<&Expr>,
        options: &FindOptions,
    ) -> DocumentStoreResult<BoxCursor> {
        let filter = translate_filter(filter)?;
        let options = find_options(options)?;
        trace!(collection, filter = %filter, "find");

        let cursor = self
            .get_collection(collection)
            .find(filter)
            .with_options(options)
            .await
            .map_err(DocumentStoreError::store)?;

        Ok(Box::new(MongoCursor { cursor: Some(cursor) }))
    }

    async fn insert_one(&self, collection: &str, document: Document) -> DocumentStoreResult<Bson> {
        let result = self
            .get_collection(collection)
            .insert_one(document)
            .await
            .map_err(DocumentStoreError::store)?;

        trace!(collection, id = %result.inserted_id, "insert_one");
        Ok(result.inserted_id)
    }

    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> DocumentStoreResult<Vec<Bson>> {
        let result = self
            .get_collection(collection)
            .insert_many(documents)
            .await
            .map_err(DocumentStoreError::store)?;

        let mut ids: Vec<(usize, Bson)> = result.inserted_ids.into_iter().collect();
        ids.sort_by_key(|(index, _)| *index);

        trace!(collection, count = ids.len(), "insert_many");
        Ok(ids.into_iter().map(|(_, id)| id).collect())
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
        let result = self
            .get_collection(collection)
            .delete_many(translate_filter(filter)?)
            .await
            .map_err(DocumentStoreError::store)?;

        trace!(collection, count = result.deleted_count, "delete_many");
        Ok(result.deleted_count)
    }

    async fn shutdown(&self) -> DocumentStoreResult<()> {
        self.client.clone().shutdown().await;
        Ok(())
    }
}

/// Adapter from a MongoDB cursor to [`DocumentCursor`].
///
/// Closing drops the server cursor; the driver kills it in the background.
pub struct MongoCursor {
    cursor: Option<Cursor<Document>>,
}

#[async_trait]
impl DocumentCursor for MongoCursor {
    async fn advance(&mut self) -> DocumentStoreResult<bool> {
        match self.cursor.as_mut() {
            Some(cursor) => cursor.advance().await.map_err(DocumentStoreError::store),
            None => Ok(false),
        }
    }

    fn current(&self) -> DocumentStoreResult<Document> {
        match self.cursor.as_ref() {
            Some(cursor) => cursor.deserialize_current().map_err(DocumentStoreError::store),
            None => Err(DocumentStoreError::store("cursor is closed")),
        }
    }

    async fn close(&mut self) -> DocumentStoreResult<()> {
        self.cursor.take();
        Ok(())
    }
}

/// Builder for [`MongoDbDriver`].
#[derive(Debug, Clone)]
pub struct MongoDbDriverBuilder {
    uri: String,
    database: String,
    app_name: Option<String>,
    max_pool_size: Option<u32>,
    connect_timeout: Option<Duration>,
}

impl MongoDbDriverBuilder {
    pub fn new(uri: &str, database: &str) -> Self {
        Self {
            uri: uri.to_string(),
            database: database.to_string(),
            app_name: None,
            max_pool_size: None,
            connect_timeout: None,
        }
    }

    /// Name reported to the server in the connection handshake.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    pub fn max_pool_size(mut self, size: u32) -> Self {
        self.max_pool_size = Some(size);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl StoreDriverBuilder for MongoDbDriverBuilder {
    type Driver = MongoDbDriver;

    async fn build(self) -> DocumentStoreResult<Self::Driver> {
        if self.database.is_empty() {
            return Err(DocumentStoreError::Initialization("database name is empty".to_string()));
        }

        let mut options = ClientOptions::parse(&self.uri)
            .await
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?;

        if let Some(app_name) = self.app_name {
            options.app_name = Some(app_name);
        }
        if let Some(size) = self.max_pool_size {
            options.max_pool_size = Some(size);
        }
        if let Some(timeout) = self.connect_timeout {
            options.connect_timeout = Some(timeout);
        }

        let client = Client::with_options(options)
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?;

        Ok(MongoDbDriver::new(client, self.database))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doclink_core::query::SortDirection;

    #[test]
    fn test_find_options_mapping() {
        let options = FindOptions::builder()
            .limit(5)
            .skip(2)
            .sort("name", SortDirection::Desc)
            .build();
        let mongo = find_options(&options).unwrap();

        assert_eq!(mongo.limit, Some(5));
        assert_eq!(mongo.skip, Some(2));
        assert_eq!(mongo.sort, Some(doc! { "name": -1 }));
    }

    #[test]
    fn test_zero_limit_is_unbounded() {
        let options = FindOptions { limit: Some(0), ..FindOptions::default() };
        assert_eq!(find_options(&options).unwrap().limit, None);
    }
}
