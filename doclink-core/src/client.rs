//! The client: an explicitly constructed connection handle shared by collections.
//!
//! A [`Client`] owns a store driver behind an [`Arc`]. Every [`Collection`] obtained from it
//! shares that driver, so a client is constructed once at startup and cloned wherever it is
//! needed.
//!
//! # Example
//!
//! ```ignore
//! use doclink::{client::Client, memory::InMemoryDriver};
//!
//! let client = Client::connect(InMemoryDriver::builder()).await?;
//! let users = client.collection("users");
//! ```

use std::sync::Arc;
use tracing::debug;

use crate::{
    collection::Collection,
    driver::{StoreDriver, StoreDriverBuilder},
    error::DocumentStoreResult,
};

/// A client whose driver type is chosen at runtime.
pub type DynClient = Client<dyn StoreDriver>;

/// Handle to a document store.
#[derive(Debug)]
pub struct Client<D: StoreDriver + ?Sized = dyn StoreDriver> {
    driver: Arc<D>,
}

impl<D: StoreDriver + ?Sized> Clone for Client<D> {
    fn clone(&self) -> Self {
        Self { driver: self.driver.clone() }
    }
}

impl<D: StoreDriver> Client<D> {
    /// Wraps an already constructed driver.
    pub fn new(driver: D) -> Self {
        Self { driver: Arc::new(driver) }
    }

    /// Builds a driver from `builder` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns whatever the builder fails with, typically
    /// [`DocumentStoreError::Initialization`](crate::error::DocumentStoreError::Initialization).
    pub async fn connect<B>(builder: B) -> DocumentStoreResult<Self>
    where
        B: StoreDriverBuilder<Driver = D>,
    {
        let driver = builder.build().await?;
        debug!(driver = ?driver, "client connected");
        Ok(Self::new(driver))
    }

    /// Erases the driver type.
    pub fn into_dyn(self) -> DynClient
    where
        D: 'static,
    {
        Client { driver: self.driver }
    }
}

impl<D: StoreDriver + ?Sized> Client<D> {
    /// Wraps a driver that is already shared.
    pub fn from_arc(driver: Arc<D>) -> Self {
        Self { driver }
    }

    /// Returns a handle to the collection called `name`.
    ///
    /// Nothing is sent to the store; collections come into existence on first write.
    pub fn collection(&self, name: impl Into<String>) -> Collection<D> {
        Collection::new(name.into(), self.driver.clone())
    }

    /// Returns the underlying driver.
    pub fn driver(&self) -> &Arc<D> {
        &self.driver
    }

    /// Releases the driver's connections.
    ///
    /// Collections obtained from this client must not be used afterwards.
    pub async fn shutdown(&self) -> DocumentStoreResult<()> {
        debug!("client shutting down");
        self.driver.shutdown().await
    }
}
