//! Main doclink crate: a typed CRUD client over BSON document stores.
//!
//! This crate is the primary entry point for users of doclink. It re-exports the core
//! types from the sub-crates and gives access to the available store drivers.
//!
//! # Features
//!
//! - **Typed records** - Define records with serde and read them back into caller-owned vectors
//! - **Insert stamping** - Identifiers and timestamps populated by `#[derive(Stamped)]`
//! - **Multiple drivers** - In-memory and MongoDB drivers behind one object-safe trait
//! - **Composable filters** - Filter expressions with sorting, paging and projection
//! - **Cancellation** - Every operation takes a `Context` with a token and optional deadline
//!
//! # Quick Start
//!
//! ```ignore
//! use doclink::{prelude::*, memory::InMemoryDriver};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Default, Serialize, Deserialize, Stamped)]
//! pub struct User {
//!     #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
//!     pub id: Option<DocumentId>,
//!     pub name: String,
//!     pub created_at: Option<DateTime>,
//!     pub updated_at: Option<DateTime>,
//! }
//!
//! #[tokio::main]
//! async fn main() -> DocumentStoreResult<()> {
//!     let client = Client::connect(InMemoryDriver::builder()).await?;
//!     let users = client.collection("users");
//!     let ctx = Context::new();
//!
//!     let mut alice = User { name: "Alice".into(), ..Default::default() };
//!     users.insert_one(&ctx, &mut alice).await?;
//!
//!     let found: User = users.find_one(&ctx, Filter::eq("name", "Alice")).await?;
//!     assert_eq!(found.created_at, alice.created_at);
//!
//!     let mut everyone: Vec<User> = Vec::new();
//!     users.find_all(&ctx, Filter::all(), FindOptions::default(), &mut everyone).await?;
//!
//!     client.shutdown().await
//! }
//! ```
//!
//! # Dynamic Dispatch
//!
//! When the driver is picked at runtime, erase its type with [`Client::into_dyn`](client::Client::into_dyn):
//!
//! ```ignore
//! use doclink::{prelude::*, memory::InMemoryDriver};
//!
//! let client: DynClient = Client::new(InMemoryDriver::new()).into_dyn();
//! let users = client.collection("users");
//! ```
//!
//! # Drivers
//!
//! - [`memory`] - In-memory store for development and testing
//! - `mongodb` - MongoDB driver (requires the `mongodb` feature)

#[allow(unused_extern_crates)]
extern crate self as doclink;

pub mod prelude;

pub use doclink_core::{client, collection, context, driver, error, id, materialize, query, stamp};
pub use doclink_macros::Stamped;

// Re-export BSON types for convenience
pub use bson;

/// In-memory store driver.
pub mod memory {
    pub use doclink_memory::{InMemoryCursor, InMemoryDriver, InMemoryDriverBuilder, InMemoryError};
}

/// MongoDB store driver.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use doclink_mongodb::{MongoCursor, MongoDbConfig, MongoDbDriver, MongoDbDriverBuilder, config, query};
}
