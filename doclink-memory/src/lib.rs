//! In-memory store driver for doclink.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreDriver` trait.
//! It is meant for development and tests: nothing is persisted, and every find scans the
//! whole collection.
//!
//! # Features
//!
//! - **Insertion-ordered collections** - Unsorted finds return documents in insert order
//! - **Filter evaluation** - Full `Expr` support including dotted paths and array fields
//! - **Find options** - Multi-key sort, skip, limit and include/exclude projection
//! - **Field-level updates** - Patches merge into documents like a `$set`
//! - **Unique `_id`** - Duplicate keys are rejected; batches stop at the first duplicate
//!
//! # Quick Start
//!
//! ```ignore
//! use doclink::{client::Client, context::Context, memory::InMemoryDriver, query::Filter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::connect(InMemoryDriver::builder()).await?;
//!     let users = client.collection("users");
//!
//!     let mut user = bson::doc! { "name": "Alice" };
//!     users.insert_one(&Context::new(), &mut user).await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as doclink_memory;

pub mod evaluator;
pub mod store;

pub use store::{InMemoryCursor, InMemoryDriver, InMemoryDriverBuilder, InMemoryError};
