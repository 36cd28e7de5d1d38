//! MongoDB store driver for doclink.
//!
//! This crate provides a MongoDB-based implementation of the `StoreDriver` trait. Filters
//! and find options are translated into MongoDB's native query syntax and run by the server.
//!
//! To use this driver, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! doclink = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Connection
//!
//! Connect through the builder, or through [`MongoDbConfig`] when settings come from a
//! configuration file or the `DOCLINK_MONGODB_*` environment variables.
//!
//! # Example
//!
//! ```ignore
//! use doclink::{client::Client, mongodb::{MongoDbConfig, MongoDbDriver}};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::connect(
//!         MongoDbDriver::builder("mongodb://localhost:27017", "my_database").app_name("billing"),
//!     )
//!     .await?;
//!
//!     let from_env = Client::connect(MongoDbConfig::from_env()?.builder()).await?;
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as doclink_mongodb;

pub mod config;
pub mod query;
pub mod store;

pub use config::MongoDbConfig;
pub use store::{MongoCursor, MongoDbDriver, MongoDbDriverBuilder};
