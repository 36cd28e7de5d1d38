//! Typed collection client over pluggable document stores.
//!
//! This crate is the core of the doclink project and provides:
//!
//! - **Identifiers** ([`id`]) - 12-byte document identifiers with hex encoding
//! - **Cancellation** ([`context`]) - Cancellation tokens and deadlines passed to every operation
//! - **Driver abstraction** ([`driver`]) - Traits implemented by concrete stores
//! - **Filters and options** ([`query`]) - Filter expressions, sorting, paging and projection
//! - **Insert stamping** ([`stamp`]) - Identifier and timestamp population before insert
//! - **Result decoding** ([`materialize`]) - Cursor draining into caller-owned vectors
//! - **Collections** ([`collection`]) - Typed find, insert, update and delete
//! - **Client** ([`client`]) - Shared driver handle that hands out collections
//! - **Error handling** ([`error`]) - Error and result types
//!
//! # Example
//!
//! ```ignore
//! use doclink::prelude::*;
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
//! ```

#[allow(unused_extern_crates)]
extern crate self as doclink_core;

pub mod client;
pub mod collection;
pub mod context;
pub mod driver;
pub mod error;
pub mod id;
pub mod materialize;
pub mod query;
pub mod stamp;
