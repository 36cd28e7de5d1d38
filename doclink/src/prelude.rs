//! Convenient re-exports of commonly used types from doclink.
//!
//! ```ignore
//! use doclink::prelude::*;
//! ```
//!
//! This provides access to:
//! - The client, collections and the cancellation context
//! - Driver traits and builders
//! - Filter construction and find options
//! - Identifiers, stamping and the `Stamped` derive
//! - Error types

pub use bson::DateTime;
pub use doclink_core::{
    client::{Client, DynClient},
    collection::Collection,
    context::Context,
    driver::{BoxCursor, DocumentCursor, StoreDriver, StoreDriverBuilder, UpdateOutcome},
    error::{DocumentStoreError, DocumentStoreResult},
    id::DocumentId,
    query::{Expr, FieldOp, Filter, FindOptions, Projection, QueryVisitor, Sort, SortDirection},
    stamp::Stamped,
};
pub use doclink_macros::Stamped;
