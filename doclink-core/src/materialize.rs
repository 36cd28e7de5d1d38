//! Decoding cursors into caller-owned containers.
//!
//! [`materialize`] drains a [`DocumentCursor`] into a `Vec<T>`, reusing the vector's
//! existing elements as slots before growing it. The vector's final length is exactly the
//! number of documents decoded, so stale elements from an earlier call never leak through.
//!
//! On a decode failure, a store failure or cancellation, the vector keeps the prefix that
//! was decoded before the failure and nothing past it. The cursor is closed on every path.

use bson::{Document, de::deserialize_from_document};
use serde::de::DeserializeOwned;
use std::any::{Any, type_name};
use tracing::{trace, warn};

use crate::{
    context::Context,
    driver::{BoxCursor, DocumentCursor},
    error::{DocumentStoreError, DocumentStoreResult},
};

/// Decodes one store document into `T`. `index` is the item's cursor position.
pub fn decode_document<T: DeserializeOwned>(index: usize, document: Document) -> DocumentStoreResult<T> {
    deserialize_from_document(document).map_err(|e| DocumentStoreError::decode(index, e))
}

/// Downcasts a type-erased destination to `Vec<T>`.
///
/// # Errors
///
/// Returns [`DocumentStoreError::InvalidContainer`] if `dest` is anything other than a `Vec<T>`.
pub fn downcast_container<T: 'static>(dest: &mut dyn Any) -> DocumentStoreResult<&mut Vec<T>> {
    dest.downcast_mut::<Vec<T>>().ok_or_else(|| {
        DocumentStoreError::InvalidContainer(format!(
            "destination must be a Vec<{}>",
            type_name::<T>()
        ))
    })
}

/// Drains `cursor` into `dest` and returns the number of documents decoded.
///
/// `dest` ends up holding exactly the decoded documents in cursor order, whatever it held
/// before. The cursor is closed before returning; a failure to close is logged, not returned.
pub async fn materialize<T>(ctx: &Context, mut cursor: BoxCursor, dest: &mut Vec<T>) -> DocumentStoreResult<usize>
where
    T: DeserializeOwned,
{
    let result = drain(ctx, cursor.as_mut(), dest).await;

    if let Err(err) = cursor.close().await {
        warn!(error = %err, "failed to close cursor");
    }

    result
}

async fn drain<T>(ctx: &Context, cursor: &mut dyn DocumentCursor, dest: &mut Vec<T>) -> DocumentStoreResult<usize>
where
    T: DeserializeOwned,
{
    let mut filled = 0;

    let outcome = loop {
        match ctx.run(cursor.advance()).await {
            Ok(true) => {}
            Ok(false) => break Ok(()),
            Err(err) => break Err(err),
        }

        let item = match cursor
            .current()
            .and_then(|document| decode_document::<T>(filled, document))
        {
            Ok(item) => item,
            Err(err) => break Err(err),
        };

        if filled < dest.len() {
            dest[filled] = item;
        } else {
            dest.push(item);
        }
        filled += 1;
    };

    dest.truncate(filled);
    trace!(decoded = filled, ok = outcome.is_ok(), "cursor drained");

    outcome.map(|_| filled)
}
