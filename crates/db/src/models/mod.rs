//! Row models for the booking schema.
//!
//! Rows carry raw `status_id` values; conversion into `cinebook-core` domain
//! records rejects unknown ids as corrupt.

pub mod catalog;
pub mod order;
pub mod ticket;

use cinebook_core::status::StatusId;
use cinebook_core::store::StoreError;

/// Resolve a stored status id through `from_id`, or report the row corrupt.
pub(crate) fn status_from_row<S>(
    table: &str,
    id: StatusId,
    from_id: fn(StatusId) -> Option<S>,
) -> Result<S, StoreError> {
    from_id(id).ok_or_else(|| StoreError::Corrupt(format!("unknown {table} status id {id}")))
}
