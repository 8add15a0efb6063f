//! Error types for `dronemap-core`.
//!
//! The read path is deliberately lenient: the stitching engine absorbs every
//! variant here into a degraded result (empty retrieval, object excluded from
//! the aggregate) and logs the detail. Nothing below ever reaches an API
//! caller as a failed request.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The referenced table/collection does not exist — an unknown object or
  /// section identifier.
  #[error("not found: {0}")]
  NotFound(String),

  /// An object must have exactly one constants row; zero or multiple rows
  /// is corrupt data, not a valid state.
  #[error("constants integrity violation for {object_id}: expected 1 row, found {rows}")]
  Integrity { object_id: String, rows: usize },

  /// The identifier failed the table-name allow-list check.
  #[error("invalid identifier: {0:?}")]
  InvalidIdentifier(String),

  /// Any other I/O failure against the backing store.
  #[error("store error: {0}")]
  Store(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
