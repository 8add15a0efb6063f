//! The `TrajectoryStore` trait.
//!
//! Implemented by storage backends (e.g. `dronemap-store-sqlite`). The
//! stitching engine and the API layer depend on this abstraction, not on any
//! concrete backend. The adapter is read-only and side-effect-free; write
//! access (used by the data generator and by tests) is a concern of the
//! concrete backend, not of this trait.
//!
//! All methods return `Send` futures so the trait can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::future::Future;

use crate::{
  Result,
  model::{ObjectConstants, SectionTraffic, TrajectoryPoint},
};

pub trait TrajectoryStore: Send + Sync {
  /// All trajectory points for `object_id` with `time` in
  /// `[start_time, end_time]` inclusive.
  ///
  /// Ascending-time ordering is an explicit contract of this method, not an
  /// incidental property of storage iteration order; the engine does not
  /// re-sort within a single retrieval. An empty window yields an empty vec,
  /// not an error.
  fn get_trajectory<'a>(
    &'a self,
    object_id: &'a str,
    start_time: i64,
    end_time: i64,
  ) -> impl Future<Output = Result<Vec<TrajectoryPoint>>> + Send + 'a;

  /// The single constants record for `object_id`.
  ///
  /// Zero or multiple rows is [`crate::Error::Integrity`]. With `no_payload`
  /// set the payload column is not fetched, so large payloads are not
  /// repeatedly pulled into the section aggregation path.
  fn get_object_constants<'a>(
    &'a self,
    object_id: &'a str,
    no_payload: bool,
  ) -> impl Future<Output = Result<ObjectConstants>> + Send + 'a;

  /// Every traversal record for the section, unfiltered by time.
  /// Time-window clamping happens downstream in the stitching engine,
  /// against each traversal's own bounds.
  fn get_section_traffic<'a>(
    &'a self,
    section_id: &'a str,
  ) -> impl Future<Output = Result<Vec<SectionTraffic>>> + Send + 'a;
}
