//! Handler for `GET /api/section/{section_id}/{start_time}/{end_time}`.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use dronemap_core::{model::SectionAggregate, stitch, store::TrajectoryStore};

/// Section query. The body is a JSON map of object identifier to stitched
/// trajectory, ordered by descending `created_time`.
///
/// Store failures and unknown sections yield an empty map with status 200;
/// the read path trades precision for availability.
pub async fn handler<S>(
  State(store): State<Arc<S>>,
  Path((section_id, start_time, end_time)): Path<(String, i64, i64)>,
) -> Json<SectionAggregate>
where
  S: TrajectoryStore,
{
  Json(stitch::section_query(store.as_ref(), &section_id, start_time, end_time).await)
}
