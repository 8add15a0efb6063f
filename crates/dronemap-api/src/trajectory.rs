//! Handler for `GET /api/trajectory/{object_id}/{start_time}/{end_time}`.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use dronemap_core::{model::ObjectData, stitch, store::TrajectoryStore};

/// Single-object query. Constants include the payload when present.
///
/// Missing or corrupt data degrades the body (null constants, empty
/// trajectory) rather than the status code; this handler always answers 200.
pub async fn handler<S>(
  State(store): State<Arc<S>>,
  Path((object_id, start_time, end_time)): Path<(String, i64, i64)>,
) -> Json<ObjectData>
where
  S: TrajectoryStore,
{
  Json(stitch::object_query(store.as_ref(), &object_id, start_time, end_time).await)
}
