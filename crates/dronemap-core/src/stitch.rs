//! The trajectory stitching engine.
//!
//! Turns fragmented per-section traversal records into continuous per-object
//! paths. Given a section and a time window it discovers which objects
//! passed through, retrieves their partial segments, folds the segments into
//! chronologically ordered trajectories and returns the object set ordered
//! by recency of creation.
//!
//! Execution is single-threaded and request-scoped: one query runs
//! start-to-finish in one invocation with no shared mutable state. The
//! per-object merge step is order-sensitive, so all traversal records are
//! folded before the aggregate is sorted and returned — results are never
//! streamed.

use tracing::warn;

use crate::{
  model::{ObjectData, SectionAggregate, Trajectory, TrajectoryPoint},
  store::TrajectoryStore,
};

/// Length of the traversal-index suffix appended to object identifiers in
/// section tables (e.g. `"{id}_0"`).
const TRAVERSAL_SUFFIX_LEN: usize = 2;

/// Recover the object identifier from a section row's `id_index` by
/// stripping the trailing traversal-index suffix.
///
/// Returns `None` for rows too short to carry both an identifier and a
/// suffix; such rows are malformed and are skipped by the engine.
pub fn object_id_from_index(id_index: &str) -> Option<&str> {
  if id_index.len() <= TRAVERSAL_SUFFIX_LEN {
    return None;
  }
  id_index.get(..id_index.len() - TRAVERSAL_SUFFIX_LEN)
}

/// Merge policy for folding a new traversal segment into an object's
/// growing trajectory.
///
/// The segment is appended when its first point is strictly later than the
/// existing trajectory's first point, and prepended otherwise. Traversal
/// records are not guaranteed to arrive in temporal order; comparing against
/// the earliest known point keeps the result chronologically oriented with
/// an O(1) decision per merge. This is not a full merge-sort of arbitrary
/// interleavings: segments that interleave rather than sitting cleanly
/// before/after each other can leave the result non-monotonic. That is a
/// known, deliberate approximation of this policy.
pub fn merge_by_first_point_time(
  existing: &mut Vec<TrajectoryPoint>,
  mut segment: Vec<TrajectoryPoint>,
) {
  let starts_after = match (segment.first(), existing.first()) {
    (Some(new_first), Some(old_first)) => new_first.time > old_first.time,
    _ => true,
  };

  if starts_after {
    existing.append(&mut segment);
  } else {
    segment.append(existing);
    *existing = segment;
  }
}

/// Single-object query: the object's full constants (payload included) and
/// its trajectory points in `[start_time, end_time]`.
///
/// Never fails — a constants fetch failure yields `None` constants and a
/// trajectory fetch failure yields an empty trajectory, each logged.
pub async fn object_query<S: TrajectoryStore>(
  store: &S,
  object_id: &str,
  start_time: i64,
  end_time: i64,
) -> ObjectData {
  let trajectory = match store.get_trajectory(object_id, start_time, end_time).await {
    Ok(points) => points,
    Err(e) => {
      warn!(object_id, error = %e, "trajectory fetch failed; serving empty trajectory");
      Vec::new()
    }
  };

  let constants = match store.get_object_constants(object_id, false).await {
    Ok(constants) => Some(constants),
    Err(e) => {
      warn!(object_id, error = %e, "constants fetch failed; serving empty constants");
      None
    }
  };

  ObjectData { constants, trajectory }
}

/// Section query: stitch every traversal of `section_id` within
/// `[start_time, end_time]` into a [`SectionAggregate`].
///
/// Missing or malformed individual records degrade the result rather than
/// failing it: traversals that fetch nothing are skipped, objects whose
/// constants cannot be resolved are excluded entirely (the aggregate is
/// sorted by `created_time`, so an object without constants has no place in
/// it), and a failed traffic lookup yields an empty aggregate.
pub async fn section_query<S: TrajectoryStore>(
  store: &S,
  section_id: &str,
  start_time: i64,
  end_time: i64,
) -> SectionAggregate {
  let traffic = match store.get_section_traffic(section_id).await {
    Ok(rows) => rows,
    Err(e) => {
      warn!(section_id, error = %e, "section traffic fetch failed; serving empty aggregate");
      return SectionAggregate::new();
    }
  };

  let mut aggregate = SectionAggregate::new();

  for row in traffic {
    let Some(object_id) = object_id_from_index(&row.id_index) else {
      warn!(id_index = %row.id_index, "id_index too short to carry a traversal suffix; skipping row");
      continue;
    };

    // Clamp the traversal to the caller's window. An inverted window is not
    // guarded against here; it simply yields an empty retrieval below.
    let window_start = start_time.max(row.start);
    let window_end = end_time.min(row.end);

    let path = match store.get_trajectory(object_id, window_start, window_end).await {
      Ok(points) => points,
      Err(e) => {
        warn!(object_id, error = %e, "trajectory fetch failed; skipping traversal");
        continue;
      }
    };

    // A traversal with no points in range contributes nothing: an object
    // whose every traversal is empty must be absent from the result, not
    // present with an empty trajectory.
    if path.is_empty() {
      continue;
    }

    if let Some(entry) = aggregate.get_mut(object_id) {
      merge_by_first_point_time(&mut entry.trajectory, path);
      continue;
    }

    // First non-empty traversal for this object: resolve its lightweight
    // constants before admitting it to the aggregate.
    let constants = match store.get_object_constants(object_id, true).await {
      Ok(constants) => constants,
      Err(e) => {
        warn!(object_id, error = %e, "constants unavailable; excluding object from aggregate");
        continue;
      }
    };
    aggregate.insert(object_id.to_owned(), Trajectory { trajectory: path, constants });
  }

  aggregate.sort_by_created_time_desc();
  aggregate
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::{collections::HashMap, sync::Mutex};

  use super::*;
  use crate::{
    Error, Result,
    model::{ObjectConstants, SectionTraffic},
    store::TrajectoryStore,
  };

  /// In-memory store. Constants are kept as row vectors so integrity
  /// violations (zero or multiple rows) can be modelled directly.
  #[derive(Default)]
  struct MockStore {
    trajectories: HashMap<String, Vec<TrajectoryPoint>>,
    constants:    HashMap<String, Vec<ObjectConstants>>,
    traffic:      HashMap<String, Vec<SectionTraffic>>,
    requested:    Mutex<Vec<(String, i64, i64)>>,
  }

  impl TrajectoryStore for MockStore {
    async fn get_trajectory(
      &self,
      object_id: &str,
      start_time: i64,
      end_time: i64,
    ) -> Result<Vec<TrajectoryPoint>> {
      self
        .requested
        .lock()
        .unwrap()
        .push((object_id.to_owned(), start_time, end_time));

      let points = self
        .trajectories
        .get(object_id)
        .ok_or_else(|| Error::NotFound(object_id.to_owned()))?;
      Ok(
        points
          .iter()
          .filter(|p| p.time >= start_time && p.time <= end_time)
          .copied()
          .collect(),
      )
    }

    async fn get_object_constants(
      &self,
      object_id: &str,
      no_payload: bool,
    ) -> Result<ObjectConstants> {
      let rows = self
        .constants
        .get(object_id)
        .ok_or_else(|| Error::NotFound(object_id.to_owned()))?;
      if rows.len() != 1 {
        return Err(Error::Integrity {
          object_id: object_id.to_owned(),
          rows:      rows.len(),
        });
      }
      let mut constants = rows[0].clone();
      if no_payload {
        constants.payload = None;
      }
      Ok(constants)
    }

    async fn get_section_traffic(&self, section_id: &str) -> Result<Vec<SectionTraffic>> {
      self
        .traffic
        .get(section_id)
        .cloned()
        .ok_or_else(|| Error::NotFound(section_id.to_owned()))
    }
  }

  fn point(time: i64) -> TrajectoryPoint {
    TrajectoryPoint { time, x: time as f64, y: time as f64, heading: 0.0 }
  }

  fn constants(created_time: i64) -> ObjectConstants {
    ObjectConstants {
      speed: 42.0,
      created_time,
      expire_time: created_time + 1_000_000,
      payload: Some("deadbeef".into()),
    }
  }

  fn traversal(id_index: &str, start: i64, end: i64) -> SectionTraffic {
    SectionTraffic { id_index: id_index.into(), start, end }
  }

  fn times(trajectory: &[TrajectoryPoint]) -> Vec<i64> {
    trajectory.iter().map(|p| p.time).collect()
  }

  // ── Identifier recovery ─────────────────────────────────────────────────────

  #[test]
  fn object_id_strips_two_character_suffix() {
    assert_eq!(object_id_from_index("abc123xyz9_0"), Some("abc123xyz9"));
  }

  #[test]
  fn object_id_rejects_short_index() {
    assert_eq!(object_id_from_index("_0"), None);
    assert_eq!(object_id_from_index(""), None);
  }

  // ── Merge policy ────────────────────────────────────────────────────────────

  #[test]
  fn merge_appends_later_segment() {
    let mut existing = vec![point(10), point(20)];
    merge_by_first_point_time(&mut existing, vec![point(210), point(220)]);
    assert_eq!(times(&existing), [10, 20, 210, 220]);
  }

  #[test]
  fn merge_prepends_earlier_segment() {
    let mut existing = vec![point(210), point(220)];
    merge_by_first_point_time(&mut existing, vec![point(10), point(20)]);
    assert_eq!(times(&existing), [10, 20, 210, 220]);
  }

  #[test]
  fn merge_prepends_on_equal_first_point() {
    // Ties go to the prepend branch; the comparison is strictly greater.
    let mut existing = vec![point(100), point(300)];
    merge_by_first_point_time(&mut existing, vec![point(100), point(200)]);
    assert_eq!(times(&existing), [100, 200, 100, 300]);
  }

  // ── Section queries ─────────────────────────────────────────────────────────

  fn two_segment_store(traversal_order: [SectionTraffic; 2]) -> MockStore {
    let mut store = MockStore::default();
    store.trajectories.insert(
      "alpha00000".into(),
      vec![point(10), point(20), point(210), point(220)],
    );
    store
      .constants
      .insert("alpha00000".into(), vec![constants(5)]);
    store.traffic.insert("A".into(), traversal_order.into());
    store
  }

  #[tokio::test]
  async fn non_overlapping_segments_merge_in_time_order() {
    // Earlier traversal arrives first.
    let store = two_segment_store([
      traversal("alpha00000_0", 0, 100),
      traversal("alpha00000_1", 200, 300),
    ]);
    let aggregate = section_query(&store, "A", 0, 1000).await;
    assert_eq!(times(&aggregate.get("alpha00000").unwrap().trajectory), [10, 20, 210, 220]);

    // Later traversal arrives first; the merge must still orient the result.
    let store = two_segment_store([
      traversal("alpha00000_1", 200, 300),
      traversal("alpha00000_0", 0, 100),
    ]);
    let aggregate = section_query(&store, "A", 0, 1000).await;
    assert_eq!(times(&aggregate.get("alpha00000").unwrap().trajectory), [10, 20, 210, 220]);
  }

  #[tokio::test]
  async fn object_with_only_empty_traversals_is_absent() {
    let mut store = MockStore::default();
    store
      .trajectories
      .insert("alpha00000".into(), vec![point(5000)]);
    store
      .constants
      .insert("alpha00000".into(), vec![constants(5)]);
    store
      .traffic
      .insert("A".into(), vec![traversal("alpha00000_0", 0, 100)]);

    let aggregate = section_query(&store, "A", 0, 1000).await;
    assert!(aggregate.is_empty());
    assert!(!aggregate.contains("alpha00000"));
  }

  #[tokio::test]
  async fn traversal_window_is_clamped_to_query_window() {
    let mut store = MockStore::default();
    store
      .trajectories
      .insert("alpha00000".into(), vec![point(250)]);
    store
      .constants
      .insert("alpha00000".into(), vec![constants(5)]);
    store
      .traffic
      .insert("A".into(), vec![traversal("alpha00000_0", 100, 500)]);

    section_query(&store, "A", 200, 1000).await;

    let requested = store.requested.lock().unwrap();
    assert_eq!(*requested, vec![("alpha00000".to_owned(), 200, 500)]);
  }

  #[tokio::test]
  async fn inverted_clamped_window_yields_no_entry() {
    // Traversal entirely before the query window: clamped to [400, 300].
    let mut store = MockStore::default();
    store
      .trajectories
      .insert("alpha00000".into(), vec![point(250)]);
    store
      .constants
      .insert("alpha00000".into(), vec![constants(5)]);
    store
      .traffic
      .insert("A".into(), vec![traversal("alpha00000_0", 100, 300)]);

    let aggregate = section_query(&store, "A", 400, 1000).await;
    assert!(aggregate.is_empty());
  }

  #[tokio::test]
  async fn aggregate_orders_by_created_time_desc() {
    let mut store = MockStore::default();
    for (id, created) in [("aaa0000000", 10), ("bbb0000000", 30), ("ccc0000000", 20)] {
      store.trajectories.insert(id.into(), vec![point(50)]);
      store.constants.insert(id.into(), vec![constants(created)]);
    }
    store.traffic.insert(
      "A".into(),
      vec![
        traversal("aaa0000000_0", 0, 100),
        traversal("bbb0000000_0", 0, 100),
        traversal("ccc0000000_0", 0, 100),
      ],
    );

    let aggregate = section_query(&store, "A", 0, 1000).await;
    let created: Vec<i64> = aggregate
      .iter()
      .map(|(_, t)| t.constants.created_time)
      .collect();
    assert_eq!(created, [30, 20, 10]);
  }

  #[tokio::test]
  async fn equal_created_times_keep_encounter_order() {
    let mut store = MockStore::default();
    for id in ["aaa0000000", "bbb0000000"] {
      store.trajectories.insert(id.into(), vec![point(50)]);
      store.constants.insert(id.into(), vec![constants(10)]);
    }
    store.traffic.insert(
      "A".into(),
      vec![
        traversal("bbb0000000_0", 0, 100),
        traversal("aaa0000000_0", 0, 100),
      ],
    );

    let aggregate = section_query(&store, "A", 0, 1000).await;
    let ids: Vec<&str> = aggregate.iter().map(|(id, _)| id).collect();
    assert_eq!(ids, ["bbb0000000", "aaa0000000"]);
  }

  #[tokio::test]
  async fn constants_violation_excludes_object_from_section() {
    let mut store = MockStore::default();

    // zero constants rows
    store
      .trajectories
      .insert("aaa0000000".into(), vec![point(50)]);
    store.constants.insert("aaa0000000".into(), vec![]);
    // two constants rows
    store
      .trajectories
      .insert("bbb0000000".into(), vec![point(50)]);
    store
      .constants
      .insert("bbb0000000".into(), vec![constants(1), constants(2)]);
    // healthy object
    store
      .trajectories
      .insert("ccc0000000".into(), vec![point(50)]);
    store.constants.insert("ccc0000000".into(), vec![constants(3)]);

    store.traffic.insert(
      "A".into(),
      vec![
        traversal("aaa0000000_0", 0, 100),
        traversal("bbb0000000_0", 0, 100),
        traversal("ccc0000000_0", 0, 100),
      ],
    );

    let aggregate = section_query(&store, "A", 0, 1000).await;
    assert_eq!(aggregate.len(), 1);
    assert!(aggregate.contains("ccc0000000"));
  }

  #[tokio::test]
  async fn section_constants_are_payload_free() {
    let store = two_segment_store([
      traversal("alpha00000_0", 0, 100),
      traversal("alpha00000_1", 200, 300),
    ]);
    let aggregate = section_query(&store, "A", 0, 1000).await;
    assert!(aggregate.get("alpha00000").unwrap().constants.payload.is_none());
  }

  #[tokio::test]
  async fn unknown_section_yields_empty_aggregate() {
    let store = MockStore::default();
    let aggregate = section_query(&store, "Z", 0, 1000).await;
    assert!(aggregate.is_empty());
  }

  #[tokio::test]
  async fn repeated_query_is_byte_identical() {
    let mut store = MockStore::default();
    for (id, created) in [("aaa0000000", 10), ("bbb0000000", 30), ("ccc0000000", 20)] {
      store
        .trajectories
        .insert(id.into(), vec![point(50), point(60)]);
      store.constants.insert(id.into(), vec![constants(created)]);
    }
    store.traffic.insert(
      "A".into(),
      vec![
        traversal("aaa0000000_0", 0, 100),
        traversal("bbb0000000_0", 0, 100),
        traversal("ccc0000000_0", 0, 100),
        traversal("aaa0000000_1", 40, 70),
      ],
    );

    let first = section_query(&store, "A", 0, 1000).await;
    let second = section_query(&store, "A", 0, 1000).await;
    assert_eq!(first, second);
    assert_eq!(
      serde_json::to_string(&first).unwrap(),
      serde_json::to_string(&second).unwrap()
    );
  }

  // ── Single-object queries ───────────────────────────────────────────────────

  #[tokio::test]
  async fn object_query_includes_payload() {
    let mut store = MockStore::default();
    store
      .trajectories
      .insert("alpha00000".into(), vec![point(10), point(20)]);
    store
      .constants
      .insert("alpha00000".into(), vec![constants(5)]);

    let data = object_query(&store, "alpha00000", 0, 1000).await;
    assert_eq!(times(&data.trajectory), [10, 20]);
    assert_eq!(data.constants.unwrap().payload.as_deref(), Some("deadbeef"));
  }

  #[tokio::test]
  async fn object_query_degrades_on_constants_violation() {
    let mut store = MockStore::default();
    store
      .trajectories
      .insert("alpha00000".into(), vec![point(10)]);
    store
      .constants
      .insert("alpha00000".into(), vec![constants(1), constants(2)]);

    let data = object_query(&store, "alpha00000", 0, 1000).await;
    assert!(data.constants.is_none());
    assert_eq!(times(&data.trajectory), [10]);
  }

  #[tokio::test]
  async fn object_query_for_unknown_object_is_empty() {
    let store = MockStore::default();
    let data = object_query(&store, "nosuchdrone", 0, 1000).await;
    assert!(data.constants.is_none());
    assert!(data.trajectory.is_empty());
  }

  // ── Serialisation order ─────────────────────────────────────────────────────

  #[tokio::test]
  async fn aggregate_serialises_in_sorted_order() {
    let mut store = MockStore::default();
    for (id, created) in [("aaa0000000", 10), ("bbb0000000", 30)] {
      store.trajectories.insert(id.into(), vec![point(50)]);
      store.constants.insert(id.into(), vec![constants(created)]);
    }
    store.traffic.insert(
      "A".into(),
      vec![
        traversal("aaa0000000_0", 0, 100),
        traversal("bbb0000000_0", 0, 100),
      ],
    );

    let aggregate = section_query(&store, "A", 0, 1000).await;
    let json = serde_json::to_string(&aggregate).unwrap();
    let newest = json.find("bbb0000000").unwrap();
    let oldest = json.find("aaa0000000").unwrap();
    assert!(newest < oldest, "newest object must serialise first: {json}");
  }
}
