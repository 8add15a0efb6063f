//! Data model for the dronemap trajectory service.
//!
//! Persisted kinds: [`TrajectoryPoint`], [`ObjectConstants`] and
//! [`SectionTraffic`]. Derived kinds, built per query and never persisted:
//! [`Trajectory`], [`ObjectData`] and [`SectionAggregate`].

use serde::{Deserialize, Serialize};

/// One position/heading sample of an object's path. Immutable once read;
/// ordered by `time` (epoch milliseconds).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
  pub time:    i64,
  pub x:       f64,
  pub y:       f64,
  pub heading: f64,
}

/// Per-object attributes that do not vary with time.
///
/// Exactly one record exists per object identifier. `payload` is omitted
/// from JSON output when it was not fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectConstants {
  pub speed:        f64,
  pub created_time: i64,
  pub expire_time:  i64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub payload:      Option<String>,
}

/// One traversal record of a section: an object was inside the section
/// during `[start, end]`.
///
/// `id_index` encodes the object identifier plus a 2-character traversal
/// index suffix; see [`crate::stitch::object_id_from_index`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionTraffic {
  pub id_index: String,
  pub start:    i64,
  pub end:      i64,
}

/// A stitched per-object path plus its payload-free constants. Built by the
/// stitching engine for section queries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trajectory {
  pub trajectory: Vec<TrajectoryPoint>,
  pub constants:  ObjectConstants,
}

/// Result of a single-object query. `constants` is `None` when the object is
/// unknown or its constants record is corrupt; the trajectory is still
/// served with whatever points were found.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectData {
  pub constants:  Option<ObjectConstants>,
  pub trajectory: Vec<TrajectoryPoint>,
}

// ─── Section aggregate ────────────────────────────────────────────────────────

/// The final output of a section query: object identifier → [`Trajectory`],
/// iterated and serialised in descending `created_time` order.
///
/// Backed by an insertion-ordered `Vec` so the sort order survives
/// serialisation (plain JSON maps would not preserve it). An object
/// identifier appears at most once, regardless of how many traversals it
/// contributed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionAggregate {
  entries: Vec<(String, Trajectory)>,
}

impl SectionAggregate {
  pub fn new() -> Self { Self::default() }

  pub fn len(&self) -> usize { self.entries.len() }

  pub fn is_empty(&self) -> bool { self.entries.is_empty() }

  pub fn contains(&self, object_id: &str) -> bool {
    self.entries.iter().any(|(id, _)| id == object_id)
  }

  pub fn get(&self, object_id: &str) -> Option<&Trajectory> {
    self
      .entries
      .iter()
      .find(|(id, _)| id == object_id)
      .map(|(_, t)| t)
  }

  pub fn get_mut(&mut self, object_id: &str) -> Option<&mut Trajectory> {
    self
      .entries
      .iter_mut()
      .find(|(id, _)| id == object_id)
      .map(|(_, t)| t)
  }

  /// Append an entry. Keys must be unique; the engine checks membership
  /// before inserting.
  pub fn insert(&mut self, object_id: String, trajectory: Trajectory) {
    debug_assert!(!self.contains(&object_id), "duplicate aggregate key");
    self.entries.push((object_id, trajectory));
  }

  /// Iterate entries in their current (insertion or sorted) order.
  pub fn iter(&self) -> impl Iterator<Item = (&str, &Trajectory)> {
    self.entries.iter().map(|(id, t)| (id.as_str(), t))
  }

  /// Stable sort by `constants.created_time` descending. Equal timestamps
  /// keep their encounter order.
  pub fn sort_by_created_time_desc(&mut self) {
    self
      .entries
      .sort_by(|a, b| b.1.constants.created_time.cmp(&a.1.constants.created_time));
  }
}

impl Serialize for SectionAggregate {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    use serde::ser::SerializeMap;

    let mut map = serializer.serialize_map(Some(self.entries.len()))?;
    for (object_id, trajectory) in &self.entries {
      map.serialize_entry(object_id, trajectory)?;
    }
    map.end()
  }
}
