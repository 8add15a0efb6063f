//! Trajectory simulation: Bézier path sampling and section bookkeeping.
//!
//! Each generated object flies a quadratic Bézier curve across a
//! 1,000,000 × 1,000,000 map split into four quadrant sections. Sampling the
//! curve at a fixed time step produces the trajectory; every boundary
//! crossing records an exit time for the old section and an entrance time
//! for the new one, so each section ends up with entrance/exit pairs.

use std::collections::BTreeMap;

use dronemap_core::model::{ObjectConstants, SectionTraffic, TrajectoryPoint};
use rand::Rng;

pub const SECTIONS: [&str; 4] = ["A", "B", "C", "D"];

const WORLD_SIZE: f64 = 1_000_000.0;
const SAMPLE_INTERVAL_MS: i64 = 150;
const ID_LEN: usize = 32;
const PAYLOAD_BYTES: usize = 100;

// ─── Geometry ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec2 {
  pub x: f64,
  pub y: f64,
}

impl Vec2 {
  pub fn length(self) -> f64 {
    (self.x * self.x + self.y * self.y).sqrt()
  }

  /// Direction of the vector in radians, normalised to `[0, 2π)`.
  pub fn heading(self) -> f64 {
    let angle = self.y.atan2(self.x);
    if angle < 0.0 {
      angle + 2.0 * std::f64::consts::PI
    } else {
      angle
    }
  }
}

impl std::ops::Sub for Vec2 {
  type Output = Vec2;

  fn sub(self, other: Vec2) -> Vec2 {
    Vec2 { x: self.x - other.x, y: self.y - other.y }
  }
}

pub fn quadratic_bezier(p0: Vec2, p1: Vec2, p2: Vec2, t: f64) -> Vec2 {
  let u = 1.0 - t;
  Vec2 {
    x: u * u * p0.x + 2.0 * u * t * p1.x + t * t * p2.x,
    y: u * u * p0.y + 2.0 * u * t * p1.y + t * t * p2.y,
  }
}

/// Quadrant sections of the map, split at the midlines:
/// A south-west, B south-east, C north-west, D north-east.
pub fn which_section(point: Vec2) -> &'static str {
  if point.y < WORLD_SIZE / 2.0 {
    if point.x < WORLD_SIZE / 2.0 { "A" } else { "B" }
  } else if point.x < WORLD_SIZE / 2.0 {
    "C"
  } else {
    "D"
  }
}

// ─── Random inputs ────────────────────────────────────────────────────────────

/// A 32-character lowercase alphanumeric identifier. The leading character
/// must be a letter: table names are derived from the identifier.
pub fn random_object_id(rng: &mut impl Rng) -> String {
  const CHARSET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

  let mut id = String::with_capacity(ID_LEN);
  id.push(CHARSET[rng.random_range(10..CHARSET.len())] as char);
  for _ in 1..ID_LEN {
    id.push(CHARSET[rng.random_range(0..CHARSET.len())] as char);
  }
  id
}

fn random_payload(rng: &mut impl Rng) -> String {
  let mut bytes = [0u8; PAYLOAD_BYTES];
  rng.fill(&mut bytes[..]);
  hex::encode(bytes)
}

pub fn random_point_in_map(rng: &mut impl Rng) -> Vec2 {
  Vec2 {
    x: rng.random_range(0.0..WORLD_SIZE),
    y: rng.random_range(0.0..WORLD_SIZE),
  }
}

/// A random map point whose distance to `initial` lies in `[min, max]`.
/// Brute-forces by rejection; the map is large enough that this terminates
/// quickly for the ranges used here.
pub fn random_point_in_area(rng: &mut impl Rng, initial: Vec2, min: f64, max: f64) -> Vec2 {
  loop {
    let point = random_point_in_map(rng);
    let distance = (point - initial).length();
    if distance >= min && distance <= max {
      return point;
    }
  }
}

// ─── Trajectory generation ────────────────────────────────────────────────────

pub struct GeneratedObject {
  pub id:         String,
  pub constants:  ObjectConstants,
  pub trajectory: Vec<TrajectoryPoint>,
  pub traffic:    BTreeMap<&'static str, Vec<SectionTraffic>>,
}

/// Sample a Bézier path at a fixed cadence and track section crossings.
///
/// Returns the trajectory and, per section, the flat list of entrance/exit
/// timestamps (always an even count, pairwise ordered).
fn bezier_trajectory(
  initial: Vec2,
  waypoint: Vec2,
  destination: Vec2,
  speed: f64,
  start_time: i64,
  sim_end_time: i64,
) -> (Vec<TrajectoryPoint>, BTreeMap<&'static str, Vec<i64>>) {
  let mut trajectory = Vec::new();
  let mut crossings: BTreeMap<&'static str, Vec<i64>> = BTreeMap::new();

  let sampling_time = SAMPLE_INTERVAL_MS as f64 / 1000.0;
  let sampling_distance = speed * sampling_time;
  let max_bezier_length =
    (initial - waypoint).length() + (destination - waypoint).length();
  // About 20 curve evaluations per sample to approximate arc length.
  let stepsize = sampling_distance / max_bezier_length / 20.0;

  let mut current = initial;
  crossings.entry(which_section(current)).or_default().push(start_time);

  let mut last_sample = TrajectoryPoint {
    time:    start_time,
    x:       current.x,
    y:       current.y,
    heading: -1.0, // no heading until the object has moved
  };
  trajectory.push(last_sample);

  let mut next_time = start_time;
  let mut distance = 0.0;
  let mut fraction = 0.0;

  while fraction <= 1.0 {
    let next = quadratic_bezier(initial, waypoint, destination, fraction);
    distance += (next - current).length();

    if distance >= sampling_distance {
      if next_time + SAMPLE_INTERVAL_MS > sim_end_time {
        break;
      }
      next_time += SAMPLE_INTERVAL_MS;

      let last_point = Vec2 { x: last_sample.x, y: last_sample.y };
      let prev_section = which_section(last_point);
      let next_section = which_section(next);

      last_sample = TrajectoryPoint {
        time:    next_time,
        x:       next.x,
        y:       next.y,
        heading: (next - last_point).heading(),
      };
      trajectory.push(last_sample);

      if prev_section != next_section {
        crossings
          .entry(prev_section)
          .or_default()
          .push(next_time - SAMPLE_INTERVAL_MS);
        crossings.entry(next_section).or_default().push(next_time);
      }

      // Zero the distance while preserving the arc-length approximation
      // error carried from this sample.
      distance -= sampling_distance;
    }

    current = next;
    fraction += stepsize;
  }

  crossings
    .entry(which_section(Vec2 { x: last_sample.x, y: last_sample.y }))
    .or_default()
    .push(next_time);

  (trajectory, crossings)
}

/// Pair up entrance/exit timestamps into traversal rows. The id_index
/// suffix is the traversal's ordinal within its section; readers strip the
/// trailing two characters to recover the object id.
fn traffic_rows(
  id: &str,
  crossings: &BTreeMap<&'static str, Vec<i64>>,
) -> BTreeMap<&'static str, Vec<SectionTraffic>> {
  let mut traffic = BTreeMap::new();
  for (&section, times) in crossings {
    let rows = times
      .chunks_exact(2)
      .enumerate()
      .map(|(n, pair)| SectionTraffic {
        id_index: format!("{id}_{n}"),
        start:    pair[0],
        end:      pair[1],
      })
      .collect();
    traffic.insert(section, rows);
  }
  traffic
}

/// Generate one object: random endpoints (a waypoint 100–150 km out, a
/// destination 150–400 km out), a speed in [10, 80] m/s, and a start time
/// uniform inside the 10-hour simulation window beginning at
/// `sim_window_start` (epoch ms).
pub fn generate_object(rng: &mut impl Rng, sim_window_start: i64) -> GeneratedObject {
  const SIM_DURATION_MS: i64 = 10 * 3600 * 1000;

  let initial = random_point_in_map(rng);
  let waypoint = random_point_in_area(rng, initial, 100_000.0, 150_000.0);
  let destination = random_point_in_area(rng, initial, 150_000.0, 400_000.0);

  let speed = rng.random_range(10.0..=80.0);
  let sim_end_time = sim_window_start + SIM_DURATION_MS;
  let start_time = rng.random_range(sim_window_start..=sim_end_time);

  let (trajectory, crossings) =
    bezier_trajectory(initial, waypoint, destination, speed, start_time, sim_end_time);

  let id = random_object_id(rng);
  let expire_time = trajectory.last().map(|p| p.time).unwrap_or(start_time);
  let constants = ObjectConstants {
    speed,
    created_time: start_time,
    expire_time,
    payload: Some(random_payload(rng)),
  };
  let traffic = traffic_rows(&id, &crossings);

  GeneratedObject { id, constants, trajectory, traffic }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
