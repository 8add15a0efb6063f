//! JSON query API for dronemap.
//!
//! Exposes an axum [`Router`] backed by any
//! [`dronemap_core::store::TrajectoryStore`]. Transport concerns (TLS,
//! timeouts, deadlines around whole aggregations) are the caller's
//! responsibility.
//!
//! Non-numeric time parameters are rejected at this boundary with a 400 via
//! the typed path extractor; everything past the boundary follows the
//! lenient read philosophy and answers 200 with a possibly-empty body.

pub mod section;
pub mod trajectory;

use std::{path::PathBuf, sync::Arc};

use axum::{Router, routing::get};
use dronemap_core::store::TrajectoryStore;
use serde::Deserialize;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `DRONEMAP_*` environment overrides.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:    String,
  pub port:    u16,
  pub db_path: PathBuf,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: TrajectoryStore + 'static,
{
  Router::new()
    .route(
      "/api/trajectory/{object_id}/{start_time}/{end_time}",
      get(trajectory::handler::<S>),
    )
    .route(
      "/api/section/{section_id}/{start_time}/{end_time}",
      get(section::handler::<S>),
    )
    .with_state(store)
}

// ─── Integration tests ────────────────────────────────────────────────────────
