//! dronemap synthetic fleet generator.
//!
//! Populates a dronemap SQLite database with randomly generated drone
//! trajectories so the server has something to serve: per-object trajectory
//! and constants tables plus per-section traversal records for the four
//! quadrant sections A–D.

mod sim;

use std::path::PathBuf;

use anyhow::Context as _;
use chrono::{TimeZone as _, Utc};
use clap::Parser;
use dronemap_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "dronemap synthetic data generator")]
struct Cli {
  /// Path of the SQLite database to create or extend.
  #[arg(long, default_value = "drone_map.db")]
  db: PathBuf,

  /// Number of objects to generate.
  #[arg(long, default_value_t = 50)]
  count: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let store = SqliteStore::open(&cli.db)
    .await
    .with_context(|| format!("failed to open database at {:?}", cli.db))?;
  store.create_section_tables(&sim::SECTIONS).await?;

  // All objects fly within the same 10-hour window.
  let sim_window_start = Utc
    .with_ymd_and_hms(2006, 12, 1, 13, 0, 0)
    .single()
    .context("invalid simulation epoch")?
    .timestamp_millis();

  let mut rng = rand::rng();

  for i in 1..=cli.count {
    let object = sim::generate_object(&mut rng, sim_window_start);
    tracing::info!(object_id = %object.id, "generating object {i}/{}", cli.count);

    store.create_object_tables(&object.id).await?;
    store
      .insert_object_constants(&object.id, object.constants)
      .await?;
    store.insert_trajectory(&object.id, object.trajectory).await?;
    for (section, rows) in object.traffic {
      store.insert_section_traffic(section, rows).await?;
    }
  }

  tracing::info!("wrote {} objects to {:?}", cli.count, cli.db);

  Ok(())
}
