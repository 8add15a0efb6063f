//! [`SqliteStore`] — the SQLite implementation of [`TrajectoryStore`].

use std::path::Path;

use dronemap_core::{
  Error, Result,
  model::{ObjectConstants, SectionTraffic, TrajectoryPoint},
  store::TrajectoryStore,
};

use crate::table::{constants_table, section_table, trajectory_table};

/// Map a database failure onto the core error taxonomy. SQLite reports a
/// missing per-entity table as a plain execution error carrying a
/// "no such table" message; that is the adapter's NotFound case.
fn map_db_err(e: tokio_rusqlite::Error) -> Error {
  if let tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(_, Some(msg))) = &e {
    if msg.starts_with("no such table") {
      return Error::NotFound(msg.clone());
    }
  }
  Error::Store(e.to_string())
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A dronemap trajectory store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. The handle
/// is constructed explicitly and passed down; there is no process-wide
/// implicit connection state.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path`.
  ///
  /// No schema is created here: tables are per-entity and are created on
  /// demand by the write path (generator, tests).
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path)
      .await
      .map_err(map_db_err)?;
    Ok(Self { conn })
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory()
      .await
      .map_err(map_db_err)?;
    Ok(Self { conn })
  }

  // ── Write path ──────────────────────────────────────────────────────────
  //
  // Used by the data generator and by tests; the serving path never writes.

  /// Create the `{id}_trajectory` and `{id}_data` tables for a new object.
  pub async fn create_object_tables(&self, object_id: &str) -> Result<()> {
    let trajectory = trajectory_table(object_id)?;
    let constants = constants_table(object_id)?;

    self
      .conn
      .call(move |conn| {
        conn.execute_batch(&format!(
          "CREATE TABLE IF NOT EXISTS {trajectory} (
             time    INTEGER PRIMARY KEY,
             x       REAL,
             y       REAL,
             heading REAL
           );
           CREATE TABLE IF NOT EXISTS {constants} (
             speed        REAL,
             created_time INTEGER,
             expire_time  INTEGER,
             payload      TEXT
           );"
        ))?;
        Ok(())
      })
      .await
      .map_err(map_db_err)
  }

  /// Create one traversal table per section identifier.
  pub async fn create_section_tables(&self, section_ids: &[&str]) -> Result<()> {
    let tables = section_ids
      .iter()
      .map(|id| section_table(id))
      .collect::<Result<Vec<_>>>()?;

    self
      .conn
      .call(move |conn| {
        for table in &tables {
          // "end" is an SQL keyword, hence the quoting.
          conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
               id_index TEXT PRIMARY KEY,
               start    INTEGER,
               \"end\"  INTEGER
             );"
          ))?;
        }
        Ok(())
      })
      .await
      .map_err(map_db_err)
  }

  /// Insert the single constants row for an object.
  pub async fn insert_object_constants(
    &self,
    object_id: &str,
    constants: ObjectConstants,
  ) -> Result<()> {
    let table = constants_table(object_id)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!(
            "INSERT INTO {table} (speed, created_time, expire_time, payload)
             VALUES (?1, ?2, ?3, ?4)"
          ),
          rusqlite::params![
            constants.speed,
            constants.created_time,
            constants.expire_time,
            constants.payload,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(map_db_err)
  }

  /// Batch-insert trajectory points for an object, one transaction.
  pub async fn insert_trajectory(
    &self,
    object_id: &str,
    points: Vec<TrajectoryPoint>,
  ) -> Result<()> {
    let table = trajectory_table(object_id)?;

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(&format!(
            "INSERT INTO {table} (time, x, y, heading) VALUES (?1, ?2, ?3, ?4)"
          ))?;
          for p in &points {
            stmt.execute(rusqlite::params![p.time, p.x, p.y, p.heading])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await
      .map_err(map_db_err)
  }

  /// Batch-insert traversal rows into a section table, one transaction.
  pub async fn insert_section_traffic(
    &self,
    section_id: &str,
    rows: Vec<SectionTraffic>,
  ) -> Result<()> {
    let table = section_table(section_id)?;

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(&format!(
            "INSERT INTO {table} (id_index, start, \"end\") VALUES (?1, ?2, ?3)"
          ))?;
          for row in &rows {
            stmt.execute(rusqlite::params![row.id_index, row.start, row.end])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await
      .map_err(map_db_err)
  }
}

// ─── TrajectoryStore impl ─────────────────────────────────────────────────────

impl TrajectoryStore for SqliteStore {
  async fn get_trajectory(
    &self,
    object_id: &str,
    start_time: i64,
    end_time: i64,
  ) -> Result<Vec<TrajectoryPoint>> {
    let table = trajectory_table(object_id)?;

    self
      .conn
      .call(move |conn| {
        // Ascending time order is part of this method's contract; it is
        // stated in SQL rather than assumed from storage iteration order.
        let mut stmt = conn.prepare(&format!(
          "SELECT time, x, y, heading FROM {table}
           WHERE time BETWEEN ?1 AND ?2
           ORDER BY time ASC"
        ))?;

        let rows = stmt
          .query_map(rusqlite::params![start_time, end_time], |row| {
            Ok(TrajectoryPoint {
              time:    row.get(0)?,
              x:       row.get(1)?,
              y:       row.get(2)?,
              heading: row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
      })
      .await
      .map_err(map_db_err)
  }

  async fn get_object_constants(
    &self,
    object_id: &str,
    no_payload: bool,
  ) -> Result<ObjectConstants> {
    let table = constants_table(object_id)?;

    // Payload-free lookups do not fetch the payload column at all, so the
    // section aggregation path never pulls large payloads.
    let sql = if no_payload {
      format!("SELECT speed, created_time, expire_time, NULL FROM {table}")
    } else {
      format!("SELECT speed, created_time, expire_time, payload FROM {table}")
    };

    let mut rows: Vec<ObjectConstants> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], |row| {
            Ok(ObjectConstants {
              speed:        row.get(0)?,
              created_time: row.get(1)?,
              expire_time:  row.get(2)?,
              payload:      row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(map_db_err)?;

    if rows.len() != 1 {
      return Err(Error::Integrity {
        object_id: object_id.to_owned(),
        rows:      rows.len(),
      });
    }
    Ok(rows.remove(0))
  }

  async fn get_section_traffic(&self, section_id: &str) -> Result<Vec<SectionTraffic>> {
    let table = section_table(section_id)?;

    self
      .conn
      .call(move |conn| {
        let mut stmt =
          conn.prepare(&format!("SELECT id_index, start, \"end\" FROM {table}"))?;

        let rows = stmt
          .query_map([], |row| {
            Ok(SectionTraffic {
              id_index: row.get(0)?,
              start:    row.get(1)?,
              end:      row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
      })
      .await
      .map_err(map_db_err)
  }
}
