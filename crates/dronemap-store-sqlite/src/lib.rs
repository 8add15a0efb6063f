//! SQLite backend for the dronemap trajectory store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. The schema is table-per-entity: each
//! object gets its own trajectory and constants tables, each section its own
//! traversal table. Every table name is built through the validated resolver
//! in [`table`].

mod store;
mod table;

pub use store::SqliteStore;
