//! Core types and trait definitions for the dronemap trajectory service.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! It holds the data model, the [`store::TrajectoryStore`] abstraction over
//! storage backends, and the trajectory stitching engine in [`stitch`].

pub mod error;
pub mod model;
pub mod stitch;
pub mod store;

pub use error::{Error, Result};
