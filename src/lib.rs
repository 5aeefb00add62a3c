//! Realty Lens: filter, aggregate and compare real-estate listing tables.
//!
//! The library is the pure core of the dashboards; the `realty-lens`
//! binary puts an egui front-end on top of it.

pub mod config;
pub mod dashboard;
pub mod data;
pub mod error;
pub mod schema;

pub use error::{DataError, SchemaError};
