#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Population figures for administrative units.
//!
//! Two complementary lookups back the API: an id-keyed store queried by
//! district, city, or region id (most specific first), and a name-keyed
//! map covering regions whose ids never made it into the reference
//! files. Both are best-effort; a failed lookup costs a log line, never
//! a failed response.

#[cfg(feature = "duckdb")]
pub mod duckdb_store;
pub mod region_map;
pub mod store;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(feature = "duckdb")]
pub use crate::duckdb_store::DuckDbPopulationStore;
pub use crate::region_map::RegionPopulations;
pub use crate::store::{FilePopulationStore, PopulationQuery, PopulationStore};

/// Errors that can occur while opening or querying a population store.
#[derive(Debug, Error)]
pub enum PopulationError {
    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A database query or command failed.
    #[cfg(feature = "duckdb")]
    #[error("Database error: {0}")]
    Database(#[from] duckdb::Error),
}

/// Male/female/total population for one administrative unit. The total
/// falls back to the sum of the parts when the source omits it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PopulationFigures {
    pub male: f64,
    pub female: f64,
    pub total: f64,
}

impl PopulationFigures {
    #[must_use]
    pub fn from_parts(male: Option<f64>, female: Option<f64>, total: Option<f64>) -> Self {
        let male = male.unwrap_or(0.0);
        let female = female.unwrap_or(0.0);
        Self {
            male,
            female,
            total: total.unwrap_or(male + female),
        }
    }
}
