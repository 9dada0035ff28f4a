#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Administrative-unit gazetteer over local GeoJSON and JSON reference
//! files.
//!
//! A closed catalog of region, city, and district sources is loaded
//! lazily and cached in memory. Records are normalized into canonical
//! GeoJSON features, matched by tiered name comparison or stringified
//! ids, and resolved with parent scoping, corpus-wide fallback, and
//! polygon backfill for point-only records.

pub mod backfill;
pub mod catalog;
pub mod listing;
pub mod matching;
pub mod normalize;
pub mod resolve;
pub mod search;

use thiserror::Error;

/// Errors raised while reading one reference source. [`catalog::SourceCatalog::load`]
/// recovers from all of them by serving the source as empty, so they
/// surface through logs rather than responses.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
