//! Name-keyed region population figures.
//!
//! Some region sources never shipped usable ids, so a separate JSON file
//! maps display names straight to `POP_M`/`POP_F` entries. Lookups probe
//! the name as given, lowercased, and uppercased, since the file mixes
//! conventions.

use std::path::Path;

use serde_json::{Map, Value};

use crate::{PopulationError, PopulationFigures};

/// The name-keyed region population map. Missing or malformed files
/// degrade to an empty map so the API keeps serving without the
/// enrichment.
#[derive(Debug, Default)]
pub struct RegionPopulations {
    entries: Map<String, Value>,
}

impl RegionPopulations {
    /// Loads the map from disk, degrading to empty on any failure.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        match Self::read(path) {
            Ok(map) => map,
            Err(error) => {
                log::warn!("Failed to load region populations from {path:?}: {error}");
                Self::default()
            }
        }
    }

    fn read(path: &Path) -> Result<Self, PopulationError> {
        if !path.is_file() {
            log::debug!("No region population map at {path:?}");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        let entries: Map<String, Value> = serde_json::from_str(&text)?;
        Ok(Self { entries })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Figures for one region name. The total is always the sum of the
    /// male and female entries; non-numeric entries count as zero.
    #[must_use]
    pub fn figures_for(&self, name: &str) -> Option<PopulationFigures> {
        let trimmed = name.trim();
        let entry = self
            .entries
            .get(trimmed)
            .or_else(|| self.entries.get(&trimmed.to_lowercase()))
            .or_else(|| self.entries.get(&trimmed.to_uppercase()))?;
        let entry = entry.as_object()?;
        let male = entry.get("POP_M").and_then(numeric).unwrap_or(0.0);
        let female = entry.get("POP_F").and_then(numeric).unwrap_or(0.0);
        Some(PopulationFigures {
            male,
            female,
            total: male + female,
        })
    }
}

fn numeric(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}
