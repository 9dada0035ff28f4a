//! Id-keyed population stores.

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::{PopulationError, PopulationFigures};

/// Identifier filters for one population lookup. When several are
/// supplied, the most specific wins: district, then city, then region.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PopulationQuery {
    pub region_id: Option<String>,
    pub city_id: Option<String>,
    pub district_id: Option<String>,
}

impl PopulationQuery {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.region_id.is_none() && self.city_id.is_none() && self.district_id.is_none()
    }
}

/// A source of id-keyed population figures.
#[async_trait]
pub trait PopulationStore: Send + Sync {
    /// Looks up figures for the most specific id in `query`.
    ///
    /// # Errors
    ///
    /// Returns [`PopulationError`] if the backing store fails; absence of
    /// a matching row is `Ok(None)`.
    async fn lookup(
        &self,
        query: &PopulationQuery,
    ) -> Result<Option<PopulationFigures>, PopulationError>;
}

/// One row of the population table. Ids keep their raw JSON form since
/// sources mix numbers and strings; the uppercase aliases cover exports
/// that kept their census column names.
#[derive(Debug, Clone, Deserialize)]
pub struct PopulationRow {
    #[serde(default)]
    pub region_id: Option<Value>,
    #[serde(default)]
    pub city_id: Option<Value>,
    #[serde(default)]
    pub district_id: Option<Value>,
    #[serde(default, alias = "POP_M")]
    pub pop_m: Option<Value>,
    #[serde(default, alias = "POP_F")]
    pub pop_f: Option<Value>,
    #[serde(default, alias = "POP_TOTAL")]
    pub pop_total: Option<Value>,
}

impl PopulationRow {
    fn figures(&self) -> PopulationFigures {
        PopulationFigures::from_parts(
            self.pop_m.as_ref().and_then(numeric),
            self.pop_f.as_ref().and_then(numeric),
            self.pop_total.as_ref().and_then(numeric),
        )
    }
}

/// A population table loaded from a local JSON file: an array of rows,
/// each keyed by any mix of region, city, and district ids.
pub struct FilePopulationStore {
    rows: Vec<PopulationRow>,
}

impl FilePopulationStore {
    /// Reads a population table from disk.
    ///
    /// # Errors
    ///
    /// Returns [`PopulationError`] if the file cannot be read or parsed.
    pub fn open(path: &Path) -> Result<Self, PopulationError> {
        let text = std::fs::read_to_string(path)?;
        let rows: Vec<PopulationRow> = serde_json::from_str(&text)?;
        log::debug!("Loaded {} population rows from {path:?}", rows.len());
        Ok(Self { rows })
    }

    /// A store with no rows, used when no population file is configured.
    #[must_use]
    pub const fn empty() -> Self {
        Self { rows: Vec::new() }
    }
}

#[async_trait]
impl PopulationStore for FilePopulationStore {
    async fn lookup(
        &self,
        query: &PopulationQuery,
    ) -> Result<Option<PopulationFigures>, PopulationError> {
        if let Some(id) = &query.district_id {
            if let Some(row) = self.rows.iter().find(|row| id_matches(&row.district_id, id)) {
                return Ok(Some(row.figures()));
            }
        }
        if let Some(id) = &query.city_id {
            if let Some(row) = self.rows.iter().find(|row| id_matches(&row.city_id, id)) {
                return Ok(Some(row.figures()));
            }
        }
        if let Some(id) = &query.region_id {
            if let Some(row) = self.rows.iter().find(|row| id_matches(&row.region_id, id)) {
                return Ok(Some(row.figures()));
            }
        }
        Ok(None)
    }
}

fn id_matches(field: &Option<Value>, id: &str) -> bool {
    field
        .as_ref()
        .and_then(id_string)
        .is_some_and(|value| value == id)
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn numeric(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}
