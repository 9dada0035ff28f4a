//! DuckDB-backed population store.
//!
//! Expects a `population` table with `region_id`, `city_id`,
//! `district_id`, `pop_m`, `pop_f`, and `pop_total` columns. Queries
//! compare ids as text so integer and varchar id columns both work.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use duckdb::Connection;

use crate::store::{PopulationQuery, PopulationStore};
use crate::{PopulationError, PopulationFigures};

/// Population store backed by a DuckDB database file.
pub struct DuckDbPopulationStore {
    conn: Mutex<Connection>,
}

impl DuckDbPopulationStore {
    /// Opens the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PopulationError`] if the database cannot be opened.
    pub fn open(path: &Path) -> Result<Self, PopulationError> {
        let conn = Connection::open(path)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn query_by(&self, column: &str, id: &str) -> Result<Option<PopulationFigures>, PopulationError> {
        // `column` is one of our three fixed id columns, never caller
        // input.
        let sql = format!(
            "SELECT pop_m, pop_f, pop_total FROM population \
             WHERE CAST({column} AS VARCHAR) = ? LIMIT 1"
        );
        let conn = self.conn.lock().expect("connection mutex poisoned");
        let mut stmt = conn.prepare(&sql)?;
        stmt.raw_bind_parameter(1, id)?;
        stmt.raw_execute()?;

        let mut rows = stmt.raw_query();
        if let Some(row) = rows.next()? {
            let male: Option<f64> = row.get(0)?;
            let female: Option<f64> = row.get(1)?;
            let total: Option<f64> = row.get(2)?;
            return Ok(Some(PopulationFigures::from_parts(male, female, total)));
        }
        Ok(None)
    }
}

#[async_trait]
impl PopulationStore for DuckDbPopulationStore {
    async fn lookup(
        &self,
        query: &PopulationQuery,
    ) -> Result<Option<PopulationFigures>, PopulationError> {
        if let Some(id) = &query.district_id {
            if let Some(figures) = self.query_by("district_id", id)? {
                return Ok(Some(figures));
            }
        }
        if let Some(id) = &query.city_id {
            if let Some(figures) = self.query_by("city_id", id)? {
                return Ok(Some(figures));
            }
        }
        if let Some(id) = &query.region_id {
            if let Some(figures) = self.query_by("region_id", id)? {
                return Ok(Some(figures));
            }
        }
        Ok(None)
    }
}
