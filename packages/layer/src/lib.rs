#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Remote feature-layer statistics passthrough.
//!
//! Queries `ArcGIS`-style feature layers for population overlays the
//! local reference files do not carry: per-name sums and grouped
//! statistics. The layer URL is caller-supplied per request, so one
//! deployment can front several upstream layers.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

/// Upstream request timeout. Layer servers are slow enough that the
/// default would leave handlers hanging well past usefulness.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Statistic output name requested from the layer.
const SUM_FIELD: &str = "SUM_POP";

/// Errors that can occur while querying a feature layer.
#[derive(Debug, Error)]
pub enum LayerError {
    /// HTTP request failed or returned a non-success status.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Sum over every layer feature matching one name.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSum {
    pub name: String,
    pub feature_count: u64,
    pub total: f64,
}

/// One group row of a grouped-sum query. Values pass through as the
/// layer returned them, including nulls.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerGroupSum {
    pub name: Option<Value>,
    pub total: Option<f64>,
}

/// Client for `ArcGIS`-style feature-layer query endpoints.
pub struct LayerClient {
    client: reqwest::Client,
}

impl LayerClient {
    /// Builds the client with the layer request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError`] if the underlying HTTP client cannot be
    /// constructed.
    pub fn new() -> Result<Self, LayerError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }

    /// Sums `value_field` over every layer feature whose `name_field`
    /// equals `name`.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError`] if the request fails, the layer responds
    /// with a non-success status, or the body is not JSON.
    pub async fn sum_for(
        &self,
        layer_url: &str,
        name_field: &str,
        name: &str,
        value_field: &str,
    ) -> Result<LayerSum, LayerError> {
        let where_clause = equality_clause(name_field, name);
        let url = query_url(layer_url);
        log::debug!("Querying layer {url} where {where_clause}");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("where", where_clause.as_str()),
                ("outFields", value_field),
                ("returnGeometry", "false"),
                ("f", "json"),
            ])
            .send()
            .await?;
        let body: Value = response.error_for_status()?.json().await?;

        let mut total = 0.0;
        let mut feature_count = 0u64;
        for feature in layer_features(&body) {
            let Some(value) = feature
                .get("attributes")
                .and_then(|attrs| attrs.get(value_field))
                .and_then(numeric)
            else {
                continue;
            };
            total += value;
            feature_count += 1;
        }

        Ok(LayerSum {
            name: name.to_string(),
            feature_count,
            total,
        })
    }

    /// Grouped sums of `value_field` by `name_field` across the whole
    /// layer, largest first. The `where_clause` restricts which features
    /// participate; pass `"1=1"` for all of them.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError`] if the request fails, the layer responds
    /// with a non-success status, or the body is not JSON.
    pub async fn grouped_sums(
        &self,
        layer_url: &str,
        name_field: &str,
        value_field: &str,
        where_clause: &str,
    ) -> Result<Vec<LayerGroupSum>, LayerError> {
        let statistics = serde_json::to_string(&serde_json::json!([{
            "statisticType": "sum",
            "onStatisticField": value_field,
            "outStatisticFieldName": SUM_FIELD,
        }]))?;
        let url = query_url(layer_url);
        log::debug!("Querying layer {url} grouped by {name_field}");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("where", where_clause),
                ("groupByFieldsForStatistics", name_field),
                ("outStatistics", statistics.as_str()),
                ("returnGeometry", "false"),
                ("f", "json"),
            ])
            .send()
            .await?;
        let body: Value = response.error_for_status()?.json().await?;

        let mut groups: Vec<LayerGroupSum> = layer_features(&body)
            .filter_map(|feature| feature.get("attributes"))
            .map(|attrs| LayerGroupSum {
                name: attrs.get(name_field).cloned(),
                total: attrs.get(SUM_FIELD).and_then(numeric),
            })
            .collect();
        groups.sort_by(|a, b| {
            b.total
                .unwrap_or(0.0)
                .total_cmp(&a.total.unwrap_or(0.0))
        });
        Ok(groups)
    }
}

/// The layer's `query` endpoint for a base layer URL.
fn query_url(layer_url: &str) -> String {
    format!("{}/query", layer_url.trim_end_matches('/'))
}

/// Builds `field = 'name'` with embedded quotes doubled, the SQL-ish
/// quoting layer servers expect.
fn equality_clause(field: &str, name: &str) -> String {
    format!("{field} = '{}'", name.replace('\'', "''"))
}

fn layer_features(body: &Value) -> impl Iterator<Item = &Value> {
    body.get("features")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
}

fn numeric(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}
