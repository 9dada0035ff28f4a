#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the atlas map server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the gazetteer result types to allow independent evolution of the
//! API contract. Query parameters keep their snake_case wire names.

use atlas_map_gazetteer_models::{
    NameSum, PlaceSummary, PopulationBreakdown, ResolvedPlace, SourceKey, SourceSum, Suggestion,
};
use atlas_map_layer::{LayerGroupSum, LayerSum};
use atlas_map_population::PopulationFigures;
use geojson::{Feature, JsonObject, JsonValue};
use serde::{Deserialize, Serialize};

/// A resolved administrative unit as returned by the API, with population
/// figures flattened in when enrichment succeeded.
#[derive(Debug, Clone, Serialize)]
pub struct ResolveResponse {
    /// Source the match came from.
    pub file_key: SourceKey,
    /// Canonical display name of the match.
    pub neighborhood: String,
    /// Normalized GeoJSON feature.
    pub feature: Feature,
    /// Property bag of the matched record.
    pub properties: JsonObject,
    /// Male population.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub population_male: Option<f64>,
    /// Female population.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub population_female: Option<f64>,
    /// Total population.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub population_total: Option<f64>,
}

impl ResolveResponse {
    /// Flattens population figures into the response when present.
    #[must_use]
    pub fn with_population(mut self, figures: Option<PopulationFigures>) -> Self {
        if let Some(figures) = figures {
            self.population_male = Some(figures.male);
            self.population_female = Some(figures.female);
            self.population_total = Some(figures.total);
        }
        self
    }
}

impl From<ResolvedPlace> for ResolveResponse {
    fn from(place: ResolvedPlace) -> Self {
        Self {
            file_key: place.file_key,
            neighborhood: place.name,
            feature: place.feature,
            properties: place.properties,
            population_male: None,
            population_female: None,
            population_total: None,
        }
    }
}

/// Query parameters for region resolution.
#[derive(Debug, Clone, Deserialize)]
pub struct RegionParams {
    /// Region identifier.
    pub region_id: Option<String>,
    /// Region display name.
    pub region_name: Option<String>,
}

/// Query parameters for city resolution.
#[derive(Debug, Clone, Deserialize)]
pub struct CityParams {
    /// City identifier.
    pub city_id: Option<String>,
    /// City display name.
    pub city_name: Option<String>,
    /// Parent region identifier scope.
    pub region_id: Option<String>,
    /// Parent region name scope.
    pub region_name: Option<String>,
}

/// Query parameters for district resolution.
#[derive(Debug, Clone, Deserialize)]
pub struct DistrictParams {
    /// District identifier.
    pub district_id: Option<String>,
    /// District display name.
    pub district_name: Option<String>,
    /// Parent city identifier scope.
    pub city_id: Option<String>,
    /// Parent city name scope.
    pub city_name: Option<String>,
}

/// Query parameters for the districts-of-city collection.
#[derive(Debug, Clone, Deserialize)]
pub struct CityDistrictsParams {
    /// City identifier.
    pub city_id: Option<String>,
    /// City display name.
    pub city_name: Option<String>,
}

/// Query parameters for corpus-wide search.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchParams {
    /// Name to search for.
    pub neighborhood: Option<String>,
    /// Comma-separated candidate property names to match against.
    pub name_field: Option<String>,
}

/// Query parameters for autocomplete suggestions.
#[derive(Debug, Clone, Deserialize)]
pub struct SuggestParams {
    /// Substring to search for.
    pub q: Option<String>,
    /// Maximum number of suggestions.
    pub limit: Option<usize>,
}

/// Response for the suggest endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SuggestResponse {
    /// Matching candidates across all sources, in catalog order.
    pub suggestions: Vec<Suggestion>,
}

/// A dropdown entry for one administrative unit.
#[derive(Debug, Clone, Serialize)]
pub struct ListEntry {
    /// Unit identifier, as typed in the source.
    pub id: Option<JsonValue>,
    /// English display name.
    pub name_en: Option<JsonValue>,
    /// Arabic display name.
    pub name_ar: Option<JsonValue>,
}

impl From<PlaceSummary> for ListEntry {
    fn from(summary: PlaceSummary) -> Self {
        Self {
            id: summary.id,
            name_en: summary.name_en,
            name_ar: summary.name_ar,
        }
    }
}

/// Response for the regions listing endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct RegionListResponse {
    /// Deduplicated region entries.
    pub regions: Vec<ListEntry>,
}

/// Query parameters for the cities listing endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ListCitiesParams {
    /// Parent region identifier scope.
    pub region_id: Option<String>,
    /// Parent region name scope.
    pub region_name: Option<String>,
}

/// Response for the cities listing endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct CityListResponse {
    /// City entries, optionally scoped to a region.
    pub cities: Vec<ListEntry>,
}

/// Query parameters for the districts listing endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ListDistrictsParams {
    /// Parent city identifier scope.
    pub city_id: Option<String>,
    /// Parent city name scope.
    pub city_name: Option<String>,
}

/// Response for the districts listing endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct DistrictListResponse {
    /// District entries, optionally scoped to a city.
    pub districts: Vec<ListEntry>,
}

/// Query parameters for the single-source feature endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct FileFeatureParams {
    /// Source key to search in.
    pub file: Option<String>,
    /// Name to search for.
    pub neighborhood: Option<String>,
    /// Comma-separated candidate property names to match against.
    pub name_field: Option<String>,
}

/// A matched feature from one named source. Same shape as
/// [`ResolveResponse`] minus the source key, which the caller supplied.
#[derive(Debug, Clone, Serialize)]
pub struct FileFeatureResponse {
    /// Canonical display name of the match.
    pub neighborhood: String,
    /// Normalized GeoJSON feature.
    pub feature: Feature,
    /// Property bag of the matched record.
    pub properties: JsonObject,
    /// Male population.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub population_male: Option<f64>,
    /// Female population.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub population_female: Option<f64>,
    /// Total population.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub population_total: Option<f64>,
}

impl FileFeatureResponse {
    /// Flattens population figures into the response when present.
    #[must_use]
    pub fn with_population(mut self, figures: Option<PopulationFigures>) -> Self {
        if let Some(figures) = figures {
            self.population_male = Some(figures.male);
            self.population_female = Some(figures.female);
            self.population_total = Some(figures.total);
        }
        self
    }
}

impl From<ResolvedPlace> for FileFeatureResponse {
    fn from(place: ResolvedPlace) -> Self {
        Self {
            neighborhood: place.name,
            feature: place.feature,
            properties: place.properties,
            population_male: None,
            population_female: None,
            population_total: None,
        }
    }
}

/// Query parameters for the single-source sum endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct FileSumParams {
    /// Source key to scan.
    pub file: Option<String>,
    /// Name to match.
    pub neighborhood: Option<String>,
    /// Property name holding the group name.
    pub name_field: Option<String>,
    /// Property name holding the numeric value.
    pub value_field: Option<String>,
}

/// Query parameters for the single-source grouped-sum endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct FileSumsParams {
    /// Source key to scan.
    pub file: Option<String>,
    /// Property name holding the group name.
    pub name_field: Option<String>,
    /// Property name holding the numeric value.
    pub value_field: Option<String>,
}

/// Query parameters for the single-source population breakdown endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct FilePopulationParams {
    /// Source key to scan.
    pub file: Option<String>,
    /// Name to match.
    pub neighborhood: Option<String>,
    /// Property name holding the group name.
    pub name_field: Option<String>,
}

/// Sum of a numeric field over the features matching one name.
#[derive(Debug, Clone, Serialize)]
pub struct SourceSumResponse {
    /// The name that was matched.
    pub neighborhood: String,
    /// Number of features counted.
    pub feature_count: u64,
    /// Sum over the counted features.
    pub population_sum: f64,
}

impl From<SourceSum> for SourceSumResponse {
    fn from(sum: SourceSum) -> Self {
        Self {
            neighborhood: sum.name,
            feature_count: sum.feature_count,
            population_sum: sum.total,
        }
    }
}

impl From<LayerSum> for SourceSumResponse {
    fn from(sum: LayerSum) -> Self {
        Self {
            neighborhood: sum.name,
            feature_count: sum.feature_count,
            population_sum: sum.total,
        }
    }
}

/// One group row of a per-source grouped sum.
#[derive(Debug, Clone, Serialize)]
pub struct GroupSumEntry {
    /// Group name.
    pub neighborhood: String,
    /// Sum over the group.
    pub population_sum: f64,
}

impl From<NameSum> for GroupSumEntry {
    fn from(sum: NameSum) -> Self {
        Self {
            neighborhood: sum.name,
            population_sum: sum.total,
        }
    }
}

/// Response for the single-source grouped-sum endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct GroupSumResponse {
    /// Group rows, largest sum first.
    pub stats: Vec<GroupSumEntry>,
}

/// Male/female population split for one matched feature.
#[derive(Debug, Clone, Serialize)]
pub struct BreakdownResponse {
    /// Display name of the match.
    pub neighborhood: String,
    /// Male population.
    pub population_male: f64,
    /// Female population.
    pub population_female: f64,
    /// Total population.
    pub population_total: f64,
    /// Normalized GeoJSON feature.
    pub feature: Feature,
}

impl From<PopulationBreakdown> for BreakdownResponse {
    fn from(breakdown: PopulationBreakdown) -> Self {
        Self {
            neighborhood: breakdown.name,
            population_male: breakdown.male,
            population_female: breakdown.female,
            population_total: breakdown.total,
            feature: breakdown.feature,
        }
    }
}

/// Query parameters for the single-name layer stats endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct LayerStatsParams {
    /// Name to match on the layer.
    pub neighborhood: Option<String>,
    /// Layer endpoint override.
    pub layer_url: Option<String>,
    /// Layer attribute holding the name.
    pub neighborhood_field: Option<String>,
    /// Layer attribute holding the population value.
    pub population_field: Option<String>,
}

/// Query parameters for the grouped layer stats endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct LayerStatsAllParams {
    /// Layer endpoint override.
    pub layer_url: Option<String>,
    /// Layer attribute holding the name.
    pub neighborhood_field: Option<String>,
    /// Layer attribute holding the population value.
    pub population_field: Option<String>,
    /// Layer filter clause; defaults to selecting everything.
    #[serde(rename = "where")]
    pub where_clause: Option<String>,
}

/// One group row from the remote layer. Values pass through as the
/// layer returned them, including nulls.
#[derive(Debug, Clone, Serialize)]
pub struct LayerGroupEntry {
    /// Group name attribute value.
    pub neighborhood: Option<JsonValue>,
    /// Summed population attribute value.
    pub population_sum: Option<f64>,
}

impl From<LayerGroupSum> for LayerGroupEntry {
    fn from(sum: LayerGroupSum) -> Self {
        Self {
            neighborhood: sum.name,
            population_sum: sum.total,
        }
    }
}

/// Response for the grouped layer stats endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct LayerStatsResponse {
    /// Group rows, largest sum first.
    pub stats: Vec<LayerGroupEntry>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}
