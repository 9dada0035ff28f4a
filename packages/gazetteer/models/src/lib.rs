#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Core vocabulary for the atlas-map gazetteer: the closed allow-list of
//! reference sources, the administrative levels they cover, and the result
//! types produced by resolution and search.

use geojson::{Feature, JsonObject, JsonValue};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Administrative level of a reference source or query.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AdminLevel {
    Region,
    City,
    District,
}

impl AdminLevel {
    /// The level one step up the administrative hierarchy, if any.
    #[must_use]
    pub const fn parent(self) -> Option<Self> {
        match self {
            Self::Region => None,
            Self::City => Some(Self::Region),
            Self::District => Some(Self::City),
        }
    }

    /// Property key holding this level's own identifier.
    #[must_use]
    pub const fn id_field(self) -> &'static str {
        match self {
            Self::Region => "region_id",
            Self::City => "city_id",
            Self::District => "district_id",
        }
    }

    /// Property keys that mark a record as belonging to a level below this
    /// one. A record carrying one of these shares an ancestor's id without
    /// being the ancestor itself.
    #[must_use]
    pub const fn child_id_fields(self) -> &'static [&'static str] {
        match self {
            Self::Region => &["city_id", "district_id"],
            Self::City => &["district_id"],
            Self::District => &[],
        }
    }

    /// Whether a point geometry resolved at this level should be upgraded
    /// to a polygon when one can be found elsewhere in the catalog. City
    /// points are deliberate center markers and are kept as-is.
    #[must_use]
    pub const fn upgrades_points(self) -> bool {
        !matches!(self, Self::City)
    }
}

/// Allow-listed reference sources. Nothing outside this enum is ever read
/// from disk, so client-supplied file keys cannot escape the data
/// directory.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SourceKey {
    GeoRegions,
    GeoCities,
    GeoDistricts,
    JsonRegions,
    JsonCities,
    JsonDistricts,
}

impl SourceKey {
    /// Every source in catalog order. Corpus-wide scans visit sources in
    /// this order, so it is part of the fallback-matching contract.
    pub const ALL: [Self; 6] = [
        Self::GeoRegions,
        Self::GeoCities,
        Self::GeoDistricts,
        Self::JsonRegions,
        Self::JsonCities,
        Self::JsonDistricts,
    ];

    /// Scan order for polygon backfill: city sources, then district, then
    /// region, so the smallest enclosing boundary wins.
    pub const BACKFILL_ORDER: [Self; 6] = [
        Self::GeoCities,
        Self::JsonCities,
        Self::GeoDistricts,
        Self::JsonDistricts,
        Self::GeoRegions,
        Self::JsonRegions,
    ];

    /// The administrative level this source covers.
    #[must_use]
    pub const fn level(self) -> AdminLevel {
        match self {
            Self::GeoRegions | Self::JsonRegions => AdminLevel::Region,
            Self::GeoCities | Self::JsonCities => AdminLevel::City,
            Self::GeoDistricts | Self::JsonDistricts => AdminLevel::District,
        }
    }

    /// Sources for one level, geometry-bearing files first.
    #[must_use]
    pub const fn for_level(level: AdminLevel) -> &'static [Self] {
        match level {
            AdminLevel::Region => &[Self::GeoRegions, Self::JsonRegions],
            AdminLevel::City => &[Self::GeoCities, Self::JsonCities],
            AdminLevel::District => &[Self::GeoDistricts, Self::JsonDistricts],
        }
    }

    /// Path of the backing file relative to the data directory.
    #[must_use]
    pub const fn relative_path(self) -> &'static str {
        match self {
            Self::GeoRegions => "geojson/regions.geojson",
            Self::GeoCities => "geojson/cities.geojson",
            Self::GeoDistricts => "geojson/districts.geojson",
            Self::JsonRegions => "json/regions.json",
            Self::JsonCities => "json/cities.json",
            Self::JsonDistricts => "json/districts.json",
        }
    }
}

/// A level-resolution query: an id or a display name, optionally scoped to
/// a parent administrative unit by id or by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceQuery {
    pub id: Option<String>,
    pub name: Option<String>,
    pub scope_id: Option<String>,
    pub scope_name: Option<String>,
}

impl PlaceQuery {
    /// A query matching by id or name, with no parent scope.
    #[must_use]
    pub fn new(id: Option<String>, name: Option<String>) -> Self {
        Self {
            id,
            name,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.id.is_none() && self.name.is_none()
    }
}

/// A successfully resolved place: the source it came from, its canonical
/// display name, the normalized feature, and the property bag the match
/// was made against.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedPlace {
    pub file_key: SourceKey,
    pub name: String,
    pub feature: Feature,
    pub properties: JsonObject,
}

/// One autocomplete candidate. Property values are passed through
/// untouched, so ids keep whatever JSON type the source used.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub file_key: SourceKey,
    pub id: Option<JsonValue>,
    pub name_en: Option<JsonValue>,
    pub name_ar: Option<JsonValue>,
    pub props: JsonObject,
}

/// A dropdown entry for one administrative unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceSummary {
    pub id: Option<JsonValue>,
    pub name_en: Option<JsonValue>,
    pub name_ar: Option<JsonValue>,
    #[serde(skip)]
    pub props: JsonObject,
}

/// Aggregated value for one group of a grouped-sum query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NameSum {
    pub name: String,
    pub total: f64,
}

/// Sum over every feature in one source matching a single name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceSum {
    pub name: String,
    pub feature_count: u64,
    pub total: f64,
}

/// Male/female population split for one matched feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopulationBreakdown {
    pub name: String,
    pub male: f64,
    pub female: f64,
    pub total: f64,
    pub feature: Feature,
}
