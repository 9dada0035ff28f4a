//! Level-scoped resolution of administrative units by id or name.
//!
//! Resolution searches the level's own sources first, then falls back to
//! the whole catalog. Parent scopes filter strictly by id: a record that
//! cannot prove it belongs to the requested parent is skipped, and a
//! scope given by name is resolved to an id before filtering so name
//! spelling never weakens the filter.

use atlas_map_gazetteer_models::{AdminLevel, PlaceQuery, ResolvedPlace, SourceKey};
use geojson::{Feature, Geometry, JsonObject, JsonValue, Value};

use crate::backfill;
use crate::catalog::SourceCatalog;
use crate::matching;
use crate::normalize;

/// Resolves a region by id or name.
#[must_use]
pub fn resolve_region(catalog: &SourceCatalog, query: &PlaceQuery) -> Option<ResolvedPlace> {
    resolve_level(catalog, AdminLevel::Region, query)
}

/// Resolves a city by id or name, optionally scoped to a region.
#[must_use]
pub fn resolve_city(catalog: &SourceCatalog, query: &PlaceQuery) -> Option<ResolvedPlace> {
    resolve_level(catalog, AdminLevel::City, query)
}

/// Resolves a district by id or name, optionally scoped to a city.
#[must_use]
pub fn resolve_district(catalog: &SourceCatalog, query: &PlaceQuery) -> Option<ResolvedPlace> {
    resolve_level(catalog, AdminLevel::District, query)
}

/// Resolves one administrative unit at the given level.
///
/// The level's own sources are searched in order first. When they miss,
/// the whole catalog is scanned; records carrying a child-level id
/// share an ancestor's identifiers without being the ancestor itself,
/// so they are held in reserve and returned only when nothing better
/// matches.
#[must_use]
pub fn resolve_level(
    catalog: &SourceCatalog,
    level: AdminLevel,
    query: &PlaceQuery,
) -> Option<ResolvedPlace> {
    if query.is_empty() {
        return None;
    }

    let scope: Option<String> = if let Some(id) = &query.scope_id {
        Some(id.clone())
    } else if let Some(name) = &query.scope_name {
        Some(resolve_scope_id(catalog, level.parent()?, name)?)
    } else {
        None
    };

    for key in SourceKey::for_level(level) {
        let data = catalog.load(*key);
        for raw in &data.records {
            let Some(props) = normalize::record_properties(raw) else {
                continue;
            };
            if !record_matches(level, query, props) {
                continue;
            }
            if !scope_matches(level, scope.as_deref(), props) {
                continue;
            }
            return build_place(catalog, level, *key, raw, query);
        }
    }

    let mut reserve: Option<(SourceKey, JsonValue)> = None;
    for key in SourceKey::ALL {
        let data = catalog.load(key);
        for raw in &data.records {
            let Some(props) = normalize::record_properties(raw) else {
                continue;
            };
            if !record_matches(level, query, props) {
                continue;
            }
            if !scope_matches(level, scope.as_deref(), props) {
                continue;
            }
            if carries_child_id(level, props) {
                if reserve.is_none() {
                    reserve = Some((key, raw.clone()));
                }
                continue;
            }
            return build_place(catalog, level, key, raw, query);
        }
    }

    let (key, raw) = reserve?;
    build_place(catalog, level, key, &raw, query)
}

/// Every district feature belonging to one city, identified by id or
/// name. An unresolvable city yields an empty list rather than an
/// error, so callers can always serve a collection.
#[must_use]
pub fn districts_of_city(catalog: &SourceCatalog, query: &PlaceQuery) -> Vec<Feature> {
    let Some(city_id) = query.id.clone().or_else(|| {
        query
            .name
            .as_deref()
            .and_then(|name| resolve_scope_id(catalog, AdminLevel::City, name))
    }) else {
        return Vec::new();
    };

    let mut features = Vec::new();
    for key in SourceKey::for_level(AdminLevel::District) {
        let data = catalog.load(*key);
        for raw in &data.records {
            let Some(props) = normalize::record_properties(raw) else {
                continue;
            };
            if !matching::matches_id(&city_id, props, &["city_id", "city"]) {
                continue;
            }
            if let Some(feature) = normalize::normalize_feature(raw) {
                features.push(feature);
            }
        }
    }
    features
}

/// Resolves a unit by name at `parent` level and extracts its id, so
/// child queries can filter strictly by identifier.
pub(crate) fn resolve_scope_id(
    catalog: &SourceCatalog,
    parent: AdminLevel,
    name: &str,
) -> Option<String> {
    let place = resolve_level(catalog, parent, &PlaceQuery::new(None, Some(name.to_string())))?;
    matching::property_id(&place.properties, &[parent.id_field(), "id"])
}

/// The canonical display name for a resolved place: English name, then
/// Arabic, then whatever the caller queried by.
pub(crate) fn canonical_name(props: &JsonObject, query: &PlaceQuery) -> String {
    matching::first_value(props, &["name_en", "name_ar"])
        .and_then(matching::value_to_string)
        .or_else(|| query.name.clone())
        .or_else(|| query.id.clone())
        .unwrap_or_default()
}

fn record_matches(level: AdminLevel, query: &PlaceQuery, props: &JsonObject) -> bool {
    if let Some(id) = &query.id {
        if matching::matches_id(id, props, &[level.id_field(), "id"]) {
            return true;
        }
    }
    query
        .name
        .as_ref()
        .is_some_and(|name| matching::matches_name(name, props, matching::RESOLVE_NAME_FIELDS))
}

fn scope_matches(level: AdminLevel, scope: Option<&str>, props: &JsonObject) -> bool {
    let Some(scope_id) = scope else {
        return true;
    };
    let Some(parent) = level.parent() else {
        return true;
    };
    // A record without the parent field cannot prove it belongs.
    matching::property_id(props, &[parent.id_field()]).is_some_and(|id| id == scope_id)
}

fn carries_child_id(level: AdminLevel, props: &JsonObject) -> bool {
    level
        .child_id_fields()
        .iter()
        .any(|field| props.contains_key(*field))
}

fn build_place(
    catalog: &SourceCatalog,
    level: AdminLevel,
    key: SourceKey,
    raw: &JsonValue,
    query: &PlaceQuery,
) -> Option<ResolvedPlace> {
    let mut feature = normalize::normalize_feature(raw)?;
    let properties = feature.properties.clone().unwrap_or_default();

    // Point geometries at region and district level are placeholders for
    // a boundary that lives elsewhere in the catalog. City points are
    // deliberate center markers and are kept.
    if level.upgrades_points() && normalize::is_point(&feature) {
        if let Some(polygon) = backfill::find_polygon(catalog, &properties) {
            feature = polygon;
        }
    }

    if level == AdminLevel::City && feature.geometry.is_none() {
        feature.geometry = center_geometry(&properties);
    }

    Some(ResolvedPlace {
        file_key: key,
        name: canonical_name(&properties, query),
        feature,
        properties,
    })
}

/// Synthesizes a center point for a city record without geometry. The
/// `center` pair is stored `[lat, lon]`; explicit `latitude`/`longitude`
/// fields are the fallback.
fn center_geometry(props: &JsonObject) -> Option<Geometry> {
    let (lat, lon) = match props.get("center") {
        Some(JsonValue::Array(center)) if center.len() >= 2 => (
            matching::numeric_value(&center[0])?,
            matching::numeric_value(&center[1])?,
        ),
        _ => (
            props.get("latitude").and_then(matching::numeric_value)?,
            props.get("longitude").and_then(matching::numeric_value)?,
        ),
    };
    Some(Geometry::new(Value::Point(vec![lon, lat])))
}
