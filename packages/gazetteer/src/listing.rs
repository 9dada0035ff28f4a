//! Dropdown listings: compact id/name summaries of every unit at one
//! level, optionally filtered to a parent unit.

use atlas_map_gazetteer_models::{AdminLevel, PlaceSummary, SourceKey};
use geojson::JsonObject;

use crate::catalog::SourceCatalog;
use crate::matching;
use crate::normalize;
use crate::resolve;

/// English name fields for summaries, most specific first.
const SUMMARY_NAME_EN: &[&str] = &["name_en", "NAME_EN", "name", "NAME"];

/// Arabic name fields for summaries.
const SUMMARY_NAME_AR: &[&str] = &["name_ar", "NAME_AR", "name", "NAME"];

/// Every region as a summary, de-duplicated by id and name. Region
/// sources often repeat one region per constituent boundary, so
/// duplicates are the norm rather than the exception.
#[must_use]
pub fn list_regions(catalog: &SourceCatalog) -> Vec<PlaceSummary> {
    let mut seen = std::collections::BTreeSet::new();
    level_summaries(catalog, AdminLevel::Region)
        .into_iter()
        .filter(|summary| {
            let id = summary
                .id
                .as_ref()
                .and_then(matching::value_to_string)
                .unwrap_or_default();
            let name = summary
                .name_en
                .as_ref()
                .or(summary.name_ar.as_ref())
                .and_then(matching::value_to_string)
                .unwrap_or_default();
            seen.insert((id, name))
        })
        .collect()
}

/// Every city as a summary, optionally restricted to one region given by
/// id or name. An unresolvable region name yields an empty list.
#[must_use]
pub fn list_cities(
    catalog: &SourceCatalog,
    region_id: Option<&str>,
    region_name: Option<&str>,
) -> Vec<PlaceSummary> {
    scoped_summaries(catalog, AdminLevel::City, region_id, region_name)
}

/// Every district as a summary, optionally restricted to one city.
#[must_use]
pub fn list_districts(
    catalog: &SourceCatalog,
    city_id: Option<&str>,
    city_name: Option<&str>,
) -> Vec<PlaceSummary> {
    scoped_summaries(catalog, AdminLevel::District, city_id, city_name)
}

fn scoped_summaries(
    catalog: &SourceCatalog,
    level: AdminLevel,
    parent_id: Option<&str>,
    parent_name: Option<&str>,
) -> Vec<PlaceSummary> {
    let Some(parent) = level.parent() else {
        return level_summaries(catalog, level);
    };

    let scope: Option<String> = if let Some(id) = parent_id {
        Some(id.to_string())
    } else if let Some(name) = parent_name {
        match resolve::resolve_scope_id(catalog, parent, name) {
            Some(id) => Some(id),
            None => return Vec::new(),
        }
    } else {
        None
    };

    let summaries = level_summaries(catalog, level);
    let Some(scope_id) = scope else {
        return summaries;
    };
    summaries
        .into_iter()
        .filter(|summary| {
            matching::property_id(&summary.props, &[parent.id_field()])
                .is_some_and(|id| id == scope_id)
        })
        .collect()
}

/// Raw summaries for one level. The JSON source is preferred since it
/// carries clean ids without geometry baggage; the GeoJSON source backs
/// it up when the JSON file is missing or empty.
fn level_summaries(catalog: &SourceCatalog, level: AdminLevel) -> Vec<PlaceSummary> {
    // for_level is ordered geometry-first, so iterate it backwards.
    for key in SourceKey::for_level(level).iter().rev() {
        let data = catalog.load(*key);
        if data.is_empty() {
            continue;
        }
        return data
            .records
            .iter()
            .filter_map(|raw| {
                normalize::record_properties(raw).map(|props| summarize(level, props))
            })
            .collect();
    }
    Vec::new()
}

fn summarize(level: AdminLevel, props: &JsonObject) -> PlaceSummary {
    // The level's own id field first, or a record carrying both its own
    // and its parent's id would list under the parent's. Zero is a valid
    // id, so only null counts as absent.
    let id = [level.id_field(), "id"]
        .iter()
        .find_map(|field| props.get(*field).filter(|value| !value.is_null()))
        .cloned();
    PlaceSummary {
        id,
        name_en: matching::first_value(props, SUMMARY_NAME_EN).cloned(),
        name_ar: matching::first_value(props, SUMMARY_NAME_AR).cloned(),
        props: props.clone(),
    }
}
