//! Corpus-wide search: single-feature lookup, autocomplete suggestions,
//! and aggregation over source properties.

use std::collections::BTreeMap;

use atlas_map_gazetteer_models::{
    NameSum, PlaceQuery, PopulationBreakdown, ResolvedPlace, SourceKey, SourceSum, Suggestion,
};
use geojson::{JsonObject, JsonValue};

use crate::backfill;
use crate::catalog::SourceCatalog;
use crate::matching;
use crate::normalize;
use crate::resolve;

/// Fields probed for a suggestion's id, in order. Presence wins even
/// when the value is null, so callers can tell "id field present but
/// empty" from "no id field at all".
const SUGGEST_ID_FIELDS: &[&str] = &["id", "city_id", "region_id", "district_id"];

/// Finds the first record in one source whose name matches `query`.
#[must_use]
pub fn find_in_source(
    catalog: &SourceCatalog,
    key: SourceKey,
    query: &str,
    fields: &[&str],
) -> Option<JsonValue> {
    let data = catalog.load(key);
    data.records
        .iter()
        .find(|raw| {
            normalize::record_properties(raw)
                .is_some_and(|props| matching::matches_name(query, props, fields))
        })
        .cloned()
}

/// Resolves the first match in one source to a place: the feature is
/// normalized, point geometry is upgraded to a polygon when one exists
/// elsewhere, and the canonical name is attached.
#[must_use]
pub fn resolve_in_source(
    catalog: &SourceCatalog,
    key: SourceKey,
    query: &str,
    fields: &[&str],
) -> Option<ResolvedPlace> {
    let raw = find_in_source(catalog, key, query, fields)?;
    let mut feature = normalize::normalize_feature(&raw)?;
    let properties = feature.properties.clone().unwrap_or_default();
    if normalize::is_point(&feature) {
        if let Some(polygon) = backfill::find_polygon(catalog, &properties) {
            feature = polygon;
        }
    }
    let name = resolve::canonical_name(
        &properties,
        &PlaceQuery::new(None, Some(query.to_string())),
    );
    Some(ResolvedPlace {
        file_key: key,
        name,
        feature,
        properties,
    })
}

/// Searches every source in catalog order and returns the first
/// resolved match.
#[must_use]
pub fn search_corpus(
    catalog: &SourceCatalog,
    query: &str,
    fields: &[&str],
) -> Option<ResolvedPlace> {
    SourceKey::ALL
        .into_iter()
        .find_map(|key| resolve_in_source(catalog, key, query, fields))
}

/// Collects up to `limit` suggestions whose name fields contain `query`
/// case-insensitively. This is the only substring matching in the
/// crate; resolution stays exact.
#[must_use]
pub fn suggest(catalog: &SourceCatalog, query: &str, limit: usize) -> Vec<Suggestion> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    let mut suggestions = Vec::new();
    for key in SourceKey::ALL {
        let data = catalog.load(key);
        for raw in &data.records {
            let Some(props) = normalize::record_properties(raw) else {
                continue;
            };
            let hit = matching::DEFAULT_NAME_FIELDS
                .iter()
                .filter_map(|field| props.get(*field).and_then(matching::value_to_string))
                .any(|value| value.trim().to_lowercase().contains(&needle));
            if !hit {
                continue;
            }
            suggestions.push(build_suggestion(key, props));
            if suggestions.len() >= limit {
                return suggestions;
            }
        }
    }
    suggestions
}

/// Groups every record in one source by a name field and sums a numeric
/// field per group. Groups are returned largest first; ties keep
/// alphabetical order. Records with no usable name are skipped and
/// non-numeric values count as zero.
#[must_use]
pub fn group_sum(
    catalog: &SourceCatalog,
    key: SourceKey,
    name_field: &str,
    value_field: &str,
) -> Vec<NameSum> {
    let data = catalog.load(key);
    let mut groups: BTreeMap<String, f64> = BTreeMap::new();
    for raw in &data.records {
        let Some(props) = normalize::record_properties(raw) else {
            continue;
        };
        let Some(name) = matching::first_value(props, &[name_field, "NAME", "name", "EN_NAME"])
            .and_then(matching::value_to_string)
        else {
            continue;
        };
        let value = matching::first_value(props, &[value_field, "POP", "pop"])
            .and_then(matching::numeric_value)
            .unwrap_or(0.0);
        *groups.entry(name).or_insert(0.0) += value;
    }

    let mut sums: Vec<NameSum> = groups
        .into_iter()
        .map(|(name, total)| NameSum { name, total })
        .collect();
    sums.sort_by(|a, b| b.total.total_cmp(&a.total));
    sums
}

/// Sums a numeric field over every record in one source matching `name`.
/// Records whose value is missing or non-numeric are left out of the
/// count entirely.
#[must_use]
pub fn sum_for_name(
    catalog: &SourceCatalog,
    key: SourceKey,
    name_field: &str,
    name: &str,
    value_field: &str,
) -> SourceSum {
    let name_fields = field_variants(name_field);
    let name_refs: Vec<&str> = name_fields.iter().map(String::as_str).collect();
    let value_upper = value_field.to_uppercase();
    let value_fields = [value_field, value_upper.as_str(), "POP", "pop"];

    let data = catalog.load(key);
    let mut total = 0.0;
    let mut feature_count = 0u64;
    for raw in &data.records {
        let Some(props) = normalize::record_properties(raw) else {
            continue;
        };
        if !matching::matches_name(name, props, &name_refs) {
            continue;
        }
        if let Some(value) =
            matching::first_value(props, &value_fields).and_then(matching::numeric_value)
        {
            total += value;
            feature_count += 1;
        }
    }
    SourceSum {
        name: name.to_string(),
        feature_count,
        total,
    }
}

/// Male/female population split for the first record in one source
/// matching `name`.
#[must_use]
pub fn population_breakdown(
    catalog: &SourceCatalog,
    key: SourceKey,
    name_field: &str,
    name: &str,
) -> Option<PopulationBreakdown> {
    let name_fields = field_variants(name_field);
    let name_refs: Vec<&str> = name_fields.iter().map(String::as_str).collect();

    let data = catalog.load(key);
    let raw = data.records.iter().find(|raw| {
        normalize::record_properties(raw)
            .is_some_and(|props| matching::matches_name(name, props, &name_refs))
    })?;

    let feature = normalize::normalize_feature(raw)?;
    let props = feature.properties.clone().unwrap_or_default();
    let male = matching::first_value(&props, &["POP_M", "pop_m"])
        .and_then(matching::numeric_value)
        .unwrap_or(0.0);
    let female = matching::first_value(&props, &["POP_F", "pop_f"])
        .and_then(matching::numeric_value)
        .unwrap_or(0.0);
    let display = matching::first_value(&props, &["EN_NAME", "NAME"])
        .and_then(matching::value_to_string)
        .unwrap_or_else(|| name.to_string());

    Some(PopulationBreakdown {
        name: display,
        male,
        female,
        total: male + female,
        feature,
    })
}

fn build_suggestion(key: SourceKey, props: &JsonObject) -> Suggestion {
    let id = SUGGEST_ID_FIELDS
        .iter()
        .find_map(|field| props.get(*field))
        .cloned();
    Suggestion {
        file_key: key,
        id,
        name_en: matching::first_value(props, &["name_en", "NAME", "name"]).cloned(),
        name_ar: matching::first_value(props, &["name_ar", "NAME", "name"]).cloned(),
        props: props.clone(),
    }
}

/// Case variants of a caller-supplied field name plus the common
/// fallbacks, so `name_field=en_name` still hits `EN_NAME` columns.
fn field_variants(field: &str) -> Vec<String> {
    vec![
        field.to_string(),
        field.to_uppercase(),
        field.to_lowercase(),
        "NAME".to_string(),
        "name".to_string(),
        "EN_NAME".to_string(),
        "en_name".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use geojson::Value;
    use serde_json::json;

    use super::*;

    fn write_source(dir: &Path, key: SourceKey, content: &JsonValue) {
        let path = dir.join(key.relative_path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, serde_json::to_string(content).unwrap()).unwrap();
    }

    #[test]
    fn find_in_source_uses_the_caller_fields() {
        let dir = tempfile::tempdir().unwrap();
        write_source(
            dir.path(),
            SourceKey::GeoDistricts,
            &json!([{"DISTRICT": "Olaya", "name": "something else"}]),
        );
        let catalog = SourceCatalog::new(dir.path());
        assert!(find_in_source(&catalog, SourceKey::GeoDistricts, "olaya", &["DISTRICT"]).is_some());
        assert!(
            find_in_source(
                &catalog,
                SourceKey::GeoDistricts,
                "olaya",
                matching::DEFAULT_NAME_FIELDS
            )
            .is_none()
        );
    }

    #[test]
    fn resolve_in_source_normalizes_and_stays_inside_the_source() {
        let dir = tempfile::tempdir().unwrap();
        write_source(
            dir.path(),
            SourceKey::JsonDistricts,
            &json!([{
                "district_id": 9,
                "name_en": "Olaya",
                "boundaries": [[24.7, 46.6], [24.8, 46.7], [24.6, 46.7], [24.7, 46.6]]
            }]),
        );
        let catalog = SourceCatalog::new(dir.path());
        let place = resolve_in_source(
            &catalog,
            SourceKey::JsonDistricts,
            "olaya",
            matching::DEFAULT_NAME_FIELDS,
        )
        .unwrap();
        assert_eq!(place.file_key, SourceKey::JsonDistricts);
        assert_eq!(place.name, "Olaya");
        assert!(matches!(
            place.feature.geometry.as_ref().map(|g| &g.value),
            Some(Value::Polygon(_))
        ));

        assert!(
            resolve_in_source(
                &catalog,
                SourceKey::GeoRegions,
                "olaya",
                matching::DEFAULT_NAME_FIELDS
            )
            .is_none()
        );
    }

    #[test]
    fn corpus_search_visits_sources_in_catalog_order() {
        let dir = tempfile::tempdir().unwrap();
        write_source(
            dir.path(),
            SourceKey::GeoRegions,
            &json!([{"name": "Asir", "region_id": 1}]),
        );
        write_source(
            dir.path(),
            SourceKey::GeoCities,
            &json!([{"name": "Asir", "city_id": 2}]),
        );
        let catalog = SourceCatalog::new(dir.path());
        let place = search_corpus(&catalog, "Asir", matching::DEFAULT_NAME_FIELDS).unwrap();
        assert_eq!(place.file_key, SourceKey::GeoRegions);
        assert_eq!(place.name, "Asir");
    }

    #[test]
    fn corpus_search_upgrades_points() {
        let dir = tempfile::tempdir().unwrap();
        write_source(
            dir.path(),
            SourceKey::GeoCities,
            &json!({"type": "FeatureCollection", "features": [{
                "type": "Feature",
                "properties": {"city_id": 7, "name_en": "Abha"},
                "geometry": {"type": "Point", "coordinates": [42.5, 18.2]}
            }]}),
        );
        write_source(
            dir.path(),
            SourceKey::GeoDistricts,
            &json!([{"city_id": 7, "boundaries": [[18.0, 42.0], [18.5, 42.9], [18.0, 42.0]]}]),
        );
        let catalog = SourceCatalog::new(dir.path());
        let place = search_corpus(&catalog, "Abha", matching::DEFAULT_NAME_FIELDS).unwrap();
        assert!(matches!(
            place.feature.geometry.as_ref().map(|g| &g.value),
            Some(Value::Polygon(_))
        ));
    }

    #[test]
    fn suggestions_match_substrings_up_to_the_limit() {
        let dir = tempfile::tempdir().unwrap();
        write_source(
            dir.path(),
            SourceKey::JsonCities,
            &json!([
                {"city_id": 1, "name_en": "Riyadh"},
                {"city_id": 2, "name_en": "Riyadh Al Khabra"},
                {"city_id": 3, "name_en": "Jeddah"}
            ]),
        );
        let catalog = SourceCatalog::new(dir.path());

        let all = suggest(&catalog, "riyadh", 50);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name_en, Some(json!("Riyadh")));

        let limited = suggest(&catalog, "riyadh", 1);
        assert_eq!(limited.len(), 1);

        assert!(suggest(&catalog, "   ", 50).is_empty());
    }

    #[test]
    fn suggestion_ids_are_probed_by_presence() {
        let dir = tempfile::tempdir().unwrap();
        write_source(
            dir.path(),
            SourceKey::JsonDistricts,
            &json!([
                {"id": null, "district_id": 4, "name_en": "Olaya"},
                {"district_id": 5, "name_en": "Olaya West"}
            ]),
        );
        let catalog = SourceCatalog::new(dir.path());
        let suggestions = suggest(&catalog, "olaya", 50);
        // `id` is present on the first record, so its null wins over the
        // populated district_id.
        assert_eq!(suggestions[0].id, Some(json!(null)));
        assert_eq!(suggestions[1].id, Some(json!(5)));
    }

    #[test]
    fn group_sums_are_sorted_descending_with_deterministic_ties() {
        let dir = tempfile::tempdir().unwrap();
        write_source(
            dir.path(),
            SourceKey::GeoDistricts,
            &json!([
                {"NAME": "Olaya", "POP": 100},
                {"NAME": "Olaya", "POP": 50},
                {"NAME": "Corniche", "POP": 200},
                {"NAME": "Aziziya", "POP": 150},
                {"NAME": "Badr", "POP": 150}
            ]),
        );
        let catalog = SourceCatalog::new(dir.path());
        let sums = group_sum(&catalog, SourceKey::GeoDistricts, "NAME", "POP");
        let names: Vec<&str> = sums.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Corniche", "Aziziya", "Badr", "Olaya"]);
        assert_eq!(sums[3].total, 150.0);
    }

    #[test]
    fn group_sum_skips_nameless_records_and_zeroes_bad_values() {
        let dir = tempfile::tempdir().unwrap();
        write_source(
            dir.path(),
            SourceKey::GeoDistricts,
            &json!([
                {"POP": 100},
                {"NAME": "Olaya", "POP": "n/a"},
                {"NAME": "Olaya", "POP": "25"}
            ]),
        );
        let catalog = SourceCatalog::new(dir.path());
        let sums = group_sum(&catalog, SourceKey::GeoDistricts, "NAME", "POP");
        assert_eq!(sums.len(), 1);
        assert_eq!(sums[0].total, 25.0);
    }

    #[test]
    fn sum_for_name_counts_only_numeric_matches() {
        let dir = tempfile::tempdir().unwrap();
        write_source(
            dir.path(),
            SourceKey::GeoDistricts,
            &json!([
                {"NAME": "Olaya", "POP": 100},
                {"NAME": "Olaya", "POP": "50"},
                {"NAME": "Olaya", "POP": "n/a"},
                {"NAME": "Corniche", "POP": 999}
            ]),
        );
        let catalog = SourceCatalog::new(dir.path());
        let sum = sum_for_name(&catalog, SourceKey::GeoDistricts, "NAME", "olaya", "POP");
        assert_eq!(sum.feature_count, 2);
        assert_eq!(sum.total, 150.0);
        assert_eq!(sum.name, "olaya");
    }

    #[test]
    fn sum_for_name_accepts_case_variant_fields() {
        let dir = tempfile::tempdir().unwrap();
        write_source(
            dir.path(),
            SourceKey::GeoDistricts,
            &json!([{"EN_NAME": "Olaya", "pop": 30}]),
        );
        let catalog = SourceCatalog::new(dir.path());
        let sum = sum_for_name(&catalog, SourceKey::GeoDistricts, "en_name", "Olaya", "POP");
        assert_eq!(sum.feature_count, 1);
        assert_eq!(sum.total, 30.0);
    }

    #[test]
    fn population_breakdown_splits_and_totals() {
        let dir = tempfile::tempdir().unwrap();
        write_source(
            dir.path(),
            SourceKey::GeoDistricts,
            &json!({"type": "FeatureCollection", "features": [{
                "type": "Feature",
                "properties": {"EN_NAME": "Olaya", "POP_M": 120, "POP_F": "80"},
                "geometry": {"type": "Point", "coordinates": [46.6, 24.7]}
            }]}),
        );
        let catalog = SourceCatalog::new(dir.path());
        let breakdown =
            population_breakdown(&catalog, SourceKey::GeoDistricts, "EN_NAME", "olaya").unwrap();
        assert_eq!(breakdown.name, "Olaya");
        assert_eq!(breakdown.male, 120.0);
        assert_eq!(breakdown.female, 80.0);
        assert_eq!(breakdown.total, 200.0);

        assert!(population_breakdown(&catalog, SourceKey::GeoDistricts, "EN_NAME", "x").is_none());
    }
}
