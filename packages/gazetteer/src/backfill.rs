//! Polygon backfill for features that resolved without an areal boundary.
//!
//! Many point records share ids and names with polygon records elsewhere
//! in the catalog. Backfill collects the source feature's identifiers and
//! names, then scans the catalog in [`SourceKey::BACKFILL_ORDER`] for a
//! polygon-bearing record sharing any of them, so a city boundary wins
//! over the enclosing region's.

use std::collections::BTreeSet;

use atlas_map_gazetteer_models::SourceKey;
use geojson::{Feature, JsonObject};

use crate::catalog::SourceCatalog;
use crate::matching;
use crate::normalize;

/// Identifier keys shared across levels. Any of them may tie a point
/// record to a polygon record.
pub const ID_KEYS: &[&str] = &["city_id", "region_id", "district_id", "id"];

/// Name keys consulted for the name-based tie.
pub const NAME_KEYS: &[&str] = &["name_en", "name_ar", "name", "NAME", "EN_NAME"];

/// Finds a polygon feature elsewhere in the catalog matching the given
/// property bag by shared id or name. Returns `None` when nothing
/// polygon-bearing matches.
#[must_use]
pub fn find_polygon(catalog: &SourceCatalog, props: &JsonObject) -> Option<Feature> {
    let ids = id_set(props);
    let names = name_set(props);
    if ids.is_empty() && names.is_empty() {
        return None;
    }

    for key in SourceKey::BACKFILL_ORDER {
        let data = catalog.load(key);
        for raw in &data.records {
            let Some(candidate) = normalize::record_properties(raw) else {
                continue;
            };
            if !shares_identity(candidate, &ids, &names) {
                continue;
            }
            if !normalize::has_polygon(raw) {
                continue;
            }
            return normalize::normalize_feature(raw);
        }
    }
    None
}

fn shares_identity(
    candidate: &JsonObject,
    ids: &BTreeSet<String>,
    names: &BTreeSet<String>,
) -> bool {
    let id_match = ID_KEYS.iter().any(|key| {
        candidate
            .get(*key)
            .and_then(matching::value_to_string)
            .is_some_and(|id| ids.contains(&id))
    });
    id_match
        || NAME_KEYS.iter().any(|key| {
            candidate
                .get(*key)
                .and_then(matching::value_to_string)
                .is_some_and(|name| names.contains(&name.trim().to_lowercase()))
        })
}

fn id_set(props: &JsonObject) -> BTreeSet<String> {
    ID_KEYS
        .iter()
        .filter_map(|key| props.get(*key).and_then(matching::value_to_string))
        .filter(|id| !id.is_empty())
        .collect()
}

fn name_set(props: &JsonObject) -> BTreeSet<String> {
    NAME_KEYS
        .iter()
        .filter_map(|key| props.get(*key).and_then(matching::value_to_string))
        .map(|name| name.trim().to_lowercase())
        .filter(|name| !name.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use geojson::{Geometry, JsonValue, Value};
    use serde_json::json;

    use super::*;

    fn write_source(dir: &Path, key: SourceKey, content: &JsonValue) {
        let path = dir.join(key.relative_path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, serde_json::to_string(content).unwrap()).unwrap();
    }

    fn props(value: JsonValue) -> JsonObject {
        value.as_object().cloned().unwrap()
    }

    fn polygon_rings(feature: &Feature) -> &Vec<Vec<Vec<f64>>> {
        match &feature.geometry {
            Some(Geometry {
                value: Value::Polygon(rings),
                ..
            }) => rings,
            other => panic!("expected polygon, got {other:?}"),
        }
    }

    #[test]
    fn backfills_by_shared_id() {
        let dir = tempfile::tempdir().unwrap();
        write_source(
            dir.path(),
            SourceKey::GeoDistricts,
            &json!({"type": "FeatureCollection", "features": [{
                "type": "Feature",
                "properties": {"district_id": 9},
                "geometry": {"type": "Polygon", "coordinates": [[[46.0, 24.0], [46.1, 24.0], [46.1, 24.1], [46.0, 24.0]]]}
            }]}),
        );
        let catalog = SourceCatalog::new(dir.path());
        let found = find_polygon(&catalog, &props(json!({"district_id": "9"}))).unwrap();
        assert_eq!(polygon_rings(&found)[0][0], vec![46.0, 24.0]);
    }

    #[test]
    fn backfills_by_shared_name_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        write_source(
            dir.path(),
            SourceKey::GeoCities,
            &json!([{
                "name_en": "RIYADH",
                "boundaries": [[24.0, 46.0], [24.1, 46.1], [24.0, 46.0]]
            }]),
        );
        let catalog = SourceCatalog::new(dir.path());
        let found = find_polygon(&catalog, &props(json!({"name": "riyadh"}))).unwrap();
        assert_eq!(polygon_rings(&found)[0][0], vec![46.0, 24.0]);
    }

    #[test]
    fn city_polygons_win_over_region_polygons() {
        let dir = tempfile::tempdir().unwrap();
        write_source(
            dir.path(),
            SourceKey::GeoRegions,
            &json!([{
                "region_id": 1,
                "boundaries": [[20.0, 40.0], [30.0, 50.0], [20.0, 40.0]]
            }]),
        );
        write_source(
            dir.path(),
            SourceKey::GeoCities,
            &json!([{
                "region_id": 1,
                "boundaries": [[24.0, 46.0], [24.1, 46.1], [24.0, 46.0]]
            }]),
        );
        let catalog = SourceCatalog::new(dir.path());
        let found = find_polygon(&catalog, &props(json!({"region_id": 1}))).unwrap();
        assert_eq!(polygon_rings(&found)[0][0], vec![46.0, 24.0]);
    }

    #[test]
    fn point_only_candidates_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_source(
            dir.path(),
            SourceKey::GeoCities,
            &json!({"type": "FeatureCollection", "features": [{
                "type": "Feature",
                "properties": {"city_id": 3},
                "geometry": {"type": "Point", "coordinates": [46.6, 24.7]}
            }]}),
        );
        let catalog = SourceCatalog::new(dir.path());
        assert!(find_polygon(&catalog, &props(json!({"city_id": 3}))).is_none());
    }

    #[test]
    fn identity_free_bags_never_match() {
        let dir = tempfile::tempdir().unwrap();
        write_source(
            dir.path(),
            SourceKey::GeoCities,
            &json!([{"name": "Riyadh", "boundaries": [[24.0, 46.0], [24.1, 46.1]]}]),
        );
        let catalog = SourceCatalog::new(dir.path());
        assert!(find_polygon(&catalog, &props(json!({"note": "x"}))).is_none());
        assert!(find_polygon(&catalog, &props(json!({"name": "", "id": null}))).is_none());
    }

    #[test]
    fn numeric_and_string_ids_interoperate() {
        let dir = tempfile::tempdir().unwrap();
        write_source(
            dir.path(),
            SourceKey::GeoDistricts,
            &json!([{"id": "12", "boundaries": [[24.0, 46.0], [24.1, 46.1]]}]),
        );
        let catalog = SourceCatalog::new(dir.path());
        assert!(find_polygon(&catalog, &props(json!({"district_id": 12}))).is_some());
    }
}
