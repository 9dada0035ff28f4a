//! Reference-source catalog: loading, top-level shape normalization, and
//! the per-source cache.
//!
//! Sources are read lazily on first use and held in memory until
//! [`SourceCatalog::invalidate`] is called. A source that is missing or
//! unreadable degrades to an empty record list, so one bad file never
//! takes queries against the rest of the catalog down with it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use atlas_map_gazetteer_models::SourceKey;
use geojson::{JsonObject, JsonValue};

use crate::CatalogError;

/// Wrapper keys probed when a top-level object is not itself a
/// FeatureCollection.
const WRAPPER_KEYS: &[&str] = &["data", "rows", "items"];

/// Parsed contents of one reference source: raw records, one per feature,
/// in file order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SourceData {
    pub records: Vec<JsonValue>,
}

impl SourceData {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// The closed set of reference sources under one data directory.
pub struct SourceCatalog {
    base_dir: PathBuf,
    cache: RwLock<BTreeMap<SourceKey, Arc<SourceData>>>,
}

impl SourceCatalog {
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            cache: RwLock::new(BTreeMap::new()),
        }
    }

    /// Absolute path of one source's backing file.
    #[must_use]
    pub fn source_path(&self, key: SourceKey) -> PathBuf {
        self.base_dir.join(key.relative_path())
    }

    /// Returns one source's records, reading and caching them on first
    /// use. Never fails: unreadable or malformed sources are logged and
    /// served as empty.
    ///
    /// # Panics
    ///
    /// Panics if the cache lock is poisoned.
    #[must_use]
    pub fn load(&self, key: SourceKey) -> Arc<SourceData> {
        if let Some(data) = self
            .cache
            .read()
            .expect("source cache lock poisoned")
            .get(&key)
        {
            return Arc::clone(data);
        }

        let data = Arc::new(self.read_source(key).unwrap_or_else(|error| {
            log::warn!("Failed to load source {key}: {error}");
            SourceData::default()
        }));

        // Two threads may race to fill the same entry; both produce the
        // same content, so last writer wins.
        self.cache
            .write()
            .expect("source cache lock poisoned")
            .insert(key, Arc::clone(&data));
        data
    }

    /// Drops every cached source so the next access re-reads from disk.
    ///
    /// # Panics
    ///
    /// Panics if the cache lock is poisoned.
    pub fn invalidate(&self) {
        self.cache
            .write()
            .expect("source cache lock poisoned")
            .clear();
    }

    fn read_source(&self, key: SourceKey) -> Result<SourceData, CatalogError> {
        let path = self.source_path(key);
        if !path.is_file() {
            log::debug!("Source {key} has no file at {path:?}, serving empty");
            return Ok(SourceData::default());
        }
        let text = std::fs::read_to_string(&path)?;
        let raw: JsonValue = serde_json::from_str(&text)?;
        let records = collect_records(raw);
        log::debug!("Loaded {} records from {path:?}", records.len());
        Ok(SourceData { records })
    }
}

/// Extracts the record list from whatever top-level shape a source file
/// uses: a bare array, a FeatureCollection (or any object with a
/// `features` array), a wrapper object (`data`/`rows`/`items`), an object
/// whose first array-of-objects value is the list, or a single
/// feature-shaped object. Anything else yields no records.
fn collect_records(raw: JsonValue) -> Vec<JsonValue> {
    let mut object = match raw {
        JsonValue::Array(items) => return items,
        JsonValue::Object(object) => object,
        _ => return Vec::new(),
    };

    if let Some(items) = take_array(&mut object, "features") {
        return items;
    }
    for key in WRAPPER_KEYS {
        if let Some(items) = take_array(&mut object, key) {
            return items;
        }
    }

    let list_key = object
        .iter()
        .find(|(_, value)| is_record_list(value))
        .map(|(key, _)| key.clone());
    if let Some(key) = list_key {
        if let Some(JsonValue::Array(items)) = object.remove(&key) {
            return items;
        }
    }

    if object.contains_key("properties") || object.contains_key("geometry") {
        return vec![JsonValue::Object(object)];
    }
    Vec::new()
}

/// Removes and returns `key` only when it holds an array, leaving
/// non-array values in place for the later probes.
fn take_array(object: &mut JsonObject, key: &str) -> Option<Vec<JsonValue>> {
    if !matches!(object.get(key), Some(JsonValue::Array(_))) {
        return None;
    }
    match object.remove(key) {
        Some(JsonValue::Array(items)) => Some(items),
        _ => None,
    }
}

/// A non-empty array made entirely of objects.
fn is_record_list(value: &JsonValue) -> bool {
    match value {
        JsonValue::Array(items) => !items.is_empty() && items.iter().all(JsonValue::is_object),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;

    use super::*;

    fn write_source(dir: &Path, key: SourceKey, content: &JsonValue) {
        let path = dir.join(key.relative_path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, serde_json::to_string(content).unwrap()).unwrap();
    }

    #[test]
    fn feature_collections_yield_their_features() {
        let raw = json!({
            "type": "FeatureCollection",
            "features": [{"properties": {"name": "a"}}, {"properties": {"name": "b"}}]
        });
        assert_eq!(collect_records(raw).len(), 2);
    }

    #[test]
    fn bare_arrays_are_taken_as_is() {
        let raw = json!([{"name": "a"}, {"name": "b"}, {"name": "c"}]);
        assert_eq!(collect_records(raw).len(), 3);
    }

    #[test]
    fn wrapper_objects_are_unwrapped() {
        for key in ["data", "rows", "items"] {
            let raw = json!({key: [{"name": "a"}]});
            assert_eq!(collect_records(raw).len(), 1, "wrapper key {key}");
        }
    }

    #[test]
    fn features_key_wins_over_wrapper_keys() {
        let raw = json!({
            "data": [{"name": "wrapped"}],
            "features": [{"name": "a"}, {"name": "b"}]
        });
        let records = collect_records(raw);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("name"), Some(&json!("a")));
    }

    #[test]
    fn first_array_of_objects_value_is_the_list() {
        let raw = json!({
            "count": 2,
            "regions": [{"name": "a"}, {"name": "b"}],
            "note": "x"
        });
        assert_eq!(collect_records(raw).len(), 2);
    }

    #[test]
    fn arrays_of_non_objects_are_not_record_lists() {
        let raw = json!({"ids": [1, 2, 3]});
        assert!(collect_records(raw).is_empty());
    }

    #[test]
    fn single_feature_objects_become_one_record() {
        let raw = json!({"properties": {"name": "a"}});
        assert_eq!(collect_records(raw).len(), 1);
        let raw = json!({"geometry": {"type": "Point", "coordinates": [0.0, 0.0]}});
        assert_eq!(collect_records(raw).len(), 1);
    }

    #[test]
    fn unrecognized_shapes_yield_no_records() {
        assert!(collect_records(json!({"note": "nothing here"})).is_empty());
        assert!(collect_records(json!("text")).is_empty());
        assert!(collect_records(json!(17)).is_empty());
    }

    #[test]
    fn non_array_features_key_does_not_block_other_probes() {
        let raw = json!({"features": "broken", "rows": [{"name": "a"}]});
        assert_eq!(collect_records(raw).len(), 1);
    }

    #[test]
    fn missing_files_serve_empty() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = SourceCatalog::new(dir.path());
        assert!(catalog.load(SourceKey::GeoRegions).is_empty());
    }

    #[test]
    fn malformed_files_serve_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SourceKey::GeoRegions.relative_path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "{not json").unwrap();
        let catalog = SourceCatalog::new(dir.path());
        assert!(catalog.load(SourceKey::GeoRegions).is_empty());
    }

    #[test]
    fn sources_are_cached_until_invalidated() {
        let dir = tempfile::tempdir().unwrap();
        write_source(
            dir.path(),
            SourceKey::JsonCities,
            &json!([{"city_id": 1, "name_en": "Riyadh"}]),
        );
        let catalog = SourceCatalog::new(dir.path());
        assert_eq!(catalog.load(SourceKey::JsonCities).records.len(), 1);

        write_source(
            dir.path(),
            SourceKey::JsonCities,
            &json!([{"city_id": 1}, {"city_id": 2}]),
        );
        // Still the cached single record.
        assert_eq!(catalog.load(SourceKey::JsonCities).records.len(), 1);

        catalog.invalidate();
        assert_eq!(catalog.load(SourceKey::JsonCities).records.len(), 2);
    }

    #[test]
    fn each_source_resolves_under_the_base_directory() {
        let catalog = SourceCatalog::new("/srv/atlas");
        assert_eq!(
            catalog.source_path(SourceKey::GeoDistricts),
            Path::new("/srv/atlas/geojson/districts.geojson")
        );
        assert_eq!(
            catalog.source_path(SourceKey::JsonRegions),
            Path::new("/srv/atlas/json/regions.json")
        );
    }
}
