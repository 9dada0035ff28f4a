//! Normalization of heterogeneous reference records into canonical
//! GeoJSON features.
//!
//! Sources range from well-formed FeatureCollections to bare JSON rows
//! holding boundary rings under ad-hoc keys. Everything is funneled into
//! [`geojson::Feature`] so downstream code sees one shape. Raw boundary
//! rings are stored `[lat, lon]` and are swapped to GeoJSON's
//! `[lon, lat]` axis order during conversion.

use geojson::{Feature, Geometry, JsonObject, JsonValue, Value};

use crate::matching;

/// Keys that may hold raw boundary-ring data, probed in order on the
/// record and then on its property bag.
pub const BOUNDARY_KEYS: &[&str] = &[
    "boundaries",
    "boundary",
    "coordinates",
    "coords",
    "polygons",
    "shape",
];

/// Views a record's property bag: the `properties` member when it is an
/// object, otherwise the record object itself.
#[must_use]
pub fn record_properties(raw: &JsonValue) -> Option<&JsonObject> {
    let record = raw.as_object()?;
    match record.get("properties") {
        Some(JsonValue::Object(properties)) => Some(properties),
        _ => Some(record),
    }
}

/// Converts one raw record into a canonical feature.
///
/// Well-formed GeoJSON features pass through typed parsing unchanged.
/// Records with a parsable `geometry` member keep it; otherwise the
/// boundary keys are probed and the first hit is converted into a
/// `Polygon` with axes swapped. Records with no usable geometry still
/// yield a feature, just without one. Only non-object records yield
/// `None`.
#[must_use]
pub fn normalize_feature(raw: &JsonValue) -> Option<Feature> {
    let record = raw.as_object()?;

    if record.get("type").and_then(JsonValue::as_str) == Some("Feature")
        && record.get("geometry").is_some_and(JsonValue::is_object)
    {
        if let Ok(feature) = Feature::try_from(record.clone()) {
            return Some(feature);
        }
        // Unparsable geometry under a Feature wrapper is treated as
        // absent and the record re-enters the generic path.
    }

    let properties = record_bag(record);

    if let Some(JsonValue::Object(geometry)) = record.get("geometry") {
        match Geometry::try_from(geometry.clone()) {
            Ok(geometry) => return Some(feature_with(properties, Some(geometry))),
            Err(error) => log::debug!("Ignoring unparsable geometry object: {error}"),
        }
    }

    let geometry = boundary_rings(record, &properties)
        .map(|rings| Geometry::new(Value::Polygon(rings)));
    Some(feature_with(properties, geometry))
}

/// Whether the feature's geometry is a bare point.
#[must_use]
pub fn is_point(feature: &Feature) -> bool {
    feature
        .geometry
        .as_ref()
        .is_some_and(|geometry| matches!(geometry.value, Value::Point(_)))
}

/// Whether a raw record carries polygonal geometry, either as a typed
/// `Polygon`/`MultiPolygon` (possibly inside a `GeometryCollection`) or
/// as raw boundary rings awaiting conversion.
#[must_use]
pub fn has_polygon(raw: &JsonValue) -> bool {
    let Some(record) = raw.as_object() else {
        return false;
    };
    if let Some(JsonValue::Object(geometry)) = record.get("geometry") {
        if geometry_is_polygonal(geometry) {
            return true;
        }
    }
    record_properties(raw).is_some_and(|props| {
        BOUNDARY_KEYS.iter().any(|key| {
            props
                .get(*key)
                .and_then(JsonValue::as_array)
                .is_some_and(|items| !items.is_empty())
        })
    })
}

fn geometry_is_polygonal(geometry: &JsonObject) -> bool {
    match geometry.get("type").and_then(JsonValue::as_str) {
        Some("Polygon" | "MultiPolygon") => true,
        Some("GeometryCollection") => geometry
            .get("geometries")
            .and_then(JsonValue::as_array)
            .is_some_and(|members| {
                members.iter().any(|member| {
                    matches!(
                        member.get("type").and_then(JsonValue::as_str),
                        Some("Polygon" | "MultiPolygon")
                    )
                })
            }),
        _ => false,
    }
}

/// Owned property bag for a normalized feature: the `properties` member
/// when it is an object, otherwise the record itself minus any
/// `geometry` member.
fn record_bag(record: &JsonObject) -> JsonObject {
    match record.get("properties") {
        Some(JsonValue::Object(properties)) => properties.clone(),
        _ => record
            .iter()
            .filter(|(key, _)| key.as_str() != "geometry")
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
    }
}

/// Probes the boundary keys for ring data, scanning every key on the
/// record before any on the property bag. Values that are not non-empty
/// arrays fall through to later keys; the first non-empty array found
/// is converted into polygon rings.
fn boundary_rings(record: &JsonObject, properties: &JsonObject) -> Option<Vec<Vec<Vec<f64>>>> {
    let items = [record, properties].into_iter().find_map(|bag| {
        BOUNDARY_KEYS.iter().find_map(|key| {
            let items = bag.get(*key)?.as_array()?;
            if items.is_empty() { None } else { Some(items) }
        })
    })?;

    let rings: Vec<Vec<Vec<f64>>> = if is_ring_list(items) {
        items
            .iter()
            .filter_map(JsonValue::as_array)
            .map(|ring| convert_ring(ring))
            .filter(|ring| !ring.is_empty())
            .collect()
    } else {
        std::iter::once(convert_ring(items))
            .filter(|ring| !ring.is_empty())
            .collect()
    };

    if rings.is_empty() { None } else { Some(rings) }
}

/// A list of rings rather than a single ring of points: the first element
/// is itself a list whose first element is a list.
fn is_ring_list(items: &[JsonValue]) -> bool {
    items
        .first()
        .and_then(JsonValue::as_array)
        .is_some_and(|first| first.first().is_some_and(JsonValue::is_array))
}

/// Converts one `[lat, lon]` ring into GeoJSON `[lon, lat]` positions,
/// skipping malformed points rather than rejecting the whole ring.
fn convert_ring(points: &[JsonValue]) -> Vec<Vec<f64>> {
    points
        .iter()
        .filter_map(|point| {
            let pair = point.as_array()?;
            let lat = pair.first().and_then(matching::numeric_value)?;
            let lon = pair.get(1).and_then(matching::numeric_value)?;
            Some(vec![lon, lat])
        })
        .collect()
}

fn feature_with(properties: JsonObject, geometry: Option<Geometry>) -> Feature {
    Feature {
        bbox: None,
        geometry,
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn polygon_coords(feature: &Feature) -> Vec<Vec<Vec<f64>>> {
        match &feature.geometry {
            Some(Geometry {
                value: Value::Polygon(rings),
                ..
            }) => rings.clone(),
            other => panic!("expected polygon, got {other:?}"),
        }
    }

    #[test]
    fn well_formed_features_pass_through() {
        let raw = json!({
            "type": "Feature",
            "properties": {"name": "Olaya"},
            "geometry": {"type": "Point", "coordinates": [46.6753, 24.7136]}
        });
        let feature = normalize_feature(&raw).unwrap();
        assert!(is_point(&feature));
        assert_eq!(
            feature.properties.unwrap().get("name"),
            Some(&json!("Olaya"))
        );
    }

    #[test]
    fn typed_geometry_without_feature_wrapper_is_kept() {
        let raw = json!({
            "name": "Olaya",
            "geometry": {"type": "Point", "coordinates": [46.0, 24.0]}
        });
        let feature = normalize_feature(&raw).unwrap();
        assert!(is_point(&feature));
        // The bag record keeps its own fields as properties, minus the
        // geometry member.
        let props = feature.properties.unwrap();
        assert_eq!(props.get("name"), Some(&json!("Olaya")));
        assert!(!props.contains_key("geometry"));
    }

    #[test]
    fn single_ring_boundaries_become_a_polygon_with_swapped_axes() {
        let raw = json!({
            "name": "Al Noor",
            "boundaries": [[24.0, 46.0], [24.1, 46.1], [24.2, 46.0], [24.0, 46.0]]
        });
        let feature = normalize_feature(&raw).unwrap();
        let rings = polygon_coords(&feature);
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0][0], vec![46.0, 24.0]);
        assert_eq!(rings[0][1], vec![46.1, 24.1]);
    }

    #[test]
    fn axis_swap_is_an_involution() {
        let original = [[24.0, 46.0], [24.5, 46.5], [25.0, 47.0]];
        let raw = json!({"boundaries": original});
        let rings = polygon_coords(&normalize_feature(&raw).unwrap());
        let swapped_back: Vec<Vec<f64>> = rings[0]
            .iter()
            .map(|position| vec![position[1], position[0]])
            .collect();
        let expected: Vec<Vec<f64>> = original.iter().map(|p| p.to_vec()).collect();
        assert_eq!(swapped_back, expected);
    }

    #[test]
    fn ring_lists_become_multi_ring_polygons() {
        let raw = json!({
            "boundaries": [
                [[24.0, 46.0], [24.1, 46.1], [24.0, 46.0]],
                [[24.02, 46.02], [24.03, 46.03], [24.02, 46.02]]
            ]
        });
        let rings = polygon_coords(&normalize_feature(&raw).unwrap());
        assert_eq!(rings.len(), 2);
        assert_eq!(rings[1][0], vec![46.02, 24.02]);
    }

    #[test]
    fn boundary_keys_are_probed_on_the_property_bag_too() {
        let raw = json!({
            "properties": {"name": "Olaya", "coords": [[24.0, 46.0], [24.1, 46.1]]}
        });
        let rings = polygon_coords(&normalize_feature(&raw).unwrap());
        assert_eq!(rings[0][0], vec![46.0, 24.0]);
    }

    #[test]
    fn malformed_points_are_skipped() {
        let raw = json!({
            "boundaries": [[24.0, 46.0], ["x"], [24.2], 7, [24.1, 46.1]]
        });
        let rings = polygon_coords(&normalize_feature(&raw).unwrap());
        assert_eq!(rings[0], vec![vec![46.0, 24.0], vec![46.1, 24.1]]);
    }

    #[test]
    fn numeric_string_points_are_accepted() {
        let raw = json!({"boundaries": [["24.0", "46.0"], ["24.1", "46.1"]]});
        let rings = polygon_coords(&normalize_feature(&raw).unwrap());
        assert_eq!(rings[0][0], vec![46.0, 24.0]);
    }

    #[test]
    fn empty_or_unusable_boundaries_leave_geometry_absent() {
        for raw in [
            json!({"name": "Olaya", "boundaries": []}),
            json!({"name": "Olaya", "boundaries": "not rings"}),
            json!({"name": "Olaya", "boundaries": [["x", "y"]]}),
            json!({"name": "Olaya"}),
        ] {
            let feature = normalize_feature(&raw).unwrap();
            assert!(feature.geometry.is_none(), "raw: {raw}");
        }
    }

    #[test]
    fn unusable_boundary_values_fall_through_to_later_keys() {
        // `boundaries` comes first in the probe order; a non-array or
        // empty value there does not mask ring data under `coords`.
        for raw in [
            json!({"boundaries": "garbage", "coords": [[24.0, 46.0], [24.1, 46.1]]}),
            json!({"boundaries": [], "coords": [[24.0, 46.0], [24.1, 46.1]]}),
        ] {
            let rings = polygon_coords(&normalize_feature(&raw).unwrap());
            assert_eq!(rings[0][0], vec![46.0, 24.0], "raw: {raw}");
        }
    }

    #[test]
    fn record_keys_are_exhausted_before_the_property_bag() {
        // `boundaries` outranks `coords` within one bag, but the record
        // pass completes before the property bag is consulted.
        let raw = json!({
            "coords": [[24.0, 46.0], [24.1, 46.1]],
            "properties": {"boundaries": [[10.0, 20.0], [10.1, 20.1]]}
        });
        let rings = polygon_coords(&normalize_feature(&raw).unwrap());
        assert_eq!(rings[0][0], vec![46.0, 24.0]);
    }

    #[test]
    fn invalid_geometry_object_falls_back_to_boundary_keys() {
        let raw = json!({
            "geometry": {"type": "Mystery", "coordinates": []},
            "boundaries": [[24.0, 46.0], [24.1, 46.1]]
        });
        let rings = polygon_coords(&normalize_feature(&raw).unwrap());
        assert_eq!(rings[0][0], vec![46.0, 24.0]);
    }

    #[test]
    fn non_object_records_are_rejected() {
        assert!(normalize_feature(&json!("Olaya")).is_none());
        assert!(normalize_feature(&json!([1, 2])).is_none());
        assert!(normalize_feature(&json!(null)).is_none());
    }

    #[test]
    fn record_properties_prefers_the_properties_member() {
        let raw = json!({"properties": {"name": "a"}, "name": "b"});
        assert_eq!(
            record_properties(&raw).unwrap().get("name"),
            Some(&json!("a"))
        );
        let bare = json!({"name": "b"});
        assert_eq!(
            record_properties(&bare).unwrap().get("name"),
            Some(&json!("b"))
        );
        assert!(record_properties(&json!(42)).is_none());
    }

    #[test]
    fn has_polygon_accepts_typed_and_raw_boundaries() {
        assert!(has_polygon(&json!({
            "geometry": {"type": "Polygon", "coordinates": []}
        })));
        assert!(has_polygon(&json!({
            "geometry": {"type": "GeometryCollection", "geometries": [
                {"type": "Point", "coordinates": [0.0, 0.0]},
                {"type": "MultiPolygon", "coordinates": []}
            ]}
        })));
        assert!(has_polygon(&json!({
            "properties": {"boundaries": [[24.0, 46.0]]}
        })));
        assert!(!has_polygon(&json!({
            "geometry": {"type": "Point", "coordinates": [0.0, 0.0]}
        })));
        assert!(!has_polygon(&json!({"properties": {"boundaries": []}})));
        assert!(!has_polygon(&json!("Olaya")));
    }
}
