//! Name and identifier matching against feature property bags.
//!
//! Reference files disagree on casing, key names, and separator
//! conventions, so matching runs in two tiers: exact comparison of
//! trimmed, lowercased values, then a loosened comparison with `-` and `_`
//! folded to spaces. Substring matching is reserved for autocomplete and
//! never used here.

use geojson::{JsonObject, JsonValue};

/// Property fields consulted when matching a display name, in order.
pub const DEFAULT_NAME_FIELDS: &[&str] = &[
    "name", "NAME", "Name", "name_en", "NAME_EN", "EN_NAME", "nameEn", "name_ar", "NAME_AR",
    "AR_NAME", "nameAr",
];

/// Narrower field list used by level resolution, where records are known
/// to carry bilingual name pairs.
pub const RESOLVE_NAME_FIELDS: &[&str] = &["name_en", "name_ar", "name", "NAME"];

/// Separators that join bilingual display labels, longest first so the
/// spaced variants win over the bare dashes they contain.
const LABEL_SEPARATORS: &[&str] = &[" \u{2014} ", " - ", " \u{2013} ", "\u{2014}", "\u{2013}"];

/// Takes the leading segment of a bilingual display label.
///
/// Suggestion lists render entries as `"<arabic> \u{2014} <english>"`; when
/// such a label comes back as a query, only the segment before the first
/// separator is matched.
#[must_use]
pub fn split_display_label(label: &str) -> &str {
    for separator in LABEL_SEPARATORS {
        if let Some((head, _)) = label.split_once(separator) {
            return head.trim();
        }
    }
    label
}

/// Renders a scalar property value as a string. Objects and arrays have
/// no sensible string form and yield `None`.
#[must_use]
pub fn value_to_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Whether a property value carries usable display content. Nulls, empty
/// strings, zeros, and `false` do not.
#[must_use]
pub fn has_value(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64() != Some(0.0),
        JsonValue::Array(_) | JsonValue::Object(_) => true,
    }
}

/// The first of `fields` present in `props` with usable content.
#[must_use]
pub fn first_value<'p>(props: &'p JsonObject, fields: &[&str]) -> Option<&'p JsonValue> {
    fields
        .iter()
        .find_map(|field| props.get(*field).filter(|value| has_value(value)))
}

/// Coerces a property value to a number. Strings holding numeric text are
/// accepted since several sources store coordinates and counts as text.
#[must_use]
pub fn numeric_value(value: &JsonValue) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

/// The first of `fields` whose value stringifies to something non-empty.
/// This is the shared identifier-extraction rule: `0` is a valid id,
/// `null` and `""` are not.
#[must_use]
pub fn property_id(props: &JsonObject, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|field| {
        props
            .get(*field)
            .and_then(value_to_string)
            .filter(|id| !id.is_empty())
    })
}

/// Whether the record's identifier equals `id`, comparing the stringified
/// forms so numeric and textual ids interoperate.
#[must_use]
pub fn matches_id(id: &str, props: &JsonObject, fields: &[&str]) -> bool {
    property_id(props, fields).is_some_and(|value| value == id)
}

fn fold(value: &str) -> String {
    value.trim().to_lowercase()
}

fn loosen(value: &str) -> String {
    value.replace(['-', '_'], " ")
}

/// Whether any of the record's name fields matches `query`.
///
/// Tier one compares trimmed, lowercased values; tier two additionally
/// folds `-` and `_` to spaces on both sides, so `"Al-Noor"` matches
/// `"al noor"` and `"AL_NOOR"`. Bilingual labels are split before
/// matching.
#[must_use]
pub fn matches_name(query: &str, props: &JsonObject, fields: &[&str]) -> bool {
    let needle = fold(split_display_label(query));
    if needle.is_empty() {
        return false;
    }

    let candidates: Vec<String> = fields
        .iter()
        .filter_map(|field| props.get(*field).and_then(value_to_string))
        .map(|value| fold(&value))
        .filter(|value| !value.is_empty())
        .collect();

    if candidates.iter().any(|candidate| *candidate == needle) {
        return true;
    }

    let loose_needle = loosen(&needle);
    candidates
        .iter()
        .any(|candidate| loosen(candidate) == loose_needle)
}
