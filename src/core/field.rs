//! Field groups: the string-keyed value mappings carried by a request

use indexmap::IndexMap;
use serde_json::Value;

/// One of the three string-keyed mappings carried by a request:
/// query parameters, path parameters, or the payload.
///
/// Insertion order is preserved so that a re-encoded query string keeps
/// the order the client sent; the cleansing passes themselves never
/// depend on key order.
pub type FieldGroup = IndexMap<String, String>;

/// Extract the string-valued top-level members of a JSON object into a
/// field group.
///
/// Non-string members are not part of the cleansing domain and are left
/// for [`write_back_json`] to carry through untouched.
pub fn string_fields(object: &serde_json::Map<String, Value>) -> FieldGroup {
    object
        .iter()
        .filter_map(|(key, value)| {
            value
                .as_str()
                .map(|s| (key.clone(), s.to_string()))
        })
        .collect()
}

/// Write a cleansed field group back into the JSON object it was
/// extracted from.
///
/// Keys present in `before` but missing from `group` were deleted by the
/// pipeline and are removed from the object; surviving keys get their
/// (possibly rewritten) string value, and keys a custom sanitizer added
/// are inserted. Members that never entered the group are untouched.
pub fn write_back_json(
    object: &mut serde_json::Map<String, Value>,
    before: &FieldGroup,
    group: &FieldGroup,
) {
    for key in before.keys() {
        if group.get(key).is_none() {
            object.remove(key);
        }
    }
    for (key, value) in group {
        object.insert(key.clone(), Value::String(value.clone()));
    }
}
