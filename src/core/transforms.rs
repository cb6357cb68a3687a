//! The fixed library of cleansing transforms
//!
//! Each transform is a total function over a [`FieldGroup`]: it takes the
//! group by value, deletes or rewrites fields whose value matches its
//! condition, and returns the group. None of them can fail, and none of
//! them ever adds a key.

use super::field::FieldGroup;
use regex::Regex;
use std::sync::OnceLock;

/// Matches values made up entirely of whitespace: tab, LF, VT, FF, CR
/// and space, plus NBSP, the Ogham space mark, the Mongolian vowel
/// separator, the U+2000..U+200A space separators, line/paragraph
/// separators, the narrow no-break and medium mathematical spaces, the
/// ideographic space and the BOM. The class is spelled out rather than
/// written as `\s` because `\s` also matches U+0085 (NEL), which is not
/// part of it.
fn whitespace_regex() -> &'static Regex {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    WHITESPACE.get_or_init(|| {
        Regex::new(
            r"^[\t\n\x0B\x0C\r \u{00A0}\u{1680}\u{180E}\u{2000}-\u{200A}\u{2028}\u{2029}\u{202F}\u{205F}\u{3000}\u{FEFF}]+$",
        )
        .unwrap()
    })
}

fn has_curly_brackets(value: &str) -> bool {
    value.starts_with('{') || value.ends_with('}')
}

/// Replace every value with its HTML-sanitized form.
///
/// Sanitization is delegated to [`ammonia`], which strips scripts and
/// unsafe markup while preserving benign tags.
pub fn sanitize_html(mut group: FieldGroup) -> FieldGroup {
    for value in group.values_mut() {
        *value = ammonia::clean(value);
    }
    group
}

/// Delete fields whose value consists only of whitespace characters.
pub fn remove_whitespace(mut group: FieldGroup) -> FieldGroup {
    group.retain(|_, value| !whitespace_regex().is_match(value));
    group
}

/// Delete fields whose value is empty.
pub fn remove_non_existent(mut group: FieldGroup) -> FieldGroup {
    group.retain(|_, value| !value.is_empty());
    group
}

/// Regex-escape values starting with `$`, defusing operator injection in
/// downstream MongoDB-style queries.
pub fn escape_dollar_sign(mut group: FieldGroup) -> FieldGroup {
    for value in group.values_mut() {
        if value.starts_with('$') {
            *value = regex::escape(value);
        }
    }
    group
}

/// Delete fields whose value starts with `$`.
pub fn remove_dollar_sign(mut group: FieldGroup) -> FieldGroup {
    group.retain(|_, value| !value.starts_with('$'));
    group
}

/// Regex-escape values starting with `{` or ending with `}`.
pub fn escape_curly_bracket(mut group: FieldGroup) -> FieldGroup {
    for value in group.values_mut() {
        if has_curly_brackets(value) {
            *value = regex::escape(value);
        }
    }
    group
}

/// Delete fields whose value starts with `{` or ends with `}`.
pub fn remove_curly_bracket(mut group: FieldGroup) -> FieldGroup {
    group.retain(|_, value| !has_curly_brackets(value));
    group
}

/// The identity transform, used as the default for every custom-sanitizer
/// slot.
pub fn original(group: FieldGroup) -> FieldGroup {
    group
}
