//! The per-field-group cleansing pipeline

use super::field::FieldGroup;
use super::policy::{FieldKind, ResolvedOptions, SpecialCharPolicy};
use super::transforms;

/// Run the cleansing pass sequence over one field group.
///
/// An empty group is returned unchanged. Otherwise the passes run in a
/// fixed order: generic HTML sanitization (when enabled for `kind`), the
/// generic custom sanitizer, the per-kind custom sanitizer, whitespace
/// removal, empty-value removal, then the dollar-sign and curly-bracket
/// policies. This routine never fails; option validation happened at
/// registration.
pub fn avert(group: FieldGroup, options: &ResolvedOptions, kind: FieldKind) -> FieldGroup {
    if group.is_empty() {
        return group;
    }

    let mut cleansed = group;

    if options.sanitize_enabled(kind) {
        cleansed = transforms::sanitize_html(cleansed);
    }

    cleansed = (options.generic_custom_sanitizer())(cleansed);
    cleansed = (options.custom_sanitizer(kind))(cleansed);

    if options.remove_whitespace {
        cleansed = transforms::remove_whitespace(cleansed);
    }
    if options.remove_non_existent {
        cleansed = transforms::remove_non_existent(cleansed);
    }

    cleansed = match options.dollar_sign {
        SpecialCharPolicy::Remove => transforms::remove_dollar_sign(cleansed),
        SpecialCharPolicy::Escape => transforms::escape_dollar_sign(cleansed),
        SpecialCharPolicy::None => cleansed,
    };
    cleansed = match options.curly_bracket {
        SpecialCharPolicy::Remove => transforms::remove_curly_bracket(cleansed),
        SpecialCharPolicy::Escape => transforms::escape_curly_bracket(cleansed),
        SpecialCharPolicy::None => cleansed,
    };

    cleansed
}
