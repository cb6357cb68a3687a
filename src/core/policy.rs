//! Per-request option resolution
//!
//! Three layers feed one immutable [`ResolvedOptions`], highest priority
//! last: built-in defaults (every flag false, every sanitizer slot the
//! identity), the global [`AvertConfig`] supplied at registration, and the
//! per-route [`RoutePolicy`] override. The route-level disabled sentinel
//! short-circuits resolution entirely.

use super::field::FieldGroup;
use super::transforms;
use crate::config::{AvertConfig, RoutePolicy};
use std::fmt;
use std::sync::Arc;

/// A caller-supplied transform over a whole field group.
///
/// Slots default to [`transforms::original`]. The pipeline owns the group
/// for the duration of one request, so sanitizers take it by value and
/// hand it back.
pub type CustomSanitizer = Arc<dyn Fn(FieldGroup) -> FieldGroup + Send + Sync>;

/// The identity slot value.
pub fn identity_sanitizer() -> CustomSanitizer {
    Arc::new(transforms::original)
}

/// Which of the three request field groups a pipeline run is cleansing.
///
/// Selects the HTML-sanitization enable flag and the per-kind custom
/// sanitizer slot. The payload group keeps the `Payload` name even though
/// hosts commonly call it the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Query,
    Params,
    Payload,
}

/// How fields carrying `$`- or `{}`-shaped values are handled.
///
/// `Remove` wins over `Escape` when the configuration sets both flags of
/// a pair; the total order is Remove > Escape > None.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpecialCharPolicy {
    #[default]
    None,
    Escape,
    Remove,
}

impl SpecialCharPolicy {
    /// Collapse a remove/escape flag pair into one policy.
    pub fn from_flags(remove: bool, escape: bool) -> Self {
        if remove {
            SpecialCharPolicy::Remove
        } else if escape {
            SpecialCharPolicy::Escape
        } else {
            SpecialCharPolicy::None
        }
    }
}

/// The flag and slot set a single request is cleansed with.
///
/// Immutable once resolved; each request gets its own copy and nothing is
/// written back to shared route state.
#[derive(Clone)]
pub struct ResolvedOptions {
    pub remove_whitespace: bool,
    pub remove_non_existent: bool,
    pub dollar_sign: SpecialCharPolicy,
    pub curly_bracket: SpecialCharPolicy,
    avert_query: bool,
    avert_params: bool,
    avert_payload: bool,
    generic_custom_sanitizer: CustomSanitizer,
    query_custom_sanitizer: CustomSanitizer,
    param_custom_sanitizer: CustomSanitizer,
    payload_custom_sanitizer: CustomSanitizer,
}

impl ResolvedOptions {
    /// Merge the global configuration with a route's policy.
    ///
    /// Returns `None` for [`RoutePolicy::Disabled`]: the pipeline is
    /// bypassed for that route and the request's field groups pass
    /// through unmodified.
    pub fn resolve(global: &AvertConfig, route: &RoutePolicy) -> Option<Self> {
        let overrides = match route {
            RoutePolicy::Disabled => return None,
            RoutePolicy::Inherit => None,
            RoutePolicy::Override(overrides) => Some(overrides),
        };

        let flag = |route_value: Option<bool>, global_value: bool| {
            route_value.unwrap_or(global_value)
        };
        let slot = |route_slot: &Option<CustomSanitizer>, global_slot: &CustomSanitizer| {
            route_slot.as_ref().unwrap_or(global_slot).clone()
        };

        let (remove_dollar, escape_dollar, remove_curly, escape_curly);
        let resolved = match overrides {
            Some(o) => {
                remove_dollar = flag(o.remove_dollar_sign, global.remove_dollar_sign);
                escape_dollar = flag(o.escape_dollar_sign, global.escape_dollar_sign);
                remove_curly = flag(o.remove_curly_bracket, global.remove_curly_bracket);
                escape_curly = flag(o.escape_curly_bracket, global.escape_curly_bracket);
                ResolvedOptions {
                    remove_whitespace: flag(o.remove_whitespace, global.remove_whitespace),
                    remove_non_existent: flag(o.remove_non_existent, global.remove_non_existent),
                    dollar_sign: SpecialCharPolicy::from_flags(remove_dollar, escape_dollar),
                    curly_bracket: SpecialCharPolicy::from_flags(remove_curly, escape_curly),
                    avert_query: flag(o.avert_query, global.avert_query),
                    avert_params: flag(o.avert_params, global.avert_params),
                    avert_payload: flag(o.avert_payload, global.avert_payload),
                    generic_custom_sanitizer: slot(
                        &o.generic_custom_sanitizer,
                        &global.generic_custom_sanitizer,
                    ),
                    query_custom_sanitizer: slot(
                        &o.query_custom_sanitizer,
                        &global.query_custom_sanitizer,
                    ),
                    param_custom_sanitizer: slot(
                        &o.param_custom_sanitizer,
                        &global.param_custom_sanitizer,
                    ),
                    payload_custom_sanitizer: slot(
                        &o.payload_custom_sanitizer,
                        &global.payload_custom_sanitizer,
                    ),
                }
            }
            None => ResolvedOptions {
                remove_whitespace: global.remove_whitespace,
                remove_non_existent: global.remove_non_existent,
                dollar_sign: SpecialCharPolicy::from_flags(
                    global.remove_dollar_sign,
                    global.escape_dollar_sign,
                ),
                curly_bracket: SpecialCharPolicy::from_flags(
                    global.remove_curly_bracket,
                    global.escape_curly_bracket,
                ),
                avert_query: global.avert_query,
                avert_params: global.avert_params,
                avert_payload: global.avert_payload,
                generic_custom_sanitizer: global.generic_custom_sanitizer.clone(),
                query_custom_sanitizer: global.query_custom_sanitizer.clone(),
                param_custom_sanitizer: global.param_custom_sanitizer.clone(),
                payload_custom_sanitizer: global.payload_custom_sanitizer.clone(),
            },
        };

        Some(resolved)
    }

    /// Whether generic HTML sanitization is enabled for this field-group
    /// kind.
    pub fn sanitize_enabled(&self, kind: FieldKind) -> bool {
        match kind {
            FieldKind::Query => self.avert_query,
            FieldKind::Params => self.avert_params,
            FieldKind::Payload => self.avert_payload,
        }
    }

    /// The generic custom sanitizer, applied to every field-group kind.
    pub fn generic_custom_sanitizer(&self) -> &CustomSanitizer {
        &self.generic_custom_sanitizer
    }

    /// The per-kind custom sanitizer slot.
    pub fn custom_sanitizer(&self, kind: FieldKind) -> &CustomSanitizer {
        match kind {
            FieldKind::Query => &self.query_custom_sanitizer,
            FieldKind::Params => &self.param_custom_sanitizer,
            FieldKind::Payload => &self.payload_custom_sanitizer,
        }
    }
}

impl fmt::Debug for ResolvedOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedOptions")
            .field("remove_whitespace", &self.remove_whitespace)
            .field("remove_non_existent", &self.remove_non_existent)
            .field("dollar_sign", &self.dollar_sign)
            .field("curly_bracket", &self.curly_bracket)
            .field("avert_query", &self.avert_query)
            .field("avert_params", &self.avert_params)
            .field("avert_payload", &self.avert_payload)
            .finish_non_exhaustive()
    }
}
