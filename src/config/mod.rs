//! Configuration loading and validation
//!
//! The global configuration is validated against the enumerated option
//! schema when it is built from YAML or JSON: unknown keys and wrongly
//! typed values are fatal registration errors, so an interceptor is never
//! installed with an invalid configuration. Boolean flags use the
//! camelCase names of the external interface (`removeWhitespace`,
//! `avertQuery`, ...); custom-sanitizer slots are functions and can only
//! be supplied through the builder methods.

use crate::core::error::ConfigError;
use crate::core::field::FieldGroup;
use crate::core::policy::{identity_sanitizer, CustomSanitizer};
use anyhow::Result;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

/// Global cleansing configuration, supplied once at registration
///
/// # Example
///
/// ```ignore
/// let config = AvertConfig::new()
///     .remove_non_existent(true)
///     .escape_dollar_sign(true)
///     .with_query_sanitizer(|group| group);
/// let app = Router::new().layer(AvertLayer::new(config));
/// ```
#[derive(Clone, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct AvertConfig {
    pub remove_whitespace: bool,
    pub remove_non_existent: bool,
    pub remove_dollar_sign: bool,
    pub escape_dollar_sign: bool,
    pub remove_curly_bracket: bool,
    pub escape_curly_bracket: bool,
    pub avert_query: bool,
    pub avert_params: bool,
    pub avert_payload: bool,

    #[serde(skip_deserializing, default = "identity_sanitizer")]
    pub generic_custom_sanitizer: CustomSanitizer,
    #[serde(skip_deserializing, default = "identity_sanitizer")]
    pub query_custom_sanitizer: CustomSanitizer,
    #[serde(skip_deserializing, default = "identity_sanitizer")]
    pub param_custom_sanitizer: CustomSanitizer,
    #[serde(skip_deserializing, default = "identity_sanitizer")]
    pub payload_custom_sanitizer: CustomSanitizer,
}

impl Default for AvertConfig {
    fn default() -> Self {
        Self {
            remove_whitespace: false,
            remove_non_existent: false,
            remove_dollar_sign: false,
            escape_dollar_sign: false,
            remove_curly_bracket: false,
            escape_curly_bracket: false,
            avert_query: false,
            avert_params: false,
            avert_payload: false,
            generic_custom_sanitizer: identity_sanitizer(),
            query_custom_sanitizer: identity_sanitizer(),
            param_custom_sanitizer: identity_sanitizer(),
            payload_custom_sanitizer: identity_sanitizer(),
        }
    }
}

impl AvertConfig {
    /// Create a configuration with every flag off and every slot the
    /// identity. Registering with this is valid and leaves requests
    /// untouched.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and validate a configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml)
            .map_err(|e| ConfigError::from_serde_message(e.to_string()))
    }

    /// Load and validate a configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&content)?;
        Ok(config)
    }

    /// Validate a configuration supplied as a JSON value
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        serde_json::from_value(value)
            .map_err(|e| ConfigError::from_serde_message(e.to_string()))
    }

    pub fn remove_whitespace(mut self, enabled: bool) -> Self {
        self.remove_whitespace = enabled;
        self
    }

    pub fn remove_non_existent(mut self, enabled: bool) -> Self {
        self.remove_non_existent = enabled;
        self
    }

    pub fn remove_dollar_sign(mut self, enabled: bool) -> Self {
        self.remove_dollar_sign = enabled;
        self
    }

    pub fn escape_dollar_sign(mut self, enabled: bool) -> Self {
        self.escape_dollar_sign = enabled;
        self
    }

    pub fn remove_curly_bracket(mut self, enabled: bool) -> Self {
        self.remove_curly_bracket = enabled;
        self
    }

    pub fn escape_curly_bracket(mut self, enabled: bool) -> Self {
        self.escape_curly_bracket = enabled;
        self
    }

    pub fn avert_query(mut self, enabled: bool) -> Self {
        self.avert_query = enabled;
        self
    }

    pub fn avert_params(mut self, enabled: bool) -> Self {
        self.avert_params = enabled;
        self
    }

    pub fn avert_payload(mut self, enabled: bool) -> Self {
        self.avert_payload = enabled;
        self
    }

    /// Set the custom sanitizer applied to every field group, ahead of
    /// the per-kind slots.
    pub fn with_generic_sanitizer<F>(mut self, sanitizer: F) -> Self
    where
        F: Fn(FieldGroup) -> FieldGroup + Send + Sync + 'static,
    {
        self.generic_custom_sanitizer = Arc::new(sanitizer);
        self
    }

    /// Set the custom sanitizer applied to the query group.
    pub fn with_query_sanitizer<F>(mut self, sanitizer: F) -> Self
    where
        F: Fn(FieldGroup) -> FieldGroup + Send + Sync + 'static,
    {
        self.query_custom_sanitizer = Arc::new(sanitizer);
        self
    }

    /// Set the custom sanitizer applied to the path-parameter group.
    pub fn with_param_sanitizer<F>(mut self, sanitizer: F) -> Self
    where
        F: Fn(FieldGroup) -> FieldGroup + Send + Sync + 'static,
    {
        self.param_custom_sanitizer = Arc::new(sanitizer);
        self
    }

    /// Set the custom sanitizer applied to the payload group.
    pub fn with_payload_sanitizer<F>(mut self, sanitizer: F) -> Self
    where
        F: Fn(FieldGroup) -> FieldGroup + Send + Sync + 'static,
    {
        self.payload_custom_sanitizer = Arc::new(sanitizer);
        self
    }
}

impl fmt::Debug for AvertConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvertConfig")
            .field("remove_whitespace", &self.remove_whitespace)
            .field("remove_non_existent", &self.remove_non_existent)
            .field("remove_dollar_sign", &self.remove_dollar_sign)
            .field("escape_dollar_sign", &self.escape_dollar_sign)
            .field("remove_curly_bracket", &self.remove_curly_bracket)
            .field("escape_curly_bracket", &self.escape_curly_bracket)
            .field("avert_query", &self.avert_query)
            .field("avert_params", &self.avert_params)
            .field("avert_payload", &self.avert_payload)
            .finish_non_exhaustive()
    }
}

/// Per-route configuration layer
///
/// Every flag is tri-state: `None` inherits the global value, `Some`
/// overrides it. Sanitizer slots behave the same way.
#[derive(Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct AvertOverrides {
    pub remove_whitespace: Option<bool>,
    pub remove_non_existent: Option<bool>,
    pub remove_dollar_sign: Option<bool>,
    pub escape_dollar_sign: Option<bool>,
    pub remove_curly_bracket: Option<bool>,
    pub escape_curly_bracket: Option<bool>,
    pub avert_query: Option<bool>,
    pub avert_params: Option<bool>,
    pub avert_payload: Option<bool>,

    #[serde(skip_deserializing)]
    pub generic_custom_sanitizer: Option<CustomSanitizer>,
    #[serde(skip_deserializing)]
    pub query_custom_sanitizer: Option<CustomSanitizer>,
    #[serde(skip_deserializing)]
    pub param_custom_sanitizer: Option<CustomSanitizer>,
    #[serde(skip_deserializing)]
    pub payload_custom_sanitizer: Option<CustomSanitizer>,
}

impl AvertOverrides {
    /// Create an override layer with every field unset (inherits
    /// everything).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remove_whitespace(mut self, enabled: bool) -> Self {
        self.remove_whitespace = Some(enabled);
        self
    }

    pub fn remove_non_existent(mut self, enabled: bool) -> Self {
        self.remove_non_existent = Some(enabled);
        self
    }

    pub fn remove_dollar_sign(mut self, enabled: bool) -> Self {
        self.remove_dollar_sign = Some(enabled);
        self
    }

    pub fn escape_dollar_sign(mut self, enabled: bool) -> Self {
        self.escape_dollar_sign = Some(enabled);
        self
    }

    pub fn remove_curly_bracket(mut self, enabled: bool) -> Self {
        self.remove_curly_bracket = Some(enabled);
        self
    }

    pub fn escape_curly_bracket(mut self, enabled: bool) -> Self {
        self.escape_curly_bracket = Some(enabled);
        self
    }

    pub fn avert_query(mut self, enabled: bool) -> Self {
        self.avert_query = Some(enabled);
        self
    }

    pub fn avert_params(mut self, enabled: bool) -> Self {
        self.avert_params = Some(enabled);
        self
    }

    pub fn avert_payload(mut self, enabled: bool) -> Self {
        self.avert_payload = Some(enabled);
        self
    }

    pub fn with_generic_sanitizer<F>(mut self, sanitizer: F) -> Self
    where
        F: Fn(FieldGroup) -> FieldGroup + Send + Sync + 'static,
    {
        self.generic_custom_sanitizer = Some(Arc::new(sanitizer));
        self
    }

    pub fn with_query_sanitizer<F>(mut self, sanitizer: F) -> Self
    where
        F: Fn(FieldGroup) -> FieldGroup + Send + Sync + 'static,
    {
        self.query_custom_sanitizer = Some(Arc::new(sanitizer));
        self
    }

    pub fn with_param_sanitizer<F>(mut self, sanitizer: F) -> Self
    where
        F: Fn(FieldGroup) -> FieldGroup + Send + Sync + 'static,
    {
        self.param_custom_sanitizer = Some(Arc::new(sanitizer));
        self
    }

    pub fn with_payload_sanitizer<F>(mut self, sanitizer: F) -> Self
    where
        F: Fn(FieldGroup) -> FieldGroup + Send + Sync + 'static,
    {
        self.payload_custom_sanitizer = Some(Arc::new(sanitizer));
        self
    }
}

impl fmt::Debug for AvertOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvertOverrides")
            .field("remove_whitespace", &self.remove_whitespace)
            .field("remove_non_existent", &self.remove_non_existent)
            .field("remove_dollar_sign", &self.remove_dollar_sign)
            .field("escape_dollar_sign", &self.escape_dollar_sign)
            .field("remove_curly_bracket", &self.remove_curly_bracket)
            .field("escape_curly_bracket", &self.escape_curly_bracket)
            .field("avert_query", &self.avert_query)
            .field("avert_params", &self.avert_params)
            .field("avert_payload", &self.avert_payload)
            .finish_non_exhaustive()
    }
}

/// A route's stance towards the cleansing pipeline
///
/// Given statically to the layer guarding a route or sub-router:
///
/// ```ignore
/// Router::new()
///     .route("/raw", post(raw_handler))
///     .layer(avert_layer.with_policy(RoutePolicy::Disabled))
/// ```
///
/// or injected dynamically by middleware outside the layer as an
/// `Extension<RoutePolicy>`, which takes precedence.
///
/// `Disabled` is a sentinel distinct from "no override supplied"
/// (`Inherit`): it bypasses the pipeline entirely for the route,
/// regardless of the global configuration.
#[derive(Clone, Debug, Default)]
pub enum RoutePolicy {
    /// No route-level override; the global configuration applies as-is.
    #[default]
    Inherit,

    /// Bypass the pipeline for this route entirely.
    Disabled,

    /// Merge these overrides on top of the global configuration.
    Override(AvertOverrides),
}

impl<'de> Deserialize<'de> for RoutePolicy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Overrides(AvertOverrides),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Flag(false) => RoutePolicy::Disabled,
            Raw::Flag(true) => RoutePolicy::Inherit,
            Raw::Overrides(overrides) => RoutePolicy::Override(overrides),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_config_is_valid() {
        let config = AvertConfig::from_yaml_str("{}").unwrap();
        assert!(!config.remove_whitespace);
        assert!(!config.avert_payload);
    }

    #[test]
    fn test_yaml_flags() {
        let config = AvertConfig::from_yaml_str(
            r#"
removeNonExistent: true
escapeDollarSign: true
avertQuery: true
"#,
        )
        .unwrap();

        assert!(config.remove_non_existent);
        assert!(config.escape_dollar_sign);
        assert!(config.avert_query);
        assert!(!config.remove_whitespace);
    }

    #[test]
    fn test_unknown_key_is_fatal() {
        let err = AvertConfig::from_yaml_str("sanitiseEverything: true").unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_OPTION");
        assert!(err.to_string().contains("sanitiseEverything"));
    }

    #[test]
    fn test_wrong_value_type_is_fatal() {
        let err = AvertConfig::from_value(json!({"removeWhitespace": "yes"})).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_OPTION_VALUE");
    }

    #[test]
    fn test_from_value_unknown_key() {
        let err = AvertConfig::from_value(json!({"avertEverything": true})).unwrap_err();
        assert!(matches!(
            err,
            crate::core::error::ConfigError::UnknownOption { .. }
        ));
    }

    #[test]
    fn test_builder_flags() {
        let config = AvertConfig::new()
            .remove_whitespace(true)
            .avert_payload(true);
        assert!(config.remove_whitespace);
        assert!(config.avert_payload);
        assert!(!config.avert_query);
    }

    #[test]
    fn test_route_policy_deserialize_false_is_disabled() {
        let policy: RoutePolicy = serde_json::from_value(json!(false)).unwrap();
        assert!(matches!(policy, RoutePolicy::Disabled));
    }

    #[test]
    fn test_route_policy_deserialize_map_is_override() {
        let policy: RoutePolicy =
            serde_json::from_value(json!({"removeWhitespace": true})).unwrap();
        match policy {
            RoutePolicy::Override(o) => assert_eq!(o.remove_whitespace, Some(true)),
            other => panic!("expected override, got {:?}", other),
        }
    }

    #[test]
    fn test_overrides_default_inherit_everything() {
        let overrides = AvertOverrides::new();
        assert!(overrides.remove_whitespace.is_none());
        assert!(overrides.generic_custom_sanitizer.is_none());
    }
}
