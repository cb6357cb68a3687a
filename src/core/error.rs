//! Typed error handling for avert
//!
//! The only fallible surface is configuration: a global configuration that
//! fails schema validation at registration time means the layer is never
//! constructed. The cleansing pipeline itself is total and has no runtime
//! error class.

use std::fmt;

/// Errors raised while validating a global configuration at registration
/// time
#[derive(Debug)]
pub enum ConfigError {
    /// Configuration contains a key outside the enumerated schema
    UnknownOption { option: String },

    /// A known key carries a value of the wrong type
    InvalidValue { message: String },

    /// Configuration could not be parsed at all
    ParseError { message: String },
}

impl ConfigError {
    /// Classify a serde deserialization failure.
    ///
    /// `deny_unknown_fields` reports unknown keys as "unknown field
    /// `name`"; type mismatches start with "invalid type". Everything
    /// else is a plain parse failure.
    pub(crate) fn from_serde_message(message: String) -> Self {
        if let Some(rest) = message.split("unknown field `").nth(1) {
            let option = rest.split('`').next().unwrap_or_default().to_string();
            ConfigError::UnknownOption { option }
        } else if message.starts_with("invalid type") {
            ConfigError::InvalidValue { message }
        } else {
            ConfigError::ParseError { message }
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ConfigError::UnknownOption { .. } => "UNKNOWN_OPTION",
            ConfigError::InvalidValue { .. } => "INVALID_OPTION_VALUE",
            ConfigError::ParseError { .. } => "CONFIG_PARSE_ERROR",
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownOption { option } => {
                write!(f, "Unknown configuration option: '{}'", option)
            }
            ConfigError::InvalidValue { message } => {
                write!(f, "Invalid configuration value: {}", message)
            }
            ConfigError::ParseError { message } => {
                write!(f, "Failed to parse configuration: {}", message)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
