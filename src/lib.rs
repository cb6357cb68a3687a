//! # avert
//!
//! Request-sanitization middleware for axum: cleanses query parameters,
//! path parameters and JSON payload fields before handlers run.
//!
//! ## Features
//!
//! - **HTML/script sanitization**: strips unsafe markup via `ammonia`,
//!   gated per field-group kind (`avertQuery`, `avertParams`,
//!   `avertPayload`)
//! - **Whitespace and empty-value removal**: drops fields that carry no
//!   information
//! - **NoSQL-injection hardening**: escapes or removes `$`- and
//!   `{}`-shaped values, with remove taking precedence over escape
//! - **Custom sanitizers**: one generic slot plus one slot per
//!   field-group kind, run between HTML sanitization and the removal
//!   passes
//! - **Per-route overrides**: routes can override any flag or slot, or
//!   opt out of the pipeline entirely with a disabled sentinel
//! - **Validated configuration**: unknown options and wrongly typed
//!   values are rejected at registration, never at request time
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use avert::prelude::*;
//!
//! let layer = AvertLayer::new(
//!     AvertConfig::new()
//!         .avert_query(true)
//!         .remove_non_existent(true)
//!         .escape_dollar_sign(true),
//! );
//!
//! let app = Router::new()
//!     .route("/search", get(search_handler))
//!     .layer(layer.clone())
//!     .merge(
//!         // this route bypasses the pipeline entirely
//!         Router::new()
//!             .route("/raw", post(raw_handler))
//!             .layer(layer.with_policy(RoutePolicy::Disabled)),
//!     );
//! ```
//!
//! The pipeline is stateless and synchronous: each request gets its own
//! resolved option set and nothing is shared across requests.

pub mod config;
pub mod core;
pub mod server;

/// Re-exports of commonly used types
pub mod prelude {
    // === Configuration ===
    pub use crate::config::{AvertConfig, AvertOverrides, RoutePolicy};

    // === Core pipeline ===
    pub use crate::core::{
        error::ConfigError,
        field::FieldGroup,
        interceptor::{Interceptor, RequestFields},
        pipeline::avert,
        policy::{CustomSanitizer, FieldKind, ResolvedOptions, SpecialCharPolicy},
        transforms,
    };

    // === Axum bindings ===
    pub use crate::server::{AvertLayer, AvertService, CleansedPath};

    // === External dependencies ===
    pub use axum::{
        Extension, Json, Router,
        routing::{get, post},
    };
}
