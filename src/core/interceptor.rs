//! The once-per-request interception point
//!
//! [`Interceptor`] is the transport-agnostic core: it owns the validated
//! global configuration and cleanses one request's field groups in a
//! single synchronous call. The axum binding in [`crate::server`] drives
//! it from a tower middleware; any other host can call
//! [`Interceptor::intercept`] directly from its own post-authentication
//! hook.

use super::field::FieldGroup;
use super::pipeline::avert;
use super::policy::{FieldKind, ResolvedOptions};
use crate::config::{AvertConfig, RoutePolicy};
use std::sync::Arc;

/// The three field groups of one request, borrowed from the host for the
/// duration of a single interception
///
/// The payload is `None` when the request carries no body; an absent
/// payload and an empty payload group cleanse identically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestFields {
    pub query: FieldGroup,
    pub params: FieldGroup,
    pub payload: Option<FieldGroup>,
}

impl RequestFields {
    /// True when there is nothing to cleanse.
    pub fn is_empty(&self) -> bool {
        self.query.is_empty()
            && self.params.is_empty()
            && self.payload.as_ref().is_none_or(|p| p.is_empty())
    }
}

/// Applies the cleansing pipeline to requests, once each, after
/// authentication
#[derive(Clone, Debug)]
pub struct Interceptor {
    global: Arc<AvertConfig>,
}

impl Interceptor {
    /// Install an interceptor with a validated global configuration.
    ///
    /// Construction is infallible: schema validation already happened
    /// when the configuration was built (see
    /// [`AvertConfig::from_yaml_str`]).
    pub fn new(config: AvertConfig) -> Self {
        Self {
            global: Arc::new(config),
        }
    }

    /// Resolve the effective options for one request's route.
    ///
    /// Returns `None` when the route carries the disabled sentinel; the
    /// caller must then pass the request through unmodified.
    pub fn resolve(&self, route: &RoutePolicy) -> Option<ResolvedOptions> {
        ResolvedOptions::resolve(&self.global, route)
    }

    /// Cleanse one request's field groups.
    ///
    /// Runs the pipeline independently for query, params and payload
    /// with one freshly resolved option set. Disabled routes and
    /// requests with nothing to cleanse come back untouched. Synchronous
    /// and infallible.
    pub fn intercept(&self, route: &RoutePolicy, fields: RequestFields) -> RequestFields {
        let Some(options) = self.resolve(route) else {
            return fields;
        };
        if fields.is_empty() {
            return fields;
        }

        let before = (
            fields.query.len(),
            fields.params.len(),
            fields.payload.as_ref().map_or(0, |p| p.len()),
        );

        let cleansed = RequestFields {
            query: avert(fields.query, &options, FieldKind::Query),
            params: avert(fields.params, &options, FieldKind::Params),
            payload: fields
                .payload
                .map(|payload| avert(payload, &options, FieldKind::Payload)),
        };

        let after = (
            cleansed.query.len(),
            cleansed.params.len(),
            cleansed.payload.as_ref().map_or(0, |p| p.len()),
        );
        if before != after {
            // Custom sanitizers may add fields, so report counts rather
            // than deltas.
            tracing::debug!(
                query = after.0,
                params = after.1,
                payload = after.2,
                "cleansing changed field counts"
            );
        }

        cleansed
    }
}
