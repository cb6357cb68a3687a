//! Axum extractor for cleansed path parameters
//!
//! Matched path parameters live inside the router and cannot be
//! rewritten from middleware, so the params pass runs at extraction
//! time instead: [`CleansedPath`] pulls the raw parameters, applies the
//! pipeline with the options [`crate::server::AvertLayer`] resolved for
//! this request, and hands the handler the cleansed group.

use crate::core::field::FieldGroup;
use crate::core::pipeline::avert;
use crate::core::policy::{FieldKind, ResolvedOptions};
use axum::extract::rejection::PathRejection;
use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use std::collections::HashMap;

/// The request's path parameters after the cleansing pipeline
///
/// Without an [`crate::server::AvertLayer`] on the router, or on a route
/// carrying [`crate::config::RoutePolicy::Disabled`], the raw parameters
/// pass through untouched.
///
/// # Usage
///
/// ```ignore
/// async fn show(CleansedPath(params): CleansedPath) -> Json<Value> {
///     // params is the cleansed field group
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CleansedPath(pub FieldGroup);

impl CleansedPath {
    /// Consume the extractor and return the cleansed group.
    pub fn into_inner(self) -> FieldGroup {
        self.0
    }
}

impl std::ops::Deref for CleansedPath {
    type Target = FieldGroup;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for CleansedPath
where
    S: Send + Sync,
{
    type Rejection = PathRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw): Path<HashMap<String, String>> =
            Path::from_request_parts(parts, state).await?;
        let group: FieldGroup = raw.into_iter().collect();

        let group = match parts.extensions.get::<ResolvedOptions>() {
            Some(options) => avert(group, options, FieldKind::Params),
            None => group,
        };

        Ok(CleansedPath(group))
    }
}
