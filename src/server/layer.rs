//! Tower middleware installing the interceptor on an axum router
//!
//! [`AvertLayer`] wraps every request once, after whatever authentication
//! layers sit outside it: it resolves the route's policy, rewrites the
//! URI query string and the buffered JSON payload through the cleansing
//! pipeline, and stashes the resolved options in the request extensions
//! so [`crate::server::CleansedPath`] can run the params pass at
//! extraction time (matched path parameters are not rewritable from
//! middleware).
//!
//! Route scoping is structural: apply the layer to the router (or
//! sub-router) whose routes inherit the global configuration, and give
//! routes with their own stance a layer built with
//! [`AvertLayer::with_policy`]. Middleware sitting outside the layer can
//! still override the policy dynamically by inserting an
//! `Extension<RoutePolicy>`; the extension wins over the layer's static
//! policy.
//!
//! Payload handling stays inside the defined domain: only
//! `application/json` bodies are buffered (up to a configurable cap),
//! and only the string-valued top-level members of a JSON object are
//! cleansed. Anything else is forwarded unmodified for the handler's
//! own extractor to deal with.

use crate::config::{AvertConfig, RoutePolicy};
use crate::core::error::ConfigError;
use crate::core::field::{string_fields, write_back_json, FieldGroup};
use crate::core::interceptor::Interceptor;
use crate::core::pipeline::avert;
use crate::core::policy::FieldKind;
use axum::body::{to_bytes, Body};
use axum::extract::Request;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Default cap on payloads buffered for cleansing (2 MiB).
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Request-cleansing middleware for axum routers
///
/// # Example
///
/// ```ignore
/// let layer = AvertLayer::new(
///     AvertConfig::new()
///         .remove_non_existent(true)
///         .avert_query(true),
/// );
///
/// let app = Router::new()
///     .route("/search", get(search))
///     .layer(layer.clone())
///     .merge(
///         // this route bypasses the pipeline entirely
///         Router::new()
///             .route("/raw", post(ingest))
///             .layer(layer.with_policy(RoutePolicy::Disabled)),
///     );
/// ```
#[derive(Clone, Debug)]
pub struct AvertLayer {
    interceptor: Arc<Interceptor>,
    policy: RoutePolicy,
    body_limit: usize,
}

impl AvertLayer {
    /// Install the layer with an already-validated configuration.
    pub fn new(config: AvertConfig) -> Self {
        Self {
            interceptor: Arc::new(Interceptor::new(config)),
            policy: RoutePolicy::Inherit,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    /// Build the layer from a YAML configuration string.
    ///
    /// This is the registration gate: an unknown option or a wrongly
    /// typed value fails here and the layer is never installed.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(Self::new(AvertConfig::from_yaml_str(yaml)?))
    }

    /// Build the layer from a JSON configuration value.
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        Ok(Self::new(AvertConfig::from_value(value)?))
    }

    /// Set the static route policy this layer applies.
    ///
    /// Use this to scope per-route overrides or the disabled sentinel to
    /// a route or sub-router. An `Extension<RoutePolicy>` inserted by
    /// outer middleware takes precedence over this.
    pub fn with_policy(mut self, policy: RoutePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Change the cap above which payloads are forwarded unmodified
    /// instead of buffered for cleansing.
    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }
}

impl<S> Layer<S> for AvertLayer {
    type Service = AvertService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AvertService {
            inner,
            interceptor: self.interceptor.clone(),
            policy: self.policy.clone(),
            body_limit: self.body_limit,
        }
    }
}

/// The service produced by [`AvertLayer`]
#[derive(Clone)]
pub struct AvertService<S> {
    inner: S,
    interceptor: Arc<Interceptor>,
    policy: RoutePolicy,
    body_limit: usize,
}

impl<S> Service<Request> for AvertService<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let interceptor = self.interceptor.clone();
        let policy = self.policy.clone();
        let body_limit = self.body_limit;

        // Take the ready service, leave the clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            match cleanse_request(&interceptor, policy, body_limit, req).await {
                Ok(req) => inner.call(req).await,
                Err(rejection) => Ok(rejection),
            }
        })
    }
}

/// Cleanse one request, or reject it when its declared-JSON body cannot
/// be read.
async fn cleanse_request(
    interceptor: &Interceptor,
    policy: RoutePolicy,
    body_limit: usize,
    req: Request,
) -> Result<Request, Response> {
    // A dynamically injected policy wins over the layer's static one.
    let route = req
        .extensions()
        .get::<RoutePolicy>()
        .cloned()
        .unwrap_or(policy);
    let Some(options) = interceptor.resolve(&route) else {
        tracing::trace!(uri = %req.uri(), "route disabled, skipping cleansing");
        return Ok(req);
    };

    let (mut parts, body) = req.into_parts();

    // Make the resolved options available to CleansedPath and to any
    // handler that wants them.
    parts.extensions.insert(options.clone());

    if let Some(raw) = parts.uri.query() {
        let group = decode_query(raw);
        if !group.is_empty() {
            let cleansed = avert(group, &options, FieldKind::Query);
            parts.uri = rebuild_uri(&parts.uri, encode_query(&cleansed).as_deref());
        }
    }

    let body = if should_buffer(&parts.headers, body_limit) {
        let bytes = match to_bytes(body, body_limit).await {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::debug!(error = %err, "failed to buffer request body");
                let status = if is_length_limit(&err) {
                    StatusCode::PAYLOAD_TOO_LARGE
                } else {
                    StatusCode::BAD_REQUEST
                };
                return Err(status.into_response());
            }
        };
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(mut object)) => {
                let before = string_fields(&object);
                if before.is_empty() {
                    Body::from(bytes)
                } else {
                    let cleansed = avert(before.clone(), &options, FieldKind::Payload);
                    write_back_json(&mut object, &before, &cleansed);
                    let buf = serde_json::to_vec(&Value::Object(object))
                        .unwrap_or_else(|_| bytes.to_vec());
                    parts.headers.insert(
                        header::CONTENT_LENGTH,
                        header::HeaderValue::from(buf.len()),
                    );
                    Body::from(buf)
                }
            }
            // Non-object JSON and unparsable bodies are outside the
            // cleansing domain.
            _ => Body::from(bytes),
        }
    } else {
        body
    };

    Ok(Request::from_parts(parts, body))
}

/// Whether the payload is eligible for cleansing: declared JSON, not
/// declared larger than the cap.
///
/// A body whose `Content-Length` exceeds the cap is forwarded unmodified
/// instead of buffered; a body without a declared length is buffered up
/// to the cap and rejected if it runs past it.
fn should_buffer(headers: &header::HeaderMap, body_limit: usize) -> bool {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| {
            let mime = v.split(';').next().unwrap_or(v).trim();
            mime == "application/json" || mime.ends_with("+json")
        })
        .unwrap_or(false);
    if !is_json {
        return false;
    }

    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok())
        .map(|len| len <= body_limit)
        .unwrap_or(true)
}

/// Whether a body-buffering failure was the cap being hit, as opposed to
/// a transport error while reading the stream.
fn is_length_limit(err: &axum::Error) -> bool {
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        if inner.is::<http_body_util::LengthLimitError>() {
            return true;
        }
        source = inner.source();
    }
    false
}

fn decode_query(raw: &str) -> FieldGroup {
    // Repeated keys collapse to the last occurrence; array-style query
    // values are outside the string-valued domain.
    serde_urlencoded::from_str::<Vec<(String, String)>>(raw)
        .map(|pairs| pairs.into_iter().collect())
        .unwrap_or_default()
}

fn encode_query(group: &FieldGroup) -> Option<String> {
    if group.is_empty() {
        return None;
    }
    let pairs: Vec<(&str, &str)> = group
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    serde_urlencoded::to_string(pairs).ok()
}

fn rebuild_uri(uri: &Uri, query: Option<&str>) -> Uri {
    let path_and_query = match query {
        Some(q) if !q.is_empty() => format!("{}?{}", uri.path(), q),
        _ => uri.path().to_string(),
    };

    let mut builder = Uri::builder();
    if let Some(scheme) = uri.scheme() {
        builder = builder.scheme(scheme.clone());
    }
    if let Some(authority) = uri.authority() {
        builder = builder.authority(authority.clone());
    }
    builder
        .path_and_query(path_and_query)
        .build()
        .unwrap_or_else(|_| uri.clone())
}
