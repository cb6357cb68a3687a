//! Axum/tower bindings for the cleansing pipeline

pub mod extractor;
pub mod layer;

pub use extractor::CleansedPath;
pub use layer::{AvertLayer, AvertService, DEFAULT_BODY_LIMIT};
