//! Core module containing the cleansing pipeline and its supporting types

pub mod error;
pub mod field;
pub mod interceptor;
pub mod pipeline;
pub mod policy;
pub mod transforms;

pub use error::ConfigError;
pub use field::FieldGroup;
pub use interceptor::{Interceptor, RequestFields};
pub use pipeline::avert;
pub use policy::{CustomSanitizer, FieldKind, ResolvedOptions, SpecialCharPolicy};
