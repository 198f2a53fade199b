//! Type annotations and schema validation.

mod annotations;
mod validator;

use thiserror::Error;

pub use annotations::{extract, parse_annotation, strip_annotation, Annotation, TypeAnnotations};
pub use validator::{check, validate, FieldSpec, TypeSpec};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SchemaError {
    #[error("expected {expected} at {path}, got {actual}")]
    TypeMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("required field \"{field}\" missing at {path}")]
    MissingField { field: String, path: String },
}
