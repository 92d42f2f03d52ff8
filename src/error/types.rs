use thiserror::Error;

use crate::context::ContextError;

/// Unified result type for the form engine.
pub type Result<T> = std::result::Result<T, FormError>;

/// Errors surfaced by the form engine and its schema binding.
///
/// Validation failures are not errors: they live as data in the form's
/// error map. Failures raised by a caller's submit handler never pass
/// through this type either, see [`crate::form::SubmitError`].
#[derive(Debug, Error)]
pub enum FormError {
    #[error("field `{0}` not found")]
    FieldNotFound(String),
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
    #[error("value error: {0}")]
    Value(#[from] ValueError),
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
    #[error("schema parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("context error: {0}")]
    Context(#[from] ContextError),
}

/// Descriptor misuse detected when a schema is bound.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("field name must not be empty")]
    EmptyFieldName,
    #[error("duplicate field `{0}`")]
    DuplicateField(String),
    #[error("field `{field}` ({tag}) requires `options`")]
    MissingOptions { field: String, tag: String },
    #[error("field `{field}` (range) requires both `min` and `max`")]
    MissingBounds { field: String },
    #[error("field `{field}` has min {min} greater than max {max}")]
    InvertedBounds { field: String, min: f64, max: f64 },
    #[error("field `{field}` initial value {value} lies outside [{min}, {max}]")]
    InitialOutOfBounds {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("field `{field}` has a non-finite {what}: {value}")]
    NonFinite {
        field: String,
        what: &'static str,
        value: f64,
    },
    #[error("field `{field}` ({tag}) cannot start with a {found} value")]
    InitialShape {
        field: String,
        tag: String,
        found: &'static str,
    },
}

/// A runtime value that cannot take the canonical shape of its field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("field `{field}` ({tag}) cannot hold a {found} value")]
    Shape {
        field: String,
        tag: String,
        found: &'static str,
    },
    #[error("field `{field}` expects a number, got `{input}`")]
    NotNumeric { field: String, input: String },
    #[error("field `{field}` expects a boolean, got `{input}`")]
    NotBoolean { field: String, input: String },
}

/// Tags used by a schema without a renderer behind them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("no renderer registered for {}", describe_missing(.0))]
    MissingRenderers(Vec<(String, String)>),
}

fn describe_missing(missing: &[(String, String)]) -> String {
    missing
        .iter()
        .map(|(field, tag)| format!("`{field}` ({tag})"))
        .collect::<Vec<_>>()
        .join(", ")
}
