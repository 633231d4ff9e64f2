use thiserror::Error;

/// Errors raised while checking module arguments against a resource schema
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Unsupported parameters: {}", names.join(", "))]
    UnsupportedParameters { names: Vec<String> },

    #[error("missing required arguments: {}", names.join(", "))]
    MissingRequired { names: Vec<String> },

    #[error("argument {field} is of type {actual} and we were unable to convert to {expected}")]
    Conversion {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Validation failed with errors: {}", errors.join("; "))]
    Invalid { errors: Vec<String> },

    #[error("Schema could not be compiled: {reason}")]
    Compile { reason: String },
}
