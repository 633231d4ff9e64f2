use thiserror::Error;

use crate::reconcile::ReconcileError;
use crate::schema::SchemaError;

/// Errors that can occur during module operations
#[derive(Error, Debug)]
pub enum ModuleError {
    #[error("Module not found: {name}")]
    ModuleNotFound { name: String },

    #[error("Invalid arguments: {message}")]
    InvalidArgs { message: String },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

/// Errors that can occur during module argument validation
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid argument value: {arg} = {value} - {reason}")]
    InvalidArgValue {
        arg: String,
        value: String,
        reason: String,
    },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl ValidationError {
    pub fn invalid(arg: &str, value: &serde_json::Value, reason: impl Into<String>) -> Self {
        ValidationError::InvalidArgValue {
            arg: arg.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}
