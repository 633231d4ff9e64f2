use serde_json::Value;
use thiserror::Error;

/// Errors returned by remote clients
#[derive(Error, Debug, Clone)]
pub enum ClientError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP {status}: {message}")]
    Application {
        status: u16,
        message: String,
        payload: Value,
    },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Invalid request: {0}")]
    Request(String),
}

impl ClientError {
    pub fn application(status: u16, message: impl Into<String>) -> Self {
        ClientError::Application {
            status,
            message: message.into(),
            payload: Value::Null,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Application { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Reads like a rejected duplicate create. The identity may still be
    /// free, so callers re-fetch before treating it as a race.
    pub fn is_already_exists(&self) -> bool {
        match self {
            ClientError::Application {
                status, message, ..
            } => {
                let message = message.to_ascii_lowercase();
                *status == 409
                    || message.contains("already exists")
                    || message.contains("duplicate")
            }
            _ => false,
        }
    }

    pub fn payload(&self) -> Value {
        match self {
            ClientError::Application { payload, .. } => payload.clone(),
            _ => Value::Null,
        }
    }

    /// Vendor error text with the HTTP status stripped.
    pub fn vendor_message(&self) -> String {
        match self {
            ClientError::Application { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            ClientError::application(status.as_u16(), err.to_string())
        } else if err.is_builder() {
            ClientError::Request(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        ClientError::Request(format!("invalid URL: {err}"))
    }
}
