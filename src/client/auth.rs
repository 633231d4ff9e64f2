//! Authentication for management API requests

use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum AuthMethod {
    #[default]
    None,
    Basic {
        username: String,
        #[serde(default)]
        password: String,
    },
    /// FortiOS REST API tokens, FlashBlade session tokens.
    Bearer { token: String },
    ApiKey { key: String, header: String },
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing required authentication parameter: {0}")]
    MissingParameter(String),
}

pub struct AuthHandler;

impl AuthHandler {
    pub fn create_basic_auth(username: &str, password: &str) -> String {
        let credentials = format!("{}:{}", username, password);
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials.as_bytes());
        format!("Basic {}", encoded)
    }

    pub fn create_bearer_auth(token: &str) -> String {
        format!("Bearer {}", token)
    }

    /// Apply authentication to headers
    pub fn apply_auth(
        headers: &mut HashMap<String, String>,
        auth_method: &AuthMethod,
    ) -> Result<(), AuthError> {
        Self::validate_auth(auth_method)?;
        match auth_method {
            AuthMethod::None => {}
            AuthMethod::Basic { username, password } => {
                let auth_header = Self::create_basic_auth(username, password);
                headers.insert("Authorization".to_string(), auth_header);
            }
            AuthMethod::Bearer { token } => {
                let auth_header = Self::create_bearer_auth(token);
                headers.insert("Authorization".to_string(), auth_header);
            }
            AuthMethod::ApiKey { key, header } => {
                headers.insert(header.clone(), key.clone());
            }
        }
        Ok(())
    }

    pub fn validate_auth(auth_method: &AuthMethod) -> Result<(), AuthError> {
        match auth_method {
            AuthMethod::None => {}
            AuthMethod::Basic { username, .. } => {
                // Password can be empty for some token-based systems
                if username.is_empty() {
                    return Err(AuthError::MissingParameter("username".to_string()));
                }
            }
            AuthMethod::Bearer { token } => {
                if token.is_empty() {
                    return Err(AuthError::MissingParameter("token".to_string()));
                }
            }
            AuthMethod::ApiKey { key, header } => {
                if key.is_empty() {
                    return Err(AuthError::MissingParameter("key".to_string()));
                }
                if header.is_empty() {
                    return Err(AuthError::MissingParameter("header".to_string()));
                }
            }
        }
        Ok(())
    }
}
