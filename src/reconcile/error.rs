use serde_json::Value;
use thiserror::Error;

use crate::client::ClientError;
use crate::schema::SchemaError;

/// Ways an asynchronous job can fail to resolve.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("job {job} still running after {timeout_secs}s; the remote operation may still complete")]
    Timeout { job: String, timeout_secs: u64 },

    #[error("job {job} could not be found")]
    Lookup { job: String },

    #[error("job {job} reported unexpected state '{state}'")]
    UnexpectedState { job: String, state: String },

    #[error("job {job} failed: {detail}")]
    Failed { job: String, detail: String },

    #[error("failed to query job {job}: {source}")]
    Remote {
        job: String,
        #[source]
        source: ClientError,
    },
}

/// Everything that can abort a reconciliation.
///
/// `target` is the resource type followed by its identity, e.g.
/// `flexcache name=cache1,vserver=vs1`.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    #[error(transparent)]
    Validation(#[from] SchemaError),

    #[error("{resource}: missing identity field(s): {}", fields.join(", "))]
    MissingIdentity {
        resource: String,
        fields: Vec<String>,
    },

    #[error("{target}: multiple records found ({count}), refusing to guess")]
    AmbiguousResource { target: String, count: usize },

    #[error("{target}: modifying {} is not supported", fields.join(", "))]
    ModifyNotSupported { target: String, fields: Vec<String> },

    #[error("Error on {action} of {target}: {source}")]
    RemoteTransport {
        action: String,
        target: String,
        #[source]
        source: ClientError,
    },

    #[error("Error on {action} of {target}: {message}")]
    RemoteApplication {
        action: String,
        target: String,
        status: u16,
        message: String,
        payload: Value,
    },

    #[error("Error on {action} of {target}: {source}")]
    Job {
        action: String,
        target: String,
        #[source]
        source: JobError,
    },

    #[error("{target}: not found after create, cannot apply {}", fields.join(", "))]
    MissingAfterCreate { target: String, fields: Vec<String> },
}

impl ReconcileError {
    /// Classifies a client failure during `action`.
    pub fn remote(action: &str, target: &str, error: ClientError) -> Self {
        match error {
            ClientError::Application {
                status,
                message,
                payload,
            } => ReconcileError::RemoteApplication {
                action: action.to_string(),
                target: target.to_string(),
                status,
                message,
                payload,
            },
            other => ReconcileError::RemoteTransport {
                action: action.to_string(),
                target: target.to_string(),
                source: other,
            },
        }
    }

    pub fn job(action: &str, target: &str, source: JobError) -> Self {
        ReconcileError::Job {
            action: action.to_string(),
            target: target.to_string(),
            source,
        }
    }

    /// Raw vendor payload, when the failure carried one.
    pub fn response(&self) -> Value {
        match self {
            ReconcileError::RemoteApplication { payload, .. } => payload.clone(),
            ReconcileError::Job {
                source: JobError::Remote { source, .. },
                ..
            } => source.payload(),
            _ => Value::Null,
        }
    }

    pub fn job_error(&self) -> Option<&JobError> {
        match self {
            ReconcileError::Job { source, .. } => Some(source),
            _ => None,
        }
    }
}
