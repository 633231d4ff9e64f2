//! Remote management API clients
//!
//! The reconciler talks to vendor APIs only through [`RemoteClient`].
//! Objects crossing this trait use internal (`snake_case`) field names;
//! implementations translate to the wire convention themselves.

pub mod auth;
pub mod error;
pub mod memory;
pub mod rest;

pub use auth::{AuthError, AuthHandler, AuthMethod};
pub use error::ClientError;
pub use memory::{Call, CallKind, InMemoryClient};
pub use rest::RestClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::resources::ResourceType;
use crate::state::ConfigurationObject;

/// Handle to an asynchronous operation started by a mutating call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRef {
    pub id: String,
    /// Management node that owns the job record, when the API is node-scoped.
    pub node: Option<String>,
}

impl JobRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node: None,
        }
    }

    pub fn on_node(id: impl Into<String>, node: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node: Some(node.into()),
        }
    }

    /// The lookup to try when this one reports the job as missing.
    ///
    /// Node-scoped handles fall back to the cluster-wide scope; cluster-wide
    /// handles are simply retried.
    pub fn alternate(&self) -> JobRef {
        JobRef::new(self.id.clone())
    }
}

impl fmt::Display for JobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node {
            Some(node) => write!(f, "{}@{}", self.id, node),
            None => write!(f, "{}", self.id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Running,
    Success,
    Failure,
    Other(String),
}

impl JobState {
    /// Maps the spellings used by the supported vendors.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "queued" | "pending" | "new" | "waiting" => JobState::Queued,
            "running" | "in_progress" | "inprogress" | "started" | "active" => JobState::Running,
            "success" | "succeeded" | "complete" | "completed" | "done" => JobState::Success,
            "failure" | "failed" | "error" => JobState::Failure,
            _ => JobState::Other(raw.to_string()),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, JobState::Queued | JobState::Running)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Queued => f.write_str("queued"),
            JobState::Running => f.write_str("running"),
            JobState::Success => f.write_str("success"),
            JobState::Failure => f.write_str("failure"),
            JobState::Other(raw) => f.write_str(raw),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub state: JobState,
    /// Completion detail or progress message reported by the vendor.
    pub detail: Option<String>,
}

impl JobStatus {
    pub fn new(state: JobState) -> Self {
        Self {
            state,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Outcome of a create, update or delete call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteResponse {
    pub status: u16,
    pub response: Value,
    pub job: Option<JobRef>,
}

impl RemoteResponse {
    pub fn ok(response: Value) -> Self {
        Self {
            status: 200,
            response,
            job: None,
        }
    }

    pub fn accepted(response: Value, job: JobRef) -> Self {
        Self {
            status: 202,
            response,
            job: Some(job),
        }
    }
}

#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Every remote object matching `identity`.
    async fn get(
        &self,
        resource: &ResourceType,
        identity: &ConfigurationObject,
    ) -> Result<Vec<ConfigurationObject>, ClientError>;

    async fn create(
        &self,
        resource: &ResourceType,
        identity: &ConfigurationObject,
        payload: &ConfigurationObject,
    ) -> Result<RemoteResponse, ClientError>;

    /// `locator` is the identity merged over the fetched object, so path
    /// templates can reference server-assigned keys such as `uuid`.
    async fn update(
        &self,
        resource: &ResourceType,
        locator: &ConfigurationObject,
        body: &ConfigurationObject,
    ) -> Result<RemoteResponse, ClientError>;

    async fn delete(
        &self,
        resource: &ResourceType,
        locator: &ConfigurationObject,
    ) -> Result<RemoteResponse, ClientError>;

    /// `Ok(None)` when the job record cannot be found.
    async fn get_job(
        &self,
        resource: &ResourceType,
        job: &JobRef,
    ) -> Result<Option<JobStatus>, ClientError>;
}

#[async_trait]
impl<T: RemoteClient + ?Sized> RemoteClient for Arc<T> {
    async fn get(
        &self,
        resource: &ResourceType,
        identity: &ConfigurationObject,
    ) -> Result<Vec<ConfigurationObject>, ClientError> {
        (**self).get(resource, identity).await
    }

    async fn create(
        &self,
        resource: &ResourceType,
        identity: &ConfigurationObject,
        payload: &ConfigurationObject,
    ) -> Result<RemoteResponse, ClientError> {
        (**self).create(resource, identity, payload).await
    }

    async fn update(
        &self,
        resource: &ResourceType,
        locator: &ConfigurationObject,
        body: &ConfigurationObject,
    ) -> Result<RemoteResponse, ClientError> {
        (**self).update(resource, locator, body).await
    }

    async fn delete(
        &self,
        resource: &ResourceType,
        locator: &ConfigurationObject,
    ) -> Result<RemoteResponse, ClientError> {
        (**self).delete(resource, locator).await
    }

    async fn get_job(
        &self,
        resource: &ResourceType,
        job: &JobRef,
    ) -> Result<Option<JobStatus>, ClientError> {
        (**self).get_job(resource, job).await
    }
}
