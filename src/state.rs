//! Desired state, remote snapshots and reconciliation results

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// A field-name to value mapping describing one manageable resource.
pub type ConfigurationObject = serde_json::Map<String, Value>;

/// What the caller wants to be true about the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    #[default]
    Present,
    Absent,
}

impl FromStr for Intent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "present" => Ok(Intent::Present),
            "absent" => Ok(Intent::Absent),
            other => Err(format!(
                "value of state must be one of: present, absent, got: {other}"
            )),
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intent::Present => write!(f, "present"),
            Intent::Absent => write!(f, "absent"),
        }
    }
}

/// Per-run execution options that are not part of the resource itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOptions {
    /// Seconds to wait for an asynchronous job. Zero means do not wait.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Unmount the resource before deleting it.
    #[serde(default)]
    pub force_unmount: bool,
    /// Take the resource offline before deleting it.
    #[serde(default)]
    pub force_offline: bool,
    #[serde(default)]
    pub check_mode: bool,
    #[serde(default)]
    pub diff_mode: bool,
}

fn default_timeout_secs() -> u64 {
    180
}

fn default_poll_interval_secs() -> u64 {
    5
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            force_unmount: false,
            force_offline: false,
            check_mode: false,
            diff_mode: false,
        }
    }
}

impl ExecutionOptions {
    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

/// User-declared configuration plus intent, immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesiredState {
    /// Registered resource type name, e.g. `flexcache`.
    pub resource: String,
    #[serde(default)]
    pub intent: Intent,
    #[serde(default)]
    pub config: ConfigurationObject,
    #[serde(default)]
    pub options: ExecutionOptions,
}

impl DesiredState {
    pub fn new(resource: impl Into<String>, intent: Intent, config: ConfigurationObject) -> Self {
        Self {
            resource: resource.into(),
            intent,
            config,
            options: ExecutionOptions::default(),
        }
    }

    pub fn present(resource: impl Into<String>, config: ConfigurationObject) -> Self {
        Self::new(resource, Intent::Present, config)
    }

    pub fn absent(resource: impl Into<String>, identity: ConfigurationObject) -> Self {
        Self::new(resource, Intent::Absent, identity)
    }

    pub fn with_options(mut self, options: ExecutionOptions) -> Self {
        self.options = options;
        self
    }
}

/// Mutation selected by comparing desired and remote state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    None,
    Create,
    Update,
    Delete,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::None => "none",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        };
        f.write_str(s)
    }
}

/// Before/after view of the fields touched by a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChanges {
    pub before: Value,
    pub after: Value,
}

/// Terminal record produced exactly once per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub changed: bool,
    pub failed: bool,
    pub message: String,
    pub action: Action,
    #[serde(default)]
    pub response: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<FieldChanges>,
}

impl ReconciliationResult {
    pub fn unchanged(message: impl Into<String>) -> Self {
        Self {
            changed: false,
            failed: false,
            message: message.into(),
            action: Action::None,
            response: Value::Null,
            diff: None,
        }
    }

    pub fn changed(action: Action, message: impl Into<String>, response: Value) -> Self {
        Self {
            changed: true,
            failed: false,
            message: message.into(),
            action,
            response,
            diff: None,
        }
    }

    pub fn failed(message: impl Into<String>, response: Value) -> Self {
        Self {
            changed: false,
            failed: true,
            message: message.into(),
            action: Action::None,
            response,
            diff: None,
        }
    }

    pub fn with_diff(mut self, diff: Option<FieldChanges>) -> Self {
        self.diff = diff;
        self
    }
}
