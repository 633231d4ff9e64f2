//! Resource-type registry
//!
//! A [`ResourceType`] describes how one kind of vendor object is addressed
//! (path templates, identity fields, naming convention), which fields can
//! only be set at creation time and which delete preconditions it supports.

pub mod builtin;
pub mod registry;

pub use registry::ResourceRegistry;

use serde::Serialize;
use serde_json::Value;

use crate::naming::KeyMapper;
use crate::schema::ResourceSchema;
use crate::state::ConfigurationObject;

/// Body shape for update calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMode {
    /// Send only the changed fields.
    Patch,
    /// Send the fetched object with the changes merged in.
    Put,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HttpVerb {
    Post,
    Put,
    Patch,
}

/// How the current object is located.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupStyle {
    /// GET the item path; 404 means absent.
    Item,
    /// GET the collection with `lookup_params` rendered as the query.
    Query,
    /// GET the whole collection and match identity fields locally.
    List,
}

/// A single field assignment used for delete preconditions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSetting {
    pub field: String,
    pub value: Value,
}

impl FieldSetting {
    pub fn new(field: &str, value: Value) -> Self {
        Self {
            field: field.to_string(),
            value,
        }
    }

    /// True when `current` holds a value other than this setting's.
    pub fn differs_from(&self, current: &ConfigurationObject) -> bool {
        match current.get(&self.field) {
            None | Some(Value::Null) => false,
            Some(v) => *v != self.value,
        }
    }
}

/// Where asynchronous job status is read from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobEndpoint {
    /// Cluster-wide job path with an `{id}` placeholder.
    pub path: String,
    /// Node-scoped job path with `{node}` and `{id}` placeholders.
    pub node_path: Option<String>,
    /// JSON pointer to the job id in a mutating response.
    pub id_pointer: String,
    /// JSON pointer to the owning node in a mutating response.
    pub node_pointer: Option<String>,
    pub state_pointer: String,
    pub message_pointer: String,
}

impl JobEndpoint {
    pub fn ontap() -> Self {
        Self {
            path: "/api/cluster/jobs/{id}".to_string(),
            node_path: None,
            id_pointer: "/job/uuid".to_string(),
            node_pointer: None,
            state_pointer: "/state".to_string(),
            message_pointer: "/message".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceType {
    /// Registry key, e.g. `flexcache`.
    pub name: String,
    /// Module name exposed to playbooks, e.g. `na_ontap_flexcache`.
    pub module_name: String,
    pub description: String,
    pub collection_path: String,
    /// Target of create calls; usually the collection path.
    pub create_path: String,
    pub item_path: String,
    pub identity: Vec<String>,
    /// Identity fields that only appear in the URL, never in a body.
    pub path_fields: Vec<String>,
    pub immutable: Vec<String>,
    /// Fields rejected at creation and applied by a follow-up update.
    pub deferred: Vec<String>,
    pub lookup: LookupStyle,
    /// Query parameters for lookups; values may hold `{field}` placeholders.
    pub lookup_params: Vec<(String, String)>,
    /// Key holding the record list in lookup responses.
    pub records_key: Option<String>,
    pub update_mode: UpdateMode,
    pub update_verb: HttpVerb,
    pub naming: KeyMapper,
    pub unmount: Option<FieldSetting>,
    pub offline: Option<FieldSetting>,
    pub job: Option<JobEndpoint>,
    pub schema: ResourceSchema,
}

impl ResourceType {
    pub fn is_identity(&self, field: &str) -> bool {
        self.identity.iter().any(|f| f == field)
    }

    pub fn is_immutable(&self, field: &str) -> bool {
        self.immutable.iter().any(|f| f == field)
    }

    pub fn is_deferred(&self, field: &str) -> bool {
        self.deferred.iter().any(|f| f == field)
    }

    pub fn is_path_field(&self, field: &str) -> bool {
        self.path_fields.iter().any(|f| f == field)
    }

    /// Identity fields of `config`; `Err` lists the missing or empty ones.
    pub fn identity_of(
        &self,
        config: &ConfigurationObject,
    ) -> Result<ConfigurationObject, Vec<String>> {
        let mut identity = ConfigurationObject::new();
        let mut missing = Vec::new();
        for field in &self.identity {
            match config.get(field) {
                None | Some(Value::Null) => missing.push(field.clone()),
                Some(Value::String(s)) if s.trim().is_empty() => missing.push(field.clone()),
                Some(value) => {
                    identity.insert(field.clone(), value.clone());
                }
            }
        }
        if missing.is_empty() {
            Ok(identity)
        } else {
            Err(missing)
        }
    }

    /// `name=value` pairs for messages and log spans.
    pub fn describe_identity(&self, identity: &ConfigurationObject) -> String {
        self.identity
            .iter()
            .filter_map(|f| {
                identity.get(f).map(|v| match v {
                    Value::String(s) => format!("{f}={s}"),
                    other => format!("{f}={other}"),
                })
            })
            .collect::<Vec<_>>()
            .join(",")
    }
}
