//! In-process [`RemoteClient`] backed by a record store
//!
//! Used by the test suite and by `converge apply --offline`. Every call is
//! logged so callers can assert exactly which requests a run would issue.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;
use uuid::Uuid;

use super::rest::template_fields;
use super::{ClientError, JobRef, JobState, JobStatus, RemoteClient, RemoteResponse};
use crate::reconcile::comparator::values_equal;
use crate::resources::{ResourceType, UpdateMode};
use crate::state::ConfigurationObject;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Get,
    Create,
    Update,
    Delete,
    GetJob,
}

/// One request observed by the client.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Get {
        resource: String,
        identity: ConfigurationObject,
    },
    Create {
        resource: String,
        payload: ConfigurationObject,
    },
    Update {
        resource: String,
        body: ConfigurationObject,
    },
    Delete {
        resource: String,
    },
    GetJob {
        resource: String,
        job: JobRef,
    },
}

impl Call {
    pub fn kind(&self) -> CallKind {
        match self {
            Call::Get { .. } => CallKind::Get,
            Call::Create { .. } => CallKind::Create,
            Call::Update { .. } => CallKind::Update,
            Call::Delete { .. } => CallKind::Delete,
            Call::GetJob { .. } => CallKind::GetJob,
        }
    }

    pub fn is_mutation(&self) -> bool {
        matches!(
            self.kind(),
            CallKind::Create | CallKind::Update | CallKind::Delete
        )
    }
}

#[derive(Debug, Default)]
struct Store {
    records: Vec<(String, ConfigurationObject)>,
    calls: Vec<Call>,
    /// Status sequence per job id; the last entry repeats.
    jobs: HashMap<String, VecDeque<Option<JobStatus>>>,
    failures: HashMap<CallKind, VecDeque<ClientError>>,
    /// Objects another writer lands just before the next create.
    racers: Vec<(String, ConfigurationObject)>,
    /// Polls a generated job stays running before it succeeds.
    job_polls: Option<usize>,
    next_job: u64,
    next_id: u64,
}

impl Store {
    fn find(&self, resource: &str, keys: &ConfigurationObject) -> Vec<usize> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, (name, object))| {
                name == resource
                    && keys.iter().all(|(field, wanted)| {
                        object
                            .get(field)
                            .is_some_and(|actual| values_equal(None, wanted, actual))
                    })
            })
            .map(|(index, _)| index)
            .collect()
    }

    fn locate(
        &self,
        resource: &ResourceType,
        locator: &ConfigurationObject,
    ) -> Result<usize, ClientError> {
        let keys: ConfigurationObject = template_fields(&resource.item_path)
            .into_iter()
            .filter_map(|field| locator.get(&field).map(|v| (field, v.clone())))
            .collect();
        self.find(&resource.name, &keys)
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::application(404, "entry doesn't exist"))
    }

    fn take_failure(&mut self, kind: CallKind) -> Result<(), ClientError> {
        match self.failures.get_mut(&kind).and_then(VecDeque::pop_front) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn respond(&mut self, resource: &ResourceType, response: Value) -> RemoteResponse {
        let Some(polls) = self.job_polls.filter(|_| resource.job.is_some()) else {
            return RemoteResponse::ok(response);
        };

        self.next_job += 1;
        let id = format!("job-{}", self.next_job);
        self.jobs.entry(id.clone()).or_insert_with(|| {
            let mut statuses: VecDeque<Option<JobStatus>> = (0..polls)
                .map(|_| Some(JobStatus::new(JobState::Running)))
                .collect();
            statuses.push_back(Some(
                JobStatus::new(JobState::Success).with_detail("Job succeeded"),
            ));
            statuses
        });
        RemoteResponse::accepted(json!({ "job": { "uuid": id } }), JobRef::new(id))
    }
}

/// Record-store client; clones share the same store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryClient {
    store: Arc<Mutex<Store>>,
}

impl InMemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seeds an existing object; `object` must be a JSON object.
    pub fn with_record(self, resource: &str, object: Value) -> Self {
        self.insert(resource, object);
        self
    }

    pub fn insert(&self, resource: &str, object: Value) {
        if let Value::Object(object) = object {
            self.store().records.push((resource.to_string(), object));
        }
    }

    /// Mutations on job-capable resources return a job that reports
    /// `running` for `polls` lookups and then succeeds.
    pub fn with_async_jobs(self, polls: usize) -> Self {
        self.store().job_polls = Some(polls);
        self
    }

    /// Scripts the lookups of job `id`; `None` entries report the job as
    /// missing. Generated ids are `job-1`, `job-2` and so on.
    pub fn script_job(&self, id: &str, statuses: Vec<Option<JobStatus>>) {
        self.store()
            .jobs
            .insert(id.to_string(), statuses.into_iter().collect());
    }

    /// Fails the next call of `kind` with `error`.
    pub fn fail_next(&self, kind: CallKind, error: ClientError) {
        self.store()
            .failures
            .entry(kind)
            .or_default()
            .push_back(error);
    }

    /// Another writer creates `object` just before the next create of
    /// `resource` reaches the store.
    pub fn race_create(&self, resource: &str, object: Value) {
        if let Value::Object(object) = object {
            self.store().racers.push((resource.to_string(), object));
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.store().calls.clone()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    pub fn records(&self, resource: &str) -> Vec<ConfigurationObject> {
        self.store()
            .records
            .iter()
            .filter(|(name, _)| name == resource)
            .map(|(_, object)| object.clone())
            .collect()
    }
}

#[async_trait]
impl RemoteClient for InMemoryClient {
    async fn get(
        &self,
        resource: &ResourceType,
        identity: &ConfigurationObject,
    ) -> Result<Vec<ConfigurationObject>, ClientError> {
        let mut store = self.store();
        store.calls.push(Call::Get {
            resource: resource.name.clone(),
            identity: identity.clone(),
        });
        store.take_failure(CallKind::Get)?;

        let found = store.find(&resource.name, identity);
        Ok(found
            .into_iter()
            .map(|index| store.records[index].1.clone())
            .collect())
    }

    async fn create(
        &self,
        resource: &ResourceType,
        identity: &ConfigurationObject,
        payload: &ConfigurationObject,
    ) -> Result<RemoteResponse, ClientError> {
        let mut store = self.store();
        store.calls.push(Call::Create {
            resource: resource.name.clone(),
            payload: payload.clone(),
        });
        store.take_failure(CallKind::Create)?;

        let (landed, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut store.racers)
            .into_iter()
            .partition(|(name, _)| *name == resource.name);
        store.racers = waiting;
        store.records.extend(landed);

        if !store.find(&resource.name, identity).is_empty() {
            return Err(ClientError::application(
                409,
                format!("duplicate entry: {}", resource.describe_identity(identity)),
            ));
        }

        let mut object = payload.clone();
        object.extend(identity.clone());
        for field in template_fields(&resource.item_path) {
            if object.contains_key(&field) {
                continue;
            }
            let generated = if field == "uuid" {
                Uuid::new_v4().to_string()
            } else {
                store.next_id += 1;
                store.next_id.to_string()
            };
            object.insert(field, Value::String(generated));
        }

        debug!(resource = %resource.name, "created in-memory record");
        store.records.push((resource.name.clone(), object.clone()));
        Ok(store.respond(resource, Value::Object(object)))
    }

    async fn update(
        &self,
        resource: &ResourceType,
        locator: &ConfigurationObject,
        body: &ConfigurationObject,
    ) -> Result<RemoteResponse, ClientError> {
        let mut store = self.store();
        store.calls.push(Call::Update {
            resource: resource.name.clone(),
            body: body.clone(),
        });
        store.take_failure(CallKind::Update)?;

        let index = store.locate(resource, locator)?;
        let object = &mut store.records[index].1;
        match resource.update_mode {
            UpdateMode::Patch => object.extend(body.clone()),
            UpdateMode::Put => {
                let mut replaced = body.clone();
                for field in template_fields(&resource.item_path) {
                    if let Some(value) = object.get(&field) {
                        replaced.entry(field).or_insert_with(|| value.clone());
                    }
                }
                *object = replaced;
            }
        }
        let response = Value::Object(object.clone());
        Ok(store.respond(resource, response))
    }

    async fn delete(
        &self,
        resource: &ResourceType,
        locator: &ConfigurationObject,
    ) -> Result<RemoteResponse, ClientError> {
        let mut store = self.store();
        store.calls.push(Call::Delete {
            resource: resource.name.clone(),
        });
        store.take_failure(CallKind::Delete)?;

        let index = store.locate(resource, locator)?;
        store.records.remove(index);
        Ok(store.respond(resource, Value::Null))
    }

    async fn get_job(
        &self,
        resource: &ResourceType,
        job: &JobRef,
    ) -> Result<Option<JobStatus>, ClientError> {
        let mut store = self.store();
        store.calls.push(Call::GetJob {
            resource: resource.name.clone(),
            job: job.clone(),
        });
        store.take_failure(CallKind::GetJob)?;

        let Some(statuses) = store.jobs.get_mut(&job.id) else {
            return Ok(None);
        };
        let status = if statuses.len() > 1 {
            statuses.pop_front().flatten()
        } else {
            statuses.front().cloned().flatten()
        };
        Ok(status)
    }
}
