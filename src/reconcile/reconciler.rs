//! Fetch, compare, mutate, wait and report for one resource identity

use serde_json::{Map, Value};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::comparator::{Comparator, Comparison};
use super::job::{JobOutcome, JobWatcher};
use super::{JobError, ReconcileError};
use crate::client::{ClientError, RemoteClient, RemoteResponse};
use crate::resources::{FieldSetting, ResourceRegistry, ResourceType, UpdateMode};
use crate::schema::SchemaValidator;
use crate::state::{
    Action, ConfigurationObject, DesiredState, ExecutionOptions, FieldChanges,
    ReconciliationResult,
};

/// One validated run against one resource identity.
struct Run<'a> {
    resource: &'a ResourceType,
    options: &'a ExecutionOptions,
    config: ConfigurationObject,
    identity: ConfigurationObject,
    target: String,
}

pub struct Reconciler<C> {
    client: C,
    registry: ResourceRegistry,
}

impl<C: RemoteClient> Reconciler<C> {
    pub fn new(client: C, registry: ResourceRegistry) -> Self {
        Self { client, registry }
    }

    pub fn with_builtin_resources(client: C) -> Self {
        Self::new(client, ResourceRegistry::with_builtin_resources())
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    /// Like [`reconcile`](Self::reconcile) but renders failures into the
    /// result, so exactly one record comes out of every run.
    pub async fn run(&self, desired: &DesiredState) -> ReconciliationResult {
        match self.reconcile(desired).await {
            Ok(result) => result,
            Err(e) => {
                error!("{}", e);
                ReconciliationResult::failed(e.to_string(), e.response())
            }
        }
    }

    pub async fn reconcile(
        &self,
        desired: &DesiredState,
    ) -> Result<ReconciliationResult, ReconcileError> {
        let resource = self
            .registry
            .get(&desired.resource)
            .ok_or_else(|| ReconcileError::UnknownResource(desired.resource.clone()))?;

        let config = SchemaValidator::validate(&resource.schema, &desired.config, desired.intent)?;
        let identity =
            resource
                .identity_of(&config)
                .map_err(|fields| ReconcileError::MissingIdentity {
                    resource: resource.name.clone(),
                    fields,
                })?;
        let described = resource.describe_identity(&identity);
        let run = Run {
            resource,
            options: &desired.options,
            target: format!("{} {}", resource.name, described),
            config,
            identity,
        };

        let span = info_span!(
            "reconcile",
            resource = %resource.name,
            identity = %described,
            intent = %desired.intent,
            run_id = %Uuid::new_v4()
        );
        self.execute(run, desired).instrument(span).await
    }

    async fn execute(
        &self,
        run: Run<'_>,
        desired: &DesiredState,
    ) -> Result<ReconciliationResult, ReconcileError> {
        let mut matches = self
            .client
            .get(run.resource, &run.identity)
            .await
            .map_err(|e| ReconcileError::remote("fetch", &run.target, e))?;
        if matches.len() > 1 {
            return Err(ReconcileError::AmbiguousResource {
                target: run.target,
                count: matches.len(),
            });
        }
        let current = matches.pop();

        let comparison =
            Comparator::new(run.resource).compare(desired.intent, &run.config, current.as_ref())?;
        let diff = run
            .options
            .diff_mode
            .then(|| field_changes(&run, &comparison, current.as_ref()));

        if comparison.action == Action::None {
            let message = if comparison.exists {
                format!("{} is already in the desired state", run.target)
            } else {
                format!("{} is already absent", run.target)
            };
            return Ok(ReconciliationResult::unchanged(message).with_diff(diff));
        }

        if run.options.check_mode {
            info!(action = %comparison.action, "check mode, no changes made");
            return Ok(ReconciliationResult::changed(
                comparison.action,
                format!("Would {} {}", comparison.action, run.target),
                Value::Null,
            )
            .with_diff(diff));
        }

        let result = match (comparison.action, current) {
            (Action::Create, _) => self.create(&run, comparison.diff).await?,
            (Action::Update, Some(current)) => self.update(&run, comparison.diff, current).await?,
            (Action::Delete, Some(current)) => self.delete(&run, current).await?,
            _ => ReconciliationResult::unchanged(format!("{} needs no change", run.target)),
        };
        let changed = result.changed;
        Ok(result.with_diff(diff.filter(|_| changed)))
    }

    async fn create(
        &self,
        run: &Run<'_>,
        payload: ConfigurationObject,
    ) -> Result<ReconciliationResult, ReconcileError> {
        let (deferred, payload): (ConfigurationObject, ConfigurationObject) = payload
            .into_iter()
            .partition(|(field, _)| run.resource.is_deferred(field));

        info!("creating {}", run.target);
        let response = match self.client.create(run.resource, &run.identity, &payload).await {
            Ok(response) => response,
            Err(e) if e.is_already_exists() => return self.lost_create_race(run, e).await,
            Err(e) => return Err(ReconcileError::remote("create", &run.target, e)),
        };
        self.await_job("create", run, &response).await?;
        let mut latest = response.response;

        if !deferred.is_empty() {
            let fields: Vec<String> = deferred.keys().cloned().collect();
            let mut created = self
                .client
                .get(run.resource, &run.identity)
                .await
                .map_err(|e| ReconcileError::remote("fetch", &run.target, e))?;
            if created.len() > 1 {
                return Err(ReconcileError::AmbiguousResource {
                    target: run.target.clone(),
                    count: created.len(),
                });
            }
            let created = created
                .pop()
                .ok_or_else(|| ReconcileError::MissingAfterCreate {
                    target: run.target.clone(),
                    fields: fields.clone(),
                })?;

            info!("applying {} to {} after create", fields.join(", "), run.target);
            let locator = locator(&created, &run.identity);
            let response = self
                .client
                .update(run.resource, &locator, &deferred)
                .await
                .map_err(|e| ReconcileError::remote("update", &run.target, e))?;
            self.await_job("update", run, &response).await?;
            latest = response.response;
        }

        Ok(ReconciliationResult::changed(
            Action::Create,
            format!("Created {}", run.target),
            latest,
        ))
    }

    /// A create rejected as a duplicate only counts as a lost race when
    /// the identity now resolves to exactly one object.
    async fn lost_create_race(
        &self,
        run: &Run<'_>,
        error: ClientError,
    ) -> Result<ReconciliationResult, ReconcileError> {
        let found = self
            .client
            .get(run.resource, &run.identity)
            .await
            .map_err(|e| ReconcileError::remote("fetch", &run.target, e))?;
        if found.len() != 1 {
            return Err(ReconcileError::remote("create", &run.target, error));
        }

        warn!(
            "{} was created concurrently: {}",
            run.target,
            error.vendor_message()
        );
        Ok(ReconciliationResult::unchanged(format!(
            "{} already exists",
            run.target
        )))
    }

    async fn update(
        &self,
        run: &Run<'_>,
        diff: ConfigurationObject,
        current: ConfigurationObject,
    ) -> Result<ReconciliationResult, ReconcileError> {
        let fields: Vec<String> = diff.keys().cloned().collect();
        let body = match run.resource.update_mode {
            UpdateMode::Patch => diff,
            UpdateMode::Put => {
                let mut merged = current.clone();
                merged.extend(diff);
                merged
            }
        };

        info!("updating {} on {}", fields.join(", "), run.target);
        let response = self
            .client
            .update(run.resource, &locator(&current, &run.identity), &body)
            .await
            .map_err(|e| ReconcileError::remote("update", &run.target, e))?;
        self.await_job("update", run, &response).await?;

        Ok(ReconciliationResult::changed(
            Action::Update,
            format!("Updated {} on {}", fields.join(", "), run.target),
            response.response,
        ))
    }

    async fn delete(
        &self,
        run: &Run<'_>,
        current: ConfigurationObject,
    ) -> Result<ReconciliationResult, ReconcileError> {
        let locator = locator(&current, &run.identity);

        if run.options.force_unmount {
            if let Some(unmount) = &run.resource.unmount {
                self.precondition("unmount", run, unmount, &current, &locator)
                    .await?;
            }
        }
        if run.options.force_offline {
            if let Some(offline) = &run.resource.offline {
                self.precondition("offline", run, offline, &current, &locator)
                    .await?;
            }
        }

        info!("deleting {}", run.target);
        let response = match self.client.delete(run.resource, &locator).await {
            Ok(response) => response,
            Err(e) if e.is_not_found() => {
                warn!("{} disappeared before delete", run.target);
                return Ok(ReconciliationResult::unchanged(format!(
                    "{} is already absent",
                    run.target
                )));
            }
            Err(e) => return Err(ReconcileError::remote("delete", &run.target, e)),
        };

        match self.await_job("delete", run, &response).await {
            Ok(()) => {}
            Err(ReconcileError::Job {
                source: JobError::Failed { detail, .. },
                ..
            }) if reports_missing(&detail) => {
                warn!("{} disappeared before delete: {}", run.target, detail);
                return Ok(ReconciliationResult::unchanged(format!(
                    "{} is already absent",
                    run.target
                )));
            }
            Err(e) => return Err(e),
        }

        Ok(ReconciliationResult::changed(
            Action::Delete,
            format!("Deleted {}", run.target),
            response.response,
        ))
    }

    /// Applies one delete precondition when the current state needs it.
    async fn precondition(
        &self,
        action: &str,
        run: &Run<'_>,
        setting: &FieldSetting,
        current: &ConfigurationObject,
        locator: &ConfigurationObject,
    ) -> Result<(), ReconcileError> {
        if !setting.differs_from(current) {
            return Ok(());
        }

        info!("{} {} before delete", action, run.target);
        let mut body = ConfigurationObject::new();
        body.insert(setting.field.clone(), setting.value.clone());
        let response = self
            .client
            .update(run.resource, locator, &body)
            .await
            .map_err(|e| ReconcileError::remote(action, &run.target, e))?;
        self.await_job(action, run, &response).await
    }

    async fn await_job(
        &self,
        action: &str,
        run: &Run<'_>,
        response: &RemoteResponse,
    ) -> Result<(), ReconcileError> {
        let Some(job) = &response.job else {
            return Ok(());
        };
        let outcome = JobWatcher::new(&self.client, run.resource, run.options)
            .wait(job)
            .await
            .map_err(|source| ReconcileError::job(action, &run.target, source))?;
        if outcome == JobOutcome::Detached {
            warn!("{} of {} continues in the background as job {}", action, run.target, job);
        }
        Ok(())
    }
}

/// The fetched object with the identity laid over it.
fn locator(current: &ConfigurationObject, identity: &ConfigurationObject) -> ConfigurationObject {
    let mut locator = current.clone();
    locator.extend(identity.clone());
    locator
}

fn reports_missing(detail: &str) -> bool {
    let detail = detail.to_ascii_lowercase();
    ["not found", "does not exist", "doesn't exist"]
        .iter()
        .any(|phrase| detail.contains(phrase))
}

fn field_changes(
    run: &Run<'_>,
    comparison: &Comparison,
    current: Option<&ConfigurationObject>,
) -> FieldChanges {
    let schema = &run.resource.schema;
    let masked = |object: &ConfigurationObject| Value::Object(schema.mask(object));
    match comparison.action {
        Action::Create => FieldChanges {
            before: Value::Null,
            after: masked(&comparison.diff),
        },
        Action::Delete => FieldChanges {
            before: current.map(masked).unwrap_or(Value::Null),
            after: Value::Null,
        },
        Action::Update | Action::None => {
            let before: Map<String, Value> = comparison
                .diff
                .keys()
                .map(|field| {
                    let value = current
                        .and_then(|c| c.get(field))
                        .cloned()
                        .unwrap_or(Value::Null);
                    (field.clone(), value)
                })
                .collect();
            FieldChanges {
                before: masked(&before),
                after: masked(&comparison.diff),
            }
        }
    }
}
