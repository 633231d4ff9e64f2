//! Polling of asynchronous remote jobs

use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use super::JobError;
use crate::client::{JobRef, JobState, RemoteClient};
use crate::resources::ResourceType;
use crate::state::ExecutionOptions;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed { detail: Option<String> },
    /// Timeout was zero; the job was left running unobserved.
    Detached,
}

pub struct JobWatcher<'a, C> {
    client: &'a C,
    resource: &'a ResourceType,
    timeout: Duration,
    interval: Duration,
}

impl<'a, C: RemoteClient> JobWatcher<'a, C> {
    pub fn new(client: &'a C, resource: &'a ResourceType, options: &ExecutionOptions) -> Self {
        Self::with_timing(
            client,
            resource,
            options.job_timeout(),
            options.poll_interval(),
        )
    }

    pub fn with_timing(
        client: &'a C,
        resource: &'a ResourceType,
        timeout: Duration,
        interval: Duration,
    ) -> Self {
        Self {
            client,
            resource,
            timeout,
            interval,
        }
    }

    /// Polls `job` until it reaches a terminal state or the timeout passes.
    ///
    /// A job that cannot be found is looked up once more through
    /// [`JobRef::alternate`] before giving up.
    pub async fn wait(&self, job: &JobRef) -> Result<JobOutcome, JobError> {
        if self.timeout.is_zero() {
            info!(job = %job, "timeout is 0, not waiting for job");
            return Ok(JobOutcome::Detached);
        }

        let start = Instant::now();
        let mut current = job.clone();
        let mut retried = false;

        loop {
            let status = self
                .client
                .get_job(self.resource, &current)
                .await
                .map_err(|source| JobError::Remote {
                    job: job.to_string(),
                    source,
                })?;

            let Some(status) = status else {
                if retried {
                    return Err(JobError::Lookup {
                        job: job.to_string(),
                    });
                }
                retried = true;
                let alternate = current.alternate();
                warn!(job = %current, alternate = %alternate, "job not found, retrying");
                if alternate == current {
                    sleep(self.next_delay(start)).await;
                }
                current = alternate;
                continue;
            };

            match status.state {
                JobState::Success => {
                    info!(job = %current, elapsed = ?start.elapsed(), "job completed");
                    return Ok(JobOutcome::Completed {
                        detail: status.detail,
                    });
                }
                JobState::Failure => {
                    return Err(JobError::Failed {
                        job: job.to_string(),
                        detail: status
                            .detail
                            .unwrap_or_else(|| "no detail reported".to_string()),
                    });
                }
                ref state if state.is_pending() => {
                    if start.elapsed() >= self.timeout {
                        return Err(JobError::Timeout {
                            job: job.to_string(),
                            timeout_secs: self.timeout.as_secs(),
                        });
                    }
                    debug!(
                        job = %current,
                        %state,
                        detail = status.detail.as_deref().unwrap_or(""),
                        "job pending"
                    );
                    sleep(self.next_delay(start)).await;
                }
                other => {
                    return Err(JobError::UnexpectedState {
                        job: job.to_string(),
                        state: other.to_string(),
                    });
                }
            }
        }
    }

    fn next_delay(&self, start: Instant) -> Duration {
        self.interval
            .min(self.timeout.saturating_sub(start.elapsed()))
    }
}
