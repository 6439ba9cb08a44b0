//! Job monitor: polls an ETL job until it reaches a terminal status.
//!
//! `Pending` and `Running` are the only non-terminal states. Once a
//! terminal status is observed no further status queries are made:
//! - `Succeeded` returns a [`JobOutcome`]
//! - `Failed` / `Cancelled` return [`VenaError::JobFailed`] with whatever
//!   error detail the API reports for the job
//!
//! With a timeout configured, the monitor gives up with
//! [`VenaError::JobTimeout`] once the deadline passes without a terminal
//! status. The remote job keeps running; there is no cancellation call.

mod clock;

pub use clock::{Clock, SystemClock};

use std::fmt;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::client::VenaClient;
use crate::config::PollOptions;
use crate::error::VenaError;
use crate::transport::Transport;

/// Lifecycle state of an ETL job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Maps the API's status text (case-insensitive).
    ///
    /// Unrecognised values are treated as `Running` so that new
    /// intermediate states never end polling early.
    pub fn from_api(status: &str) -> Self {
        match status.trim().to_ascii_uppercase().as_str() {
            "COMPLETED" | "SUCCEEDED" | "SUCCESS" => JobStatus::Succeeded,
            "ERROR" | "FAILED" | "FAILURE" => JobStatus::Failed,
            "CANCELLED" | "CANCELED" => JobStatus::Cancelled,
            "NOT_STARTED" | "PENDING" | "QUEUED" | "CREATED" => JobStatus::Pending,
            _ => JobStatus::Running,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobStatus::Pending => "Pending",
            JobStatus::Running => "Running",
            JobStatus::Succeeded => "Succeeded",
            JobStatus::Failed => "Failed",
            JobStatus::Cancelled => "Cancelled",
        };
        f.write_str(name)
    }
}

/// One answer from the job status endpoint.
#[derive(Clone, Debug, PartialEq)]
pub struct JobObservation {
    pub status: JobStatus,
    /// Status text exactly as the API sent it.
    pub raw_status: String,
    /// Full response body.
    pub payload: Value,
}

impl JobObservation {
    /// Accepts either a bare JSON string (`"COMPLETED"`) or an object with a
    /// `status` field.
    pub fn from_json(payload: Value) -> Option<Self> {
        let raw_status = match &payload {
            Value::String(s) => s.clone(),
            Value::Object(map) => map.get("status")?.as_str()?.to_string(),
            _ => return None,
        };
        Some(Self {
            status: JobStatus::from_api(&raw_status),
            raw_status,
            payload,
        })
    }
}

/// Result of a job that finished successfully.
#[derive(Clone, Debug, PartialEq)]
pub struct JobOutcome {
    pub job_id: String,
    pub status: JobStatus,
    /// Number of status queries made, including the terminal one.
    pub polls: usize,
    pub elapsed: Duration,
    /// Body of the terminal status response.
    pub payload: Value,
}

impl<T: Transport, C: Clock> VenaClient<T, C> {
    /// Queries the job status endpoint once.
    pub fn job_status(&self, job_id: &str) -> Result<JobObservation, VenaError> {
        let url = self.endpoint(&["etl", "jobs", job_id, "status"])?;
        let payload = self.get_json(&url)?;
        JobObservation::from_json(payload).ok_or_else(|| VenaError::UnexpectedResponse {
            url,
            message: "expected a status string or an object with a 'status' field".to_string(),
        })
    }

    /// Fetches the full job record.
    pub fn job_details(&self, job_id: &str) -> Result<Value, VenaError> {
        let url = self.endpoint(&["etl", "jobs", job_id])?;
        self.get_json(&url)
    }

    /// Blocks until `job_id` reaches a terminal status.
    ///
    /// # Errors
    /// - [`VenaError::JobFailed`] if the job ends `Failed` or `Cancelled`
    /// - [`VenaError::JobTimeout`] if `options.timeout` elapses first
    /// - [`VenaError::Transport`] if a status query fails
    pub fn await_completion(
        &self,
        job_id: &str,
        options: &PollOptions,
    ) -> Result<JobOutcome, VenaError> {
        let clock = self.clock();
        let started = clock.now();

        let initial_delay = match options.timeout {
            Some(timeout) => options.initial_delay.min(timeout),
            None => options.initial_delay,
        };
        clock.sleep(initial_delay);

        let mut polls = 0;
        loop {
            let observation = self.job_status(job_id)?;
            polls += 1;
            let elapsed = clock.now().saturating_sub(started);

            match observation.status {
                JobStatus::Succeeded => {
                    info!(job_id, polls, ?elapsed, "job completed successfully");
                    return Ok(JobOutcome {
                        job_id: job_id.to_string(),
                        status: observation.status,
                        polls,
                        elapsed,
                        payload: observation.payload,
                    });
                }
                JobStatus::Failed | JobStatus::Cancelled => {
                    let detail = self.failure_detail(job_id, &observation.payload);
                    warn!(
                        job_id,
                        status = %observation.raw_status,
                        detail = detail.as_deref().unwrap_or(""),
                        "job did not complete"
                    );
                    return Err(VenaError::JobFailed {
                        job_id: job_id.to_string(),
                        status: observation.status,
                        detail,
                    });
                }
                JobStatus::Pending | JobStatus::Running => {
                    info!(job_id, status = %observation.raw_status, "job in progress");
                }
            }

            let wait = match options.timeout {
                Some(timeout) if elapsed >= timeout => {
                    return Err(VenaError::JobTimeout {
                        job_id: job_id.to_string(),
                        elapsed,
                        last_status: observation.status,
                    });
                }
                Some(timeout) => options.poll_interval.min(timeout - elapsed),
                None => options.poll_interval,
            };
            clock.sleep(wait);
        }
    }

    /// Error text for a failed job: from the status payload if it has one,
    /// otherwise from the job record. Never fails.
    fn failure_detail(&self, job_id: &str, status_payload: &Value) -> Option<String> {
        if let Some(detail) = extract_error_detail(status_payload, false) {
            return Some(detail);
        }
        match self.job_details(job_id) {
            Ok(record) => extract_error_detail(&record, true),
            Err(err) => {
                debug!(job_id, error = %err, "could not fetch job details");
                None
            }
        }
    }
}

/// Pulls `error`, then `message`, out of a job payload. With `whole_body`,
/// any other non-empty object is rendered in full.
fn extract_error_detail(payload: &Value, whole_body: bool) -> Option<String> {
    let map = payload.as_object()?;
    for key in ["error", "message"] {
        match map.get(key) {
            Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
            Some(Value::Null) | None => {}
            Some(Value::String(_)) => {}
            Some(other) => return Some(other.to_string()),
        }
    }
    (whole_body && !map.is_empty()).then(|| payload.to_string())
}
