use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::job::JobStatus;

/// The main error type for vepi operations.
#[derive(Debug, Error)]
pub enum VenaError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("{}", transport_message(.url, .status, .message, .body))]
    Transport {
        url: String,
        /// `None` when the host could not be reached at all.
        status: Option<u16>,
        message: String,
        body: String,
    },

    #[error("Unexpected response from {url}: {message}")]
    UnexpectedResponse { url: String, message: String },

    #[error("Job {job_id} ended with status {status}{}", detail_suffix(.detail))]
    JobFailed {
        job_id: String,
        status: JobStatus,
        detail: Option<String>,
    },

    #[error("Job {job_id} did not finish within {elapsed:?} (last status: {last_status})")]
    JobTimeout {
        job_id: String,
        elapsed: Duration,
        last_status: JobStatus,
    },

    #[error("Invalid table: {0}")]
    InvalidTable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse CSV from {path}: {source}")]
    CsvParse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to write CSV to {path}: {source}")]
    CsvWrite {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl VenaError {
    /// HTTP status carried by a transport error, if the server answered.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            VenaError::Transport { status, .. } => *status,
            _ => None,
        }
    }
}

fn transport_message(url: &str, status: &Option<u16>, message: &str, body: &str) -> String {
    match status {
        Some(code) if body.is_empty() => format!("HTTP {code} from {url}: {message}"),
        Some(code) => format!("HTTP {code} from {url}: {message}\nResponse body: {body}"),
        None => format!("Request to {url} failed: {message}"),
    }
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|d| format!(": {d}"))
        .unwrap_or_default()
}
