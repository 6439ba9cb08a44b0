//! Importer: submits data to a Vena ETL template and waits for the job.
//!
//! Two submission paths exist:
//! - File upload (`startWithFile`): CSV content sent as multipart form data.
//!   The content can come from a path, a [`Table`] or any reader
//!   ([`FileSource`]); all three are normalized to an [`UploadFile`] once.
//! - Direct data (`startWithData`): rows posted as JSON, encoded per the
//!   client's [`DataLayout`](crate::config::DataLayout).
//!
//! Either way the returned job id goes straight to the job monitor and the
//! call blocks until the job resolves. Column names are not checked against
//! the template locally; a mismatch comes back as a failed job.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::client::VenaClient;
use crate::error::VenaError;
use crate::job::{Clock, JobOutcome};
use crate::table::{rows_to_json, to_csv_bytes, Table};
use crate::transport::{ApiRequest, MultipartForm, RequestBody, Transport};

/// File name used when the source has none of its own.
pub const DEFAULT_FILE_NAME: &str = "data.csv";

/// Form field that carries the upload.
pub const FILE_FIELD: &str = "file";

/// Content type of the uploaded part.
pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

/// Where file-upload content comes from.
pub enum FileSource<'a> {
    /// A CSV file on disk, uploaded byte for byte.
    Path(&'a Path),
    /// A table, serialized to CSV in memory.
    Table(&'a Table),
    /// Any reader; drained completely before the upload starts.
    Stream(&'a mut dyn Read),
}

impl<'a> From<&'a Path> for FileSource<'a> {
    fn from(path: &'a Path) -> Self {
        FileSource::Path(path)
    }
}

impl<'a> From<&'a PathBuf> for FileSource<'a> {
    fn from(path: &'a PathBuf) -> Self {
        FileSource::Path(path.as_path())
    }
}

impl<'a> From<&'a Table> for FileSource<'a> {
    fn from(table: &'a Table) -> Self {
        FileSource::Table(table)
    }
}

impl<'a> From<&'a mut dyn Read> for FileSource<'a> {
    fn from(reader: &'a mut dyn Read) -> Self {
        FileSource::Stream(reader)
    }
}

/// Normalized upload: a file name and its bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub content: Vec<u8>,
}

impl FileSource<'_> {
    /// Reads or serializes the source. `file_name` overrides the default
    /// (the path's own name, or [`DEFAULT_FILE_NAME`]).
    pub fn into_upload(self, file_name: Option<&str>) -> Result<UploadFile, VenaError> {
        let (default_name, content) = match self {
            FileSource::Path(path) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string());
                (name, fs::read(path)?)
            }
            FileSource::Table(table) => {
                ensure_not_empty(table)?;
                (DEFAULT_FILE_NAME.to_string(), to_csv_bytes(table)?)
            }
            FileSource::Stream(reader) => {
                let mut content = Vec::new();
                reader.read_to_end(&mut content)?;
                (DEFAULT_FILE_NAME.to_string(), content)
            }
        };

        Ok(UploadFile {
            file_name: file_name.map(str::to_string).unwrap_or(default_name),
            content,
        })
    }
}

impl<T: Transport, C: Clock> VenaClient<T, C> {
    /// Uploads CSV content to the template and waits for the import job.
    ///
    /// # Example
    /// ```no_run
    /// use std::path::Path;
    /// use vepi::{ClientConfig, VenaClient};
    ///
    /// let client = VenaClient::new(ClientConfig::new("us1", "user", "key", "tpl")?);
    /// let outcome = client.start_with_file(Path::new("actuals.csv"))?;
    /// println!("job {} finished after {} polls", outcome.job_id, outcome.polls);
    /// # Ok::<(), vepi::VenaError>(())
    /// ```
    pub fn start_with_file<'a>(
        &self,
        source: impl Into<FileSource<'a>>,
    ) -> Result<JobOutcome, VenaError> {
        let upload = source.into().into_upload(None)?;
        let job_id = self.submit_file(upload)?;
        self.await_completion(&job_id, self.poll_options())
    }

    /// Like [`start_with_file`](Self::start_with_file) with an explicit
    /// upload file name.
    pub fn start_with_file_named<'a>(
        &self,
        source: impl Into<FileSource<'a>>,
        file_name: &str,
    ) -> Result<JobOutcome, VenaError> {
        let upload = source.into().into_upload(Some(file_name))?;
        let job_id = self.submit_file(upload)?;
        self.await_completion(&job_id, self.poll_options())
    }

    /// Posts the table's rows as JSON and waits for the import job.
    pub fn start_with_data(&self, table: &Table) -> Result<JobOutcome, VenaError> {
        let job_id = self.submit_data(table)?;
        self.await_completion(&job_id, self.poll_options())
    }

    /// Same as [`start_with_data`](Self::start_with_data).
    pub fn import_dataframe(&self, table: &Table) -> Result<JobOutcome, VenaError> {
        self.start_with_data(table)
    }

    /// Starts a file import and returns the job id without waiting.
    pub fn submit_file(&self, upload: UploadFile) -> Result<String, VenaError> {
        let url = self.template_endpoint("startWithFile")?;
        info!(
            template_id = self.config().template_id(),
            file_name = %upload.file_name,
            bytes = upload.content.len(),
            "starting ETL job with file"
        );

        let form = MultipartForm::new().file(
            FILE_FIELD,
            upload.file_name,
            CSV_CONTENT_TYPE,
            upload.content,
        );
        let response = self.execute(ApiRequest::post(&url, RequestBody::Multipart(form)))?;
        parse_job_id(&response.json(&url)?, &url)
    }

    /// Starts a direct-data import and returns the job id without waiting.
    pub fn submit_data(&self, table: &Table) -> Result<String, VenaError> {
        ensure_not_empty(table)?;
        let url = self.template_endpoint("startWithData")?;
        info!(
            template_id = self.config().template_id(),
            rows = table.num_rows(),
            layout = ?self.data_layout(),
            "starting ETL job with data"
        );

        let body = json!({ "input": { "data": rows_to_json(table, self.data_layout()) } });
        let response = self.execute(ApiRequest::post(&url, RequestBody::Json(body)))?;
        parse_job_id(&response.json(&url)?, &url)
    }

    fn template_endpoint(&self, action: &str) -> Result<String, VenaError> {
        self.endpoint(&["etl", "templates", self.config().template_id(), action])
    }
}

fn ensure_not_empty(table: &Table) -> Result<(), VenaError> {
    if table.is_empty() {
        return Err(VenaError::InvalidTable(
            "cannot import an empty table".to_string(),
        ));
    }
    Ok(())
}

/// Body of a successful start call.
#[derive(Deserialize)]
struct StartedJob {
    id: JobId,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JobId {
    Text(String),
    Number(serde_json::Number),
}

fn parse_job_id(body: &Value, url: &str) -> Result<String, VenaError> {
    let id = StartedJob::deserialize(body)
        .ok()
        .and_then(|job| match job.id {
            JobId::Text(id) if !id.is_empty() => Some(id),
            JobId::Text(_) => None,
            JobId::Number(id) => Some(id.to_string()),
        });
    id.ok_or_else(|| VenaError::UnexpectedResponse {
        url: url.to_string(),
        message: format!("response has no job id: {body}"),
    })
}
