//! The Vena API client.
//!
//! [`VenaClient`] owns an immutable [`ClientConfig`], a [`Transport`] and a
//! [`Clock`]. The operations themselves live next to their components:
//! - [`crate::import`]: `start_with_file`, `start_with_data`, `import_dataframe`
//! - [`crate::job`]: `job_status`, `await_completion`
//! - [`crate::export`]: `export_data`
//! - [`crate::hierarchy`]: `get_dimension_hierarchy`

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::Value;
use url::Url;

use crate::config::{ClientConfig, DataLayout, PollOptions};
use crate::error::VenaError;
use crate::job::{Clock, SystemClock};
use crate::transport::{ApiRequest, ApiResponse, Transport, UreqTransport};

/// Synchronous client for one hub, template and model.
///
/// Holds no mutable state: read operations can run from separate client
/// instances in parallel, and each import blocks its caller until the job
/// resolves.
///
/// # Example
/// ```no_run
/// use vepi::{ClientConfig, VenaClient};
///
/// let config = ClientConfig::new("us1", "api-user", "api-key", "template-id")?
///     .with_model_id("model-id");
/// let client = VenaClient::new(config);
/// let intersections = client.export_data(50_000)?;
/// println!("{} rows", intersections.num_rows());
/// # Ok::<(), vepi::VenaError>(())
/// ```
pub struct VenaClient<T = UreqTransport, C = SystemClock> {
    config: ClientConfig,
    transport: T,
    clock: C,
    poll_options: PollOptions,
    data_layout: DataLayout,
    authorization: String,
}

impl VenaClient {
    /// Creates a client that talks to Vena over HTTPS.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_transport(config, UreqTransport::new())
    }
}

impl<T: Transport> VenaClient<T, SystemClock> {
    /// Creates a client that sends every request through `transport`.
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        let credentials = format!("{}:{}", config.api_user(), config.api_key());
        let authorization = format!("Basic {}", STANDARD.encode(credentials));
        Self {
            config,
            transport,
            clock: SystemClock::default(),
            poll_options: PollOptions::default(),
            data_layout: DataLayout::default(),
            authorization,
        }
    }
}

impl<T: Transport, C: Clock> VenaClient<T, C> {
    /// Replaces the time source used while polling jobs.
    pub fn with_clock<C2: Clock>(self, clock: C2) -> VenaClient<T, C2> {
        VenaClient {
            config: self.config,
            transport: self.transport,
            clock,
            poll_options: self.poll_options,
            data_layout: self.data_layout,
            authorization: self.authorization,
        }
    }

    pub fn with_poll_options(mut self, poll_options: PollOptions) -> Self {
        self.poll_options = poll_options;
        self
    }

    pub fn with_data_layout(mut self, data_layout: DataLayout) -> Self {
        self.data_layout = data_layout;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn poll_options(&self) -> &PollOptions {
        &self.poll_options
    }

    pub fn data_layout(&self) -> DataLayout {
        self.data_layout
    }

    pub(crate) fn clock(&self) -> &C {
        &self.clock
    }

    /// Absolute URL below the API root. Each segment is percent-encoded,
    /// so ids containing `/`, `?` or `#` stay inside their segment.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<String, VenaError> {
        let base_url = self.config.base_url();
        let invalid = || {
            VenaError::Configuration(format!("base URL '{base_url}' cannot be used as a base"))
        };
        let mut url = Url::parse(&base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|()| invalid())?
            .pop_if_empty()
            .extend(segments);
        Ok(url.into())
    }

    /// Resolves a link returned by the API: absolute URLs pass through,
    /// anything else is joined onto the API root.
    pub(crate) fn resolve_link(&self, link: &str) -> Result<String, VenaError> {
        if let Ok(absolute) = Url::parse(link) {
            return Ok(absolute.into());
        }
        let base = format!("{}/", self.config.base_url());
        Url::parse(&base)
            .and_then(|base| base.join(link))
            .map(Into::into)
            .map_err(|source| VenaError::UnexpectedResponse {
                url: link.to_string(),
                message: format!("cannot resolve link: {source}"),
            })
    }

    /// Authenticates and sends `request`; non-2xx responses become errors.
    pub(crate) fn execute(&self, request: ApiRequest) -> Result<ApiResponse, VenaError> {
        let request = request
            .header("Authorization", self.authorization.as_str())
            .header("Accept", "application/json");
        let url = request.url.clone();
        self.transport.send(&request)?.into_success(&url)
    }

    pub(crate) fn get_json(&self, url: &str) -> Result<Value, VenaError> {
        self.execute(ApiRequest::get(url))?.json(url)
    }
}

impl<T, C> std::fmt::Debug for VenaClient<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VenaClient")
            .field("config", &self.config)
            .field("poll_options", &self.poll_options)
            .field("data_layout", &self.data_layout)
            .finish_non_exhaustive()
    }
}
