//! Client configuration.
//!
//! A [`ClientConfig`] is built once and handed to [`crate::VenaClient`]; it
//! never changes afterwards. Credentials are always supplied by the caller;
//! nothing here reads the process environment.

use std::time::Duration;

use url::Url;

use crate::error::VenaError;

/// Delay before the first job status query.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(1);

/// Delay between job status queries.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Default number of intersections requested per export page.
pub const DEFAULT_PAGE_SIZE: usize = 50_000;

/// Connection details for one Vena hub, template and (optionally) model.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    hub: String,
    api_user: String,
    api_key: String,
    template_id: String,
    model_id: Option<String>,
    base_url: Option<String>,
}

impl ClientConfig {
    /// Creates a configuration, rejecting empty required fields.
    ///
    /// # Errors
    /// Returns [`VenaError::Configuration`] naming every blank field.
    pub fn new(
        hub: impl Into<String>,
        api_user: impl Into<String>,
        api_key: impl Into<String>,
        template_id: impl Into<String>,
    ) -> Result<Self, VenaError> {
        let config = Self {
            hub: hub.into().trim().to_string(),
            api_user: api_user.into().trim().to_string(),
            api_key: api_key.into().trim().to_string(),
            template_id: template_id.into().trim().to_string(),
            model_id: None,
            base_url: None,
        };

        let missing: Vec<&str> = [
            ("hub", &config.hub),
            ("api_user", &config.api_user),
            ("api_key", &config.api_key),
            ("template_id", &config.template_id),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            return Err(VenaError::Configuration(format!(
                "{} must not be empty",
                missing.join(", ")
            )));
        }

        Ok(config)
    }

    /// Sets the model used for exports and hierarchy reads.
    ///
    /// A blank id is treated as absent.
    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        let model_id = model_id.into().trim().to_string();
        self.model_id = (!model_id.is_empty()).then_some(model_id);
        self
    }

    /// Overrides the API root (normally `https://{hub}.vena.io/api/public/v1`).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Result<Self, VenaError> {
        let base_url = base_url.into();
        let parsed = Url::parse(&base_url).map_err(|source| {
            VenaError::Configuration(format!("invalid base URL '{base_url}': {source}"))
        })?;
        if parsed.cannot_be_a_base() {
            return Err(VenaError::Configuration(format!(
                "base URL '{base_url}' cannot be used as a base"
            )));
        }
        self.base_url = Some(base_url.trim_end_matches('/').to_string());
        Ok(self)
    }

    pub fn hub(&self) -> &str {
        &self.hub
    }

    pub fn api_user(&self) -> &str {
        &self.api_user
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn template_id(&self) -> &str {
        &self.template_id
    }

    pub fn model_id(&self) -> Option<&str> {
        self.model_id.as_deref()
    }

    /// The model id, or a configuration error naming the operation that needed it.
    pub fn require_model_id(&self, operation: &str) -> Result<&str, VenaError> {
        self.model_id.as_deref().ok_or_else(|| {
            VenaError::Configuration(format!("model_id must be set to {operation}"))
        })
    }

    /// API root without a trailing slash.
    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| format!("https://{}.vena.io/api/public/v1", self.hub))
    }
}

// Keeps the API key out of logs and panic messages.
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("hub", &self.hub)
            .field("api_user", &self.api_user)
            .field("api_key", &"<redacted>")
            .field("template_id", &self.template_id)
            .field("model_id", &self.model_id)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Timing for the job monitor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollOptions {
    /// Wait before the first status query.
    pub initial_delay: Duration,
    /// Wait between consecutive status queries.
    pub poll_interval: Duration,
    /// Give up after this long. `None` polls until a terminal status.
    pub timeout: Option<Duration>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            initial_delay: DEFAULT_INITIAL_DELAY,
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
        }
    }
}

impl PollOptions {
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_initial_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// How `start_with_data` encodes rows in the JSON body.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DataLayout {
    /// One object per row, keyed by column name.
    #[default]
    Records,
    /// One array per row, values in column order, no header row.
    Arrays,
}
