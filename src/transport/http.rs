use std::time::Duration;

use tracing::{debug, trace};
use ureq::unversioned::multipart::{Form, Part};

use super::{ApiRequest, ApiResponse, Method, RequestBody, Transport};
use crate::error::VenaError;

/// Per-request timeout used by [`UreqTransport::new`].
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

// Export pages of 50k intersections run well past ureq's 10 MB default.
const MAX_BODY_BYTES: u64 = 1024 * 1024 * 1024;

/// Blocking transport backed by a shared `ureq` agent.
///
/// The agent keeps a connection pool, so consecutive calls to the same hub
/// reuse connections.
#[derive(Clone, Debug)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();
        Self {
            agent: config.into(),
        }
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, VenaError> {
        let url = request.full_url()?;
        let url_str = url.as_str();
        debug!(method = %request.method, url = url_str, "sending request");

        let unreachable = |source: ureq::Error| VenaError::Transport {
            url: url_str.to_string(),
            status: None,
            message: source.to_string(),
            body: String::new(),
        };

        let result = match (request.method, &request.body) {
            (Method::Get, _) => with_headers(self.agent.get(url_str), &request.headers).call(),
            (Method::Post, RequestBody::Empty) => {
                with_headers(self.agent.post(url_str), &request.headers).send_empty()
            }
            (Method::Post, RequestBody::Json(value)) => {
                with_headers(self.agent.post(url_str), &request.headers).send_json(value)
            }
            (Method::Post, RequestBody::Multipart(form)) => {
                let mut multipart = Form::new();
                for part in form.iter() {
                    let mut body = Part::bytes(&part.data);
                    if let Some(file_name) = &part.file_name {
                        body = body.file_name(file_name.as_str());
                    }
                    if let Some(content_type) = &part.content_type {
                        body = body.mime_str(content_type.as_str()).map_err(|source| {
                            VenaError::Transport {
                                url: url_str.to_string(),
                                status: None,
                                message: format!(
                                    "invalid content type for part '{}': {source}",
                                    part.name
                                ),
                                body: String::new(),
                            }
                        })?;
                    }
                    multipart = multipart.part(part.name.as_str(), body);
                }
                // ureq sets the multipart Content-Type with its boundary.
                with_headers(self.agent.post(url_str), &request.headers).send(multipart)
            }
        };

        let mut response = result.map_err(unreachable)?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_BYTES)
            .read_to_string()
            .map_err(unreachable)?;

        trace!(status, bytes = body.len(), "received response");
        Ok(ApiResponse { status, body })
    }
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}
