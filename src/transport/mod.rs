//! HTTP plumbing.
//!
//! Everything above this module talks to Vena through the [`Transport`]
//! trait: it hands over a fully described [`ApiRequest`] (absolute URL,
//! query, headers, body) and gets back the raw status and body text. The
//! production implementation is [`UreqTransport`]; tests substitute a
//! scripted one.
//!
//! A `Transport` reports only failures to reach the host. Turning non-2xx
//! statuses into [`VenaError::Transport`] is done by [`ApiResponse::into_success`]
//! so that every implementation behaves the same.

mod http;
mod multipart;

pub use http::{UreqTransport, DEFAULT_REQUEST_TIMEOUT};
pub use multipart::{FormPart, MultipartForm};

use std::fmt;

use serde_json::Value;
use url::Url;

use crate::error::VenaError;

/// HTTP method.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
        }
    }
}

/// Request payload.
#[derive(Clone, Debug, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Multipart(MultipartForm),
}

/// A fully resolved API call.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Absolute URL, possibly already carrying a query string.
    pub url: String,
    /// Extra query parameters appended to `url`.
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn post(url: impl Into<String>, body: RequestBody) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body,
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Value of the first header called `name` (case-insensitive).
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// `url` with `query` appended.
    pub fn full_url(&self) -> Result<Url, VenaError> {
        let mut url = Url::parse(&self.url).map_err(|source| VenaError::Transport {
            url: self.url.clone(),
            status: None,
            message: format!("invalid URL: {source}"),
            body: String::new(),
        })?;
        if !self.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }
}

/// Raw response from a [`Transport`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Passes 2xx responses through and turns everything else into
    /// [`VenaError::Transport`] carrying the status and body.
    pub fn into_success(self, url: &str) -> Result<Self, VenaError> {
        if self.is_success() {
            return Ok(self);
        }
        Err(VenaError::Transport {
            url: url.to_string(),
            status: Some(self.status),
            message: status_reason(self.status).to_string(),
            body: self.body,
        })
    }

    /// Parses the body as JSON.
    pub fn json(&self, url: &str) -> Result<Value, VenaError> {
        serde_json::from_str(&self.body).map_err(|source| VenaError::UnexpectedResponse {
            url: url.to_string(),
            message: format!("body is not valid JSON: {source}"),
        })
    }
}

/// Sends requests to the Vena API.
pub trait Transport {
    /// Performs one request. Fails only when no response was received.
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, VenaError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, VenaError> {
        (**self).send(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, VenaError> {
        (**self).send(request)
    }
}

fn status_reason(status: u16) -> &'static str {
    match status {
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        409 => "Conflict",
        413 => "Payload Too Large",
        415 => "Unsupported Media Type",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        300..=399 => "unexpected redirect",
        400..=499 => "client error",
        _ => "server error",
    }
}
