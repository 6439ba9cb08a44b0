#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::time::Duration;

use serde_json::Value;
use vepi::job::Clock;
use vepi::transport::{ApiRequest, ApiResponse, Method, MultipartForm, RequestBody, Transport};
use vepi::{ClientConfig, VenaClient, VenaError};

pub const BASE: &str = "https://us1.vena.io/api/public/v1";

/// Transport that replays queued responses and records every request.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: RefCell<VecDeque<Result<ApiResponse, VenaError>>>,
    requests: RefCell<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn json(&self, status: u16, body: Value) -> &Self {
        self.responses
            .borrow_mut()
            .push_back(Ok(ApiResponse::new(status, body.to_string())));
        self
    }

    pub fn text(&self, status: u16, body: &str) -> &Self {
        self.responses
            .borrow_mut()
            .push_back(Ok(ApiResponse::new(status, body)));
        self
    }

    pub fn unreachable(&self, message: &str) -> &Self {
        self.responses.borrow_mut().push_back(Err(VenaError::Transport {
            url: "scripted".to_string(),
            status: None,
            message: message.to_string(),
            body: String::new(),
        }));
        self
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.borrow().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }

    pub fn remaining(&self) -> usize {
        self.responses.borrow().len()
    }

    /// Full URLs (with query) of all GET requests.
    pub fn get_urls(&self) -> Vec<String> {
        self.requests
            .borrow()
            .iter()
            .filter(|r| r.method == Method::Get)
            .map(|r| r.full_url().expect("valid url").to_string())
            .collect()
    }

    /// Number of requests whose URL ends with `suffix`.
    pub fn count_path(&self, suffix: &str) -> usize {
        self.requests
            .borrow()
            .iter()
            .filter(|r| r.url.ends_with(suffix))
            .count()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, VenaError> {
        self.requests.borrow_mut().push(request.clone());
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| panic!("unscripted request: {} {}", request.method, request.url))
    }
}

/// Clock whose `sleep` advances virtual time instantly.
#[derive(Default)]
pub struct ManualClock {
    now: Cell<Duration>,
    sleeps: RefCell<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
        self.now.set(self.now.get() + duration);
    }
}

pub fn config() -> ClientConfig {
    ClientConfig::new("us1", "api-user", "api-key", "tpl-1")
        .expect("config")
        .with_model_id("model-7")
}

pub fn client<'a>(
    transport: &'a ScriptedTransport,
    clock: &'a ManualClock,
) -> VenaClient<&'a ScriptedTransport, &'a ManualClock> {
    VenaClient::with_transport(config(), transport).with_clock(clock)
}

pub fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

/// JSON body of a recorded request.
pub fn json_body(request: &ApiRequest) -> &Value {
    match &request.body {
        RequestBody::Json(value) => value,
        other => panic!("expected JSON body, got {other:?}"),
    }
}

/// Multipart form of a recorded request.
pub fn multipart_body(request: &ApiRequest) -> &MultipartForm {
    match &request.body {
        RequestBody::Multipart(form) => form,
        other => panic!("expected multipart body, got {other:?}"),
    }
}
