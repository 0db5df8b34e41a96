//! HTTP transport to the onboarding proxy.
//!
//! The transport owns request shaping (path normalization, JSON bodies,
//! credential headers, the fixed timeout) and response normalization (empty
//! bodies, non-JSON text, error message extraction). It never logs or
//! persists; callers decide what to surface.
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::util::truncate_string;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Raw (non-JSON) error bodies are cut to this many bytes in messages.
const MAX_ERROR_TEXT_BYTES: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single request against the proxy, relative to the configured base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub idempotency_key: Option<String>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: None,
            idempotency_key: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: Some(body),
            idempotency_key: None,
        }
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Put,
            path: path.into(),
            body: Some(body),
            idempotency_key: None,
        }
    }

    pub fn with_idempotency_key(mut self, key: Option<String>) -> Self {
        self.idempotency_key = key;
        self
    }
}

/// Request/response seam between the endpoint wrappers and the network.
pub trait Transport {
    fn send(&self, request: &ApiRequest) -> Result<Value, ApiError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: &ApiRequest) -> Result<Value, ApiError> {
        (**self).send(request)
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, request: &ApiRequest) -> Result<Value, ApiError> {
        (**self).send(request)
    }
}

/// Blocking ureq transport with a fixed global timeout.
pub struct HttpTransport {
    agent: ureq::Agent,
    base_url: String,
    timeout: Duration,
    api_key: Option<String>,
    authorization: Option<String>,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            api_key: None,
            authorization: None,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        let mut transport = Self::new(&config.base_url, config.timeout());
        transport.api_key = config.api_key.clone();
        transport.authorization = config.authorization.clone();
        transport
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, normalize_path(path))
    }

    fn with_headers<B>(
        &self,
        mut builder: ureq::RequestBuilder<B>,
        request: &ApiRequest,
    ) -> ureq::RequestBuilder<B> {
        builder = builder.header("accept", "application/json");
        if let Some(key) = &self.api_key {
            builder = builder.header("x-api-key", key);
        }
        if let Some(auth) = &self.authorization {
            builder = builder.header("authorization", auth);
        }
        if let Some(key) = &request.idempotency_key {
            builder = builder.header("x-idempotency-key", key);
        }
        builder
    }

    fn map_error(&self, err: ureq::Error, path: &str) -> ApiError {
        let timed_out = match &err {
            ureq::Error::Timeout(_) => true,
            ureq::Error::Io(io) => io.kind() == std::io::ErrorKind::TimedOut,
            _ => false,
        };
        if timed_out {
            return ApiError::Timeout {
                path: path.to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            };
        }
        ApiError::Network {
            path: path.to_string(),
            message: err.to_string(),
        }
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &ApiRequest) -> Result<Value, ApiError> {
        let url = self.url_for(&request.path);
        let path = request.path.as_str();
        let payload = request
            .body
            .as_ref()
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|err| ApiError::Decode {
                path: path.to_string(),
                message: format!("serialize request body: {err}"),
            })?;

        let result = match request.method {
            Method::Get => self.with_headers(self.agent.get(&url), request).call(),
            Method::Post | Method::Put => {
                let builder = match request.method {
                    Method::Put => self.agent.put(&url),
                    _ => self.agent.post(&url),
                };
                let builder = self.with_headers(builder, request);
                match payload.as_deref() {
                    Some(bytes) => builder
                        .header("content-type", "application/json")
                        .send(bytes),
                    None => builder.send_empty(),
                }
            }
        };
        let mut response = result.map_err(|err| self.map_error(err, path))?;

        let status = response.status();
        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|err| self.map_error(err, path))?;

        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("Request failed");
            return Err(error_from_response(status.as_u16(), &text, reason, path));
        }
        Ok(parse_body(&text))
    }
}

/// Normalize a caller path onto the proxy's canonical routes.
///
/// `/api/agent` prefixes are dropped, bare `brd/...` paths gain `/api`, and a
/// duplicated `/api/brd` prefix collapses to exactly one.
pub fn normalize_path(path: &str) -> String {
    let (route, query) = match path.split_once('?') {
        Some((route, query)) => (route, Some(query)),
        None => (path, None),
    };
    let mut route = format!("/{}", route.trim_start_matches('/'));
    if let Some(rest) = route.strip_prefix("/api/agent") {
        if rest.is_empty() || rest.starts_with('/') {
            route = format!("/{}", rest.trim_start_matches('/'));
        }
    }
    if route.starts_with("/brd/") {
        route = format!("/api{route}");
    }
    while let Some(rest) = route.strip_prefix("/api/brd/api/brd") {
        if !(rest.is_empty() || rest.starts_with('/')) {
            break;
        }
        route = format!("/api/brd{rest}");
    }
    match query {
        Some(query) if !query.is_empty() => format!("{route}?{query}"),
        _ => route,
    }
}

/// Decode a success body: empty → `{}`, JSON → value, anything else → raw text.
pub fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Object(Map::new());
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Build a structured error from a non-2xx response.
pub fn error_from_response(status: u16, text: &str, reason: &str, path: &str) -> ApiError {
    let parsed = if text.trim().is_empty() {
        None
    } else {
        serde_json::from_str::<Value>(text).ok()
    };
    let (code, message) = match &parsed {
        Some(value) => (
            extract_error_code(value),
            extract_error_message(value).unwrap_or_else(|| reason.to_string()),
        ),
        None if text.trim().is_empty() => (None, reason.to_string()),
        None => (None, truncate_string(text.trim(), MAX_ERROR_TEXT_BYTES)),
    };
    ApiError::status(status, code, message, path)
}

fn extract_error_message(value: &Value) -> Option<String> {
    if let Value::String(text) = value {
        return non_empty(text);
    }
    if let Some(detail) = value.get("detail") {
        let nested = detail
            .get("message")
            .or_else(|| detail.get("error"))
            .and_then(Value::as_str)
            .and_then(non_empty);
        if nested.is_some() {
            return nested;
        }
        match detail {
            Value::String(text) => return non_empty(text),
            Value::Null => {}
            other => return Some(other.to_string()),
        }
    }
    for key in ["error", "message"] {
        match value.get(key) {
            Some(Value::String(text)) => {
                if let Some(text) = non_empty(text) {
                    return Some(text);
                }
            }
            Some(Value::Null) | None => {}
            Some(other) => return Some(other.to_string()),
        }
    }
    if let Some(errors) = value.get("errors").and_then(Value::as_array) {
        let joined = errors
            .iter()
            .map(|item| match item {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ");
        return non_empty(&joined);
    }
    None
}

fn extract_error_code(value: &Value) -> Option<String> {
    let candidates = [
        value.get("detail").and_then(|detail| detail.get("error")),
        value.get("detail").and_then(|detail| detail.get("code")),
        value.get("detail"),
        value.get("error"),
        value.get("code"),
    ];
    candidates
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|candidate| is_error_code(candidate))
        .map(str::to_string)
}

fn is_error_code(text: &str) -> bool {
    !text.is_empty()
        && text
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
