//! In-memory transport used by unit tests.
use crate::error::{ApiError, NOT_APPROVED_CODE};
use crate::transport::{ApiRequest, Method, Transport};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Replays queued responses keyed by `"METHOD path"` and records every call.
///
/// The last queued response for a route is sticky, so a route scripted once
/// answers every later call the same way.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, VecDeque<Result<Value, ApiError>>>>,
    calls: Mutex<Vec<ApiRequest>>,
}

fn route_key(method: Method, path: &str) -> String {
    format!("{method} {path}")
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, method: Method, path: &str, response: Result<Value, ApiError>) -> &Self {
        self.routes
            .lock()
            .expect("routes lock")
            .entry(route_key(method, path))
            .or_default()
            .push_back(response);
        self
    }

    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().expect("calls lock").clone()
    }

    /// Recorded calls rendered as `"METHOD path"`.
    pub fn call_keys(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|call| route_key(call.method, &call.path))
            .collect()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        let key = route_key(method, path);
        self.call_keys().iter().filter(|k| **k == key).count()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: &ApiRequest) -> Result<Value, ApiError> {
        self.calls.lock().expect("calls lock").push(request.clone());
        let mut routes = self.routes.lock().expect("routes lock");
        let key = route_key(request.method, &request.path);
        match routes.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front().expect("non-empty queue"),
            Some(queue) => queue
                .front()
                .cloned()
                .unwrap_or_else(|| Err(not_scripted(&request.path))),
            None => Err(not_scripted(&request.path)),
        }
    }
}

fn not_scripted(path: &str) -> ApiError {
    ApiError::status(404, None, format!("no scripted response for {path}"), path)
}

pub fn not_approved_conflict(path: &str) -> ApiError {
    ApiError::status(
        409,
        Some(NOT_APPROVED_CODE.to_string()),
        "requirement set must be approved before planning".to_string(),
        path,
    )
}
