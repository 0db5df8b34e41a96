//! Shared test infrastructure for integration tests.
//!
//! [`StubBackend`] is a minimal HTTP/1.1 server on a loopback port that
//! replays scripted responses per `"METHOD path"` and records every request.
//! [`run_dorch`] runs the built binary against it with a temporary config.
#![allow(dead_code)]

use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::process::{Command, ExitStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct StubResponse {
    pub status: u16,
    pub body: String,
    pub delay: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn key(&self) -> String {
        format!("{} {}", self.method, self.path)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }
}

type Routes = Arc<Mutex<HashMap<String, VecDeque<StubResponse>>>>;

pub struct StubBackend {
    port: u16,
    routes: Routes,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    shutdown: Arc<AtomicBool>,
}

impl StubBackend {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub backend");
        let port = listener.local_addr().expect("stub addr").port();
        let routes: Routes = Arc::default();
        let requests: Arc<Mutex<Vec<RecordedRequest>>> = Arc::default();
        let shutdown = Arc::new(AtomicBool::new(false));

        let accept_routes = Arc::clone(&routes);
        let accept_requests = Arc::clone(&requests);
        let accept_shutdown = Arc::clone(&shutdown);
        thread::spawn(move || {
            for stream in listener.incoming() {
                if accept_shutdown.load(Ordering::SeqCst) {
                    break;
                }
                let Ok(stream) = stream else { continue };
                let routes = Arc::clone(&accept_routes);
                let requests = Arc::clone(&accept_requests);
                thread::spawn(move || handle_connection(stream, &routes, &requests));
            }
        });

        Self {
            port,
            routes,
            requests,
            shutdown,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Queue a response; the last one queued for a route repeats.
    pub fn on(&self, method: &str, path: &str, status: u16, body: &str) -> &Self {
        self.push(method, path, status, body, None)
    }

    pub fn on_json(&self, method: &str, path: &str, status: u16, body: Value) -> &Self {
        self.push(method, path, status, &body.to_string(), None)
    }

    pub fn on_delayed(&self, method: &str, path: &str, delay: Duration, body: Value) -> &Self {
        self.push(method, path, 200, &body.to_string(), Some(delay))
    }

    fn push(
        &self,
        method: &str,
        path: &str,
        status: u16,
        body: &str,
        delay: Option<Duration>,
    ) -> &Self {
        self.routes
            .lock()
            .expect("routes lock")
            .entry(format!("{method} {path}"))
            .or_default()
            .push_back(StubResponse {
                status,
                body: body.to_string(),
                delay,
            });
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn request_keys(&self) -> Vec<String> {
        self.requests().iter().map(RecordedRequest::key).collect()
    }

    pub fn count(&self, method: &str, path: &str) -> usize {
        let key = format!("{method} {path}");
        self.request_keys().iter().filter(|k| **k == key).count()
    }
}

impl Drop for StubBackend {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        // Wake the accept loop so it observes the flag.
        let _ = TcpStream::connect(("127.0.0.1", self.port));
    }
}

fn next_response(routes: &Routes, key: &str) -> StubResponse {
    let mut routes = routes.lock().expect("routes lock");
    match routes.get_mut(key) {
        Some(queue) if queue.len() > 1 => queue.pop_front().expect("queued response"),
        Some(queue) if !queue.is_empty() => queue[0].clone(),
        _ => StubResponse {
            status: 404,
            body: json!({"detail": format!("no stub for {key}")}).to_string(),
            delay: None,
        },
    }
}

fn handle_connection(
    stream: TcpStream,
    routes: &Routes,
    requests: &Arc<Mutex<Vec<RecordedRequest>>>,
) {
    let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).unwrap_or(0) == 0 {
        return;
    }
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut headers = Vec::new();
    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            let (name, value) = (name.trim().to_string(), value.trim().to_string());
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.parse().unwrap_or(0);
            }
            headers.push((name, value));
        }
    }
    let mut body = vec![0u8; content_length];
    if content_length > 0 && reader.read_exact(&mut body).is_err() {
        return;
    }

    let request = RecordedRequest {
        method,
        path,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    };
    let response = next_response(routes, &request.key());
    requests.lock().expect("requests lock").push(request);

    if let Some(delay) = response.delay {
        thread::sleep(delay);
    }
    let reason = match response.status {
        200 => "OK",
        201 => "Created",
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        409 => "Conflict",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Status",
    };
    let payload = format!(
        "HTTP/1.1 {} {reason}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        response.status,
        response.body.len(),
        response.body
    );
    let mut stream = stream;
    let _ = stream.write_all(payload.as_bytes());
    let _ = stream.flush();
}

pub struct CliOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CliOutput {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.stdout)
            .unwrap_or_else(|err| panic!("stdout is not JSON ({err}): {}", self.stdout))
    }
}

/// Run `dorch` with a config pointing at `base_url`; `extra` fields are merged into the config.
pub fn run_dorch(base_url: &str, extra: Value, args: &[&str]) -> CliOutput {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = json!({
        "schema_version": 1,
        "base_url": base_url,
        "timeout_ms": 5000,
        "poll_interval_ms": 20,
    });
    if let (Some(config), Value::Object(extra)) = (config.as_object_mut(), extra) {
        config.extend(extra);
    }
    let config_path = dir.path().join("config.json");
    std::fs::write(&config_path, config.to_string()).expect("write config");

    let output = Command::new(env!("CARGO_BIN_EXE_dorch"))
        .arg("--config")
        .arg(&config_path)
        .args(args)
        .env_remove("DORCH_BASE_URL")
        .env_remove("DORCH_API_KEY")
        .env_remove("DORCH_AUTHORIZATION")
        .env_remove("DORCH_TIMEOUT_MS")
        .env_remove("DORCH_POLL_INTERVAL_MS")
        .env_remove("DORCH_ACTOR")
        .env("DORCH_LOG", "warn")
        .output()
        .expect("run dorch");
    CliOutput {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    }
}
