//! Typed wrappers over the onboarding proxy's REST endpoints.
//!
//! Endpoints are grouped by backend area: `brd` (sessions and requirement
//! sets), `deploy` (plans and infrastructure runs) and `runs` (outputs and
//! the event log).
use crate::error::ApiError;
use crate::transport::{ApiRequest, Transport};
use serde::de::DeserializeOwned;
use serde_json::Value;

mod brd;
mod deploy;
mod runs;

pub struct OnboardingClient<T> {
    transport: T,
}

impl<T: Transport> OnboardingClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Send a request and return the raw JSON body.
    pub fn send_raw(&self, request: ApiRequest) -> Result<Value, ApiError> {
        self.transport.send(&request)
    }

    fn send_typed<R: DeserializeOwned>(&self, request: ApiRequest) -> Result<R, ApiError> {
        let value = self.transport.send(&request)?;
        decode(&request.path, value)
    }
}

fn decode<R: DeserializeOwned>(path: &str, value: Value) -> Result<R, ApiError> {
    serde_json::from_value(value).map_err(|err| ApiError::Decode {
        path: path.to_string(),
        message: err.to_string(),
    })
}
