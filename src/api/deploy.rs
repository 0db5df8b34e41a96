use super::OnboardingClient;
use crate::error::ApiError;
use crate::model::{ApproveAck, PlacementParams, PlanResponse, RefreshResponse};
use crate::transport::{ApiRequest, Transport};
use crate::util::encode_path_segment;
use serde_json::{json, Map, Value};

fn run_path(run_id: &str, action: &str) -> String {
    format!("/api/deploy/{}/{action}", encode_path_segment(run_id))
}

impl<T: Transport> OnboardingClient<T> {
    pub fn create_plan(
        &self,
        requirement_set_id: &str,
        placement: &PlacementParams,
        idempotency_key: Option<&str>,
    ) -> Result<PlanResponse, ApiError> {
        let mut body = match serde_json::to_value(placement) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        body.insert(
            "requirement_set_id".to_string(),
            Value::String(requirement_set_id.to_string()),
        );
        let request = ApiRequest::post("/api/deploy/plan", Value::Object(body))
            .with_idempotency_key(idempotency_key.map(str::to_string));
        self.send_typed(request)
    }

    pub fn approve_run(&self, run_id: &str) -> Result<ApproveAck, ApiError> {
        self.send_typed(ApiRequest::post(run_path(run_id, "approve"), json!({})))
    }

    pub fn refresh_run(&self, run_id: &str) -> Result<RefreshResponse, ApiError> {
        self.send_typed(ApiRequest::get(run_path(run_id, "refresh")))
    }

    /// Deploy package manifest; its shape is backend-defined, so it stays raw JSON.
    pub fn get_package(&self, run_id: &str) -> Result<Value, ApiError> {
        self.send_raw(ApiRequest::get(run_path(run_id, "package")))
    }
}
