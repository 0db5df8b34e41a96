use super::OnboardingClient;
use crate::error::ApiError;
use crate::model::{BusinessContext, Constraints, Guardrails, RequirementSet, Session};
use crate::transport::{ApiRequest, Transport};
use crate::util::encode_path_segment;
use serde_json::{json, Value};

fn requirement_set_path(id: &str) -> String {
    format!("/api/brd/requirement-sets/{}", encode_path_segment(id))
}

impl<T: Transport> OnboardingClient<T> {
    pub fn create_session(&self, created_by: &str) -> Result<Session, ApiError> {
        self.send_typed(ApiRequest::post(
            "/api/brd/sessions",
            json!({ "created_by": created_by }),
        ))
    }

    pub fn create_requirement_set(
        &self,
        session_id: &str,
        name: &str,
        created_by: &str,
    ) -> Result<RequirementSet, ApiError> {
        self.send_typed(ApiRequest::post(
            "/api/brd/requirement-sets",
            json!({ "session_id": session_id, "name": name, "created_by": created_by }),
        ))
    }

    pub fn get_requirement_set(&self, id: &str) -> Result<RequirementSet, ApiError> {
        self.send_typed(ApiRequest::get(requirement_set_path(id)))
    }

    pub fn put_business_context(
        &self,
        id: &str,
        context: &BusinessContext,
    ) -> Result<Value, ApiError> {
        let body = to_body(context);
        self.send_raw(ApiRequest::put(
            format!("{}/business-context", requirement_set_path(id)),
            body,
        ))
    }

    pub fn put_constraints(&self, id: &str, constraints: &Constraints) -> Result<Value, ApiError> {
        self.send_raw(ApiRequest::put(
            format!("/api/brd/constraints/{}", encode_path_segment(id)),
            to_body(constraints),
        ))
    }

    pub fn put_guardrails(&self, id: &str, guardrails: &Guardrails) -> Result<Value, ApiError> {
        self.send_raw(ApiRequest::put(
            format!("/api/brd/guardrails/{}", encode_path_segment(id)),
            to_body(guardrails),
        ))
    }

    /// Submit a draft. The response is the updated set; its status may be absent.
    pub fn submit_requirement_set(&self, id: &str, actor: &str) -> Result<Value, ApiError> {
        self.send_raw(ApiRequest::post(
            format!("{}/submit", requirement_set_path(id)),
            json!({ "actor": actor }),
        ))
    }

    pub fn approve_requirement_set(&self, id: &str, actor: &str) -> Result<Value, ApiError> {
        self.send_raw(ApiRequest::post(
            format!("{}/approve", requirement_set_path(id)),
            json!({ "actor": actor }),
        ))
    }
}

// Edit payloads are plain structs of optional fields; serializing them cannot fail.
fn to_body<S: serde::Serialize>(payload: &S) -> Value {
    serde_json::to_value(payload).unwrap_or_else(|_| json!({}))
}
