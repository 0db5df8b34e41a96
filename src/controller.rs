//! Deploy plan and run control: create the run, trigger infrastructure,
//! refresh status, and decide when a run is finished.
use crate::api::OnboardingClient;
use crate::error::ApiError;
use crate::model::{ApproveAck, PlacementParams, PlanResponse, RefreshResponse, RunStatus};
use crate::retry::RetryPolicy;
use crate::transport::Transport;
use serde_json::Value;
use tracing::{debug, info};

pub struct DeployController<'a, T> {
    client: &'a OnboardingClient<T>,
    retry: RetryPolicy,
}

impl<'a, T: Transport> DeployController<'a, T> {
    pub fn new(client: &'a OnboardingClient<T>) -> Self {
        Self {
            client,
            retry: RetryPolicy::default(),
        }
    }

    #[cfg(test)]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Create a run for an approved requirement set.
    ///
    /// Not idempotent: repeating the call may create a second run unless the
    /// server deduplicates on the idempotency key.
    pub fn create_plan(
        &self,
        requirement_set_id: &str,
        placement: &PlacementParams,
        idempotency_key: Option<&str>,
    ) -> Result<PlanResponse, ApiError> {
        let plan = self
            .client
            .create_plan(requirement_set_id, placement, idempotency_key)?;
        info!(
            requirement_set_id,
            run_id = %plan.run_id,
            status = %plan.status,
            warnings = plan.policy_warnings.len(),
            "deploy plan created"
        );
        Ok(plan)
    }

    /// Trigger infrastructure apply. Acceptance only; completion is observed by polling.
    pub fn approve_run(&self, run_id: &str) -> Result<ApproveAck, ApiError> {
        let ack = self.client.approve_run(run_id)?;
        info!(run_id, status = ?ack.status, "infrastructure apply triggered");
        Ok(ack)
    }

    pub fn refresh(&self, run_id: &str) -> Result<RefreshResponse, ApiError> {
        let refreshed = self.retry.with_retries(|| {
            self.client
                .refresh_run(run_id)
                .inspect_err(|err| {
                    debug!(run_id, timeout = err.is_timeout(), error = %err, "refresh attempt failed")
                })
        })?;
        debug!(
            run_id,
            previous = ?refreshed.previous_status,
            current = ?refreshed.current_status,
            "run refreshed"
        );
        Ok(refreshed)
    }

    pub fn package(&self, run_id: &str) -> Result<Value, ApiError> {
        self.client.get_package(run_id)
    }
}

/// Whether `status` is in the terminal set (case-insensitive).
pub fn is_terminal(status: &str) -> bool {
    RunStatus::parse(status).is_terminal()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransport;
    use crate::transport::Method;
    use serde_json::json;
    use std::time::Duration;

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::new(vec![Duration::ZERO], 3)
    }

    #[test]
    fn is_terminal_matches_fixed_set_case_insensitively() {
        assert!(is_terminal("infra_succeeded"));
        assert!(is_terminal("INFRA_FAILED"));
        assert!(is_terminal("Failed"));
        assert!(is_terminal("succeeded"));
        assert!(!is_terminal("infra_triggered"));
        assert!(!is_terminal(""));
    }

    #[test]
    fn refresh_retries_transient_failures() {
        let transport = ScriptedTransport::new();
        let path = "/api/deploy/run_1/refresh";
        transport
            .on(Method::Get, path, Err(ApiError::status(502, None, "bad gateway".into(), path)))
            .on(Method::Get, path, Err(ApiError::status(502, None, "bad gateway".into(), path)))
            .on(
                Method::Get,
                path,
                Ok(json!({"previous_status": "infra_triggered", "current_status": "infra_succeeded"})),
            );
        let client = OnboardingClient::new(&transport);
        let controller = DeployController::new(&client).with_retry(fast_retry());

        let refreshed = controller.refresh("run_1").expect("third attempt");
        assert_eq!(refreshed.run_status(), Some(RunStatus::InfraSucceeded));
        assert_eq!(transport.count(Method::Get, path), 3);
    }

    #[test]
    fn refresh_gives_up_after_max_attempts() {
        let transport = ScriptedTransport::new();
        let path = "/api/deploy/run_1/refresh";
        transport.on(
            Method::Get,
            path,
            Err(ApiError::Timeout {
                path: path.to_string(),
                timeout_ms: 20_000,
            }),
        );
        let client = OnboardingClient::new(&transport);
        let controller = DeployController::new(&client).with_retry(fast_retry());

        let err = controller.refresh("run_1").expect_err("exhausted");
        assert!(err.is_timeout());
        assert_eq!(transport.count(Method::Get, path), 3);
    }

    #[test]
    fn approve_run_is_not_retried() {
        let transport = ScriptedTransport::new();
        let path = "/api/deploy/run_1/approve";
        transport.on(
            Method::Post,
            path,
            Err(ApiError::status(500, None, "boom".into(), path)),
        );
        let client = OnboardingClient::new(&transport);
        let controller = DeployController::new(&client).with_retry(fast_retry());

        controller.approve_run("run_1").expect_err("write fails");
        assert_eq!(transport.count(Method::Post, path), 1);
    }
}
