//! Requirement-set lifecycle gate.
//!
//! The gate owns the cached status of one requirement set. It keeps edits to
//! drafts, walks `draft -> submitted -> approved`, and recovers a dependent
//! operation that the server refused because the set was not approved yet.
use crate::api::OnboardingClient;
use crate::controller::DeployController;
use crate::error::ApiError;
use crate::model::{
    BusinessContext, Constraints, Guardrails, NextAction, PlacementParams, PlanResponse,
    RequirementStatus,
};
use crate::transport::Transport;
use serde_json::Value;
use tracing::{debug, info, warn};

pub struct LifecycleGate<'a, T> {
    client: &'a OnboardingClient<T>,
    requirement_set_id: String,
    actor: String,
    status: Option<RequirementStatus>,
    needs_manual_approval: bool,
}

impl<'a, T: Transport> LifecycleGate<'a, T> {
    pub fn new(client: &'a OnboardingClient<T>, requirement_set_id: &str, actor: &str) -> Self {
        Self {
            client,
            requirement_set_id: requirement_set_id.to_string(),
            actor: actor.to_string(),
            status: None,
            needs_manual_approval: false,
        }
    }

    /// Seed the cached status (for example from a create or read response).
    pub fn with_status(mut self, status: RequirementStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn status(&self) -> Option<&RequirementStatus> {
        self.status.as_ref()
    }

    pub fn refresh_status(&mut self) -> Result<RequirementStatus, ApiError> {
        let set = self.client.get_requirement_set(&self.requirement_set_id)?;
        let status = set.status();
        debug!(requirement_set_id = %self.requirement_set_id, %status, "requirement set status read");
        self.status = Some(status.clone());
        Ok(status)
    }

    /// Fail with [`ApiError::Locked`] unless the set is a draft.
    ///
    /// An unknown status is read from the server first; a known non-draft
    /// status fails without any request.
    pub fn ensure_editable(&mut self) -> Result<(), ApiError> {
        let status = match &self.status {
            Some(status) => status.clone(),
            None => self.refresh_status()?,
        };
        if status.is_editable() {
            return Ok(());
        }
        Err(ApiError::Locked {
            requirement_set_id: self.requirement_set_id.clone(),
            status: status.to_string(),
        })
    }

    pub fn update_business_context(&mut self, context: &BusinessContext) -> Result<Value, ApiError> {
        self.ensure_editable()?;
        self.client
            .put_business_context(&self.requirement_set_id, context)
    }

    pub fn update_constraints(&mut self, constraints: &Constraints) -> Result<Value, ApiError> {
        self.ensure_editable()?;
        self.client
            .put_constraints(&self.requirement_set_id, constraints)
    }

    pub fn update_guardrails(&mut self, guardrails: &Guardrails) -> Result<Value, ApiError> {
        self.ensure_editable()?;
        self.client
            .put_guardrails(&self.requirement_set_id, guardrails)
    }

    pub fn submit(&mut self) -> Result<RequirementStatus, ApiError> {
        let response = self
            .client
            .submit_requirement_set(&self.requirement_set_id, &self.actor)?;
        let status = status_from_response(&response).unwrap_or(RequirementStatus::Submitted);
        info!(requirement_set_id = %self.requirement_set_id, %status, "requirement set submitted");
        self.status = Some(status.clone());
        Ok(status)
    }

    /// Approve a submitted set. A set known to be a draft must be submitted first.
    pub fn approve(&mut self) -> Result<RequirementStatus, ApiError> {
        if let Some(status @ RequirementStatus::Draft) = &self.status {
            return Err(ApiError::InvalidTransition {
                requirement_set_id: self.requirement_set_id.clone(),
                action: "approve",
                status: status.to_string(),
            });
        }
        let response = self
            .client
            .approve_requirement_set(&self.requirement_set_id, &self.actor)?;
        let status = status_from_response(&response).unwrap_or(RequirementStatus::Approved);
        info!(requirement_set_id = %self.requirement_set_id, %status, "requirement set approved");
        self.status = Some(status.clone());
        Ok(status)
    }

    /// Run `op`; if the server says the set is not approved, submit and
    /// approve it, then run `op` exactly once more.
    ///
    /// When recovery or the retry fails the error is returned as-is and the
    /// gate is flagged for manual approval (see [`Self::recovery_action`]).
    pub fn ensure_approved_then<R>(
        &mut self,
        mut op: impl FnMut() -> Result<R, ApiError>,
    ) -> Result<R, ApiError> {
        let err = match op() {
            Ok(value) => {
                self.needs_manual_approval = false;
                return Ok(value);
            }
            Err(err) if err.is_not_approved() => err,
            Err(err) => return Err(err),
        };
        warn!(
            requirement_set_id = %self.requirement_set_id,
            status = ?err.status_code(),
            code = ?err.code(),
            "requirement set not approved; submitting and approving"
        );
        if let Err(recovery_err) = self.submit_and_approve() {
            warn!(
                requirement_set_id = %self.requirement_set_id,
                error = %recovery_err,
                "automatic approval failed"
            );
            self.needs_manual_approval = true;
            return Err(recovery_err);
        }
        match op() {
            Ok(value) => {
                self.needs_manual_approval = false;
                Ok(value)
            }
            Err(retry_err) => {
                if retry_err.is_not_approved() {
                    self.needs_manual_approval = true;
                }
                Err(retry_err)
            }
        }
    }

    pub fn ensure_approved_then_plan(
        &mut self,
        controller: &DeployController<'_, T>,
        placement: &PlacementParams,
        idempotency_key: Option<&str>,
    ) -> Result<PlanResponse, ApiError> {
        let requirement_set_id = self.requirement_set_id.clone();
        self.ensure_approved_then(|| {
            controller.create_plan(&requirement_set_id, placement, idempotency_key)
        })
    }

    /// Walk the set to `approved` from wherever the server has it.
    ///
    /// An unknown status is read first so a submitted set is not submitted
    /// twice. A failed read falls back to the full submit and approve.
    fn submit_and_approve(&mut self) -> Result<(), ApiError> {
        if self.status.is_none() {
            if let Err(err) = self.refresh_status() {
                debug!(
                    requirement_set_id = %self.requirement_set_id,
                    error = %err,
                    "status read before recovery failed"
                );
            }
        }
        match self.status {
            Some(RequirementStatus::Approved) => return Ok(()),
            Some(RequirementStatus::Submitted) => {}
            _ => {
                self.submit()?;
            }
        }
        self.approve()?;
        Ok(())
    }

    /// Manual follow-up once automatic approval has failed.
    pub fn recovery_action(&self) -> Option<NextAction> {
        if !self.needs_manual_approval {
            return None;
        }
        let id = &self.requirement_set_id;
        let command = match &self.status {
            Some(RequirementStatus::Submitted) => {
                format!("dorch requirement-set approve --id {id}")
            }
            _ => format!(
                "dorch requirement-set submit --id {id} && dorch requirement-set approve --id {id}"
            ),
        };
        Some(NextAction::Command {
            command,
            reason: "automatic submit/approve did not succeed; approve the requirement set manually"
                .to_string(),
        })
    }
}

fn status_from_response(response: &Value) -> Option<RequirementStatus> {
    response
        .get("status")
        .and_then(Value::as_str)
        .filter(|status| !status.trim().is_empty())
        .map(RequirementStatus::parse)
}

#[cfg(test)]
#[path = "gate_tests.rs"]
mod tests;
