//! Wire records and status vocabularies shared by the gate, controller and poller.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Requirement-set approval status. Unknown labels are preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequirementStatus {
    Draft,
    Submitted,
    Approved,
    Other(String),
}

impl RequirementStatus {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "draft" => RequirementStatus::Draft,
            "submitted" => RequirementStatus::Submitted,
            "approved" => RequirementStatus::Approved,
            _ => RequirementStatus::Other(trimmed.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RequirementStatus::Draft => "draft",
            RequirementStatus::Submitted => "submitted",
            RequirementStatus::Approved => "approved",
            RequirementStatus::Other(label) => label,
        }
    }

    pub fn is_editable(&self) -> bool {
        *self == RequirementStatus::Draft
    }
}

impl fmt::Display for RequirementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deploy run status. Unknown labels are preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    AwaitingApproval,
    PlanGenerated,
    InfraTriggered,
    InfraSucceeded,
    InfraFailed,
    Failed,
    Succeeded,
    Other(String),
}

/// Ordered progress stages shown in the run timeline.
pub const TIMELINE: [&str; 5] = [
    "awaiting_approval",
    "plan_generated",
    "infra_triggered",
    "infra_succeeded",
    "failed",
];

impl RunStatus {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "awaiting_approval" => RunStatus::AwaitingApproval,
            "plan_generated" => RunStatus::PlanGenerated,
            "infra_triggered" => RunStatus::InfraTriggered,
            "infra_succeeded" => RunStatus::InfraSucceeded,
            "infra_failed" => RunStatus::InfraFailed,
            "failed" => RunStatus::Failed,
            "succeeded" => RunStatus::Succeeded,
            _ => RunStatus::Other(trimmed.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RunStatus::AwaitingApproval => "awaiting_approval",
            RunStatus::PlanGenerated => "plan_generated",
            RunStatus::InfraTriggered => "infra_triggered",
            RunStatus::InfraSucceeded => "infra_succeeded",
            RunStatus::InfraFailed => "infra_failed",
            RunStatus::Failed => "failed",
            RunStatus::Succeeded => "succeeded",
            RunStatus::Other(label) => label,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::InfraSucceeded
                | RunStatus::InfraFailed
                | RunStatus::Failed
                | RunStatus::Succeeded
        )
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, RunStatus::InfraFailed | RunStatus::Failed)
    }

    /// Position in [`TIMELINE`]; labels outside it map to the first stage.
    pub fn timeline_index(&self) -> usize {
        TIMELINE
            .iter()
            .position(|stage| *stage == self.as_str())
            .unwrap_or(0)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Session {
    pub session_id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RequirementSet {
    #[serde(alias = "requirement_set_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_request_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reject_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_context: Option<BusinessContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Constraints>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guardrails: Option<Guardrails>,
}

impl RequirementSet {
    pub fn status(&self) -> RequirementStatus {
        RequirementStatus::parse(&self.status)
    }

    pub fn display_name(&self) -> &str {
        self.title
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or(self.id.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct BusinessContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stakeholders: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Constraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Guardrails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pii_present: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gdpr_required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_networking_required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_eur_month: Option<f64>,
}

/// Placement parameters sent with a plan request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlacementParams {
    pub name_prefix: String,
    pub region: String,
    pub environment: String,
    pub enable_apim: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_app_hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warehouse: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etl: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub governance: Option<String>,
    pub enable_bi: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bi_tool: Option<String>,
    pub allow_costly_resources: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlanResponse {
    pub run_id: String,
    #[serde(default = "default_plan_status")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_summary: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub policy_warnings: Vec<Value>,
}

fn default_plan_status() -> String {
    RunStatus::AwaitingApproval.as_str().to_string()
}

impl PlanResponse {
    pub fn run_status(&self) -> RunStatus {
        RunStatus::parse(&self.status)
    }
}

/// Acknowledgement that an infrastructure apply was triggered.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ApproveAck {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ok: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_run_id: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Pipeline {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RefreshResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<Pipeline>,
}

impl RefreshResponse {
    pub fn run_status(&self) -> Option<RunStatus> {
        self.current_status.as_deref().map(RunStatus::parse)
    }
}

/// Canonical run outputs. Fields the client does not model are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RunOutputs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<Pipeline>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RunOutputs {
    /// Canonical status label: `current_status`, else `status`.
    pub fn status_label(&self) -> Option<&str> {
        self.current_status
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| self.status.as_deref().filter(|s| !s.trim().is_empty()))
    }

    pub fn run_status(&self) -> Option<RunStatus> {
        self.status_label().map(RunStatus::parse)
    }
}

/// Output value with any `{ "value": ... }` wrapper removed.
pub fn unwrap_output(value: &Value) -> &Value {
    match value {
        Value::Object(map) => map.get("value").unwrap_or(value),
        other => other,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RunEvent {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, alias = "ts", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// The events endpoint answers with either a bare list or `{ "events": [...] }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum EventsPayload {
    List(Vec<RunEvent>),
    Wrapped {
        #[serde(default)]
        events: Vec<RunEvent>,
    },
}

impl EventsPayload {
    pub fn into_events(self) -> Vec<RunEvent> {
        match self {
            EventsPayload::List(events) => events,
            EventsPayload::Wrapped { events } => events,
        }
    }
}

/// Suggested follow-up for a user after an operation stops short.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NextAction {
    Command { command: String, reason: String },
}

impl fmt::Display for NextAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NextAction::Command { command, reason } => write!(f, "{command}  # {reason}"),
        }
    }
}
