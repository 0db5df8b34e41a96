//! CLI argument parsing for the deploy workflow.
//!
//! Subcommands map one-to-one onto workflow handlers; shared connection
//! settings live on [`RootArgs`] as global flags.
use crate::config::ConfigOverrides;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "dorch",
    version,
    about = "Requirement-set approval, deploy planning and run status polling",
    after_help = "Examples:\n  dorch requirement-set show --id rs_1\n  dorch plan --requirement-set-id rs_1\n  dorch approve-run --run-id run_42\n  dorch watch --run-id run_42\n  dorch deploy --requirement-set-id rs_1 --approve --json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Config file (JSON); defaults to <config dir>/dorch/config.json
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Proxy base URL (overrides config file and DORCH_BASE_URL)
    #[arg(long, value_name = "URL", global = true)]
    pub base_url: Option<String>,

    /// API key sent as x-api-key
    #[arg(long, value_name = "KEY", global = true)]
    pub api_key: Option<String>,

    /// Per-request timeout in milliseconds
    #[arg(long, value_name = "MS", global = true)]
    pub timeout_ms: Option<u64>,

    /// Emit machine-readable JSON output
    #[arg(long, global = true)]
    pub json: bool,

    /// Log workflow progress to stderr
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl RootArgs {
    pub fn config_overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            config_path: self.config.clone(),
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            timeout_ms: self.timeout_ms,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Intake sessions
    #[command(subcommand)]
    Session(SessionCommand),
    /// Requirement set lifecycle and edits
    #[command(subcommand)]
    RequirementSet(RequirementSetCommand),
    Plan(PlanArgs),
    /// Trigger infrastructure apply for a planned run
    ApproveRun(RunArgs),
    /// Refresh a run's status from its pipeline (retried)
    Refresh(RunArgs),
    /// Show a run's deploy package manifest
    Package(RunArgs),
    Watch(WatchArgs),
    Deploy(DeployArgs),
}

#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    /// Create an intake session
    Create(SessionCreateArgs),
}

#[derive(Args, Debug)]
pub struct SessionCreateArgs {
    /// Creator recorded on the session (defaults to the configured actor)
    #[arg(long)]
    pub created_by: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum RequirementSetCommand {
    /// Create a draft requirement set in a session
    Create(RequirementSetCreateArgs),
    /// Show a requirement set and its status
    Show(RequirementSetIdArgs),
    /// Submit a draft for approval
    Submit(RequirementSetIdArgs),
    /// Approve a submitted requirement set
    Approve(RequirementSetIdArgs),
    /// Update business context (draft only)
    BusinessContext(BusinessContextArgs),
    /// Update placement constraints (draft only)
    Constraints(ConstraintsArgs),
    /// Update guardrails (draft only)
    Guardrails(GuardrailsArgs),
}

#[derive(Args, Debug)]
pub struct RequirementSetCreateArgs {
    #[arg(long)]
    pub session_id: String,

    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub created_by: Option<String>,
}

#[derive(Args, Debug)]
pub struct RequirementSetIdArgs {
    /// Requirement set id
    #[arg(long)]
    pub id: String,
}

#[derive(Args, Debug)]
pub struct BusinessContextArgs {
    #[arg(long)]
    pub id: String,

    #[arg(long)]
    pub industry: Option<String>,

    #[arg(long)]
    pub business_owner: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// Comma-separated stakeholder list
    #[arg(long, value_name = "LIST")]
    pub stakeholders: Option<String>,
}

#[derive(Args, Debug)]
pub struct ConstraintsArgs {
    #[arg(long)]
    pub id: String,

    #[arg(long)]
    pub region: Option<String>,

    #[arg(long)]
    pub environment: Option<String>,

    #[arg(long)]
    pub cloud: Option<String>,
}

#[derive(Args, Debug)]
pub struct GuardrailsArgs {
    #[arg(long)]
    pub id: String,

    #[arg(long)]
    pub pii_present: Option<bool>,

    #[arg(long)]
    pub gdpr_required: Option<bool>,

    #[arg(long)]
    pub private_networking_required: Option<bool>,

    #[arg(long, value_name = "EUR")]
    pub budget_eur_month: Option<f64>,
}

/// Placement parameters for a deploy plan.
#[derive(Args, Debug, Default)]
pub struct PlacementArgs {
    /// Resource name prefix (defaults to config)
    #[arg(long)]
    pub name_prefix: Option<String>,

    /// Azure region (defaults to config)
    #[arg(long)]
    pub region: Option<String>,

    /// Target environment (defaults to config)
    #[arg(long)]
    pub environment: Option<String>,

    #[arg(long)]
    pub enable_apim: bool,

    #[arg(long, value_name = "HOST")]
    pub backend_app_hostname: Option<String>,

    #[arg(long)]
    pub cloud: Option<String>,

    #[arg(long)]
    pub warehouse: Option<String>,

    #[arg(long)]
    pub etl: Option<String>,

    #[arg(long)]
    pub governance: Option<String>,

    #[arg(long)]
    pub enable_bi: bool,

    #[arg(long)]
    pub bi_tool: Option<String>,

    #[arg(long)]
    pub allow_costly_resources: bool,
}

#[derive(Args, Debug)]
#[command(about = "Create a deploy plan, approving the requirement set if needed")]
pub struct PlanArgs {
    #[arg(long)]
    pub requirement_set_id: String,

    #[command(flatten)]
    pub placement: PlacementArgs,

    /// Hint forwarded as x-idempotency-key
    #[arg(long)]
    pub idempotency_key: Option<String>,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Deploy run id
    #[arg(long)]
    pub run_id: String,
}

#[derive(Args, Debug)]
#[command(about = "Poll a run's outputs and events until it finishes")]
pub struct WatchArgs {
    #[arg(long)]
    pub run_id: String,

    /// Poll interval in milliseconds (defaults to config)
    #[arg(long, value_name = "MS")]
    pub interval_ms: Option<u64>,
}

#[derive(Args, Debug)]
#[command(about = "Approve, plan, optionally trigger infrastructure, then watch")]
pub struct DeployArgs {
    #[arg(long)]
    pub requirement_set_id: String,

    #[command(flatten)]
    pub placement: PlacementArgs,

    /// Trigger infrastructure apply after planning
    #[arg(long)]
    pub approve: bool,

    #[arg(long)]
    pub idempotency_key: Option<String>,

    #[arg(long, value_name = "MS")]
    pub interval_ms: Option<u64>,
}
