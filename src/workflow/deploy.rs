use super::plan::{plan_with_gate, print_plan};
use super::watch::{ensure_succeeded, watch_run};
use super::DeployContext;
use crate::cli::DeployArgs;
use crate::controller::DeployController;
use crate::model::NextAction;
use crate::output::{print_json, print_next_action, RunSummary};
use anyhow::{Context, Result};
use serde_json::json;
use tracing::info;

/// Gate, plan, and (with `--approve`) trigger infrastructure and watch to completion.
pub(crate) fn run_deploy(ctx: &DeployContext, args: DeployArgs) -> Result<()> {
    let placement = ctx.placement(&args.placement);
    let plan = plan_with_gate(
        ctx,
        &args.requirement_set_id,
        &placement,
        args.idempotency_key.as_deref(),
    )?;
    info!(run_id = %plan.run_id, "planned");

    if !args.approve {
        if ctx.json {
            return print_json(&json!({ "plan": plan }), "deploy result");
        }
        print_plan(&plan);
        print_next_action(&NextAction::Command {
            command: format!("dorch approve-run --run-id {}", plan.run_id),
            reason: "infrastructure apply was not requested (pass --approve)".to_string(),
        });
        return Ok(());
    }

    let controller = DeployController::new(ctx.client.as_ref());
    let ack = controller
        .approve_run(&plan.run_id)
        .with_context(|| format!("approve run {}", plan.run_id))?;
    if !ctx.json {
        print_plan(&plan);
        println!("apply triggered");
    }

    let session = watch_run(ctx, &plan.run_id, args.interval_ms)?;
    if ctx.json {
        print_json(
            &json!({
                "plan": plan,
                "approval": ack,
                "run": RunSummary::from_session(&session),
            }),
            "deploy result",
        )?;
    }
    ensure_succeeded(&session)
}
