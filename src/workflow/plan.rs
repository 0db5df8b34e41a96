use super::DeployContext;
use crate::cli::{PlanArgs, RunArgs};
use crate::controller::DeployController;
use crate::gate::LifecycleGate;
use crate::model::{NextAction, PlacementParams, PlanResponse};
use crate::output::{print_json, print_next_action};
use anyhow::{Context, Result};
use serde_json::Value;

/// Plan through the lifecycle gate, printing the manual follow-up if
/// automatic approval could not be completed.
pub(super) fn plan_with_gate(
    ctx: &DeployContext,
    requirement_set_id: &str,
    placement: &PlacementParams,
    idempotency_key: Option<&str>,
) -> Result<PlanResponse> {
    let client = ctx.client.as_ref();
    let controller = DeployController::new(client);
    let mut gate = LifecycleGate::new(client, requirement_set_id, ctx.actor());
    match gate.ensure_approved_then_plan(&controller, placement, idempotency_key) {
        Ok(plan) => Ok(plan),
        Err(err) => {
            if let Some(action) = gate.recovery_action() {
                print_next_action(&action);
            }
            Err(err).with_context(|| format!("create deploy plan for {requirement_set_id}"))
        }
    }
}

pub(super) fn print_plan(plan: &PlanResponse) {
    println!("run: {}", plan.run_id);
    println!("status: {}", plan.run_status());
    if let Some(summary) = &plan.plan_summary {
        match summary {
            Value::String(text) => println!("plan summary: {text}"),
            other => println!("plan summary: {other}"),
        }
    }
    for warning in &plan.policy_warnings {
        match warning {
            Value::String(text) => println!("policy warning: {text}"),
            other => println!("policy warning: {other}"),
        }
    }
}

pub(crate) fn run_plan(ctx: &DeployContext, args: PlanArgs) -> Result<()> {
    let placement = ctx.placement(&args.placement);
    let plan = plan_with_gate(
        ctx,
        &args.requirement_set_id,
        &placement,
        args.idempotency_key.as_deref(),
    )?;
    if ctx.json {
        return print_json(&plan, "plan");
    }
    print_plan(&plan);
    print_next_action(&NextAction::Command {
        command: format!("dorch approve-run --run-id {}", plan.run_id),
        reason: "review the plan, then trigger infrastructure apply".to_string(),
    });
    Ok(())
}

pub(crate) fn run_approve_run(ctx: &DeployContext, args: RunArgs) -> Result<()> {
    let controller = DeployController::new(ctx.client.as_ref());
    let ack = controller
        .approve_run(&args.run_id)
        .with_context(|| format!("approve run {}", args.run_id))?;
    if ctx.json {
        return print_json(&ack, "approval");
    }
    println!("run {}: apply triggered", args.run_id);
    if let Some(status) = &ack.status {
        println!("status: {status}");
    }
    if let Some(pipeline_run_id) = &ack.pipeline_run_id {
        println!("pipeline run: {pipeline_run_id}");
    }
    Ok(())
}

pub(crate) fn run_refresh(ctx: &DeployContext, args: RunArgs) -> Result<()> {
    let controller = DeployController::new(ctx.client.as_ref());
    let refreshed = controller
        .refresh(&args.run_id)
        .with_context(|| format!("refresh run {}", args.run_id))?;
    if ctx.json {
        return print_json(&refreshed, "refresh");
    }
    if let Some(previous) = &refreshed.previous_status {
        println!("previous status: {previous}");
    }
    match refreshed.run_status() {
        Some(status) => println!("status: {status}"),
        None => println!("status: unknown"),
    }
    if let Some(pipeline) = &refreshed.pipeline {
        println!(
            "pipeline: {} ({})",
            pipeline.state.as_deref().unwrap_or("-"),
            pipeline.result.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

pub(crate) fn run_package(ctx: &DeployContext, args: RunArgs) -> Result<()> {
    let controller = DeployController::new(ctx.client.as_ref());
    let package = controller
        .package(&args.run_id)
        .with_context(|| format!("fetch deploy package for {}", args.run_id))?;
    // The manifest has no stable text form; both modes print JSON.
    print_json(&package, "deploy package")
}
