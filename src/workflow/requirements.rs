use super::DeployContext;
use crate::cli::{
    BusinessContextArgs, ConstraintsArgs, GuardrailsArgs, RequirementSetCommand,
    RequirementSetIdArgs, SessionCommand,
};
use crate::error::ApiError;
use crate::gate::LifecycleGate;
use crate::model::{BusinessContext, Constraints, Guardrails, NextAction, RequirementSet};
use crate::output::{print_json, print_next_action};
use crate::util::split_list;
use anyhow::{Context, Result};
use serde_json::{json, Value};

pub(crate) fn run_session(ctx: &DeployContext, command: SessionCommand) -> Result<()> {
    match command {
        SessionCommand::Create(args) => {
            let created_by = args.created_by.as_deref().unwrap_or(ctx.actor());
            let session = ctx
                .client
                .create_session(created_by)
                .context("create session")?;
            if ctx.json {
                return print_json(&session, "session");
            }
            println!("session: {}", session.session_id);
            Ok(())
        }
    }
}

pub(crate) fn run_requirement_set(ctx: &DeployContext, command: RequirementSetCommand) -> Result<()> {
    match command {
        RequirementSetCommand::Create(args) => {
            let created_by = args.created_by.as_deref().unwrap_or(ctx.actor());
            let set = ctx
                .client
                .create_requirement_set(&args.session_id, &args.name, created_by)
                .context("create requirement set")?;
            print_requirement_set(ctx, &set)
        }
        RequirementSetCommand::Show(args) => {
            let set = ctx
                .client
                .get_requirement_set(&args.id)
                .with_context(|| format!("read requirement set {}", args.id))?;
            print_requirement_set(ctx, &set)
        }
        RequirementSetCommand::Submit(args) => run_submit(ctx, &args),
        RequirementSetCommand::Approve(args) => run_approve(ctx, &args),
        RequirementSetCommand::BusinessContext(args) => run_business_context(ctx, args),
        RequirementSetCommand::Constraints(args) => run_constraints(ctx, args),
        RequirementSetCommand::Guardrails(args) => run_guardrails(ctx, args),
    }
}

fn print_requirement_set(ctx: &DeployContext, set: &RequirementSet) -> Result<()> {
    if ctx.json {
        return print_json(set, "requirement set");
    }
    println!("requirement set: {}", set.id);
    println!("name: {}", set.display_name());
    println!("status: {}", set.status());
    if let Some(version) = set.version {
        println!("version: {version}");
    }
    if let Some(reason) = &set.reject_reason {
        println!("reject reason: {reason}");
    }
    if let Some(reference) = &set.change_request_ref {
        println!("change request: {reference}");
    }
    Ok(())
}

fn print_transition(ctx: &DeployContext, id: &str, status: &str) -> Result<()> {
    if ctx.json {
        return print_json(&json!({ "id": id, "status": status }), "transition");
    }
    println!("requirement set {id}: {status}");
    Ok(())
}

fn run_submit(ctx: &DeployContext, args: &RequirementSetIdArgs) -> Result<()> {
    let mut gate = LifecycleGate::new(ctx.client.as_ref(), &args.id, ctx.actor());
    let status = gate
        .submit()
        .with_context(|| format!("submit requirement set {}", args.id))?;
    print_transition(ctx, &args.id, status.as_str())
}

fn run_approve(ctx: &DeployContext, args: &RequirementSetIdArgs) -> Result<()> {
    let current = ctx
        .client
        .get_requirement_set(&args.id)
        .with_context(|| format!("read requirement set {}", args.id))?;
    let mut gate = LifecycleGate::new(ctx.client.as_ref(), &args.id, ctx.actor())
        .with_status(current.status());
    let status = match gate.approve() {
        Ok(status) => status,
        Err(err @ ApiError::InvalidTransition { .. }) => {
            print_next_action(&NextAction::Command {
                command: format!("dorch requirement-set submit --id {}", args.id),
                reason: "drafts must be submitted before approval".to_string(),
            });
            return Err(err.into());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("approve requirement set {}", args.id))
        }
    };
    print_transition(ctx, &args.id, status.as_str())
}

fn print_edit(ctx: &DeployContext, id: &str, what: &str, response: &Value) -> Result<()> {
    if ctx.json {
        return print_json(response, what);
    }
    println!("updated {what} for requirement set {id}");
    Ok(())
}

fn run_business_context(ctx: &DeployContext, args: BusinessContextArgs) -> Result<()> {
    let context = BusinessContext {
        industry: args.industry,
        business_owner: args.business_owner,
        description: args.description,
        stakeholders: args
            .stakeholders
            .as_deref()
            .map(split_list)
            .unwrap_or_default(),
    };
    let mut gate = LifecycleGate::new(ctx.client.as_ref(), &args.id, ctx.actor());
    let response = gate
        .update_business_context(&context)
        .with_context(|| format!("update business context for {}", args.id))?;
    print_edit(ctx, &args.id, "business context", &response)
}

fn run_constraints(ctx: &DeployContext, args: ConstraintsArgs) -> Result<()> {
    let constraints = Constraints {
        region: args.region,
        environment: args.environment,
        cloud: args.cloud,
    };
    let mut gate = LifecycleGate::new(ctx.client.as_ref(), &args.id, ctx.actor());
    let response = gate
        .update_constraints(&constraints)
        .with_context(|| format!("update constraints for {}", args.id))?;
    print_edit(ctx, &args.id, "constraints", &response)
}

fn run_guardrails(ctx: &DeployContext, args: GuardrailsArgs) -> Result<()> {
    let guardrails = Guardrails {
        pii_present: args.pii_present,
        gdpr_required: args.gdpr_required,
        private_networking_required: args.private_networking_required,
        budget_eur_month: args.budget_eur_month,
    };
    let mut gate = LifecycleGate::new(ctx.client.as_ref(), &args.id, ctx.actor());
    let response = gate
        .update_guardrails(&guardrails)
        .with_context(|| format!("update guardrails for {}", args.id))?;
    print_edit(ctx, &args.id, "guardrails", &response)
}
