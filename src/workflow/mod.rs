//! Command handlers.
//!
//! Each handler resolves a [`DeployContext`], drives the gate, controller or
//! poller, and prints text or JSON.
mod context;
mod deploy;
mod plan;
mod requirements;
mod watch;

pub(crate) use context::DeployContext;
pub(crate) use deploy::run_deploy;
pub(crate) use plan::{run_approve_run, run_package, run_plan, run_refresh};
pub(crate) use requirements::{run_requirement_set, run_session};
pub(crate) use watch::run_watch;
