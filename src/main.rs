//! `dorch`: drive a requirement set through approval, plan a deploy run,
//! trigger infrastructure and poll the run until it finishes.
use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod api;
mod cli;
mod config;
mod controller;
mod error;
mod gate;
mod model;
mod output;
mod poller;
mod retry;
#[cfg(test)]
mod testing;
mod transport;
mod util;
mod workflow;

use cli::{Command, RootArgs};
use workflow::DeployContext;

const LOG_ENV: &str = "DORCH_LOG";

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    // Logs go to stderr so `--json` output on stdout stays parseable.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> Result<()> {
    let args = RootArgs::parse();
    init_logging(args.verbose);
    let ctx = DeployContext::load(&args)?;
    match args.command {
        Command::Session(command) => workflow::run_session(&ctx, command),
        Command::RequirementSet(command) => workflow::run_requirement_set(&ctx, command),
        Command::Plan(plan) => workflow::run_plan(&ctx, plan),
        Command::ApproveRun(run) => workflow::run_approve_run(&ctx, run),
        Command::Refresh(run) => workflow::run_refresh(&ctx, run),
        Command::Package(run) => workflow::run_package(&ctx, run),
        Command::Watch(watch) => workflow::run_watch(&ctx, watch),
        Command::Deploy(deploy) => workflow::run_deploy(&ctx, deploy),
    }
}
