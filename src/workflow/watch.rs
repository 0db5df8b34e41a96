use super::context::HttpClient;
use super::DeployContext;
use crate::cli::WatchArgs;
use crate::model::RunStatus;
use crate::output::{event_line, print_json, session_lines, RunSummary};
use crate::poller::{Poller, RunSession, RunWatcher};
use anyhow::{anyhow, Result};
use std::sync::Arc;
use std::time::Duration;

pub(crate) fn run_watch(ctx: &DeployContext, args: WatchArgs) -> Result<()> {
    let session = watch_run(ctx, &args.run_id, args.interval_ms)?;
    if ctx.json {
        print_json(&RunSummary::from_session(&session), "run summary")?;
    }
    ensure_succeeded(&session)
}

/// Poll `run_id` until it reaches a terminal status, streaming progress in text mode.
pub(super) fn watch_run(
    ctx: &DeployContext,
    run_id: &str,
    interval_ms: Option<u64>,
) -> Result<RunSession> {
    let interval = interval_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| ctx.config.poll_interval());
    let poller: Poller<HttpClient> = Poller::new(Arc::clone(&ctx.client), interval);
    let mut watcher = RunWatcher::new(poller);
    watcher.watch(run_id)?;

    let mut progress = Progress::default();
    while let Some(snapshot) = watcher.wait_update() {
        if !ctx.json {
            progress.print(snapshot);
        }
    }
    let session = watcher
        .view()
        .cloned()
        .ok_or_else(|| anyhow!("poller for run {run_id} stopped before any update"))?;
    if !session.is_terminal() {
        return Err(anyhow!("poller for run {run_id} stopped before a terminal status"));
    }
    if !ctx.json {
        for line in session_lines(&session) {
            println!("{line}");
        }
    }
    Ok(session)
}

pub(super) fn ensure_succeeded(session: &RunSession) -> Result<()> {
    match session.status() {
        Some(status) if status.is_failure() => Err(anyhow!(
            "run {} finished with status {status}",
            session.run_id()
        )),
        Some(_) => Ok(()),
        None => Err(anyhow!("run {} finished without a status", session.run_id())),
    }
}

/// Incremental text output: status changes, new events, poll errors.
#[derive(Default)]
struct Progress {
    status: Option<RunStatus>,
    printed_events: usize,
    error: Option<String>,
}

impl Progress {
    fn print(&mut self, session: &RunSession) {
        let status = session.status();
        if status.is_some() && status != self.status {
            if let Some(status) = &status {
                println!("status: {status}");
            }
            self.status = status;
        }
        for event in session.events().iter().skip(self.printed_events) {
            println!("{}", event_line(event));
        }
        self.printed_events = session.events().len();
        let error = session.last_error().map(str::to_string);
        if error.is_some() && error != self.error {
            if let Some(error) = &error {
                eprintln!("poll error: {error}");
            }
        }
        self.error = error;
    }
}
