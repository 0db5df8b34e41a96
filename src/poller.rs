//! Run status poller.
//!
//! One activation polls one run on a dedicated thread: a cycle immediately,
//! then one per interval until the cycle after the first terminal status, or
//! until the activation is cancelled. Each cycle fetches outputs and new events
//! concurrently and merges them into a [`RunSession`]; snapshots of the
//! session are published over a channel.
use crate::api::OnboardingClient;
use crate::error::ApiError;
use crate::model::{RunEvent, RunOutputs, RunStatus};
use crate::transport::Transport;
use anyhow::{Context, Result};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

mod cancel;
mod cursor;
mod session;

pub use cancel::CancelToken;
pub use cursor::EventCursor;
pub use session::RunSession;

/// Read side of a run, as the poller needs it.
pub trait RunSource: Send + Sync {
    fn fetch_outputs(&self, run_id: &str) -> Result<RunOutputs, ApiError>;
    fn fetch_events(&self, run_id: &str, after_id: u64) -> Result<Vec<RunEvent>, ApiError>;
}

impl<T: Transport + Send + Sync> RunSource for OnboardingClient<T> {
    fn fetch_outputs(&self, run_id: &str) -> Result<RunOutputs, ApiError> {
        self.get_run_outputs(run_id)
    }

    fn fetch_events(&self, run_id: &str, after_id: u64) -> Result<Vec<RunEvent>, ApiError> {
        self.get_run_events(run_id, after_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Continue,
    Terminal,
    /// Results arrived after cancellation and were discarded.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollExit {
    Terminal(RunStatus),
    Cancelled,
}

pub struct Poller<S> {
    source: Arc<S>,
    interval: Duration,
}

impl<S> Clone for Poller<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            interval: self.interval,
        }
    }
}

impl<S: RunSource + 'static> Poller<S> {
    pub fn new(source: Arc<S>, interval: Duration) -> Self {
        Self { source, interval }
    }

    /// Fetch outputs and events concurrently, then merge unless cancelled meanwhile.
    pub fn run_cycle(&self, session: &mut RunSession, cancel: &CancelToken) -> CycleOutcome {
        if cancel.is_cancelled() {
            return CycleOutcome::Cancelled;
        }
        let run_id = session.run_id().to_string();
        let after_id = session.cursor().last_event_id();
        let source = self.source.as_ref();

        let (outputs, events) = thread::scope(|scope| {
            let outputs = scope.spawn(|| source.fetch_outputs(&run_id));
            let events = source.fetch_events(&run_id, after_id);
            let outputs = outputs.join().unwrap_or_else(|_| {
                Err(ApiError::Network {
                    path: format!("/runs/{run_id}/outputs"),
                    message: "outputs fetch panicked".to_string(),
                })
            });
            (outputs, events)
        });

        if cancel.is_cancelled() {
            debug!(run_id = %run_id, "discarding results that arrived after cancellation");
            return CycleOutcome::Cancelled;
        }
        let terminal = session.apply_cycle(outputs, events);
        match session.last_error() {
            Some(error) => warn!(run_id = %run_id, error, "poll cycle failed"),
            None => debug!(
                run_id = %run_id,
                status = ?session.status().map(|s| s.to_string()),
                events = session.events().len(),
                cursor = session.cursor().last_event_id(),
                "poll cycle merged"
            ),
        }
        if terminal {
            CycleOutcome::Terminal
        } else {
            CycleOutcome::Continue
        }
    }

    /// Poll until terminal or cancelled, reporting the session after every merged cycle.
    ///
    /// Once a terminal status is first observed, exactly one more cycle runs
    /// on the next tick so trailing events written alongside the final status
    /// are still merged. Then the schedule stops.
    pub fn run(
        &self,
        session: &mut RunSession,
        cancel: &CancelToken,
        mut on_update: impl FnMut(&RunSession),
    ) -> PollExit {
        let mut final_cycle = false;
        loop {
            let outcome = self.run_cycle(session, cancel);
            if outcome == CycleOutcome::Cancelled {
                return PollExit::Cancelled;
            }
            on_update(session);
            if final_cycle {
                let status = session
                    .status()
                    .unwrap_or_else(|| RunStatus::Other(String::new()));
                info!(run_id = session.run_id(), %status, "run reached terminal status");
                return PollExit::Terminal(status);
            }
            if outcome == CycleOutcome::Terminal {
                debug!(
                    run_id = session.run_id(),
                    cursor = session.cursor().last_event_id(),
                    "terminal status observed; one final cycle scheduled"
                );
                final_cycle = true;
            }
            if cancel.wait_timeout(self.interval) {
                return PollExit::Cancelled;
            }
        }
    }

    /// Start polling `session` on a dedicated thread.
    pub fn spawn(&self, mut session: RunSession) -> Result<PollerHandle> {
        let cancel = CancelToken::new();
        let (tx, rx) = mpsc::channel();
        let run_id = session.run_id().to_string();
        let poller = self.clone();
        let token = cancel.clone();
        let thread = thread::Builder::new()
            .name(format!("poll-{run_id}"))
            .spawn(move || {
                let exit = poller.run(&mut session, &token, |snapshot| {
                    if tx.send(snapshot.clone()).is_err() {
                        token.cancel();
                    }
                });
                (session, exit)
            })
            .with_context(|| format!("spawn poller thread for run {run_id}"))?;
        Ok(PollerHandle {
            run_id,
            cancel,
            updates: rx,
            thread: Some(thread),
        })
    }
}

/// A running activation. Dropping the handle cancels it.
pub struct PollerHandle {
    run_id: String,
    cancel: CancelToken,
    updates: Receiver<RunSession>,
    thread: Option<JoinHandle<(RunSession, PollExit)>>,
}

impl PollerHandle {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Block for the next snapshot; `None` once the poller has stopped.
    pub fn next_update(&self) -> Option<RunSession> {
        self.updates.recv().ok()
    }

    /// Cancel (if still running) and wait for the final session.
    pub fn join(mut self) -> Option<(RunSession, PollExit)> {
        let thread = self.thread.take()?;
        if !thread.is_finished() {
            self.cancel.cancel();
        }
        thread.join().ok()
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Owns the single active activation and the latest view of its run.
pub struct RunWatcher<S> {
    poller: Poller<S>,
    active: Option<PollerHandle>,
    view: Option<RunSession>,
}

impl<S: RunSource + 'static> RunWatcher<S> {
    pub fn new(poller: Poller<S>) -> Self {
        Self {
            poller,
            active: None,
            view: None,
        }
    }

    /// Activate polling for `run_id`.
    ///
    /// The previous activation is cancelled. A different run starts from a
    /// blank session; re-watching the same run keeps the merged view.
    pub fn watch(&mut self, run_id: &str) -> Result<()> {
        if let Some(previous) = self.active.take() {
            debug!(run_id = previous.run_id(), "cancelling previous activation");
            previous.cancel();
        }
        let mut session = self
            .view
            .take()
            .unwrap_or_else(|| RunSession::new(run_id));
        session.retarget(run_id);
        self.active = Some(self.poller.spawn(session.clone())?);
        self.view = Some(session);
        Ok(())
    }

    pub fn view(&self) -> Option<&RunSession> {
        self.view.as_ref()
    }

    /// Block until the next snapshot and adopt it.
    ///
    /// Returns `None` once polling has stopped; the view then holds the
    /// poller's final session.
    pub fn wait_update(&mut self) -> Option<&RunSession> {
        let snapshot = self.active.as_ref()?.next_update();
        match snapshot {
            Some(snapshot) => {
                self.view = Some(snapshot);
                self.view.as_ref()
            }
            None => {
                if let Some((session, exit)) = self.active.take().and_then(PollerHandle::join) {
                    debug!(run_id = session.run_id(), ?exit, "poller stopped");
                    self.view = Some(session);
                }
                None
            }
        }
    }
}
