use super::cursor::EventCursor;
use crate::error::ApiError;
use crate::model::{RunEvent, RunOutputs, RunStatus};

/// Client-side view of one run, merged from successive poll cycles.
///
/// A failed fetch never clears what earlier cycles merged; it only replaces
/// `last_error`.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSession {
    outputs: Option<RunOutputs>,
    events: Vec<RunEvent>,
    cursor: EventCursor,
    last_error: Option<String>,
    terminal: bool,
    cycles: u64,
}

impl RunSession {
    pub fn new(run_id: &str) -> Self {
        Self {
            outputs: None,
            events: Vec::new(),
            cursor: EventCursor::new(run_id),
            last_error: None,
            terminal: false,
            cycles: 0,
        }
    }

    pub fn run_id(&self) -> &str {
        self.cursor.run_id()
    }

    pub fn outputs(&self) -> Option<&RunOutputs> {
        self.outputs.as_ref()
    }

    pub fn events(&self) -> &[RunEvent] {
        &self.events
    }

    pub fn cursor(&self) -> &EventCursor {
        &self.cursor
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn status(&self) -> Option<RunStatus> {
        self.outputs.as_ref().and_then(RunOutputs::run_status)
    }

    /// Switch to another run, discarding everything merged for the old one.
    pub fn retarget(&mut self, run_id: &str) {
        if self.run_id() == run_id {
            return;
        }
        *self = Self::new(run_id);
    }

    /// Merge one cycle's results. Returns `true` once a terminal status is seen.
    pub fn apply_cycle(
        &mut self,
        outputs: Result<RunOutputs, ApiError>,
        events: Result<Vec<RunEvent>, ApiError>,
    ) -> bool {
        let mut errors = Vec::new();
        match outputs {
            Ok(outputs) => {
                self.terminal = outputs
                    .run_status()
                    .is_some_and(|status| status.is_terminal());
                self.outputs = Some(outputs);
            }
            Err(err) => errors.push(format!("outputs: {err}")),
        }
        match events {
            Ok(batch) => {
                let fresh = self.cursor.accept(batch);
                self.events.extend(fresh);
            }
            Err(err) => errors.push(format!("events: {err}")),
        }
        self.last_error = (!errors.is_empty()).then(|| errors.join("; "));
        self.cycles += 1;
        self.terminal
    }
}
