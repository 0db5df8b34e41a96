//! Text and JSON rendering of command results.
use crate::model::{unwrap_output, NextAction, RunEvent, RunStatus, TIMELINE};
use crate::poller::RunSession;
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Serializable projection of a [`RunSession`].
#[derive(Debug, Serialize)]
pub struct RunSummary<'a> {
    pub run_id: &'a str,
    pub status: Option<String>,
    pub timeline_index: usize,
    pub terminal: bool,
    pub cycles: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<&'a str>,
    pub outputs: BTreeMap<&'a str, &'a Value>,
    pub events: &'a [RunEvent],
}

impl<'a> RunSummary<'a> {
    pub fn from_session(session: &'a RunSession) -> Self {
        let status = session.status();
        Self {
            run_id: session.run_id(),
            timeline_index: status.as_ref().map_or(0, RunStatus::timeline_index),
            status: status.map(|s| s.to_string()),
            terminal: session.is_terminal(),
            cycles: session.cycles(),
            last_error: session.last_error(),
            outputs: session
                .outputs()
                .map(|outputs| {
                    outputs
                        .outputs
                        .iter()
                        .map(|(key, value)| (key.as_str(), unwrap_output(value)))
                        .collect()
                })
                .unwrap_or_default(),
            events: session.events(),
        }
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T, label: &str) -> Result<()> {
    let text = serde_json::to_string_pretty(value).with_context(|| format!("serialize {label}"))?;
    println!("{text}");
    Ok(())
}

/// One line per timeline stage: `x` done, `>` current, blank pending.
pub fn timeline_lines(status: &RunStatus) -> Vec<String> {
    let current = status.timeline_index();
    let failed = status.is_failure();
    TIMELINE
        .iter()
        .enumerate()
        .map(|(index, stage)| {
            let mark = if failed && *stage == "failed" {
                "!"
            } else if index < current {
                "x"
            } else if index == current && !failed {
                ">"
            } else {
                " "
            };
            format!("  [{mark}] {stage}")
        })
        .collect()
}

pub fn event_line(event: &RunEvent) -> String {
    let mut line = format!("  #{}", event.id);
    if let Some(at) = &event.created_at {
        line.push_str(&format!(" {at}"));
    }
    if let Some(stage) = &event.stage {
        line.push_str(&format!(" [{stage}]"));
    }
    if let Some(status) = &event.status {
        line.push_str(&format!(" {status}"));
    }
    if let Some(message) = &event.message {
        line.push_str(&format!(": {message}"));
    }
    line
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Full text view of a session: status, timeline, outputs, then events.
pub fn session_lines(session: &RunSession) -> Vec<String> {
    let mut lines = Vec::new();
    let status = session.status();
    lines.push(format!("run: {}", session.run_id()));
    lines.push(format!(
        "status: {}",
        status
            .as_ref()
            .map_or_else(|| "unknown".to_string(), |s| s.to_string())
    ));
    if let Some(pipeline) = session.outputs().and_then(|o| o.pipeline.as_ref()) {
        let state = pipeline.state.as_deref().unwrap_or("-");
        let result = pipeline.result.as_deref().unwrap_or("-");
        lines.push(format!("pipeline: {state} ({result})"));
        if let Some(url) = &pipeline.url {
            lines.push(format!("pipeline url: {url}"));
        }
    }
    if let Some(status) = &status {
        lines.push("timeline:".to_string());
        lines.extend(timeline_lines(status));
    }
    if let Some(outputs) = session.outputs().filter(|o| !o.outputs.is_empty()) {
        lines.push("outputs:".to_string());
        for (key, value) in &outputs.outputs {
            lines.push(format!("  {key} = {}", value_text(unwrap_output(value))));
        }
    }
    if !session.events().is_empty() {
        lines.push("events:".to_string());
        lines.extend(session.events().iter().map(event_line));
    }
    if let Some(error) = session.last_error() {
        lines.push(format!("last error: {error}"));
    }
    lines
}

pub fn print_next_action(action: &NextAction) {
    match action {
        NextAction::Command { command, reason } => {
            eprintln!("next: {command}");
            eprintln!("next detail: {reason}");
        }
    }
}
