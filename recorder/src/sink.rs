//! Consumers of tracked steps.
//!
//! The tracker owns one [`StepSink`] and calls into it at three points: to
//! build a step, right after a step begins, and right after it ends. The
//! default `on_end_step` writes one log line per step (see [`log_step`]).

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{Level, info};

use crate::core::step::{StepMeta, TrackedStep};

/// Extension points of a [`StepTracker`](crate::core::tracker::StepTracker).
///
/// Hooks run synchronously on the caller's thread and never while the
/// tracker holds its stack lock.
pub trait StepSink {
    /// Build the concrete step for freshly assigned metadata.
    fn create_step(&self, meta: StepMeta) -> TrackedStep {
        TrackedStep::new(meta)
    }

    /// Called after a real step has been created and pushed.
    ///
    /// The step's id is already on the open-step stack, so a step begun from
    /// inside this hook is nested under it.
    fn on_begin_step(&self, _step: &TrackedStep) {}

    /// Called after a real step has been popped and ended.
    ///
    /// Errors are returned as-is from `end_step`.
    fn on_end_step(&self, step: &TrackedStep) -> Result<()> {
        log_step(step);
        Ok(())
    }
}

impl<S: StepSink + ?Sized> StepSink for Arc<S> {
    fn create_step(&self, meta: StepMeta) -> TrackedStep {
        (**self).create_step(meta)
    }

    fn on_begin_step(&self, step: &TrackedStep) {
        (**self).on_begin_step(step);
    }

    fn on_end_step(&self, step: &TrackedStep) -> Result<()> {
        (**self).on_end_step(step)
    }
}

/// Discards every step.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl StepSink for NoopSink {
    fn on_end_step(&self, _step: &TrackedStep) -> Result<()> {
        Ok(())
    }
}

/// Logs one `info` line per completed step.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl StepSink for LogSink {}

/// Emit the reference line for a completed step.
///
/// Skips formatting entirely when `info` is not enabled.
pub fn log_step(step: &TrackedStep) {
    if tracing::enabled!(Level::INFO) {
        let line = format_step_line(
            step.elapsed(),
            step.level(),
            step.step_type(),
            step.name(),
            step.description(),
        );
        info!(
            step_id = step.id(),
            parent_id = step.parent_id(),
            level = step.level(),
            "{line}"
        );
    }
}

/// `"    12 ms :   Bar - init db(init)"`: right-aligned milliseconds, then
/// the type indented by level, then `description(name)`.
pub fn format_step_line(
    elapsed: Duration,
    level: usize,
    step_type: &str,
    name: &str,
    description: &str,
) -> String {
    format!(
        "{:>6} ms : {}{} - {}({})",
        elapsed.as_millis(),
        pad_string(level),
        step_type,
        description,
        name
    )
}

/// Two spaces per nesting level.
pub fn pad_string(level: usize) -> String {
    " ".repeat(level * 2)
}

/// Snapshot of a completed step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    #[serde(rename = "type")]
    pub step_type: String,
    pub name: String,
    pub description: String,
    pub id: u32,
    pub parent_id: u32,
    pub level: usize,
    pub begun_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub tags: BTreeMap<String, String>,
}

impl From<&TrackedStep> for StepRecord {
    fn from(step: &TrackedStep) -> Self {
        Self {
            step_type: step.step_type().to_string(),
            name: step.name().to_string(),
            description: step.description().to_string(),
            id: step.id(),
            parent_id: step.parent_id(),
            level: step.level(),
            begun_at: step.begun_at(),
            elapsed_ms: u64::try_from(step.elapsed().as_millis()).unwrap_or(u64::MAX),
            tags: step.tags().clone(),
        }
    }
}

/// Keeps completed steps in memory, in the order they ended.
#[derive(Debug, Default)]
pub struct RecordingSink {
    records: Mutex<Vec<StepRecord>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<StepRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Pretty JSON array of the recorded steps.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.records()).context("serialize step records")
    }
}

impl StepSink for RecordingSink {
    fn on_end_step(&self, step: &TrackedStep) -> Result<()> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(StepRecord::from(step));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::capture_logs;

    fn tracked(id: u32, parent_id: u32, level: usize) -> TrackedStep {
        TrackedStep::new(StepMeta {
            step_type: "Bar".to_string(),
            name: "init".to_string(),
            description: "init db".to_string(),
            id,
            parent_id,
            level,
        })
    }

    #[test]
    fn pad_string_is_two_spaces_per_level() {
        assert_eq!(pad_string(0), "");
        assert_eq!(pad_string(1), "  ");
        for level in 0..16 {
            let pad = pad_string(level);
            assert_eq!(pad.len(), level * 2);
            assert!(pad.chars().all(|c| c == ' '));
        }
    }

    #[test]
    fn format_step_line_matches_reference_layout() {
        let line = format_step_line(Duration::from_millis(12), 1, "Bar", "init", "init db");
        assert_eq!(line, "    12 ms :   Bar - init db(init)");

        let wide = format_step_line(Duration::from_millis(1_234_567), 0, "Foo", "boot", "b");
        assert_eq!(wide, "1234567 ms : Foo - b(boot)");
    }

    #[test]
    fn log_sink_writes_one_info_line() {
        let mut step = tracked(2, 1, 1);
        step.end();

        let logs = capture_logs(Level::INFO, || LogSink.on_end_step(&step).expect("log"));

        assert!(logs.contains(" ms :   Bar - init db(init)"), "{logs}");
        assert!(logs.contains("step_id=2"), "{logs}");
        assert!(logs.contains("parent_id=1"), "{logs}");
        assert_eq!(logs.lines().count(), 1);
    }

    #[test]
    fn log_sink_is_silent_below_info() {
        let mut step = tracked(1, 0, 0);
        step.end();

        let logs = capture_logs(Level::WARN, || LogSink.on_end_step(&step).expect("log"));

        assert!(logs.is_empty(), "{logs}");
    }

    #[test]
    fn noop_sink_records_nothing() {
        let mut step = tracked(1, 0, 0);
        step.end();

        let logs = capture_logs(Level::TRACE, || NoopSink.on_end_step(&step).expect("noop"));

        assert!(logs.is_empty(), "{logs}");
    }

    #[test]
    fn recording_sink_keeps_end_order_and_tags() {
        let sink = RecordingSink::new();
        let mut inner = tracked(2, 1, 1);
        inner.add_tag("pool", "main");
        inner.end();
        let mut outer = tracked(1, 0, 0);
        outer.end();

        sink.on_end_step(&inner).expect("record");
        sink.on_end_step(&outer).expect("record");

        let records = sink.records();
        assert_eq!(
            records.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![2, 1]
        );
        assert_eq!(records[0].tags.get("pool").map(String::as_str), Some("main"));

        let json = sink.to_json().expect("json");
        assert!(json.contains("\"type\": \"Bar\""), "{json}");

        sink.clear();
        assert!(sink.is_empty());
    }
}
