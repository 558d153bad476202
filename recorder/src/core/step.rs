//! Step values handed out by the tracker.
//!
//! A [`Step`] is either a real [`TrackedStep`] or the [`Step::Disabled`]
//! sentinel. The sentinel is recognized by its tag, never by field values, so a
//! tracked step that happens to carry zeroed fields is still ended normally.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

/// Identity and placement computed by the tracker before a step is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepMeta {
    /// Short name of the kind of work (e.g. a component's type name).
    pub step_type: String,
    pub name: String,
    pub description: String,
    /// Tracker-unique id, never `0`.
    pub id: u32,
    /// Id of the step open when this one began, or `0` at top level.
    pub parent_id: u32,
    /// Nesting depth at creation (`0` = top level).
    pub level: usize,
}

/// A step that is being tracked.
#[derive(Debug)]
pub struct TrackedStep {
    meta: StepMeta,
    begin_time: Instant,
    begun_at: DateTime<Utc>,
    end_time: Option<Instant>,
    tags: BTreeMap<String, String>,
}

impl TrackedStep {
    /// Create a step beginning now.
    pub fn new(meta: StepMeta) -> Self {
        Self::starting_at(meta, Instant::now(), Utc::now())
    }

    /// Create a step with an explicit begin time.
    pub fn starting_at(meta: StepMeta, begin_time: Instant, begun_at: DateTime<Utc>) -> Self {
        Self {
            meta,
            begin_time,
            begun_at,
            end_time: None,
            tags: BTreeMap::new(),
        }
    }

    pub fn meta(&self) -> &StepMeta {
        &self.meta
    }

    pub fn step_type(&self) -> &str {
        &self.meta.step_type
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    pub fn description(&self) -> &str {
        &self.meta.description
    }

    pub fn id(&self) -> u32 {
        self.meta.id
    }

    pub fn parent_id(&self) -> u32 {
        self.meta.parent_id
    }

    pub fn level(&self) -> usize {
        self.meta.level
    }

    pub fn begin_time(&self) -> Instant {
        self.begin_time
    }

    /// Wall-clock time the step began.
    pub fn begun_at(&self) -> DateTime<Utc> {
        self.begun_at
    }

    pub fn is_ended(&self) -> bool {
        self.end_time.is_some()
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    /// Attach metadata. Later values replace earlier ones for the same key.
    pub fn add_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(key.into(), value.into());
    }

    /// Mark the step complete. Only the first call records an end time.
    pub fn end(&mut self) {
        if self.end_time.is_none() {
            self.end_time = Some(Instant::now());
        }
    }

    /// Time since the step began, frozen once the step has ended.
    pub fn elapsed(&self) -> Duration {
        self.end_time
            .unwrap_or_else(Instant::now)
            .saturating_duration_since(self.begin_time)
    }
}

/// Value returned by [`StepTracker::begin_step`](crate::core::tracker::StepTracker::begin_step).
///
/// Always safe to hand back to `end_step`, whichever variant it is.
#[derive(Debug)]
pub enum Step {
    Tracked(TrackedStep),
    /// Returned while tracking is off or the depth cutoff applies. Every
    /// accessor reports a default value and every mutation is a no-op.
    Disabled,
}

impl Step {
    pub fn is_disabled(&self) -> bool {
        matches!(self, Step::Disabled)
    }

    pub fn as_tracked(&self) -> Option<&TrackedStep> {
        match self {
            Step::Tracked(step) => Some(step),
            Step::Disabled => None,
        }
    }

    pub fn step_type(&self) -> Option<&str> {
        self.as_tracked().map(TrackedStep::step_type)
    }

    pub fn name(&self) -> Option<&str> {
        self.as_tracked().map(TrackedStep::name)
    }

    pub fn description(&self) -> Option<&str> {
        self.as_tracked().map(TrackedStep::description)
    }

    pub fn id(&self) -> u32 {
        self.as_tracked().map_or(0, TrackedStep::id)
    }

    pub fn parent_id(&self) -> u32 {
        self.as_tracked().map_or(0, TrackedStep::parent_id)
    }

    pub fn level(&self) -> usize {
        self.as_tracked().map_or(0, TrackedStep::level)
    }

    pub fn begin_time(&self) -> Option<Instant> {
        self.as_tracked().map(TrackedStep::begin_time)
    }

    pub fn elapsed(&self) -> Duration {
        self.as_tracked().map_or(Duration::ZERO, TrackedStep::elapsed)
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.as_tracked()
            .and_then(|step| step.tags().get(key))
            .map(String::as_str)
    }

    pub fn add_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        if let Step::Tracked(step) = self {
            step.add_tag(key, value);
        }
    }

    pub fn end(&mut self) {
        if let Step::Tracked(step) = self {
            step.end();
        }
    }
}

/// Unqualified name of `T` with generic arguments stripped, e.g. `Vec` for
/// `alloc::vec::Vec<u8>`.
pub fn simple_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
