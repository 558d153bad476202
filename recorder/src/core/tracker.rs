//! The open-step stack and id assignment.
//!
//! `start` pushes an implicit root (`0`), so the first real step computes
//! level `0` and parent `0`. Every tracked step pushes its id on
//! `begin_step` and pops the top on `end_step`.
//!
//! # Caller contract
//!
//! `begin_step`/`end_step` must pair like push/pop. The tracker does not check
//! that the step being ended is the innermost open one: ending out of order
//! pops a different id and skews parent/level for every later step until
//! `stop`. A step that is never ended stays on the stack the same way.
//!
//! The stack is locked per operation, so it is never torn, but two unrelated
//! chains running concurrently without external ordering will still see each
//! other's steps as parents. Ids are unique and increasing regardless.

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use tracing::{debug, warn};

use crate::core::step::{Step, StepMeta, simple_type_name};
use crate::io::config::RecorderConfig;
use crate::sink::{LogSink, StepSink};

/// `max_depth` value that disables the depth cutoff.
pub const UNLIMITED_DEPTH: i32 = -1;

/// Root marker pushed by `start`; also the parent id of top-level steps.
const ROOT_ID: u32 = 0;

#[derive(Debug)]
pub struct StepTracker<S = LogSink> {
    sink: S,
    counter: AtomicU32,
    open_steps: Mutex<Vec<u32>>,
    enabled: AtomicBool,
    disable_after_started: AtomicBool,
    max_depth: AtomicI32,
}

impl StepTracker<LogSink> {
    /// Tracker reporting to the log. Disabled until [`set_enabled`](Self::set_enabled).
    pub fn new() -> Self {
        Self::with_sink(LogSink)
    }
}

impl Default for StepTracker<LogSink> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: StepSink> StepTracker<S> {
    pub fn with_sink(sink: S) -> Self {
        let defaults = RecorderConfig::default();
        Self {
            sink,
            counter: AtomicU32::new(0),
            open_steps: Mutex::new(Vec::new()),
            enabled: AtomicBool::new(defaults.enabled),
            disable_after_started: AtomicBool::new(defaults.disable_after_started),
            max_depth: AtomicI32::new(defaults.max_depth),
        }
    }

    pub fn from_config(config: &RecorderConfig, sink: S) -> Self {
        let tracker = Self::with_sink(sink);
        tracker.apply_config(config);
        tracker
    }

    pub fn apply_config(&self, config: &RecorderConfig) {
        self.set_enabled(config.enabled);
        self.set_disable_after_started(config.disable_after_started);
        self.set_max_depth(config.max_depth);
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Advisory: read by the host to stop tracking once the application has
    /// started. The tracker itself never acts on it.
    pub fn is_disable_after_started(&self) -> bool {
        self.disable_after_started.load(Ordering::Relaxed)
    }

    pub fn set_disable_after_started(&self, disable: bool) {
        self.disable_after_started.store(disable, Ordering::Relaxed);
    }

    pub fn max_depth(&self) -> i32 {
        self.max_depth.load(Ordering::Relaxed)
    }

    /// Steps whose level would be `>= max_depth` are not tracked.
    /// [`UNLIMITED_DEPTH`] turns the cutoff off.
    pub fn set_max_depth(&self, max_depth: i32) {
        self.max_depth.store(max_depth, Ordering::Relaxed);
    }

    /// Number of entries on the open-step stack, including root markers.
    pub fn open_depth(&self) -> usize {
        self.lock_open_steps().len()
    }

    /// Push a root marker. Call once per tracked lifecycle.
    pub fn start(&self) {
        let mut open = self.lock_open_steps();
        open.push(ROOT_ID);
        debug!(depth = open.len(), "startup step tracking started");
    }

    /// Disable tracking and drop all open-step state, balanced or not.
    pub fn stop(&self) {
        self.set_enabled(false);
        let mut open = self.lock_open_steps();
        let discarded = open.len();
        open.clear();
        debug!(discarded, "startup step tracking stopped");
    }

    /// Begin a step nested under the innermost open one.
    ///
    /// Returns [`Step::Disabled`] without touching any state when tracking is
    /// off, the step falls at or below the depth cutoff, or all `u32::MAX`
    /// ids have been handed out.
    pub fn begin_step(&self, step_type: &str, name: &str, description: &str) -> Step {
        if !self.is_enabled() {
            return Step::Disabled;
        }

        let meta = {
            let mut open = self.lock_open_steps();
            let level = open.len().saturating_sub(1);
            if self.below_cutoff(level) {
                debug!(level, step_type, name, "step below depth cutoff not tracked");
                return Step::Disabled;
            }
            let Ok(last) =
                self.counter
                    .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_add(1))
            else {
                warn!(step_type, name, "step id space exhausted; step not tracked");
                return Step::Disabled;
            };
            let id = last + 1;
            let parent_id = open.last().copied().unwrap_or(ROOT_ID);
            open.push(id);
            StepMeta {
                step_type: step_type.to_string(),
                name: name.to_string(),
                description: description.to_string(),
                id,
                parent_id,
                level,
            }
        };

        let step = self.sink.create_step(meta);
        self.sink.on_begin_step(&step);
        Step::Tracked(step)
    }

    /// [`begin_step`](Self::begin_step) with the type taken from `T`'s simple name.
    pub fn begin_step_for<T: ?Sized>(&self, name: &str, description: &str) -> Step {
        self.begin_step(simple_type_name::<T>(), name, description)
    }

    /// End a step returned by `begin_step`.
    ///
    /// The sentinel is ignored. For a real step the stack top is popped and the
    /// step ended before the sink sees it; only a sink error is returned.
    pub fn end_step(&self, step: Step) -> Result<()> {
        let Step::Tracked(mut step) = step else {
            return Ok(());
        };
        self.lock_open_steps().pop();
        step.end();
        self.sink.on_end_step(&step)
    }

    /// Run `f` inside a step. A panic in `f` leaves the step open.
    pub fn in_step<R>(
        &self,
        step_type: &str,
        name: &str,
        description: &str,
        f: impl FnOnce(&mut Step) -> R,
    ) -> Result<R> {
        let mut step = self.begin_step(step_type, name, description);
        let out = f(&mut step);
        self.end_step(step)?;
        Ok(out)
    }

    fn below_cutoff(&self, level: usize) -> bool {
        let max_depth = self.max_depth();
        max_depth != UNLIMITED_DEPTH
            && i64::try_from(level).unwrap_or(i64::MAX) >= i64::from(max_depth)
    }

    fn lock_open_steps(&self) -> MutexGuard<'_, Vec<u32>> {
        self.open_steps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
