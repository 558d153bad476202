//! Nested startup step recorder.
//!
//! Tracks the steps a host runs while starting up: each step gets a unique
//! id, the id of the step it is nested in, its depth, and a duration, and is
//! handed to a sink when it ends (by default, one `info` log line).
//!
//! - **[`core`]**: The step values and the [`StepTracker`] state machine
//!   (open-step stack, id counter, depth cutoff).
//! - **[`sink`]**: Where completed steps go ([`LogSink`], [`NoopSink`],
//!   [`RecordingSink`]) plus the line formatting used by the log sink.
//! - **[`io`]**: TOML configuration.
//!
//! ```
//! use startup_recorder::{RecordingSink, StepTracker};
//!
//! let tracker = StepTracker::with_sink(RecordingSink::new());
//! tracker.set_enabled(true);
//! tracker.start();
//!
//! let boot = tracker.begin_step("Context", "bootstrap", "boot");
//! let db = tracker.begin_step("Pool", "init", "init db");
//! assert_eq!((db.parent_id(), db.level()), (boot.id(), 1));
//! tracker.end_step(db)?;
//! tracker.end_step(boot)?;
//!
//! tracker.stop();
//! assert_eq!(tracker.sink().len(), 2);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod core;
pub mod io;
pub mod logging;
pub mod sink;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use crate::core::step::{Step, StepMeta, TrackedStep, simple_type_name};
pub use crate::core::tracker::{StepTracker, UNLIMITED_DEPTH};
pub use crate::io::config::{RecorderConfig, load_config, write_config};
pub use crate::sink::{LogSink, NoopSink, RecordingSink, StepRecord, StepSink, pad_string};
