//! Step values and the tracker that hands them out.
//!
//! Nothing here performs I/O directly; reporting goes through the
//! [`StepSink`](crate::sink::StepSink) owned by the tracker.

pub mod step;
pub mod tracker;
