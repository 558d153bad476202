//! Test-only helpers for sinks and log capture.

use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Result, anyhow};
use tracing::Level;

use crate::core::step::TrackedStep;
use crate::sink::StepSink;

/// Shared in-memory buffer usable as a `tracing_subscriber` writer.
#[derive(Debug, Clone, Default)]
pub struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

impl CaptureWriter {
    pub fn contents(&self) -> String {
        let buf = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl io::Write for CaptureWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` under a thread-local subscriber capped at `max_level` and return
/// everything it logged, without ANSI colors or timestamps.
pub fn capture_logs<R>(max_level: Level, f: impl FnOnce() -> R) -> String {
    let writer = CaptureWriter::default();
    let make_writer = writer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(max_level)
        .with_ansi(false)
        .without_time()
        .with_writer(move || make_writer.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    writer.contents()
}

/// Sink whose `on_end_step` always fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingSink;

impl StepSink for FailingSink {
    fn on_end_step(&self, step: &TrackedStep) -> Result<()> {
        Err(anyhow!("sink rejected step {}", step.id()))
    }
}
