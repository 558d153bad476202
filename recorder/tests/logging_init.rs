//! Global subscriber bootstrap.
//!
//! Kept in its own test binary because it installs process-wide state.

use startup_recorder::{StepTracker, logging};

#[test]
fn init_installs_once_and_reports_second_attempt() {
    logging::init("info").expect("first init");
    assert!(logging::init("info").is_err());

    // Step lines now flow through the global subscriber without panicking.
    let tracker = StepTracker::new();
    tracker.set_enabled(true);
    tracker.start();
    tracker
        .in_step("AppContext", "context", "start context", |_| ())
        .expect("in_step");
    tracker.stop();
}
