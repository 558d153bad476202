//! Side-effecting helpers kept out of the tracking core.

pub mod config;
