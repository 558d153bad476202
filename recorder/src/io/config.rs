//! Recorder configuration loaded from TOML.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::tracker::UNLIMITED_DEPTH;

/// Recorder options (TOML). Missing fields take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RecorderConfig {
    /// Gate for all tracking.
    pub enabled: bool,

    /// Hint for the host to turn tracking off once the application has started.
    pub disable_after_started: bool,

    /// Steps at level `>= max_depth` are not tracked; `-1` means unlimited.
    pub max_depth: i32,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            disable_after_started: true,
            max_depth: UNLIMITED_DEPTH,
        }
    }
}

impl RecorderConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_depth < UNLIMITED_DEPTH {
            return Err(anyhow!(
                "max_depth must be -1 (unlimited) or >= 0, got {}",
                self.max_depth
            ));
        }
        Ok(())
    }
}

/// Load recorder options from a TOML file.
///
/// A missing file means "use the defaults" (tracking off).
pub fn load_config(path: &Path) -> Result<RecorderConfig> {
    if !path.is_file() {
        debug!(path = %path.display(), "no recorder config, using defaults");
        return Ok(RecorderConfig::default());
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read recorder config {}", path.display()))?;
    let cfg: RecorderConfig = toml::from_str(&raw)
        .with_context(|| format!("parse recorder config {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid recorder config {}", path.display()))?;
    debug!(
        path = %path.display(),
        enabled = cfg.enabled,
        max_depth = cfg.max_depth,
        "recorder config loaded"
    );
    Ok(cfg)
}

/// Write recorder options as TOML, replacing any existing file in one rename.
pub fn write_config(path: &Path, cfg: &RecorderConfig) -> Result<()> {
    cfg.validate()?;
    let mut body = toml::to_string_pretty(cfg).context("serialize recorder config")?;
    body.push('\n');

    let dir = path
        .parent()
        .with_context(|| format!("recorder config path has no parent: {}", path.display()))?;
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let staged = path.with_extension("toml.tmp");
    fs::write(&staged, body).with_context(|| format!("stage {}", staged.display()))?;
    fs::rename(&staged, path)
        .with_context(|| format!("install recorder config {}", path.display()))?;
    Ok(())
}
