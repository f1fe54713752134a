//! Render settings, read from TOML

use std::path::Path;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use crate::channel::SystemMode;

/// Settings for an offline render. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Master volume, 0-16383
    pub master_volume: u16,
    /// Master balance, 0-16383 with 8192 centered
    pub master_balance: u16,
    /// Reset standard applied before playback
    pub system_mode: SystemMode,
    /// Loop passes, 0 plays the song once
    pub loop_count: u32,
    /// Longest release tail rendered after the last event, seconds
    pub tail_seconds: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            master_volume: 16383,
            master_balance: 8192,
            system_mode: SystemMode::Default,
            loop_count: 0,
            tail_seconds: 2.0,
        }
    }
}

impl RenderConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).context("invalid render config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config '{}'", path.display()))?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            (8000..=192_000).contains(&self.sample_rate),
            "sample_rate must be 8000-192000 (got {})",
            self.sample_rate
        );
        ensure!(
            self.master_volume <= 16383,
            "master_volume must be <= 16383 (got {})",
            self.master_volume
        );
        ensure!(
            self.master_balance <= 16383,
            "master_balance must be <= 16383 (got {})",
            self.master_balance
        );
        ensure!(
            self.tail_seconds.is_finite() && self.tail_seconds >= 0.0,
            "tail_seconds must be a non-negative number"
        );
        Ok(())
    }
}
