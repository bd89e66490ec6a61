//! Runtime configuration

use crate::pattern::TrackerKind;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for a mining run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinerConfig {
    /// Commits touching more files than this are ignored; large sweeps
    /// drown the linker in incidental references.
    #[serde(default = "default_max_files")]
    pub max_files_per_commit: u32,

    /// Budget for one backup restore, in seconds.
    #[serde(default = "default_restore_timeout")]
    pub restore_timeout_secs: u64,

    /// Force a tracker kind instead of probing the restored tables.
    #[serde(default)]
    pub tracker: Option<TrackerKind>,
}

fn default_max_files() -> u32 {
    20
}

fn default_restore_timeout() -> u64 {
    600
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            max_files_per_commit: default_max_files(),
            restore_timeout_secs: default_restore_timeout(),
            tracker: None,
        }
    }
}

impl MinerConfig {
    /// Load configuration from the given path or return defaults when no
    /// file exists.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            let config: MinerConfig = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the given path.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;
        Ok(())
    }
}
