// src/config.rs

use crate::types::Config;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{info, warn};

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {path}"))?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }
}

/// Hot-reloading wrapper around the config file. `current()` is called once
/// per frame; the file is re-parsed only when its mtime changes, so a running
/// session picks up profile/tightness edits without a restart.
pub struct ConfigWatcher {
    path: PathBuf,
    modified: Option<SystemTime>,
    config: Config,
}

impl ConfigWatcher {
    pub fn new(path: &str) -> Result<Self> {
        let config = Config::load(path)?;
        Ok(Self {
            modified: mtime(Path::new(path)),
            path: PathBuf::from(path),
            config,
        })
    }

    pub fn current(&mut self) -> &Config {
        let now = mtime(&self.path);
        if now.is_some() && now != self.modified {
            match Config::load(&self.path.to_string_lossy()) {
                Ok(config) => {
                    info!("🔄 Config reloaded from {}", self.path.display());
                    self.config = config;
                    self.modified = now;
                }
                Err(e) => {
                    // Keep the last good config; a half-written file is not fatal
                    warn!("Config reload failed, keeping previous: {e:#}");
                    self.modified = now;
                }
            }
        }
        &self.config
    }
}

fn mtime(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}
