//! File-backed tenant configuration store.
//!
//! One JSON file per session id under `{state_dir}/helpdesk-config/`, written
//! atomically so a crashed write never leaves a torn record behind.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use iris_core::write_text_atomic;
use iris_correlate::TenantConfigSource;
use iris_helpdesk::HelpdeskConfig;

const CONFIG_SUBDIR: &str = "helpdesk-config";

/// Per-tenant helpdesk configuration records on disk.
pub struct TenantConfigStore {
    dir: PathBuf,
}

impl TenantConfigStore {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            dir: state_dir.join(CONFIG_SUBDIR),
        }
    }

    fn config_path(&self, session_id: &str) -> Result<PathBuf> {
        let session_id = session_id.trim();
        if session_id.is_empty() {
            bail!("session id cannot be empty");
        }
        if !session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            bail!("session id '{session_id}' contains unsupported characters");
        }
        Ok(self.dir.join(format!("{session_id}.json")))
    }

    /// Persists a validated config record.
    pub fn save(&self, config: &HelpdeskConfig) -> Result<()> {
        config
            .validate()
            .map_err(|error| anyhow::anyhow!(error.to_string()))?;
        let path = self.config_path(&config.session_id)?;
        let serialized = serde_json::to_string_pretty(config)
            .context("failed to serialize helpdesk config")?;
        write_text_atomic(&path, &serialized)
    }

    pub fn load(&self, session_id: &str) -> Result<Option<HelpdeskConfig>> {
        let path = self.config_path(session_id)?;
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(error) => {
                return Err(error).with_context(|| format!("failed to read {}", path.display()))
            }
        };
        let config = serde_json::from_str::<HelpdeskConfig>(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(Some(config))
    }

    pub fn remove(&self, session_id: &str) -> Result<bool> {
        let path = self.config_path(session_id)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(error) => {
                Err(error).with_context(|| format!("failed to remove {}", path.display()))
            }
        }
    }
}

impl TenantConfigSource for TenantConfigStore {
    fn load_config(&self, session_id: &str) -> Result<Option<HelpdeskConfig>> {
        self.load(session_id)
    }
}
