//! Session restore
//!
//! The last-used watermark and export settings are kept in a single JSON
//! file. A [`Session`] owns the live state for the lifetime of the app and
//! writes it back on close.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::error::StoreError;
use super::template::Template;
use crate::export::ExportSettings;
use crate::watermark::WatermarkConfig;

/// Persisted session contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(default)]
    pub watermark: WatermarkConfig,
    #[serde(default)]
    pub export: ExportSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            watermark: WatermarkConfig::default(),
            export: ExportSettings::default(),
            saved_at: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the saved session, or defaults if it is missing or unreadable.
    pub fn load(&self) -> SessionState {
        match self.try_load() {
            Ok(Some(state)) => {
                debug!(path = %self.path.display(), "Restored session");
                state
            }
            Ok(None) => {
                debug!(path = %self.path.display(), "No saved session, using defaults");
                SessionState::default()
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring unreadable session file");
                SessionState::default()
            }
        }
    }

    fn try_load(&self) -> Result<Option<SessionState>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&self.path)?;
        let state = serde_json::from_str(&json).map_err(|e| StoreError::ConfigLoad {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        Ok(Some(state))
    }

    pub fn save(&self, state: &SessionState) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(state)?;
        fs::write(&self.path, json)?;
        debug!(path = %self.path.display(), "Saved session");
        Ok(())
    }
}

/// Live editing state, restored on open and persisted on close
#[derive(Debug)]
pub struct Session {
    store: SessionStore,
    state: SessionState,
}

impl Session {
    pub fn open(store: SessionStore) -> Self {
        let state = store.load();
        Self { store, state }
    }

    pub fn watermark(&self) -> &WatermarkConfig {
        &self.state.watermark
    }

    pub fn export(&self) -> &ExportSettings {
        &self.state.export
    }

    pub fn set_watermark(&mut self, watermark: WatermarkConfig) {
        self.state.watermark = watermark;
    }

    pub fn set_export(&mut self, export: ExportSettings) {
        self.state.export = export;
    }

    /// Replace the watermark, and the export settings when the template has them.
    pub fn apply_template(&mut self, template: &Template) {
        self.state.watermark = template.watermark.clone();
        if let Some(export) = &template.export {
            self.state.export = export.clone();
        }
        info!(template = %template.name, "Applied template");
    }

    /// Copy of the current state, e.g. to hand to an export job.
    pub fn snapshot(&self) -> SessionState {
        self.state.clone()
    }

    /// Persist the session and return what was saved.
    pub fn close(mut self) -> Result<SessionState, StoreError> {
        self.state.saved_at = Some(Utc::now());
        self.store.save(&self.state)?;
        Ok(self.state)
    }
}
