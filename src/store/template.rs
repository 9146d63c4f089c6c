//! Named watermark templates
//!
//! One pretty-printed JSON file per template in a directory. A template
//! carries the full watermark configuration and, optionally, the export
//! settings that went with it.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::error::StoreError;
use crate::constants::TEMPLATE_EXTENSION;
use crate::export::ExportSettings;
use crate::watermark::WatermarkConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
    pub watermark: WatermarkConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export: Option<ExportSettings>,
    #[serde(default = "Utc::now")]
    pub saved_at: DateTime<Utc>,
}

/// Turn a display name into a file-safe template key.
///
/// Trims whitespace and replaces anything outside `[A-Za-z0-9_-]` with `_`.
pub fn sanitize_name(name: &str) -> Result<String, StoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(StoreError::InvalidName(name.to_string()));
    }

    let re = Regex::new(r"[^A-Za-z0-9_-]")
        .map_err(|e| StoreError::InvalidName(format!("{}: {}", name, e)))?;
    Ok(re.replace_all(trimmed, "_").into_owned())
}

#[derive(Debug, Clone)]
pub struct TemplateStore {
    dir: PathBuf,
}

impl TemplateStore {
    /// Store rooted at `dir`; the directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", key, TEMPLATE_EXTENSION))
    }

    /// Sorted template keys. A missing directory means no templates.
    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let is_template = path.is_file()
                && path
                    .extension()
                    .map(|e| e.eq_ignore_ascii_case(TEMPLATE_EXTENSION))
                    .unwrap_or(false);
            if !is_template {
                continue;
            }
            if let Some(stem) = path.file_stem() {
                names.push(stem.to_string_lossy().into_owned());
            }
        }

        names.sort();
        Ok(names)
    }

    pub fn exists(&self, name: &str) -> bool {
        sanitize_name(name)
            .map(|key| self.path_for(&key).is_file())
            .unwrap_or(false)
    }

    pub fn load(&self, name: &str) -> Result<Template, StoreError> {
        let key = sanitize_name(name)?;
        let path = self.path_for(&key);
        if !path.is_file() {
            return Err(StoreError::NotFound(name.to_string()));
        }

        let json = fs::read_to_string(&path)?;
        let template: Template =
            serde_json::from_str(&json).map_err(|e| StoreError::ConfigLoad {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        debug!(name = %key, path = %path.display(), "Loaded template");
        Ok(template)
    }

    /// Create or overwrite a template and return what was written.
    pub fn save(
        &self,
        name: &str,
        watermark: &WatermarkConfig,
        export: Option<&ExportSettings>,
    ) -> Result<Template, StoreError> {
        let key = sanitize_name(name)?;
        let template = Template {
            name: name.trim().to_string(),
            watermark: watermark.clone(),
            export: export.cloned(),
            saved_at: Utc::now(),
        };

        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(&key);
        let json = serde_json::to_string_pretty(&template)?;
        fs::write(&path, json)?;

        info!(name = %key, path = %path.display(), "Saved template");
        Ok(template)
    }

    pub fn delete(&self, name: &str) -> Result<(), StoreError> {
        let key = sanitize_name(name)?;
        let path = self.path_for(&key);
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(name = %key, "Deleted template");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(name = %key, "Template to delete does not exist");
                Err(StoreError::NotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
