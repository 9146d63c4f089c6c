//! Persistence for templates and the restored session.
//!
//! Both live under the application directory (see [`default_app_dir`]):
//! `templates/<name>.json` and `session.json`.

pub mod error;
pub mod session;
pub mod template;

use std::path::PathBuf;

pub use error::StoreError;
pub use session::{Session, SessionState, SessionStore};
pub use template::{sanitize_name, Template, TemplateStore};

use crate::constants::{APP_DIR_NAME, SESSION_FILE_NAME, TEMPLATES_DIR_NAME};

/// `$XDG_CONFIG_HOME/watermarker`, falling back to `$HOME/.config/watermarker`.
///
/// Returns `None` when neither variable is set.
pub fn default_app_dir() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var_os("HOME")
                .filter(|v| !v.is_empty())
                .map(|home| PathBuf::from(home).join(".config"))
        })?;
    Some(base.join(APP_DIR_NAME))
}

/// Template and session stores under one application directory
#[derive(Debug, Clone)]
pub struct Stores {
    pub templates: TemplateStore,
    pub session: SessionStore,
}

impl Stores {
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            templates: TemplateStore::new(dir.join(TEMPLATES_DIR_NAME)),
            session: SessionStore::new(dir.join(SESSION_FILE_NAME)),
        }
    }
}
