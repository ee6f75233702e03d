//! Application settings consumed by document sessions.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

/// Read-only view of the settings a session consults.
pub trait Settings: Send + Sync {
    /// Whether every content change should be saved immediately.
    fn autosave_enabled(&self) -> bool;

    /// Whether a modal dialog currently owns the keyboard.
    fn dialog_shown(&self) -> bool {
        false
    }
}

/// Persisted preferences, as stored in the JSON settings file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Save on every content change.
    pub autosave: bool,
    /// Extensions (with leading dot) the host may open. Empty allows all.
    pub supported_file_types: Vec<String>,
}

impl Preferences {
    /// Parses preferences from JSON text.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// Live settings shared between the host and its sessions.
#[derive(Debug, Default)]
pub struct AppSettings {
    autosave: AtomicBool,
    dialog_shown: AtomicBool,
    supported_file_types: Vec<String>,
}

impl AppSettings {
    pub fn from_preferences(preferences: Preferences) -> Self {
        Self {
            autosave: AtomicBool::new(preferences.autosave),
            dialog_shown: AtomicBool::new(false),
            supported_file_types: preferences
                .supported_file_types
                .into_iter()
                .map(|ext| normalize_extension(&ext))
                .collect(),
        }
    }

    /// Loads settings from a JSON file. A missing file yields defaults.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::info!("No settings at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let preferences = Preferences::from_json(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Loaded settings from {}", path.display());
        Ok(Self::from_preferences(preferences))
    }

    pub fn set_autosave(&self, enabled: bool) {
        self.autosave.store(enabled, Ordering::SeqCst);
    }

    pub fn set_dialog_shown(&self, shown: bool) {
        self.dialog_shown.store(shown, Ordering::SeqCst);
    }

    /// Returns the configured extensions, normalized to lowercase with a leading dot.
    pub fn supported_file_types(&self) -> &[String] {
        &self.supported_file_types
    }

    /// Returns true if the host may open `path`.
    pub fn is_supported(&self, path: &Path) -> bool {
        if self.supported_file_types.is_empty() {
            return true;
        }
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) => {
                let ext = normalize_extension(ext);
                self.supported_file_types.iter().any(|known| *known == ext)
            }
            None => false,
        }
    }
}

impl Settings for AppSettings {
    fn autosave_enabled(&self) -> bool {
        self.autosave.load(Ordering::SeqCst)
    }

    fn dialog_shown(&self) -> bool {
        self.dialog_shown.load(Ordering::SeqCst)
    }
}

fn normalize_extension(ext: &str) -> String {
    format!(".{}", ext.trim_start_matches('.').to_ascii_lowercase())
}
