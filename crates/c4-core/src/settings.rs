use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::StorageError;

pub const SETTINGS_FILE: &str = "settings.json";

/// Editor-wide behaviour switches, persisted next to the documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Removing an entity also removes its children through the parent keys
    /// (containers of a system, components of a container, and so on).
    pub cascade_children: bool,
    /// Maximum number of navigation history entries kept.
    pub history_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cascade_children: false,
            history_limit: 100,
        }
    }
}

impl Settings {
    /// Read `settings.json` from `dir`, falling back to defaults when the file
    /// is missing or unreadable.
    pub fn read_from(dir: &Path) -> Settings {
        let path = dir.join(SETTINGS_FILE);
        if !path.exists() {
            return Settings::default();
        }
        match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "ignoring malformed settings");
                Settings::default()
            }),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read settings");
                Settings::default()
            }
        }
    }

    pub fn write_to(&self, dir: &Path) -> Result<(), StorageError> {
        fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;
        let json = serde_json::to_string_pretty(self).map_err(StorageError::Settings)?;
        let path = dir.join(SETTINGS_FILE);
        fs::write(&path, json).map_err(|e| StorageError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Settings::read_from(dir.path()), Settings::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(SETTINGS_FILE), r#"{"cascadeChildren":true}"#).unwrap();
        let settings = Settings::read_from(dir.path());
        assert!(settings.cascade_children);
        assert_eq!(settings.history_limit, 100);
    }

    #[test]
    fn malformed_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(SETTINGS_FILE), "{not json").unwrap();
        assert_eq!(Settings::read_from(dir.path()), Settings::default());
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            cascade_children: true,
            history_limit: 5,
        };
        settings.write_to(&dir.path().join("nested")).unwrap();
        assert_eq!(Settings::read_from(&dir.path().join("nested")), settings);
    }
}
