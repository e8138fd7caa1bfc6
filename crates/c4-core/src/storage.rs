use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::document;
use crate::error::StorageError;
use crate::settings::Settings;
use crate::store::Store;

const EXTENSION: &str = ".c4.json";

/// Resolve the default documents directory (~/.c4/).
pub fn default_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".c4")
}

/// Named documents kept as files in one directory.
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Default for Storage {
    fn default() -> Self {
        Self::at(default_dir())
    }
}

impl Storage {
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, StorageError> {
        let valid = !name.is_empty()
            && !name.starts_with('.')
            && !name.contains(&['/', '\\'][..]);
        if !valid {
            return Err(StorageError::InvalidName {
                name: name.to_string(),
            });
        }
        Ok(self.root.join(format!("{name}{EXTENSION}")))
    }

    /// List all document names (without extension), sorted.
    pub fn list(&self) -> Result<Vec<String>, StorageError> {
        if !self.root.exists() {
            return Ok(vec![]);
        }
        let mut names: Vec<String> = fs::read_dir(&self.root)
            .map_err(|e| StorageError::io(&self.root, e))?
            .filter_map(|entry| {
                let entry = entry.ok()?;
                let name = entry.file_name().to_string_lossy().to_string();
                name.strip_suffix(EXTENSION)
                    .filter(|n| !n.starts_with('.'))
                    .map(|n| n.to_string())
            })
            .collect();
        names.sort();
        Ok(names)
    }

    pub fn read_raw(&self, name: &str) -> Result<String, StorageError> {
        let path = self.path_for(name)?;
        fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound {
                name: name.to_string(),
            },
            _ => StorageError::io(path, e),
        })
    }

    /// Write a document through a temp file and rename, so a reader never
    /// sees a half-written file.
    pub fn write_raw(&self, name: &str, data: &str) -> Result<(), StorageError> {
        let path = self.path_for(name)?;
        fs::create_dir_all(&self.root).map_err(|e| StorageError::io(&self.root, e))?;
        let tmp = self.root.join(format!(".{name}{EXTENSION}.tmp"));
        fs::write(&tmp, data).map_err(|e| StorageError::io(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| StorageError::io(path, e))
    }

    /// Delete a document by name. Deleting a missing document is not an error.
    pub fn delete(&self, name: &str) -> Result<(), StorageError> {
        let path = self.path_for(name)?;
        if path.exists() {
            fs::remove_file(&path).map_err(|e| StorageError::io(path, e))
        } else {
            Ok(())
        }
    }

    /// Export the store's current model under `name`.
    pub fn save(&self, name: &str, store: &Store) -> Result<(), StorageError> {
        let text = store.export_model()?;
        self.write_raw(name, &text)?;
        info!(name, entities = store.model().entity_count(), "saved document");
        Ok(())
    }

    /// Replace the store's model with the document `name`. The store is left
    /// untouched unless the document parses completely.
    pub fn load(&self, name: &str, store: &mut Store) -> Result<(), StorageError> {
        let raw = self.read_raw(name)?;
        let model = document::parse(&raw)?;
        info!(name, entities = model.entity_count(), "loaded document");
        store.set_model(model);
        Ok(())
    }

    pub fn read_settings(&self) -> Settings {
        Settings::read_from(&self.root)
    }

    pub fn write_settings(&self, settings: &Settings) -> Result<(), StorageError> {
        settings.write_to(&self.root)
    }
}
