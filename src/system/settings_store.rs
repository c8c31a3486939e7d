// src/system/settings_store.rs

use crate::constants::SETTINGS_FILE_PREFIX;
use std::{
    fmt::Debug,
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsStoreError {
    #[error("Could not write settings file in '{dir}': {source}")]
    Io {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not persist settings file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Persists a serialized settings document and returns where it was written.
pub trait SettingsStore: Debug + Send + Sync {
    fn write(&self, settings_json: &str) -> Result<PathBuf, SettingsStoreError>;
}

/// Writes settings to content-addressed files, so identical payloads share one file
/// and concurrent launchers never clobber each other's settings.
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    dir: PathBuf,
}

impl FileSettingsStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `ccr-settings-<first 16 hex chars of the blake3 hash>.json`
    pub fn file_name_for(settings_json: &str) -> String {
        let hash = blake3::hash(settings_json.as_bytes());
        let hex = hash.to_hex();
        format!(
            "{}{}.json",
            SETTINGS_FILE_PREFIX,
            hex.get(..16).unwrap_or(hex.as_str())
        )
    }

    fn io_error(&self, source: std::io::Error) -> SettingsStoreError {
        SettingsStoreError::Io {
            dir: self.dir.clone(),
            source,
        }
    }
}

impl SettingsStore for FileSettingsStore {
    fn write(&self, settings_json: &str) -> Result<PathBuf, SettingsStoreError> {
        let target = self.dir.join(Self::file_name_for(settings_json));
        if is_same_content(&target, settings_json) {
            log::debug!("Reusing settings file {}", target.display());
            return Ok(target);
        }

        fs::create_dir_all(&self.dir).map_err(|e| self.io_error(e))?;

        // Write beside the target, then rename into place.
        let mut temp = NamedTempFile::with_prefix_in(SETTINGS_FILE_PREFIX, &self.dir)
            .map_err(|e| self.io_error(e))?;
        temp.write_all(settings_json.as_bytes())
            .map_err(|e| self.io_error(e))?;
        temp.flush().map_err(|e| self.io_error(e))?;
        temp.persist(&target)?;

        log::debug!("Settings written to {}", target.display());
        Ok(target)
    }
}

fn is_same_content(path: &Path, expected: &str) -> bool {
    fs::read_to_string(path).is_ok_and(|existing| existing == expected)
}
