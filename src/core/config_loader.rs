//! # Config Loader
//!
//! Reads the router's global `config.json` and preset manifests. Both are plain
//! JSON documents; only the fields in [`crate::models`] are interpreted and the
//! rest is carried along untouched.

use crate::{
    core::paths::{self, PathError},
    models::{GlobalConfig, PresetConfig},
};
use serde::de::DeserializeOwned;
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Path(#[from] PathError),
    #[error("Could not read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not parse '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Preset '{0}' is not installed.")]
    PresetNotFound(String),
}

/// Loads the global configuration from its default location.
pub fn load_global_config() -> Result<GlobalConfig, ConfigError> {
    load_global_config_from(&paths::get_config_path()?)
}

/// Loads the global configuration from `path`. A missing file yields the defaults.
pub fn load_global_config_from(path: &Path) -> Result<GlobalConfig, ConfigError> {
    match read_json(path)? {
        Some(config) => Ok(config),
        None => {
            log::debug!("No config found at {}, using defaults.", path.display());
            Ok(GlobalConfig::default())
        }
    }
}

/// Loads an installed preset by name.
pub fn load_preset(preset_name: &str) -> Result<PresetConfig, ConfigError> {
    load_preset_from(&paths::get_preset_manifest_path(preset_name)?, preset_name)
}

/// Loads a preset manifest from `path`; unlike the global config it must exist.
pub fn load_preset_from(path: &Path, preset_name: &str) -> Result<PresetConfig, ConfigError> {
    read_json(path)?.ok_or_else(|| ConfigError::PresetNotFound(preset_name.to_string()))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };

    log::trace!("Parsing {}", path.display());
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
}
