// src/core/paths.rs

use crate::constants::{
    CCR_HOME_DIRNAME, CONFIG_FILENAME, PID_FILENAME, PRESET_MANIFEST_FILENAME, PRESETS_DIRNAME,
    REFERENCE_COUNT_FILENAME,
};
use lazy_static::lazy_static;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;

lazy_static! {
    static ref CCR_HOME_DIR: Mutex<Option<PathBuf>> = Mutex::new(None);
}

#[derive(Error, Debug)]
pub enum PathError {
    #[error("Could not find the user's home directory.")]
    HomeDirNotFound,
}

/// Returns the router home directory (`~/.claude-code-router`).
///
/// Memoized: the first call computes the path, later calls return the cached value.
/// The directory is not created here; readers treat a missing directory as "no config".
pub fn get_ccr_home_dir() -> Result<PathBuf, PathError> {
    let mut cached = CCR_HOME_DIR
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    if let Some(path) = &*cached {
        return Ok(path.clone());
    }

    let home = dirs::home_dir()
        .ok_or(PathError::HomeDirNotFound)?
        .join(CCR_HOME_DIRNAME);
    *cached = Some(home.clone());
    Ok(home)
}

/// Returns the path to the global `config.json`.
pub fn get_config_path() -> Result<PathBuf, PathError> {
    get_ccr_home_dir().map(|dir| dir.join(CONFIG_FILENAME))
}

/// Returns the path to a preset's manifest.
pub fn get_preset_manifest_path(preset_name: &str) -> Result<PathBuf, PathError> {
    get_ccr_home_dir().map(|dir| {
        dir.join(PRESETS_DIRNAME)
            .join(preset_name)
            .join(PRESET_MANIFEST_FILENAME)
    })
}

/// Returns the path to the router service PID file.
pub fn get_pid_file_path() -> Result<PathBuf, PathError> {
    get_ccr_home_dir().map(|dir| dir.join(PID_FILENAME))
}

/// The reference-count file lives in the system temp directory, shared by every launcher.
pub fn get_reference_count_path() -> PathBuf {
    std::env::temp_dir().join(REFERENCE_COUNT_FILENAME)
}

/// Directory where generated settings files are written.
pub fn get_settings_dir() -> PathBuf {
    std::env::temp_dir()
}

/// Resolves the executable to launch: config first, then the environment, then `claude`.
/// A leading `~` is expanded to the home directory.
pub fn resolve_claude_path(from_config: Option<&str>, from_env: Option<&str>) -> String {
    let raw = from_config
        .filter(|p| !p.is_empty())
        .or(from_env.filter(|p| !p.is_empty()))
        .unwrap_or(crate::constants::DEFAULT_CLAUDE_PATH);
    shellexpand::tilde(raw).into_owned()
}
