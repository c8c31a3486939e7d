// src/constants.rs

/// The name this launcher is invoked by; used to build the status-line command.
pub const LAUNCHER_NAME: &str = "ccr";

/// The executable launched when no `CLAUDE_PATH` is configured.
pub const DEFAULT_CLAUDE_PATH: &str = "claude";

/// The name of the directory holding router configuration (inside the home directory).
pub const CCR_HOME_DIRNAME: &str = ".claude-code-router";

/// The name of the global configuration file (inside the router home).
pub const CONFIG_FILENAME: &str = "config.json";

/// The name of the directory containing installed presets (inside the router home).
pub const PRESETS_DIRNAME: &str = "presets";

/// The name of a preset's manifest file (inside its preset directory).
pub const PRESET_MANIFEST_FILENAME: &str = "manifest.json";

/// The name of the file holding the router service PID (inside the router home).
pub const PID_FILENAME: &str = ".claude-code-router.pid";

/// The name of the shared reference-count file (inside the system temp directory).
pub const REFERENCE_COUNT_FILENAME: &str = "claude-code-reference-count.txt";

/// Prefix of the content-addressed settings files handed to the child.
pub const SETTINGS_FILE_PREFIX: &str = "ccr-settings-";

/// Environment variable naming the executable to launch.
pub const ENV_CLAUDE_PATH: &str = "CLAUDE_PATH";

/// Environment variable naming a file that receives the child's stdout in automation mode.
pub const ENV_OUTPUT_FILE: &str = "CCR_OUTPUT_FILE";

pub const DEFAULT_PORT: u16 = 3456;
pub const DEFAULT_API_KEY: &str = "test";
pub const DEFAULT_API_TIMEOUT_MS: u64 = 600_000;
