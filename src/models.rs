// src/models.rs

use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Environment mapping handed to the child through the settings file.
/// Ordered so that identical payloads serialize to identical bytes.
pub type EnvMap = BTreeMap<String, String>;

/// The `env` object of a settings document. Values a preset supplies are kept
/// as raw JSON; everything the launcher itself adds is a string.
pub type SettingsEnv = BTreeMap<String, Value>;

/// Reads a field as `T`, falling back to `T::default()` when the value has
/// another shape. Malformed manifests still load.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

/// Loose truthiness for hand-written flags: `null`, `false`, `0` and `""` are off.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

// --- GLOBAL CONFIG (what is read from `config.json`) ---

/// The status-line section of either the global config or a preset.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct StatusLineConfig {
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub enabled: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StatusLineConfig {
    /// A status-line section with `enabled` set to `flag`.
    pub fn with_enabled(flag: bool) -> Self {
        Self {
            enabled: Value::Bool(flag),
            extra: Map::new(),
        }
    }

    /// Whether the section asks for a status line.
    pub fn is_enabled(&self) -> bool {
        is_truthy(&self.enabled)
    }
}

/// The subset of the router's global configuration the launcher reads.
/// Every other key survives in `extra` untouched.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct GlobalConfig {
    #[serde(rename = "NON_INTERACTIVE_MODE", default, deserialize_with = "lenient")]
    pub non_interactive_mode: bool,
    #[serde(
        rename = "CLAUDE_PATH",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub claude_path: Option<String>,
    #[serde(
        rename = "StatusLine",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub status_line: Option<StatusLineConfig>,
    #[serde(
        rename = "PORT",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub port: Option<u16>,
    #[serde(
        rename = "APIKEY",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub api_key: Option<String>,
    #[serde(
        rename = "API_TIMEOUT_MS",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub api_timeout_ms: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// --- PRESET MODELS (what is read from a preset `manifest.json`) ---

/// The nested `settings` object of a preset. Only `env` is interpreted;
/// everything else, `statusLine` included, is merged into the payload verbatim.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct PresetSettings {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub env: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A named bundle of configuration selectable with `--preset`.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct PresetConfig {
    /// Skip the "is the router running?" check before launching.
    #[serde(rename = "noServer", default, skip_serializing_if = "Value::is_null")]
    pub suppress_server_start: Value,
    #[serde(
        rename = "StatusLine",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub status_line: Option<StatusLineConfig>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub settings: Option<PresetSettings>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(
        rename = "Router",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub router: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PresetConfig {
    /// Whether `noServer` is set to anything truthy.
    pub fn suppresses_server_start(&self) -> bool {
        is_truthy(&self.suppress_server_start)
    }
}

// --- SETTINGS PAYLOAD (what is written for `claude --settings`) ---

/// A status line that delegates rendering to an external command.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct StatusLineDescriptor {
    #[serde(rename = "type")]
    pub kind: String,
    pub command: String,
    pub padding: i64,
}

impl StatusLineDescriptor {
    /// Builds a `{"type": "command", ...}` descriptor with no padding.
    pub fn command(command: impl Into<String>) -> Self {
        Self {
            kind: "command".to_string(),
            command: command.into(),
            padding: 0,
        }
    }
}

/// Either the status line this launcher synthesizes, or whatever a preset supplied.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum StatusLineSetting {
    Command(StatusLineDescriptor),
    Opaque(Value),
}

/// The JSON document passed to the child via `--settings <path>`.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct SettingsPayload {
    pub env: SettingsEnv,
    #[serde(rename = "statusLine", default, skip_serializing_if = "Option::is_none")]
    pub status_line: Option<StatusLineSetting>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// --- RUNTIME MODELS ---

/// Everything the caller asks for in a single launch.
#[derive(Debug, Clone, Default)]
pub struct LaunchRequest {
    pub args: Vec<String>,
    pub preset: Option<PresetConfig>,
    pub env_overrides: Option<EnvMap>,
    pub preset_name: Option<String>,
}

/// The process-environment inputs of a launch, read once at start-up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessEnv {
    /// `CLAUDE_PATH` from the environment.
    pub claude_path: Option<String>,
    /// `CCR_OUTPUT_FILE` from the environment.
    pub output_file: Option<PathBuf>,
}

impl ProcessEnv {
    /// Captures the relevant variables from the current process environment.
    /// Empty values are treated as unset.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ProcessEnv::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| lookup(key).filter(|v| !v.is_empty());
        Self {
            claude_path: read(crate::constants::ENV_CLAUDE_PATH),
            output_file: read(crate::constants::ENV_OUTPUT_FILE).map(PathBuf::from),
        }
    }
}
