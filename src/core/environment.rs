// src/core/environment.rs

use crate::{
    constants::{DEFAULT_API_KEY, DEFAULT_API_TIMEOUT_MS, DEFAULT_PORT},
    models::{EnvMap, GlobalConfig},
};

/// Builds the base environment that points the child at the local router.
pub fn create_env_variables(config: &GlobalConfig) -> EnvMap {
    let port = config.port.unwrap_or(DEFAULT_PORT);
    let api_key = config
        .api_key
        .as_deref()
        .filter(|key| !key.is_empty())
        .unwrap_or(DEFAULT_API_KEY);
    let timeout = config.api_timeout_ms.unwrap_or(DEFAULT_API_TIMEOUT_MS);

    EnvMap::from([
        ("ANTHROPIC_AUTH_TOKEN".to_string(), api_key.to_string()),
        ("ANTHROPIC_API_KEY".to_string(), String::new()),
        (
            "ANTHROPIC_BASE_URL".to_string(),
            format!("http://127.0.0.1:{}", port),
        ),
        ("NO_PROXY".to_string(), "127.0.0.1".to_string()),
        ("DISABLE_TELEMETRY".to_string(), "true".to_string()),
        ("DISABLE_COST_WARNINGS".to_string(), "true".to_string()),
        ("API_TIMEOUT_MS".to_string(), timeout.to_string()),
    ])
}

/// The fixed overrides applied last when the router runs in automation mode.
pub fn non_interactive_overrides() -> EnvMap {
    EnvMap::from([
        ("NODE_NO_READLINE".to_string(), "1".to_string()),
        ("FORCE_COLOR".to_string(), "0".to_string()),
        ("TERM".to_string(), "dumb".to_string()),
        ("CI".to_string(), "true".to_string()),
    ])
}
