// src/core/settings_builder.rs

//! Assembles the `--settings` document for a launch.
//!
//! Precedence, lowest to highest:
//! 1. the base environment from the environment builder,
//! 2. the caller's environment overrides,
//! 3. the preset's nested `settings` (shallow, with `env` deep-merged),
//! 4. the automation-mode overrides, when `NON_INTERACTIVE_MODE` is set.

use crate::{
    constants::LAUNCHER_NAME,
    core::environment,
    models::{
        EnvMap, GlobalConfig, LaunchRequest, PresetSettings, SettingsEnv, SettingsPayload,
        StatusLineConfig, StatusLineDescriptor, StatusLineSetting,
    },
};
use serde_json::Value;

/// Key of the status-line entry inside the settings document.
const STATUS_LINE_KEY: &str = "statusLine";

/// Builds the settings payload for `request`. Pure: performs no I/O.
pub fn build_settings_payload(
    config: &GlobalConfig,
    base_env: &EnvMap,
    request: &LaunchRequest,
) -> SettingsPayload {
    let mut env = string_entries(base_env);
    if let Some(overrides) = &request.env_overrides {
        env.extend(string_entries(overrides));
    }

    let mut payload = SettingsPayload {
        env,
        ..Default::default()
    };

    let preset_status = request.preset.as_ref().and_then(|p| p.status_line.as_ref());
    if let Some(status) = select_status_line(preset_status, config.status_line.as_ref())
        && status.is_enabled()
    {
        payload.status_line = Some(StatusLineSetting::Command(StatusLineDescriptor::command(
            status_line_command(request.preset_name.as_deref()),
        )));
    }

    if let Some(settings) = request.preset.as_ref().and_then(|p| p.settings.as_ref()) {
        merge_preset_settings(&mut payload, settings);
    }

    if config.non_interactive_mode {
        payload
            .env
            .extend(string_entries(&environment::non_interactive_overrides()));
    }

    payload
}

fn string_entries(env: &EnvMap) -> SettingsEnv {
    env.iter()
        .map(|(k, v)| (k.clone(), Value::from(v.as_str())))
        .collect()
}

/// A preset's status-line section, when present, shadows the global one entirely,
/// including its `enabled` flag.
fn select_status_line<'a>(
    preset: Option<&'a StatusLineConfig>,
    global: Option<&'a StatusLineConfig>,
) -> Option<&'a StatusLineConfig> {
    preset.or(global)
}

/// `ccr statusline`, or `ccr statusline <preset>` so each preset renders its own line.
pub fn status_line_command(preset_name: Option<&str>) -> String {
    match preset_name.filter(|name| !name.is_empty()) {
        Some(name) => {
            let quoted = shlex::try_quote(name)
                .map_or_else(|_| name.to_string(), |q| q.into_owned());
            format!("{} statusline {}", LAUNCHER_NAME, quoted)
        }
        None => format!("{} statusline", LAUNCHER_NAME),
    }
}

/// Shallow-merges the preset's top-level keys over the payload; `env` is merged
/// key by key so base variables the preset does not mention survive. Preset
/// values are copied as they are, whatever their JSON type.
pub fn merge_preset_settings(payload: &mut SettingsPayload, settings: &PresetSettings) {
    if let Some(preset_env) = &settings.env {
        payload
            .env
            .extend(preset_env.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    for (key, value) in &settings.extra {
        if key == STATUS_LINE_KEY {
            payload.status_line = Some(StatusLineSetting::Opaque(value.clone()));
        } else {
            payload.extra.insert(key.clone(), value.clone());
        }
    }
}
