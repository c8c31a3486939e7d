// src/core/launcher.rs

//! # Launcher
//!
//! Runs one `claude` invocation on behalf of the router:
//!
//! ```text
//! Idle → ConfigBuilt → SettingsWritten → RefIncremented → Spawned
//!      → {Streaming → Exited | SpawnFailed}
//! ```
//!
//! The reference count taken in `RefIncremented` is released exactly once on every
//! path out of [`Launcher::launch`], early errors included.

use crate::{
    core::{
        arg_parser::parse_flags,
        flag_translation::{TranslationMode, translate_flags},
        paths, settings_builder,
    },
    models::{EnvMap, GlobalConfig, LaunchRequest, ProcessEnv, SettingsPayload},
    system::{
        executor::{self, ExecutionError, Invocation, ParentStreams, StreamWiring},
        service::ServiceLifecycle,
        settings_store::{SettingsStore, SettingsStoreError},
    },
};
use std::path::{Path, PathBuf};
use thiserror::Error;

const SETTINGS_FLAG: &str = "--settings";

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Could not serialize the settings payload: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error(transparent)]
    Settings(#[from] SettingsStoreError),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

/// Progress of a single launch, logged as it advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchStage {
    Idle,
    ConfigBuilt,
    SettingsWritten,
    RefIncremented,
    Spawned,
    Streaming,
    Exited,
    SpawnFailed,
}

/// How a launch ended.
#[derive(Debug)]
pub enum LaunchOutcome {
    /// The child ran and exited; `None` when no exit code was available (e.g. signalled).
    Exited { status_code: Option<i32> },
    /// The executable could not be started.
    SpawnFailed { error: ExecutionError },
}

impl LaunchOutcome {
    /// The code the hosting process should exit with.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Exited { status_code } => status_code.unwrap_or(0),
            Self::SpawnFailed { .. } => 1,
        }
    }
}

/// Everything computed before the child is spawned.
#[derive(Debug, Clone)]
pub struct PreparedLaunch {
    pub payload: SettingsPayload,
    pub settings_path: PathBuf,
    pub invocation: Invocation,
}

/// Builds settings, translates arguments and supervises the `claude` child.
///
/// Configuration is supplied once at construction; the launcher never reads global state.
#[derive(Debug)]
pub struct Launcher {
    config: GlobalConfig,
    base_env: EnvMap,
    process_env: ProcessEnv,
    settings_store: Box<dyn SettingsStore>,
    service: Box<dyn ServiceLifecycle>,
}

impl Launcher {
    pub fn new(
        config: GlobalConfig,
        base_env: EnvMap,
        process_env: ProcessEnv,
        settings_store: Box<dyn SettingsStore>,
        service: Box<dyn ServiceLifecycle>,
    ) -> Self {
        Self {
            config,
            base_env,
            process_env,
            settings_store,
            service,
        }
    }

    fn is_non_interactive(&self) -> bool {
        self.config.non_interactive_mode
    }

    /// Builds and persists the settings payload and works out the exact invocation.
    pub fn prepare(&self, request: &LaunchRequest) -> Result<PreparedLaunch, LaunchError> {
        enter(LaunchStage::Idle);
        let payload =
            settings_builder::build_settings_payload(&self.config, &self.base_env, request);
        enter(LaunchStage::ConfigBuilt);

        let settings_json = serde_json::to_string(&payload)?;
        let settings_path = self.settings_store.write(&settings_json)?;
        enter(LaunchStage::SettingsWritten);

        let mut args = request.args.clone();
        insert_settings_flag(&mut args, &settings_path);

        let mode = TranslationMode::for_non_interactive(self.is_non_interactive());
        let tokens = translate_flags(&parse_flags(&args), mode);
        let program = paths::resolve_claude_path(
            self.config.claude_path.as_deref(),
            self.process_env.claude_path.as_deref(),
        );

        Ok(PreparedLaunch {
            payload,
            settings_path,
            invocation: Invocation {
                program,
                args: tokens,
                // The shell would swallow piped stdin in automation mode.
                use_shell: !self.is_non_interactive(),
            },
        })
    }

    /// Runs the full launch. `streams` are only used in automation mode.
    pub async fn launch(
        &self,
        request: &LaunchRequest,
        streams: ParentStreams,
    ) -> Result<LaunchOutcome, LaunchError> {
        let prepared = self.prepare(request)?;

        let lease = match self.service.increment() {
            Ok(()) => Some(scopeguard::guard(self.service.as_ref(), |service| {
                if let Err(e) = service.decrement() {
                    log::warn!("Failed to release service reference: {}", e);
                }
            })),
            Err(e) => {
                log::warn!("Failed to register service reference: {}", e);
                None
            }
        };
        enter(LaunchStage::RefIncremented);

        let wiring = if self.is_non_interactive() {
            StreamWiring::piped(streams, self.process_env.output_file.as_deref())?
        } else {
            StreamWiring::Inherit
        };

        let child = match executor::spawn(&prepared.invocation, &wiring) {
            Ok(child) => child,
            Err(error) => {
                enter(LaunchStage::SpawnFailed);
                drop(lease);
                return Ok(LaunchOutcome::SpawnFailed { error });
            }
        };
        enter(LaunchStage::Spawned);
        if self.is_non_interactive() {
            enter(LaunchStage::Streaming);
        }

        let status_code =
            executor::supervise(child, wiring, &prepared.invocation.program).await?;
        drop(lease);
        enter(LaunchStage::Exited);

        if let Err(e) = self.service.close() {
            log::warn!("Failed to shut down the router service: {}", e);
        }
        Ok(LaunchOutcome::Exited { status_code })
    }
}

fn enter(stage: LaunchStage) {
    log::debug!("launch stage: {:?}", stage);
}

/// Adds `--settings <path>`, ahead of any `--` terminator so the flag is still parsed.
fn insert_settings_flag(args: &mut Vec<String>, settings_path: &Path) {
    let path = dunce::simplified(settings_path).display().to_string();
    let at = args.iter().position(|a| a == "--").unwrap_or(args.len());
    args.insert(at, path);
    args.insert(at, SETTINGS_FLAG.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PresetConfig;
    use crate::system::{service::ServiceError, settings_store::FileSettingsStore};
    use std::fs;
    use std::sync::{Arc, Mutex};
    use tempfile::{TempDir, tempdir};

    /// Records every lifecycle call in order.
    #[derive(Debug, Clone, Default)]
    struct RecordingService {
        calls: Arc<Mutex<Vec<&'static str>>>,
        fail_increment: bool,
    }

    impl RecordingService {
        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: &'static str) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl ServiceLifecycle for RecordingService {
        fn increment(&self) -> Result<(), ServiceError> {
            if self.fail_increment {
                return Err(ServiceError::ReferenceCount {
                    path: PathBuf::from("/unwritable"),
                    source: std::io::Error::other("read-only"),
                });
            }
            self.record("increment");
            Ok(())
        }

        fn decrement(&self) -> Result<(), ServiceError> {
            self.record("decrement");
            Ok(())
        }

        fn close(&self) -> Result<(), ServiceError> {
            self.record("close");
            Ok(())
        }

        fn is_running(&self) -> bool {
            true
        }
    }

    struct Fixture {
        dir: TempDir,
        service: RecordingService,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: tempdir().unwrap(),
                service: RecordingService::default(),
            }
        }

        fn launcher(
            &self,
            non_interactive: bool,
            claude: &str,
            output_file: Option<PathBuf>,
        ) -> Launcher {
            let config = GlobalConfig {
                non_interactive_mode: non_interactive,
                claude_path: Some(claude.to_string()),
                ..Default::default()
            };
            Launcher::new(
                config,
                EnvMap::from([("A".to_string(), "1".to_string())]),
                ProcessEnv {
                    claude_path: None,
                    output_file,
                },
                Box::new(FileSettingsStore::new(self.dir.path())),
                Box::new(self.service.clone()),
            )
        }
    }

    fn request(args: &[&str]) -> LaunchRequest {
        LaunchRequest {
            args: args.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    fn empty_streams() -> ParentStreams {
        ParentStreams {
            input: Box::new(&b""[..]),
            output: Box::new(tokio::io::sink()),
        }
    }

    #[test]
    fn test_prepare_interactive_uses_shell_quoted_tokens() {
        let fixture = Fixture::new();
        let launcher = fixture.launcher(false, "claude", None);

        let prepared = launcher.prepare(&request(&["--model", "x", "-v"])).unwrap();

        let path = dunce::simplified(&prepared.settings_path).display().to_string();
        assert!(prepared.invocation.use_shell);
        assert_eq!(prepared.invocation.program, "claude");
        assert_eq!(
            prepared.invocation.args,
            vec![
                "--model \"x\"".to_string(),
                "-v".to_string(),
                format!("--settings {}", serde_json::to_string(&path).unwrap()),
            ]
        );
    }

    #[test]
    fn test_prepare_non_interactive_uses_separate_tokens() {
        let fixture = Fixture::new();
        let launcher = fixture.launcher(true, "claude", None);

        let prepared = launcher.prepare(&request(&["--model", "x"])).unwrap();

        let path = dunce::simplified(&prepared.settings_path).display().to_string();
        assert!(!prepared.invocation.use_shell);
        assert_eq!(
            prepared.invocation.args,
            vec!["--model".to_string(), "x".to_string(), "--settings".to_string(), path]
        );
        assert_eq!(prepared.payload.env["TERM"], "dumb");
    }

    #[test]
    fn test_prepare_writes_payload_to_settings_file() {
        let fixture = Fixture::new();
        let launcher = fixture.launcher(false, "claude", None);

        let prepared = launcher.prepare(&request(&[])).unwrap();

        let written: SettingsPayload =
            serde_json::from_str(&fs::read_to_string(&prepared.settings_path).unwrap()).unwrap();
        assert_eq!(written, prepared.payload);
        assert_eq!(written.env["A"], "1");
        // Nothing is registered until the launch actually starts.
        assert!(fixture.service.calls().is_empty());
    }

    #[test]
    fn test_loosely_typed_preset_env_reaches_settings_file() {
        let fixture = Fixture::new();
        let launcher = fixture.launcher(false, "claude", None);
        let preset: PresetConfig = serde_json::from_str(
            r#"{ "noServer": "yes", "settings": { "env": { "MAX_THINKING_TOKENS": 8000 } } }"#,
        )
        .unwrap();
        let request = LaunchRequest {
            preset: Some(preset),
            preset_name: Some("loose".to_string()),
            ..Default::default()
        };

        let prepared = launcher.prepare(&request).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&prepared.settings_path).unwrap()).unwrap();
        assert_eq!(written["env"]["MAX_THINKING_TOKENS"], 8000);
        assert_eq!(written["env"]["A"], "1");
    }

    #[test]
    fn test_settings_flag_goes_before_terminator() {
        let mut args = vec!["-p".to_string(), "--".to_string(), "rest".to_string()];
        insert_settings_flag(&mut args, Path::new("/tmp/s.json"));
        assert_eq!(args, vec!["-p", "--settings", "/tmp/s.json", "--", "rest"]);
    }

    #[test]
    fn test_outcome_exit_codes() {
        assert_eq!(LaunchOutcome::Exited { status_code: Some(42) }.exit_code(), 42);
        assert_eq!(LaunchOutcome::Exited { status_code: None }.exit_code(), 0);
        let failed = LaunchOutcome::SpawnFailed {
            error: ExecutionError::SpawnFailed(
                "claude".to_string(),
                std::io::Error::from(std::io::ErrorKind::NotFound),
            ),
        };
        assert_eq!(failed.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_spawn_failure_releases_reference_without_close() {
        let fixture = Fixture::new();
        let launcher = fixture.launcher(true, "/definitely/not/a/real/claude", None);

        let outcome = launcher
            .launch(&request(&[]), empty_streams())
            .await
            .unwrap();

        assert!(matches!(outcome, LaunchOutcome::SpawnFailed { .. }));
        assert_eq!(outcome.exit_code(), 1);
        assert_eq!(fixture.service.calls(), vec!["increment", "decrement"]);
    }

    #[tokio::test]
    async fn test_failed_increment_is_not_released() {
        let mut fixture = Fixture::new();
        fixture.service.fail_increment = true;
        let launcher = fixture.launcher(true, "/definitely/not/a/real/claude", None);

        let outcome = launcher
            .launch(&request(&[]), empty_streams())
            .await
            .unwrap();

        assert_eq!(outcome.exit_code(), 1);
        assert!(fixture.service.calls().is_empty());
    }

    #[tokio::test]
    async fn test_output_file_error_releases_reference() {
        let fixture = Fixture::new();
        let missing = fixture.dir.path().join("missing").join("out.log");
        let launcher = fixture.launcher(true, "true", Some(missing));

        let err = launcher
            .launch(&request(&[]), empty_streams())
            .await
            .unwrap_err();

        assert!(matches!(err, LaunchError::Execution(ExecutionError::OutputFile { .. })));
        assert_eq!(fixture.service.calls(), vec!["increment", "decrement"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_releases_reference_then_closes() {
        let fixture = Fixture::new();
        let launcher = fixture.launcher(true, "true", None);

        let outcome = launcher
            .launch(&request(&["-v"]), empty_streams())
            .await
            .unwrap();

        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(fixture.service.calls(), vec!["increment", "decrement", "close"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_propagated() {
        let fixture = Fixture::new();
        let launcher = fixture.launcher(true, "false", None);

        let outcome = launcher
            .launch(&request(&[]), empty_streams())
            .await
            .unwrap();

        assert!(matches!(outcome, LaunchOutcome::Exited { status_code: Some(1) }));
        assert_eq!(fixture.service.calls(), vec!["increment", "decrement", "close"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_interactive_launch_runs_through_shell() {
        let fixture = Fixture::new();
        let launcher = fixture.launcher(false, "false", None);

        let outcome = launcher
            .launch(&request(&["--model", "x"]), empty_streams())
            .await
            .unwrap();

        assert_eq!(outcome.exit_code(), 1);
        assert_eq!(fixture.service.calls(), vec!["increment", "decrement", "close"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_output_file_receives_child_stdout() {
        // --- Setup ---
        let fixture = Fixture::new();
        let out_path = fixture.dir.path().join("claude.out");
        let launcher = fixture.launcher(true, "echo", Some(out_path.clone()));

        // --- Execute ---
        let outcome = launcher
            .launch(&request(&["--model", "x"]), empty_streams())
            .await
            .unwrap();

        // --- Assert ---
        assert_eq!(outcome.exit_code(), 0);
        let written = fs::read_to_string(&out_path).unwrap();
        assert!(written.starts_with("--model x --settings "));
        assert!(written.trim_end().ends_with(".json"));
    }
}
