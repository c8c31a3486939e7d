// src/system/service.rs

use colored::Colorize;
use std::{
    fmt::Debug,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Reference count file '{path}' could not be updated: {source}")]
    ReferenceCount {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not stop the router service (PID {pid}): {source}")]
    Stop {
        pid: u32,
        #[source]
        source: std::io::Error,
    },
}

/// Lifecycle hooks of the shared background router service.
///
/// Every launcher increments the count before spawning its child and decrements it
/// once the child is gone; `close` lets the service go away when nobody uses it.
pub trait ServiceLifecycle: Debug + Send + Sync {
    fn increment(&self) -> Result<(), ServiceError>;
    fn decrement(&self) -> Result<(), ServiceError>;
    /// Stops the service if it is running and no launcher holds a reference.
    fn close(&self) -> Result<(), ServiceError>;
    fn is_running(&self) -> bool;
}

/// File-backed implementation: a counter file plus the service's PID file.
#[derive(Debug, Clone)]
pub struct FileServiceLifecycle {
    count_path: PathBuf,
    pid_path: PathBuf,
}

impl FileServiceLifecycle {
    pub fn new(count_path: impl Into<PathBuf>, pid_path: impl Into<PathBuf>) -> Self {
        Self {
            count_path: count_path.into(),
            pid_path: pid_path.into(),
        }
    }

    /// Current count; a missing or unreadable file counts as zero.
    pub fn reference_count(&self) -> u64 {
        fs::read_to_string(&self.count_path)
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0)
    }

    fn store_count(&self, count: u64) -> Result<(), ServiceError> {
        fs::write(&self.count_path, count.to_string()).map_err(|e| {
            ServiceError::ReferenceCount {
                path: self.count_path.clone(),
                source: e,
            }
        })
    }

    fn read_pid(&self) -> Option<u32> {
        fs::read_to_string(&self.pid_path)
            .ok()
            .and_then(|s| s.trim().parse().ok())
    }

    fn cleanup_pid_file(&self) {
        match fs::remove_file(&self.pid_path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => log::warn!("Failed to remove {}: {}", self.pid_path.display(), e),
        }
    }
}

impl ServiceLifecycle for FileServiceLifecycle {
    fn increment(&self) -> Result<(), ServiceError> {
        let count = self.reference_count().saturating_add(1);
        log::trace!("Reference count -> {}", count);
        self.store_count(count)
    }

    fn decrement(&self) -> Result<(), ServiceError> {
        let count = self.reference_count().saturating_sub(1);
        log::trace!("Reference count -> {}", count);
        self.store_count(count)
    }

    fn close(&self) -> Result<(), ServiceError> {
        if self.reference_count() > 0 {
            log::debug!("Service still referenced, leaving it running.");
            return Ok(());
        }
        let Some(pid) = self.read_pid() else {
            log::debug!("No service PID recorded, nothing to stop.");
            return Ok(());
        };
        if !process_alive(pid) {
            self.cleanup_pid_file();
            return Ok(());
        }

        terminate_process(pid).map_err(|e| ServiceError::Stop { pid, source: e })?;
        self.cleanup_pid_file();
        println!("{}", format!(t!("service.info.stopped"), pid = pid).dimmed());
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.read_pid().is_some_and(process_alive)
    }
}

fn process_alive(pid: u32) -> bool {
    let status = if cfg!(target_os = "windows") {
        Command::new("tasklist")
            .args(["/FI", &format!("PID eq {}", pid), "/NH"])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .map(|out| String::from_utf8_lossy(&out.stdout).contains(&pid.to_string()))
    } else {
        Command::new("kill")
            .args(["-0", &pid.to_string()])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
    };
    status.unwrap_or(false)
}

fn terminate_process(pid: u32) -> std::io::Result<()> {
    let pid_arg = pid.to_string();
    let status = if cfg!(target_os = "windows") {
        Command::new("taskkill")
            .args(["/PID", &pid_arg, "/F"])
            .stdout(Stdio::null())
            .status()?
    } else {
        Command::new("kill").arg(&pid_arg).status()?
    };
    if status.success() {
        Ok(())
    } else {
        Err(std::io::Error::other(format!(
            "terminate command exited with {}",
            status
        )))
    }
}

/// Default locations: the shared temp-dir counter and the router's PID file.
pub fn default_service_lifecycle(pid_path: &Path) -> FileServiceLifecycle {
    FileServiceLifecycle::new(crate::core::paths::get_reference_count_path(), pid_path)
}
