//! Runs the application's cache-clear commands (`<command> config:clear`, ...).

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use dixis_core::error::MaintenanceError;
use dixis_core::ports::{ClearTarget, MaintenanceRunner};

/// Maintenance command configuration.
#[derive(Debug, Clone)]
pub struct MaintenanceConfig {
    /// Command prefix, e.g. `php artisan`. `None` disables the runner.
    pub command: Option<String>,
    /// Upper bound for a single clear command.
    pub timeout: Duration,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            command: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl MaintenanceConfig {
    pub fn from_env() -> Self {
        Self {
            command: std::env::var("MAINTENANCE_COMMAND")
                .ok()
                .filter(|c| !c.trim().is_empty()),
            timeout: Duration::from_secs(
                std::env::var("MAINTENANCE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }
}

/// Spawns `<program> <args..> <target>:clear` for each target.
pub struct ShellMaintenanceRunner {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ShellMaintenanceRunner {
    /// Build from a whitespace separated command prefix. `None` if it is blank.
    pub fn new(command: &str, timeout: Duration) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_owned);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
            timeout,
        })
    }

    pub fn from_config(config: &MaintenanceConfig) -> Option<Self> {
        config
            .command
            .as_deref()
            .and_then(|command| Self::new(command, config.timeout))
    }
}

#[async_trait]
impl MaintenanceRunner for ShellMaintenanceRunner {
    async fn clear(&self, target: ClearTarget) -> Result<(), MaintenanceError> {
        let subcommand = format!("{target}:clear");

        let mut command = Command::new(&self.program);
        command.args(&self.args).arg(&subcommand).kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| MaintenanceError::Failed(format!("{subcommand} timed out")))?
            .map_err(|e| MaintenanceError::Spawn(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MaintenanceError::Failed(format!(
                "{subcommand} exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        tracing::info!(program = %self.program, command = %subcommand, "Application cache cleared");
        Ok(())
    }
}

/// Runner for deployments without application-level caches.
#[derive(Debug, Default)]
pub struct NoopMaintenanceRunner;

#[async_trait]
impl MaintenanceRunner for NoopMaintenanceRunner {
    async fn clear(&self, target: ClearTarget) -> Result<(), MaintenanceError> {
        tracing::debug!(clear_target = %target, "No maintenance command configured; nothing to clear");
        Ok(())
    }
}
