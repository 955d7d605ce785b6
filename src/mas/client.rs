//! `mas manage lock-user` invocation.

use std::fmt;

use tracing::{info, warn};

use crate::config::{MasConfig, SubprocessConfig};
use crate::executor::SubprocessBuilder;

/// How the auth-service lock went. Lock failures are advisory, so this is a
/// value rather than an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockOutcome {
    Locked,
    Failed { reason: String },
}

impl LockOutcome {
    pub fn is_locked(&self) -> bool {
        matches!(self, LockOutcome::Locked)
    }
}

impl fmt::Display for LockOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockOutcome::Locked => write!(f, "locked"),
            LockOutcome::Failed { reason } => write!(f, "lock failed: {}", reason),
        }
    }
}

/// Locks accounts in the auxiliary auth service.
pub trait AccountLocker {
    /// Prevent `localpart` from logging in. Never fails hard.
    fn lock(&self, localpart: &str) -> LockOutcome;
}

/// Drives the MAS command-line binary.
pub struct MasCli {
    mas: MasConfig,
    subprocess: SubprocessConfig,
}

impl MasCli {
    pub fn new(mas: MasConfig, subprocess: SubprocessConfig) -> Self {
        Self { mas, subprocess }
    }
}

impl AccountLocker for MasCli {
    fn lock(&self, localpart: &str) -> LockOutcome {
        let binary = self.mas.binary.to_string_lossy();
        let config = self.mas.config.to_string_lossy();

        let result = SubprocessBuilder::new(&binary)
            .args(["manage", "lock-user", localpart])
            .clear_env()
            .env("MAS_CONFIG", &config)
            .env("PATH", &self.subprocess.path)
            .timeout(self.subprocess.timeout())
            .run();

        match result {
            Ok(result) if result.success => {
                info!(localpart = %localpart, "User locked in MAS");
                LockOutcome::Locked
            }
            Ok(result) => {
                let stderr = result.stderr.trim();
                let reason = match (result.exit_code, stderr.is_empty()) {
                    (Some(code), true) => format!("mas exited with status {}", code),
                    (Some(code), false) => format!("mas exited with status {}: {}", code, stderr),
                    (None, _) => "mas was terminated by a signal".to_string(),
                };
                warn!(localpart = %localpart, exit_code = ?result.exit_code, "MAS lock failed");
                LockOutcome::Failed { reason }
            }
            Err(e) => {
                warn!(localpart = %localpart, error = %e, "Failed to run MAS lock");
                LockOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}
