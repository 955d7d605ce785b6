//! Command-line surface and dispatch.

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

use crate::commands::{delete_user, list_users};
use crate::error::{AdminError, AdminResult};
use crate::mas::AccountLocker;
use crate::synapse::QueryExecutor;

/// Manage Matrix users (Synapse database + MAS).
#[derive(Parser, Debug)]
#[command(name = "matrix-user-admin", version, about)]
pub struct Cli {
    /// Path to configuration file
    /// [default: /etc/matrix-user-admin/config.toml, built-in defaults if absent]
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List all users (CREATED dates are shown in UTC)
    List,
    /// Delete (deactivate) a user
    Delete {
        /// Full MXID (e.g. @user:example.org)
        username: String,
    },
}

impl Command {
    /// Run the command, writing user-facing output to `out`.
    ///
    /// A failed MAS lock still returns `Ok`; only validation and database
    /// failures are errors.
    pub fn execute(
        &self,
        db: &dyn QueryExecutor,
        locker: &dyn AccountLocker,
        out: &mut dyn Write,
    ) -> AdminResult<()> {
        match self {
            Command::List => {
                let summary = list_users(db, out)?;
                info!(printed = summary.printed, skipped = summary.skipped, "List complete");
            }
            Command::Delete { username } => {
                let report = delete_user(db, locker, username, out)?;
                info!(mxid = %report.mxid, lock = %report.lock, "Delete complete");
            }
        }
        Ok(())
    }
}

/// Print a fatal error the way the user expects to see it.
///
/// Validation problems go to `out` next to the usage they correct; everything
/// else goes to `err`.
pub fn report_error(error: &AdminError, out: &mut dyn Write, err: &mut dyn Write) {
    // Nothing sensible to do if the terminal is gone.
    let _ = match error {
        AdminError::Validation { kind } => writeln!(out, "Error: {}", kind),
        AdminError::Database { .. } => writeln!(err, "{}", error),
        other => writeln!(err, "Error: {}", other),
    };
}
