//! Delete (deactivate) user command.
//!
//! Deactivates the user in the Synapse database, then locks the matching
//! account in MAS. The database step is authoritative and fatal on failure;
//! the MAS lock is best-effort and only ever produces a warning.

use std::io::Write;

use tracing::{info, warn};

use crate::error::AdminResult;
use crate::mas::{AccountLocker, LockOutcome};
use crate::synapse::QueryExecutor;
use crate::validation::{localpart, validate_mxid};

/// Statement behind `delete`. `:'mxid'` is bound by the query executor.
pub const DEACTIVATE_USER_STATEMENT: &str =
    "UPDATE users SET deactivated = 1, password_hash = '' WHERE name = :'mxid'";

/// What happened during a delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteReport {
    pub mxid: String,
    pub localpart: String,
    /// Rows the update touched, when the client reported it.
    pub rows_affected: Option<u64>,
    pub lock: LockOutcome,
}

/// Deactivate `mxid` in Synapse and lock it in MAS.
///
/// # Errors
///
/// Fails before any side effect when `mxid` lacks the `@` sigil, and fails
/// without attempting the lock when the database update fails. A failed lock
/// is reported through [`DeleteReport::lock`] instead.
pub fn delete_user(
    db: &dyn QueryExecutor,
    locker: &dyn AccountLocker,
    mxid: &str,
    out: &mut dyn Write,
) -> AdminResult<DeleteReport> {
    let mxid = validate_mxid(mxid)?;

    writeln!(out, "[*] Deactivating user {}...", mxid)?;

    let outcome = db.execute(DEACTIVATE_USER_STATEMENT, &[("mxid", mxid)])?;
    writeln!(out, "    - Marked deactivated in Synapse DB.")?;
    info!(mxid = %mxid, rows_affected = ?outcome.rows_affected, "User deactivated in Synapse");

    if outcome.rows_affected == Some(0) {
        warn!(mxid = %mxid, "No user row matched");
        writeln!(out, "    ! Warning: no user row matched {}", mxid)?;
    }

    let localpart = localpart(mxid);
    writeln!(out, "    - Locking user '{}' in MAS...", localpart)?;
    let lock = locker.lock(&localpart);
    if let LockOutcome::Failed { reason } = &lock {
        writeln!(out, "    ! Warning: Failed to run MAS lock: {}", reason)?;
    }

    writeln!(out, "[+] User {} has been processed.", mxid)?;

    Ok(DeleteReport {
        mxid: mxid.to_string(),
        localpart,
        rows_affected: outcome.rows_affected,
        lock,
    })
}
