//! Matrix user ID validation.
//!
//! Only the `@` sigil is checked. Domain presence and character set are
//! left to the homeserver.

use tracing::debug;

use crate::error::{AdminError, ValidationErrorKind};

/// Sigil that starts every Matrix user ID.
pub const USER_SIGIL: char = '@';

/// Validate that `username` is given as a full MXID.
///
/// # Errors
///
/// Returns [`ValidationErrorKind::MissingSigil`] when the `@` prefix is
/// missing.
pub fn validate_mxid(username: &str) -> Result<&str, AdminError> {
    if !username.starts_with(USER_SIGIL) {
        debug!(username = %username, "Rejected username without sigil");
        return Err(AdminError::Validation {
            kind: ValidationErrorKind::MissingSigil {
                username: username.to_string(),
            },
        });
    }

    Ok(username)
}

/// Derive the MAS username from an MXID.
///
/// Everything from the first `:` onward is dropped, then every `@` is
/// removed: `@alice:example.org` becomes `alice`.
pub fn localpart(mxid: &str) -> String {
    let before_domain = mxid.split(':').next().unwrap_or_default();
    before_domain.replace(USER_SIGIL, "")
}
