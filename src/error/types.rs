//! Error types for matrix-user-admin.

use thiserror::Error;

/// Main error type for the admin tool.
#[derive(Error, Debug)]
pub enum AdminError {
    /// Configuration-related errors.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Input validation errors.
    #[error("Validation error: {kind}")]
    Validation { kind: ValidationErrorKind },

    /// External command execution errors (spawn failures, timeouts).
    #[error("Command error: {kind}")]
    Command { kind: CommandErrorKind },

    /// The database client ran but exited non-zero.
    #[error("Error executing SQL: {stderr}")]
    Database { stderr: String },

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Validation error kinds.
#[derive(Error, Debug)]
pub enum ValidationErrorKind {
    #[error("Please provide full MXID (e.g. @user:example.org)")]
    MissingSigil { username: String },
}

/// Command error kinds.
#[derive(Error, Debug)]
pub enum CommandErrorKind {
    #[error("Command execution failed: {message}")]
    ExecutionFailed { message: String },

    #[error("Command timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },
}

/// Result type alias for admin operations.
pub type AdminResult<T> = Result<T, AdminError>;
