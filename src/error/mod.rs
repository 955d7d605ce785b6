//! Error types for matrix-user-admin.
//!
//! Provides a unified error handling system using thiserror.

mod types;

pub use types::*;
