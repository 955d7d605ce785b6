//! Command executor module.
//!
//! Handles subprocess spawning for the database client and the auth service.

mod subprocess;

pub use subprocess::{SubprocessBuilder, SubprocessResult};
