//! matrix-user-admin library
//!
//! Lists and deactivates users in a Synapse homeserver database and locks
//! deactivated accounts in the Matrix Authentication Service. All database
//! and MAS work is delegated to the `psql` client and the `mas` binary.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod executor;
pub mod mas;
pub mod synapse;
pub mod validation;
