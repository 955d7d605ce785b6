//! Matrix Authentication Service integration.

mod client;

pub use client::{AccountLocker, LockOutcome, MasCli};
