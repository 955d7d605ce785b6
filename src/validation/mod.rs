//! Input validation module.

mod mxid;

pub use mxid::{localpart, validate_mxid, USER_SIGIL};
