//! Command implementations.
//!
//! - `list`: print every Synapse user as a table
//! - `delete`: deactivate a user in Synapse and lock them in MAS

mod delete;
mod list;

pub use delete::{delete_user, DeleteReport, DEACTIVATE_USER_STATEMENT};
pub use list::{
    format_creation_date, list_users, render_user_table, ListSummary, UserRow, LIST_USERS_QUERY,
};
