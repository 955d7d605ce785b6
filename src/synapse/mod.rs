//! Synapse homeserver database access.

mod psql;
mod traits;

pub use psql::Psql;
pub use traits::{QueryExecutor, StatementOutcome};
