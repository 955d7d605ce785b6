//! Query executor trait definition.

use crate::error::AdminResult;

/// Result of a side-effecting statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatementOutcome {
    /// Rows touched, when the client reported a command tag.
    pub rows_affected: Option<u64>,
}

/// Runs SQL against the homeserver database.
///
/// `params` are `(name, value)` pairs referenced from the SQL text as
/// `:'name'`. Implementations must bind them as literals, never splice
/// them into the statement.
pub trait QueryExecutor {
    /// Run a read query and return its rows as CSV text with a header line.
    fn fetch(&self, query: &str, params: &[(&str, &str)]) -> AdminResult<String>;

    /// Run a side-effecting statement.
    fn execute(&self, statement: &str, params: &[(&str, &str)]) -> AdminResult<StatementOutcome>;
}
