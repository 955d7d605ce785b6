//! `psql`-backed query execution against the Synapse database.

use tracing::debug;

use crate::config::{DatabaseConfig, SubprocessConfig};
use crate::error::{AdminError, AdminResult};
use crate::executor::{SubprocessBuilder, SubprocessResult};

use super::traits::{QueryExecutor, StatementOutcome};

/// Runs SQL through the `psql` command-line client.
///
/// Statements are written to the client's stdin rather than passed with
/// `-c`, because psql only performs `:'var'` interpolation on scripts.
/// Every bound value therefore reaches the server as a quoted literal.
pub struct Psql {
    database: DatabaseConfig,
    subprocess: SubprocessConfig,
}

impl Psql {
    pub fn new(database: DatabaseConfig, subprocess: SubprocessConfig) -> Self {
        Self {
            database,
            subprocess,
        }
    }

    fn command(&self, quiet: bool, params: &[(&str, &str)]) -> SubprocessBuilder {
        let mut builder = SubprocessBuilder::new(&self.database.client)
            .args([
                "-X",
                "-w",
                "-h",
                self.database.host.as_str(),
                "-U",
                self.database.user.as_str(),
                "-d",
                self.database.name.as_str(),
                "-v",
                "ON_ERROR_STOP=1",
            ])
            .clear_env()
            .env("PATH", &self.subprocess.path)
            .timeout(self.subprocess.timeout());

        if quiet {
            builder = builder.arg("-q");
        }
        for (name, value) in params {
            builder = builder.arg("-v").arg(&format!("{}={}", name, value));
        }
        if let Some(password) = &self.database.password {
            builder = builder.env("PGPASSWORD", password);
        }

        builder.args(["-f", "-"])
    }

    fn check(result: SubprocessResult) -> AdminResult<String> {
        if result.success {
            return Ok(result.stdout);
        }

        debug!(
            exit_code = ?result.exit_code,
            stderr = %result.stderr.trim(),
            "Database client failed"
        );
        Err(AdminError::Database {
            stderr: result.stderr.trim().to_string(),
        })
    }
}

impl QueryExecutor for Psql {
    fn fetch(&self, query: &str, params: &[(&str, &str)]) -> AdminResult<String> {
        let script = format!("COPY ({}) TO STDOUT WITH CSV HEADER;\n", query);
        debug!(query = %query, "Fetching rows");
        let result = self.command(true, params).stdin(&script).run()?;
        Self::check(result)
    }

    fn execute(&self, statement: &str, params: &[(&str, &str)]) -> AdminResult<StatementOutcome> {
        debug!(statement = %statement, "Executing statement");
        let script = format!("{};\n", statement.trim_end().trim_end_matches(';'));
        let result = self.command(false, params).stdin(&script).run()?;
        let stdout = Self::check(result)?;
        Ok(StatementOutcome {
            rows_affected: parse_rows_affected(&stdout),
        })
    }
}

/// Read the row count from a command tag such as `UPDATE 3` or `INSERT 0 1`.
fn parse_rows_affected(stdout: &str) -> Option<u64> {
    stdout.lines().rev().find_map(|line| {
        let mut words = line.split_whitespace();
        match words.next()? {
            "UPDATE" | "DELETE" | "INSERT" => words.last()?.parse().ok(),
            _ => None,
        }
    })
}
