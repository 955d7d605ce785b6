//! List users command.
//!
//! Fetches every Synapse user and prints a fixed-width table.

use std::io::Write;

use chrono::DateTime;
use tracing::{debug, warn};

use crate::error::AdminResult;
use crate::synapse::QueryExecutor;

/// Query behind `list`.
pub const LIST_USERS_QUERY: &str =
    "SELECT name, admin, deactivated, creation_ts FROM users ORDER BY name ASC";

/// Prefix of the CSV header line echoed by `COPY ... WITH CSV HEADER`.
const HEADER_ECHO: &str = "name,admin";

/// Minimum number of fields a data row must carry.
const MIN_FIELDS: usize = 4;

const NAME_WIDTH: usize = 40;
const ADMIN_WIDTH: usize = 10;
const DEACTIVATED_WIDTH: usize = 12;
const SEPARATOR_WIDTH: usize = 80;

/// A user row as it comes out of the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow<'a> {
    pub name: &'a str,
    pub admin: bool,
    pub deactivated: bool,
    /// Seconds since the epoch, unparsed.
    pub creation_ts: &'a str,
}

impl<'a> UserRow<'a> {
    /// Split a CSV line on commas. No quoting is understood.
    ///
    /// Returns `None` for lines with fewer than four fields.
    pub fn parse(line: &'a str) -> Option<Self> {
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() < MIN_FIELDS {
            return None;
        }

        Some(Self {
            name: fields[0],
            admin: fields[1] == "1",
            deactivated: fields[2] == "1",
            creation_ts: fields[3],
        })
    }
}

/// What the renderer did with the fetched rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListSummary {
    pub printed: usize,
    pub skipped: usize,
}

/// Lines of fetched CSV that carry data: blank lines and the header echo are
/// dropped.
fn data_lines(csv: &str) -> impl Iterator<Item = &str> {
    csv.lines()
        .filter(|line| !line.is_empty() && !line.starts_with(HEADER_ECHO))
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

/// Render epoch seconds as `YYYY-MM-DD` (UTC), or return the raw text when
/// it is not a usable timestamp.
pub fn format_creation_date(raw: &str) -> String {
    raw.parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| raw.to_string())
}

/// Write the user table for `csv` to `out`.
pub fn render_user_table(csv: &str, out: &mut dyn Write) -> AdminResult<ListSummary> {
    writeln!(
        out,
        "{:<name$} {:<admin$} {:<deact$} {}",
        "USERNAME",
        "ADMIN",
        "DEACTIVATED",
        "CREATED",
        name = NAME_WIDTH,
        admin = ADMIN_WIDTH,
        deact = DEACTIVATED_WIDTH,
    )?;
    writeln!(out, "{}", "-".repeat(SEPARATOR_WIDTH))?;

    let mut summary = ListSummary::default();
    for line in data_lines(csv) {
        let Some(row) = UserRow::parse(line) else {
            debug!(line = %line, "Skipping malformed row");
            summary.skipped += 1;
            continue;
        };

        writeln!(
            out,
            "{:<name$} {:<admin$} {:<deact$} {}",
            row.name,
            yes_no(row.admin),
            yes_no(row.deactivated),
            format_creation_date(row.creation_ts),
            name = NAME_WIDTH,
            admin = ADMIN_WIDTH,
            deact = DEACTIVATED_WIDTH,
        )?;
        summary.printed += 1;
    }

    Ok(summary)
}

/// Fetch all users and print them as a table.
pub fn list_users(db: &dyn QueryExecutor, out: &mut dyn Write) -> AdminResult<ListSummary> {
    let csv = db.fetch(LIST_USERS_QUERY, &[])?;
    let summary = render_user_table(&csv, out)?;

    if summary.skipped > 0 {
        warn!(
            skipped = summary.skipped,
            "Rows with fewer than {} fields were left out of the table", MIN_FIELDS
        );
    }
    debug!(printed = summary.printed, "Listed users");

    Ok(summary)
}
