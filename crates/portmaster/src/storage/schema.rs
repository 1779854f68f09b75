//! `SQLite` schema definitions for portmaster.
//!
//! Every logical table is a key/value table holding JSON documents, so the
//! schema is generated from [`Table`](super::Table).

use super::Table;

/// SQL statement to create the sequences table used for numeric ids.
pub const CREATE_SEQUENCES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS sequences (
    name TEXT PRIMARY KEY,
    value INTEGER NOT NULL
)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// Tables present in schema version 1.
pub const BASE_TABLES: [Table; 5] = [
    Table::Users,
    Table::Fishers,
    Table::Catches,
    Table::NfcLogs,
    Table::Renewals,
];

/// `CREATE TABLE` statement for one record table.
#[must_use]
pub fn create_record_table(table: Table) -> String {
    format!(
        r"
CREATE TABLE IF NOT EXISTS {name} (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
)
",
        name = table.name()
    )
}

/// All base schema statements in order.
#[must_use]
pub fn base_schema() -> Vec<String> {
    let mut statements: Vec<String> = BASE_TABLES
        .iter()
        .map(|&table| create_record_table(table))
        .collect();
    statements.push(CREATE_SEQUENCES_TABLE.to_string());
    statements.push(CREATE_METADATA_TABLE.to_string());
    statements
}
