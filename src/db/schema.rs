// src/db/schema.rs

//! yum primary_db schema
//!
//! The relational backend only reads three tables; `verify` checks they
//! carry the columns the backend queries, `create` builds them (for
//! fixtures and tooling that write catalogs).

use crate::error::{Error, Result};
use rusqlite::Connection;
use tracing::debug;

/// primary_db schema version written into db_info by `create`
pub const DB_VERSION: i32 = 10;

/// Tables and columns the backend depends on
pub const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    (
        "packages",
        &[
            "pkgKey",
            "name",
            "version",
            "release",
            "epoch",
            "rpm_group",
            "arch",
            "location_href",
        ],
    ),
    (
        "provides",
        &["pkgKey", "name", "version", "release", "epoch", "flags"],
    ),
    (
        "requires",
        &["pkgKey", "name", "version", "release", "epoch", "flags", "pre"],
    ),
];

/// List the column names of a table (empty when the table is missing)
fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(columns)
}

/// Check that every required table and column exists
///
/// Column names compare case-insensitively, as sqlite does.
pub fn verify(conn: &Connection) -> Result<()> {
    for (table, required) in REQUIRED_COLUMNS {
        let columns = table_columns(conn, table)?;
        if columns.is_empty() {
            return Err(Error::SchemaError(format!("missing table '{}'", table)));
        }
        for column in *required {
            if !columns.iter().any(|c| c.eq_ignore_ascii_case(column)) {
                return Err(Error::SchemaError(format!(
                    "table '{}' has no column '{}'",
                    table, column
                )));
            }
        }
    }
    debug!("Catalog schema verified");
    Ok(())
}

/// Create the primary_db tables
pub fn create(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE db_info (dbversion INTEGER, checksum TEXT);

        CREATE TABLE packages (
            pkgKey INTEGER PRIMARY KEY,
            pkgId TEXT,
            name TEXT,
            arch TEXT,
            version TEXT,
            epoch TEXT,
            release TEXT,
            summary TEXT,
            description TEXT,
            url TEXT,
            time_file INTEGER,
            time_build INTEGER,
            rpm_license TEXT,
            rpm_vendor TEXT,
            rpm_group TEXT,
            rpm_buildhost TEXT,
            rpm_sourcerpm TEXT,
            rpm_header_start INTEGER,
            rpm_header_end INTEGER,
            rpm_packager TEXT,
            size_package INTEGER,
            size_installed INTEGER,
            size_archive INTEGER,
            location_href TEXT,
            location_base TEXT,
            checksum_type TEXT
        );

        CREATE TABLE provides (
            name TEXT,
            flags TEXT,
            epoch TEXT,
            version TEXT,
            release TEXT,
            pkgKey INTEGER
        );

        CREATE TABLE requires (
            name TEXT,
            flags TEXT,
            epoch TEXT,
            version TEXT,
            release TEXT,
            pkgKey INTEGER,
            pre BOOLEAN DEFAULT FALSE
        );

        CREATE INDEX packagename ON packages (name);
        CREATE INDEX providesname ON provides (name);
        CREATE INDEX pkgprovides ON provides (pkgKey);
        CREATE INDEX pkgrequires ON requires (pkgKey);
        ",
    )?;
    conn.execute(
        "INSERT INTO db_info (dbversion, checksum) VALUES (?1, '')",
        [DB_VERSION],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_then_verify() {
        let conn = Connection::open_in_memory().unwrap();
        create(&conn).unwrap();
        verify(&conn).unwrap();
    }

    #[test]
    fn test_verify_reports_missing_column() {
        let conn = Connection::open_in_memory().unwrap();
        create(&conn).unwrap();
        conn.execute_batch(
            "DROP TABLE requires;
             CREATE TABLE requires (name TEXT, flags TEXT, epoch TEXT, version TEXT, release TEXT, pkgKey INTEGER);",
        )
        .unwrap();

        let err = verify(&conn).unwrap_err();
        assert!(err.to_string().contains("pre"));
    }

    #[test]
    fn test_verify_reports_missing_table() {
        let conn = Connection::open_in_memory().unwrap();
        let err = verify(&conn).unwrap_err();
        assert!(err.to_string().contains("packages"));
    }
}
