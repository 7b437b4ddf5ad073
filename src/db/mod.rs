// src/db/mod.rs

//! Database layer for primary_db catalogs
//!
//! This module handles the SQLite side of the relational backend:
//! - Opening a decompressed catalog read-only
//! - Verifying the yum primary_db schema before any query
//! - Decoding package, provides and requires rows

pub mod models;
pub mod schema;

use crate::error::{Error, Result};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use tracing::debug;

/// Open a decompressed primary_db catalog
///
/// The connection is read-only; the schema is checked before returning.
///
/// # Arguments
///
/// * `db_path` - Path to the uncompressed `primary.sqlite` file
///
/// # Returns
///
/// * `Result<Connection>` - Database connection if successful
pub fn open_catalog(db_path: &Path) -> Result<Connection> {
    if !db_path.exists() {
        return Err(Error::DatabaseNotFound(db_path.display().to_string()));
    }

    debug!("Opening catalog database at: {}", db_path.display());

    let conn = Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;

    conn.execute_batch("PRAGMA busy_timeout = 5000;")?;

    schema::verify(&conn)?;

    Ok(conn)
}

/// Close a connection, surfacing any error from sqlite
pub fn close(conn: Connection) -> Result<()> {
    conn.close().map_err(|(_, e)| Error::Database(e))
}
