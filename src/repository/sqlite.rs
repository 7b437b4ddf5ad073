// src/repository/sqlite.rs

//! Relational catalog backend
//!
//! Consumes the `primary_db` artifact: a bzip2-compressed SQLite
//! database. The artifact is decompressed next to itself and queried
//! through one read-only connection; packages are assembled fresh for
//! every query.

use crate::compression;
use crate::db::{self, models::EntryRow, models::PackageRow};
use crate::error::{Error, Result};
use crate::packages::{Package, Provides, Rpm};
use crate::repository::RepositoryClient;
use crate::repository::backend::Backend;
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

const PRIMARY_COMPRESSED: &str = "primary.sqlite.bz2";
const PRIMARY: &str = "primary.sqlite";

/// Backend over a yum `primary_db` SQLite catalog
pub struct SqliteBackend {
    repository: String,
    cache_dir: PathBuf,
    primary_compressed: PathBuf,
    primary: PathBuf,
    conn: Option<Connection>,
}

impl SqliteBackend {
    pub const KIND: &'static str = "sqlite";
    pub const YUM_DATA_TYPE: &'static str = "primary_db";

    pub fn new(repository: &str, cache_dir: &Path) -> Self {
        Self {
            repository: repository.to_string(),
            cache_dir: cache_dir.to_path_buf(),
            primary_compressed: cache_dir.join(PRIMARY_COMPRESSED),
            primary: cache_dir.join(PRIMARY),
            conn: None,
        }
    }

    /// Path of the decompressed catalog
    pub fn primary_path(&self) -> &Path {
        &self.primary
    }

    fn conn(&self) -> Result<&Connection> {
        self.conn.as_ref().ok_or_else(|| {
            Error::NotLoaded(format!("sqlite catalog of repository {}", self.repository))
        })
    }

    fn close_connection(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            db::close(conn)?;
        }
        Ok(())
    }

    fn assemble(&self, conn: &Connection, rows: Vec<PackageRow>) -> Result<Vec<Package>> {
        rows.into_iter()
            .map(|row| row.into_package(conn, &self.repository))
            .collect()
    }
}

impl Backend for SqliteBackend {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn yum_data_type(&self) -> &'static str {
        Self::YUM_DATA_TYPE
    }

    fn artifact_path(&self) -> &Path {
        &self.primary_compressed
    }

    fn get_latest_db(&mut self, url: &str) -> Result<()> {
        self.close_connection()?;

        fs::create_dir_all(&self.cache_dir).map_err(|e| {
            Error::IoError(format!(
                "Failed to create directory {}: {}",
                self.cache_dir.display(),
                e
            ))
        })?;

        let mut temp = NamedTempFile::new_in(&self.cache_dir).map_err(|e| {
            Error::IoError(format!(
                "Failed to create temporary file in {}: {}",
                self.cache_dir.display(),
                e
            ))
        })?;

        info!("Downloading {} to {}", url, self.primary_compressed.display());
        RepositoryClient::new()?.download_to(url, temp.as_file_mut())?;
        temp.as_file().sync_all()?;

        // Only keep the artifact once it is known to decompress
        let size = compression::bunzip2_file(temp.path(), &self.primary)?;
        debug!("Decompressed catalog: {} bytes", size);

        temp.persist(&self.primary_compressed).map_err(|e| {
            Error::IoError(format!(
                "Failed to move download to {}: {}",
                self.primary_compressed.display(),
                e.error
            ))
        })?;

        Ok(())
    }

    fn load_db(&mut self) -> Result<()> {
        self.close_connection()?;

        if !self.primary.exists() {
            if !self.has_db() {
                return Err(Error::DatabaseNotFound(
                    self.primary_compressed.display().to_string(),
                ));
            }
            compression::bunzip2_file(&self.primary_compressed, &self.primary)?;
        }

        self.conn = Some(db::open_catalog(&self.primary)?);
        debug!("Opened sqlite catalog for repository {}", self.repository);
        Ok(())
    }

    fn packages_by_name(&self, name: &str, version: &str) -> Result<Vec<Package>> {
        let conn = self.conn()?;
        let rows = PackageRow::find_by_name(conn, name, version)?;
        self.assemble(conn, rows)
    }

    fn provides_by_name(&self, name: &str) -> Result<Vec<Provides>> {
        EntryRow::provides_named(self.conn()?, name)?
            .into_iter()
            .map(EntryRow::into_unjoined_provide)
            .collect()
    }

    fn packages_providing(&self, provide: &Provides) -> Result<Vec<Package>> {
        let conn = self.conn()?;
        let rows =
            PackageRow::find_providing(conn, provide.name(), provide.version(), provide.release())?;
        self.assemble(conn, rows)
    }

    fn get_packages(&self) -> Result<Vec<Package>> {
        let conn = self.conn()?;
        let rows = PackageRow::list_all(conn)?;
        self.assemble(conn, rows)
    }

    fn close(&mut self) -> Result<()> {
        self.close_connection()?;

        if self.primary.exists() {
            fs::remove_file(&self.primary).map_err(|e| {
                Error::IoError(format!("Failed to remove {}: {}", self.primary.display(), e))
            })?;
        }
        Ok(())
    }
}

impl Drop for SqliteBackend {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(
                "Failed to close sqlite catalog of repository {}: {}",
                self.repository, e
            );
        }
    }
}
