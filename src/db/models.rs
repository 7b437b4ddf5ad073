// src/db/models.rs

//! Row models for primary_db catalogs
//!
//! This module decodes `packages`, `provides` and `requires` rows into
//! catalog entities. It issues a small fixed set of parameterized
//! lookups; there is no general query layer.

use crate::error::Result;
use crate::packages::{Identity, Package, PackageBuilder, PackageKey, Provides};
use crate::packages::rpm::parse_pre;
use rusqlite::types::{Type, ValueRef};
use rusqlite::{Connection, Row, params, params_from_iter};

const PACKAGE_COLUMNS: &str =
    "p.pkgKey, p.name, p.version, p.release, p.epoch, p.rpm_group, p.arch, p.location_href";

/// Read a column as text, whatever its storage class
///
/// NULL reads as the empty string, integers as decimal text.
fn text(row: &Row, idx: usize) -> rusqlite::Result<String> {
    match row.get_ref(idx)? {
        ValueRef::Null => Ok(String::new()),
        ValueRef::Integer(i) => Ok(i.to_string()),
        ValueRef::Real(f) => Ok(f.to_string()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => String::from_utf8(bytes.to_vec())
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))),
    }
}

/// A row of the `packages` table
#[derive(Debug, Clone)]
pub struct PackageRow {
    pub pkgkey: i64,
    pub name: String,
    pub version: String,
    pub release: String,
    pub epoch: String,
    pub group: String,
    pub arch: String,
    pub location: String,
}

impl PackageRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            pkgkey: row.get(0)?,
            name: text(row, 1)?,
            version: text(row, 2)?,
            release: text(row, 3)?,
            epoch: text(row, 4)?,
            group: text(row, 5)?,
            arch: text(row, 6)?,
            location: text(row, 7)?,
        })
    }

    /// List every package in the catalog
    pub fn list_all(conn: &Connection) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM packages p ORDER BY p.pkgKey",
            PACKAGE_COLUMNS
        ))?;

        let rows = stmt
            .query_map([], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Find packages by name, optionally pinned to an exact version
    pub fn find_by_name(conn: &Connection, name: &str, version: &str) -> Result<Vec<Self>> {
        let mut query = format!("SELECT {} FROM packages p WHERE p.name = ?1", PACKAGE_COLUMNS);
        let mut args = vec![name];
        if !version.is_empty() {
            query.push_str(" AND p.version = ?2");
            args.push(version);
        }

        let mut stmt = conn.prepare(&query)?;
        let rows = stmt
            .query_map(params_from_iter(args), Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Find packages exposing a capability with this exact name/version[/release]
    ///
    /// NULL version and release columns compare as the empty string.
    pub fn find_providing(
        conn: &Connection,
        name: &str,
        version: &str,
        release: &str,
    ) -> Result<Vec<Self>> {
        let mut query = format!(
            "SELECT DISTINCT {} FROM packages p, provides r
             WHERE p.pkgKey = r.pkgKey
             AND r.name = ?1
             AND ifnull(r.version, '') = ?2",
            PACKAGE_COLUMNS
        );
        let mut args = vec![name, version];
        if !release.is_empty() {
            query.push_str(" AND ifnull(r.release, '') = ?3");
            args.push(release);
        }
        query.push_str(" ORDER BY p.pkgKey");

        let mut stmt = conn.prepare(&query)?;
        let rows = stmt
            .query_map(params_from_iter(args), Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Assemble the full Package, loading its provides and requires
    pub fn into_package(self, conn: &Connection, repository: &str) -> Result<Package> {
        let identity =
            Identity::from_columns(self.name, &self.version, &self.release, &self.epoch, "")?;
        let key = PackageKey(self.pkgkey);

        let mut builder = PackageBuilder::new(key, identity)
            .arch(self.arch)
            .group(self.group)
            .location(self.location)
            .repository(repository);

        for entry in EntryRow::provides_of(conn, self.pkgkey)? {
            builder.push_provide(entry.into_identity()?);
        }
        for entry in EntryRow::requires_of(conn, self.pkgkey)? {
            let pre = parse_pre(&entry.pre);
            builder.push_require(entry.into_identity()?, pre);
        }

        Ok(builder.build())
    }
}

/// A row of the `provides` or `requires` table
#[derive(Debug, Clone)]
pub struct EntryRow {
    pub name: String,
    pub version: String,
    pub release: String,
    pub epoch: String,
    pub flags: String,
    /// Only populated for requires
    pub pre: String,
}

impl EntryRow {
    fn from_provides_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            name: text(row, 0)?,
            version: text(row, 1)?,
            release: text(row, 2)?,
            epoch: text(row, 3)?,
            flags: text(row, 4)?,
            pre: String::new(),
        })
    }

    fn from_requires_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            pre: text(row, 5)?,
            ..Self::from_provides_row(row)?
        })
    }

    /// Provides of one package
    pub fn provides_of(conn: &Connection, pkgkey: i64) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT name, version, release, epoch, flags FROM provides WHERE pkgKey = ?1",
        )?;

        let rows = stmt
            .query_map(params![pkgkey], Self::from_provides_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Requires of one package
    pub fn requires_of(conn: &Connection, pkgkey: i64) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT name, version, release, epoch, flags, pre FROM requires WHERE pkgKey = ?1",
        )?;

        let rows = stmt
            .query_map(params![pkgkey], Self::from_requires_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Every provides row carrying a capability name
    pub fn provides_named(conn: &Connection, name: &str) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT name, version, release, epoch, flags FROM provides WHERE name = ?1",
        )?;

        let rows = stmt
            .query_map(params![name], Self::from_provides_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Convert to an identity; relational catalogs default empty flags to EQ
    pub fn into_identity(self) -> Result<Identity> {
        let flags = if self.flags.is_empty() {
            "EQ"
        } else {
            self.flags.as_str()
        };
        Identity::from_columns(self.name, &self.version, &self.release, &self.epoch, flags)
    }

    /// Convert to a capability not yet joined to its owning package
    pub fn into_unjoined_provide(self) -> Result<Provides> {
        Ok(Provides::new(self.into_identity()?, None))
    }
}
