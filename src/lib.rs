// src/lib.rs

//! yumrepo: dependency resolution against yum/RPM repositories
//!
//! Finds the best package for a name or a capability requirement in a
//! locally synchronized copy of repository metadata.
//!
//! # Architecture
//!
//! - Backends: one repository catalog behind a common trait, either the
//!   `primary_db` SQLite catalog or the `primary` XML catalog
//! - Registry: backend kinds are picked by name at runtime
//! - Resolver: RPM version ordering, operator matching, latest-wins selection
//! - Repository: repomd.xml lookup, download, checksum check, cache reuse
//! - Client: resolution across several repositories, dependency closure

pub mod client;
pub mod compression;
pub mod config;
pub mod db;
mod error;
pub mod packages;
pub mod repository;
pub mod resolver;
pub mod version;

pub use error::{Error, Result};
