// src/repository/backend.rs

//! Backend capability contract
//!
//! A backend owns one repository's cached catalog: it knows which
//! repomd.xml data type it consumes, how to download and unpack it, and
//! how to look up raw candidates in it. Matching and latest-wins
//! selection are shared and provided on top of the raw lookups.

use crate::error::Result;
use crate::packages::{Package, Provides, Requires, Rpm};
use crate::resolver;
use std::path::Path;
use tracing::debug;

/// Storage strategy for one repository's catalog
///
/// Operations block until complete. A backend instance must not be used
/// from several threads at once.
pub trait Backend {
    /// Registry kind of this backend ("sqlite", "xml")
    fn kind(&self) -> &'static str;

    /// repomd.xml data type consumed by this backend
    fn yum_data_type(&self) -> &'static str;

    /// Path of the compressed artifact in the cache directory
    fn artifact_path(&self) -> &Path;

    /// Whether the compressed artifact is already cached
    fn has_db(&self) -> bool {
        self.artifact_path().exists()
    }

    /// Fetch the compressed catalog from `url` into the cache directory
    fn get_latest_db(&mut self, url: &str) -> Result<()>;

    /// Make the backend ready to answer queries
    fn load_db(&mut self) -> Result<()>;

    /// Packages named `name`, restricted to `version` when it is non-empty
    fn packages_by_name(&self, name: &str, version: &str) -> Result<Vec<Package>>;

    /// Capability entries named `name`
    fn provides_by_name(&self, name: &str) -> Result<Vec<Provides>>;

    /// Packages exposing a capability with the provide's name, version and
    /// (when non-empty) release
    fn packages_providing(&self, provide: &Provides) -> Result<Vec<Package>>;

    /// Every package currently loaded, without duplicates
    fn get_packages(&self) -> Result<Vec<Package>>;

    /// Release resources held by the backend
    fn close(&mut self) -> Result<()>;

    /// Locate a package by name, returning the latest matching version
    fn find_latest_matching_name(&self, name: &str, version: &str, release: &str) -> Result<Package> {
        let candidates = self.packages_by_name(name, version)?;
        resolver::latest_matching_name(name, version, release, candidates)
    }

    /// Locate the latest package providing a capability
    ///
    /// Two stages: pick the latest matching capability entry, then look up
    /// the packages exposing that exact entry and pick the latest of them.
    fn find_latest_matching_require(&self, requirement: &Requires) -> Result<Package> {
        debug!("looking for match for {}", requirement);

        let provides = self.provides_by_name(requirement.name())?;
        let provide = resolver::latest_matching_provide(requirement, provides)?;

        let packages = self.packages_providing(&provide)?;
        let count = packages.len();
        let pkg = resolver::latest(packages).ok_or_else(|| resolver::no_provider(requirement))?;

        debug!(
            "found {} package(s) providing {} - returning latest: {}",
            count, provide, pkg
        );
        Ok(pkg)
    }
}
