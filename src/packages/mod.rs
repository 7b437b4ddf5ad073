// src/packages/mod.rs

//! Package catalog entities
//!
//! Packages, the capabilities they provide and the capabilities they
//! require, as decoded from a repository catalog by a backend. Every
//! entity implements the `Rpm` trait for uniform version access.

pub mod rpm;
pub mod traits;

pub use rpm::{Identity, Package, PackageBuilder, PackageKey, Provides, Requires};
pub use traits::Rpm;

/// Capability names left out of capability indexes
///
/// These are synthetic names every RPM carries; indexing them would make
/// every package a provider.
pub const IGNORED_PACKAGES: &[&str] = &[
    "rpmlib(CompressedFileNames)",
    "/bin/sh",
    "rpmlib(PayloadFilesHavePrefix)",
    "rpmlib(PartialHardlinkSets)",
];

/// Whether a capability name is on the ignore list
pub fn is_ignored(name: &str) -> bool {
    IGNORED_PACKAGES.contains(&name)
}
