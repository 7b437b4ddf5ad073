// src/packages/rpm.rs

//! RPM catalog entities: packages, provides and requires

use crate::error::{Error, Result};
use crate::packages::traits::Rpm;
use crate::version::{Flags, RpmVersion, parse_epoch};
use serde::Serialize;
use std::fmt;

/// Backend-local identifier of a package (pkgkey or index position)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PackageKey(pub i64);

/// Versioned identity shared by packages, provides and requires
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Identity {
    pub name: String,
    #[serde(flatten)]
    pub evr: RpmVersion,
    pub flags: Option<Flags>,
}

impl Identity {
    pub fn new(name: impl Into<String>, evr: RpmVersion, flags: Option<Flags>) -> Self {
        Self {
            name: name.into(),
            evr,
            flags,
        }
    }

    /// Build an identity from raw catalog columns
    ///
    /// Empty epoch means absent, empty flags means no operator. A
    /// non-numeric epoch or unknown flag is a format error.
    pub fn from_columns(
        name: impl Into<String>,
        version: &str,
        release: &str,
        epoch: &str,
        flags: &str,
    ) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::ParseError("Missing name".to_string()));
        }
        Ok(Self {
            name,
            evr: RpmVersion::new(parse_epoch(epoch)?, version, release),
            flags: Flags::parse_optional(flags)?,
        })
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.evr.version.is_empty() {
            let op = self.flags.unwrap_or(Flags::Eq).symbol();
            write!(f, " {} {}", op, self.evr)?;
        }
        Ok(())
    }
}

/// A capability exposed by a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Provides {
    #[serde(flatten)]
    identity: Identity,
    /// Owning package; `None` for raw capability lookups not yet joined
    #[serde(skip)]
    package: Option<PackageKey>,
}

impl Provides {
    pub fn new(identity: Identity, package: Option<PackageKey>) -> Self {
        Self { identity, package }
    }

    /// Key of the owning package, when known
    pub fn package(&self) -> Option<PackageKey> {
        self.package
    }
}

impl Rpm for Provides {
    fn identity(&self) -> &Identity {
        &self.identity
    }
}

impl fmt::Display for Provides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.identity.fmt(f)
    }
}

/// A capability a package depends on
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Requires {
    #[serde(flatten)]
    identity: Identity,
    /// Needed before the pre-install step; install ordering only
    pre: bool,
}

impl Requires {
    pub fn new(identity: Identity, pre: bool) -> Self {
        Self { identity, pre }
    }

    /// Requirement on a bare capability name, any version
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(Identity::new(name, RpmVersion::default(), None), false)
    }

    /// Versioned requirement with an operator
    pub fn versioned(
        name: impl Into<String>,
        flags: Flags,
        version: impl Into<String>,
        release: impl Into<String>,
    ) -> Self {
        Self::new(
            Identity::new(name, RpmVersion::new(None, version, release), Some(flags)),
            false,
        )
    }

    pub fn is_pre(&self) -> bool {
        self.pre
    }
}

impl Rpm for Requires {
    fn identity(&self) -> &Identity {
        &self.identity
    }
}

impl fmt::Display for Requires {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.identity.fmt(f)
    }
}

/// Parse a `pre` marker column ("1", "TRUE", "true"; empty is false)
pub fn parse_pre(s: &str) -> bool {
    matches!(s.trim(), "1" | "TRUE" | "True" | "true")
}

/// A package from a repository catalog
///
/// Built once by a backend through [`PackageBuilder`]; immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Package {
    #[serde(skip)]
    key: PackageKey,
    #[serde(flatten)]
    identity: Identity,
    arch: String,
    group: String,
    location: String,
    provides: Vec<Provides>,
    requires: Vec<Requires>,
    /// Name of the repository this package was loaded from
    repository: String,
}

impl Package {
    pub fn key(&self) -> PackageKey {
        self.key
    }

    pub fn arch(&self) -> &str {
        &self.arch
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    /// Path of the RPM file relative to the repository base URL
    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn provides(&self) -> &[Provides] {
        &self.provides
    }

    pub fn requires(&self) -> &[Requires] {
        &self.requires
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// `name-version-release`
    pub fn rpm_name(&self) -> String {
        format!("{}-{}-{}", self.name(), self.version(), self.release())
    }

    /// `name-version-release.arch.rpm`
    pub fn rpm_file_name(&self) -> String {
        format!("{}.{}.rpm", self.rpm_name(), self.arch)
    }

    /// Catalog identity within a repository: (name, evr, arch)
    pub fn same_identity(&self, other: &Package) -> bool {
        self.identity.name == other.identity.name
            && self.identity.evr == other.identity.evr
            && self.arch == other.arch
    }
}

impl Rpm for Package {
    fn identity(&self) -> &Identity {
        &self.identity
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.identity.name, self.identity.evr)?;
        if !self.arch.is_empty() {
            write!(f, ".{}", self.arch)?;
        }
        Ok(())
    }
}

/// Builder for constructing a Package while decoding a catalog row
///
/// Provides and requires are append-only; `build` freezes the package.
#[derive(Debug)]
pub struct PackageBuilder {
    key: PackageKey,
    identity: Identity,
    arch: String,
    group: String,
    location: String,
    provides: Vec<Provides>,
    requires: Vec<Requires>,
    repository: String,
}

impl PackageBuilder {
    pub fn new(key: PackageKey, identity: Identity) -> Self {
        Self {
            key,
            identity,
            arch: String::new(),
            group: String::new(),
            location: String::new(),
            provides: Vec::new(),
            requires: Vec::new(),
            repository: String::new(),
        }
    }

    pub fn arch(mut self, arch: impl Into<String>) -> Self {
        self.arch = arch.into();
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = repository.into();
        self
    }

    /// Append a provide; its owner is set to this package
    pub fn push_provide(&mut self, identity: Identity) {
        self.provides.push(Provides::new(identity, Some(self.key)));
    }

    pub fn push_require(&mut self, identity: Identity, pre: bool) {
        self.requires.push(Requires::new(identity, pre));
    }

    pub fn build(self) -> Package {
        Package {
            key: self.key,
            identity: self.identity,
            arch: self.arch,
            group: self.group,
            location: self.location,
            provides: self.provides,
            requires: self.requires,
            repository: self.repository,
        }
    }
}
