// src/packages/traits.rs

//! Common traits for catalog entities

use crate::packages::rpm::Identity;
use crate::version::{Flags, RpmVersion};

/// Anything carrying a versioned identity: packages, provides, requires
pub trait Rpm {
    /// Get the versioned identity
    fn identity(&self) -> &Identity;

    /// Get the name (package name or capability name)
    fn name(&self) -> &str {
        &self.identity().name
    }

    /// Get epoch, version and release
    fn evr(&self) -> &RpmVersion {
        &self.identity().evr
    }

    /// Get the version; empty means unconstrained
    fn version(&self) -> &str {
        &self.identity().evr.version
    }

    /// Get the release
    fn release(&self) -> &str {
        &self.identity().evr.release
    }

    /// Get the epoch, if one was recorded
    fn epoch(&self) -> Option<u32> {
        self.identity().evr.epoch
    }

    /// Get the comparison operator, if one was recorded
    fn flags(&self) -> Option<Flags> {
        self.identity().flags
    }
}
