// src/repository/registry.rs

//! Backend registry
//!
//! Maps a backend kind name to its constructor so repositories can be
//! built with a backend chosen at runtime. The process-wide registry is
//! installed once at start-up and read-only afterwards.

use crate::error::{Error, Result};
use crate::repository::backend::Backend;
use crate::repository::sqlite::SqliteBackend;
use crate::repository::xml::XmlBackend;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

/// Builds a backend for a repository name and cache directory
pub type BackendConstructor = fn(&str, &Path) -> Result<Box<dyn Backend>>;

/// Kind name → constructor table
#[derive(Debug, Clone, Default)]
pub struct BackendRegistry {
    constructors: BTreeMap<&'static str, BackendConstructor>,
}

impl BackendRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in `sqlite` and `xml` backends
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(SqliteBackend::KIND, sqlite_backend);
        registry.register(XmlBackend::KIND, xml_backend);
        registry
    }

    /// Register (or replace) a constructor
    pub fn register(&mut self, kind: &'static str, constructor: BackendConstructor) {
        self.constructors.insert(kind, constructor);
    }

    /// Build a backend of the given kind
    pub fn create(&self, kind: &str, repository: &str, cache_dir: &Path) -> Result<Box<dyn Backend>> {
        let constructor = self
            .constructors
            .get(kind)
            .ok_or_else(|| Error::UnknownBackend(kind.to_string()))?;
        constructor(repository, cache_dir)
    }

    /// Registered kind names, sorted
    pub fn kinds(&self) -> Vec<&'static str> {
        self.constructors.keys().copied().collect()
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.constructors.contains_key(kind)
    }
}

fn sqlite_backend(repository: &str, cache_dir: &Path) -> Result<Box<dyn Backend>> {
    Ok(Box::new(SqliteBackend::new(repository, cache_dir)))
}

fn xml_backend(repository: &str, cache_dir: &Path) -> Result<Box<dyn Backend>> {
    Ok(Box::new(XmlBackend::new(repository, cache_dir)))
}

static REGISTRY: OnceLock<BackendRegistry> = OnceLock::new();

/// Install the process-wide registry
///
/// Must run before the first call to [`registry`]; fails afterwards.
pub fn install_registry(registry: BackendRegistry) -> Result<()> {
    REGISTRY
        .set(registry)
        .map_err(|_| Error::InitError("backend registry already installed".to_string()))
}

/// The process-wide registry, installing the defaults if none was installed
pub fn registry() -> &'static BackendRegistry {
    REGISTRY.get_or_init(BackendRegistry::with_defaults)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_kinds() {
        let registry = BackendRegistry::with_defaults();
        assert_eq!(registry.kinds(), vec!["sqlite", "xml"]);
        assert!(registry.contains("xml"));
        assert!(!registry.contains("RepositoryXMLBackend"));
    }

    #[test]
    fn test_create_reports_data_types() {
        let dir = tempdir().unwrap();
        let registry = BackendRegistry::with_defaults();

        let sqlite = registry.create("sqlite", "base", dir.path()).unwrap();
        assert_eq!(sqlite.yum_data_type(), "primary_db");
        assert_eq!(sqlite.kind(), "sqlite");

        let xml = registry.create("xml", "base", dir.path()).unwrap();
        assert_eq!(xml.yum_data_type(), "primary");
        assert!(!xml.has_db());
    }

    #[test]
    fn test_unknown_kind() {
        let dir = tempdir().unwrap();
        let err = BackendRegistry::new().create("sqlite", "base", dir.path()).err().unwrap();
        assert!(matches!(err, Error::UnknownBackend(_)));
    }

    #[test]
    fn test_global_registry_is_stable() {
        let first = registry() as *const BackendRegistry;
        let second = registry() as *const BackendRegistry;
        assert_eq!(first, second);
        assert!(install_registry(BackendRegistry::new()).is_err());
    }
}
