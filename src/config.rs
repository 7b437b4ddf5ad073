// src/config.rs

//! Installer configuration
//!
//! There are no config files: settings come from command-line flags and
//! the `MYSITEROOT` environment variable, on top of per-experiment presets.

use crate::error::{Error, Result};
use crate::repository::registry;
use clap::ValueEnum;
use std::fmt;
use std::path::{Path, PathBuf};

/// Environment variable naming the installation root
pub const SITEROOT_ENV: &str = "MYSITEROOT";

/// Backend kinds tried in order when none are configured
pub const DEFAULT_BACKENDS: &[&str] = &["sqlite", "xml"];

/// Cache location below the site root
const CACHE_SUBDIR: &str = "var/cache/yum";

/// Configuration preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ConfigType {
    #[default]
    Lhcb,
    Atlas,
}

impl ConfigType {
    /// Repository base URL used when none is given
    pub fn default_repo_url(self) -> &'static str {
        match self {
            ConfigType::Lhcb => "http://test-lbrpm.web.cern.ch/test-lbrpm",
            ConfigType::Atlas => {
                "http://atlas-computing.web.cern.ch/atlas-computing/links/reposDirectory/lcg/slc6/yum/"
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConfigType::Lhcb => "lhcb",
            ConfigType::Atlas => "atlas",
        }
    }
}

impl fmt::Display for ConfigType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub config_type: ConfigType,
    /// Installation root; caches live below it
    pub siteroot: PathBuf,
    pub repo_url: String,
    /// Backend kinds, in the order they are tried
    pub backends: Vec<String>,
    pub debug: bool,
}

impl Config {
    /// Build a configuration for a preset
    ///
    /// An explicit `siteroot` wins over `MYSITEROOT`; having neither is an
    /// error.
    pub fn new(config_type: ConfigType, siteroot: Option<PathBuf>) -> Result<Self> {
        let siteroot = siteroot
            .or_else(|| std::env::var_os(SITEROOT_ENV).map(PathBuf::from))
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| {
                Error::InitError(format!(
                    "no site root given and {} is not set",
                    SITEROOT_ENV
                ))
            })?;

        Ok(Self {
            config_type,
            siteroot,
            repo_url: config_type.default_repo_url().to_string(),
            backends: DEFAULT_BACKENDS.iter().map(|s| s.to_string()).collect(),
            debug: false,
        })
    }

    /// Override the repository base URL
    pub fn with_repo_url(mut self, repo_url: impl Into<String>) -> Self {
        self.repo_url = repo_url.into();
        self
    }

    /// Override the backend order; an empty list keeps the defaults
    pub fn with_backends(mut self, backends: Vec<String>) -> Self {
        if !backends.is_empty() {
            self.backends = backends;
        }
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn siteroot(&self) -> &Path {
        &self.siteroot
    }

    /// `<siteroot>/var/cache/yum/<repository>`
    pub fn cache_dir(&self, repository: &str) -> PathBuf {
        self.siteroot.join(CACHE_SUBDIR).join(repository)
    }

    /// Check that every configured backend kind is registered
    pub fn validate(&self) -> Result<()> {
        let registry = registry::registry();
        if let Some(unknown) = self.backends.iter().find(|kind| !registry.contains(kind)) {
            return Err(Error::UnknownBackend(format!(
                "{} (known: {})",
                unknown,
                registry.kinds().join(", ")
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let cfg = Config::new(ConfigType::Lhcb, Some(PathBuf::from("/opt/site"))).unwrap();
        assert_eq!(cfg.repo_url, "http://test-lbrpm.web.cern.ch/test-lbrpm");
        assert_eq!(cfg.backends, vec!["sqlite", "xml"]);
        assert_eq!(cfg.cache_dir("lhcb"), PathBuf::from("/opt/site/var/cache/yum/lhcb"));

        let cfg = Config::new(ConfigType::Atlas, Some(PathBuf::from("/opt/site"))).unwrap();
        assert!(cfg.repo_url.starts_with("http://atlas-computing.web.cern.ch/"));
        assert_eq!(cfg.config_type.to_string(), "atlas");
    }

    #[test]
    fn test_overrides() {
        let cfg = Config::new(ConfigType::Lhcb, Some(PathBuf::from("/opt/site")))
            .unwrap()
            .with_repo_url("file:///srv/repo")
            .with_backends(vec!["xml".to_string()])
            .with_debug(true);
        assert_eq!(cfg.repo_url, "file:///srv/repo");
        assert_eq!(cfg.backends, vec!["xml"]);
        assert!(cfg.debug);
        cfg.validate().unwrap();

        let cfg = cfg.with_backends(Vec::new());
        assert_eq!(cfg.backends, vec!["xml"]);
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        let cfg = Config::new(ConfigType::Lhcb, Some(PathBuf::from("/opt/site")))
            .unwrap()
            .with_backends(vec!["sqlite".to_string(), "mysql".to_string()]);
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, Error::UnknownBackend(_)));
        assert!(err.to_string().contains("mysql"));
    }

    #[test]
    fn test_empty_siteroot_is_rejected() {
        let err = Config::new(ConfigType::Lhcb, Some(PathBuf::new())).unwrap_err();
        assert!(matches!(err, Error::InitError(_)));
    }
}
