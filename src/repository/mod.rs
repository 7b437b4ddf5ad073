// src/repository/mod.rs

//! Repository management and catalog synchronization
//!
//! This module provides functionality for:
//! - Fetching repository metadata over HTTP(S) or from the local filesystem
//! - Resolving a backend's catalog artifact through repomd.xml
//! - Refreshing, verifying and loading the cached catalog
//! - Querying the active backend for packages

pub mod backend;
pub mod registry;
pub mod repomd;
pub mod sqlite;
pub mod xml;

pub use backend::Backend;
pub use registry::{BackendConstructor, BackendRegistry, install_registry, registry};
pub use repomd::{Checksum, RepoMd, RepoMdData};
pub use sqlite::SqliteBackend;
pub use xml::XmlBackend;

use crate::error::{Error, Result};
use crate::packages::{Package, Requires};
use reqwest::blocking::Client;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use url::Url;

/// Default timeout for HTTP requests (30 seconds)
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Name of the cached repository index
pub const REPOMD_FILE: &str = "repomd.xml";

/// Location of the repository index relative to the base URL
const REPOMD_PATH: &str = "repodata/repomd.xml";

/// Where a URL points to
enum Source<'a> {
    Remote(&'a str),
    Local(PathBuf),
}

impl<'a> Source<'a> {
    /// `file://` URLs are percent-decoded into a local path
    fn of(url: &'a str) -> Result<Self> {
        if url.starts_with("http://") || url.starts_with("https://") {
            Ok(Source::Remote(url))
        } else if url.starts_with("file://") {
            let path = Url::parse(url)
                .ok()
                .and_then(|u| u.to_file_path().ok())
                .ok_or_else(|| Error::DownloadError(format!("Invalid file URL: {}", url)))?;
            Ok(Source::Local(path))
        } else {
            Ok(Source::Local(PathBuf::from(url)))
        }
    }
}

/// Fetch client for repository metadata
///
/// HTTP(S) URLs go through a blocking reqwest client; `file://` URLs and
/// bare paths are read from disk. A fetch either succeeds or fails, there
/// is no retry.
pub struct RepositoryClient {
    client: Client,
}

impl RepositoryClient {
    /// Create a new repository client
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::InitError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Stream the content at `url` into `dst`, returning bytes written
    pub fn download_to<W: Write>(&self, url: &str, dst: &mut W) -> Result<u64> {
        match Source::of(url)? {
            Source::Remote(url) => {
                let mut response = self
                    .client
                    .get(url)
                    .send()
                    .map_err(|e| Error::DownloadError(format!("Failed to download {}: {}", url, e)))?;

                if !response.status().is_success() {
                    return Err(Error::DownloadError(format!(
                        "HTTP {} from {}",
                        response.status(),
                        url
                    )));
                }

                io::copy(&mut response, dst)
                    .map_err(|e| Error::DownloadError(format!("Failed to read {}: {}", url, e)))
            }
            Source::Local(path) => {
                let mut file = File::open(&path).map_err(|e| {
                    Error::DownloadError(format!("Failed to open {}: {}", path.display(), e))
                })?;
                io::copy(&mut file, dst).map_err(|e| {
                    Error::IoError(format!("Failed to copy {}: {}", path.display(), e))
                })
            }
        }
    }

    /// Fetch the whole content at `url`
    pub fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.download_to(url, &mut buf)?;
        Ok(buf)
    }

    /// Download `url` to `dest_path`
    ///
    /// The content lands in a temporary sibling first and is renamed into
    /// place once complete, so a failed download never leaves a truncated
    /// file at `dest_path`.
    pub fn download_file(&self, url: &str, dest_path: &Path) -> Result<()> {
        info!("Downloading {} to {}", url, dest_path.display());

        let parent = dest_path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent).map_err(|e| {
            Error::IoError(format!("Failed to create directory {}: {}", parent.display(), e))
        })?;

        let mut temp = NamedTempFile::new_in(parent).map_err(|e| {
            Error::IoError(format!("Failed to create temporary file in {}: {}", parent.display(), e))
        })?;

        let written = self.download_to(url, temp.as_file_mut())?;
        temp.as_file().sync_all()?;

        temp.persist(dest_path).map_err(|e| {
            Error::IoError(format!("Failed to move download to {}: {}", dest_path.display(), e.error))
        })?;

        debug!("Downloaded {} bytes to {}", written, dest_path.display());
        Ok(())
    }
}

/// A yum repository backed by one catalog backend
pub struct Repository {
    name: String,
    base_url: String,
    cache_dir: PathBuf,
    backend: Box<dyn Backend>,
}

impl Repository {
    /// Create a repository around an already-built backend
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        cache_dir: impl Into<PathBuf>,
        backend: Box<dyn Backend>,
    ) -> Result<Self> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir).map_err(|e| {
            Error::InitError(format!(
                "Failed to create cache directory {}: {}",
                cache_dir.display(),
                e
            ))
        })?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into(),
            cache_dir,
            backend,
        })
    }

    /// Create a repository with a backend from the process-wide registry
    pub fn with_kind(name: &str, base_url: &str, cache_dir: &Path, kind: &str) -> Result<Self> {
        let backend = registry().create(kind, name, cache_dir)?;
        Self::new(name, base_url, cache_dir, backend)
    }

    /// Set up a repository with the first backend kind that loads
    ///
    /// Each kind is tried in order; failures are logged and the next kind
    /// is tried. When every kind fails the last error is returned.
    pub fn open<S: AsRef<str>>(
        name: &str,
        base_url: &str,
        cache_dir: &Path,
        kinds: &[S],
        check_for_updates: bool,
    ) -> Result<Self> {
        let mut last_error = None;

        for kind in kinds {
            let kind = kind.as_ref();
            let attempt = Self::with_kind(name, base_url, cache_dir, kind).and_then(|mut repo| {
                repo.load(check_for_updates)?;
                Ok(repo)
            });

            match attempt {
                Ok(repo) => {
                    info!("Repository {} ready with {} backend", name, kind);
                    return Ok(repo);
                }
                Err(e) => {
                    warn!("Backend {} failed for repository {}: {}", kind, name, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::InitError(format!("No backend configured for repository {}", name))
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    /// `<base_url>/<href>`
    fn url_for(&self, href: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            href.trim_start_matches('/')
        )
    }

    /// Download URL of a package's RPM file
    pub fn package_url(&self, pkg: &Package) -> String {
        self.url_for(pkg.location())
    }

    fn cached_repomd_path(&self) -> PathBuf {
        self.cache_dir.join(REPOMD_FILE)
    }

    /// Fetch and parse the remote repository index
    fn fetch_repomd(&self) -> Result<(Vec<u8>, RepoMd)> {
        let url = self.url_for(REPOMD_PATH);
        debug!("Fetching repository index from {}", url);

        let raw = RepositoryClient::new()?.fetch_bytes(&url)?;
        let repomd = RepoMd::parse(&raw)?;
        Ok((raw, repomd))
    }

    /// The index cached by the last successful refresh, if readable
    fn cached_repomd(&self) -> Option<RepoMd> {
        let path = self.cached_repomd_path();
        let raw = fs::read(&path).ok()?;
        match RepoMd::parse(&raw) {
            Ok(repomd) => Some(repomd),
            Err(e) => {
                debug!("Ignoring unreadable cached index {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Whether the remote entry for our data type differs from the cached one
    fn is_stale(&self, remote: &RepoMd) -> bool {
        let data_type = self.backend.yum_data_type();
        let cached = self.cached_repomd();
        let cached_entry = cached.as_ref().and_then(|r| r.find(data_type));
        cached_entry.is_none() || cached_entry != remote.find(data_type)
    }

    /// Whether `load(true)` would download a new catalog
    pub fn needs_update(&self) -> Result<bool> {
        if !self.backend.has_db() {
            return Ok(true);
        }
        let (_, remote) = self.fetch_repomd()?;
        Ok(self.is_stale(&remote))
    }

    /// Download the latest catalog and load it
    pub fn refresh(&mut self) -> Result<()> {
        let (raw, repomd) = self.fetch_repomd()?;
        self.refresh_with(&raw, &repomd)
    }

    fn refresh_with(&mut self, raw: &[u8], repomd: &RepoMd) -> Result<()> {
        let data_type = self.backend.yum_data_type();
        let entry = repomd.find(data_type).ok_or_else(|| {
            Error::NotFoundError(format!(
                "Repository {} has no '{}' data in {}",
                self.name, data_type, REPOMD_FILE
            ))
        })?;

        let url = self.url_for(&entry.location);
        info!("Refreshing {} catalog of {} from {}", data_type, self.name, url);
        self.backend.get_latest_db(&url)?;

        if let Some(checksum) = &entry.checksum {
            let artifact = self.backend.artifact_path().to_path_buf();
            if let Err(e) = checksum.verify_file(&artifact) {
                if let Err(close_err) = self.backend.close() {
                    warn!("Failed to close {} backend of {}: {}", data_type, self.name, close_err);
                }
                if let Err(rm_err) = fs::remove_file(&artifact) {
                    warn!("Failed to remove {}: {}", artifact.display(), rm_err);
                }
                return Err(e);
            }
        }

        self.backend.load_db()?;

        fs::write(self.cached_repomd_path(), raw).map_err(|e| {
            Error::IoError(format!(
                "Failed to write {}: {}",
                self.cached_repomd_path().display(),
                e
            ))
        })?;

        Ok(())
    }

    /// Make the repository ready to answer queries
    ///
    /// Refreshes when no catalog is cached, or when `check_for_updates` is
    /// set and the remote index changed; otherwise loads from cache.
    pub fn load(&mut self, check_for_updates: bool) -> Result<()> {
        if !self.backend.has_db() {
            info!("No cached catalog for {}, downloading", self.name);
            return self.refresh();
        }

        if check_for_updates {
            let (raw, remote) = self.fetch_repomd()?;
            if self.is_stale(&remote) {
                info!("Catalog of {} is out of date, downloading", self.name);
                return self.refresh_with(&raw, &remote);
            }
        }

        debug!("Loading catalog of {} from cache", self.name);
        self.backend.load_db()
    }

    pub fn find_latest_matching_name(&self, name: &str, version: &str, release: &str) -> Result<Package> {
        self.backend.find_latest_matching_name(name, version, release)
    }

    pub fn find_latest_matching_require(&self, requirement: &Requires) -> Result<Package> {
        self.backend.find_latest_matching_require(requirement)
    }

    pub fn get_packages(&self) -> Result<Vec<Package>> {
        self.backend.get_packages()
    }

    /// Release the backend's resources
    pub fn close(&mut self) -> Result<()> {
        self.backend.close()
    }
}
