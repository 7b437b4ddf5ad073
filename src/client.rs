// src/client.rs

//! Multi-repository resolution
//!
//! A `Client` holds repositories in priority order and answers lookups
//! across all of them: misses in one repository are skipped, the latest
//! hit wins, and on an exact tie the earlier repository wins.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::packages::{self, Package, Requires, Rpm};
use crate::repository::Repository;
use std::cmp::Ordering;
use std::collections::VecDeque;
use tracing::{debug, info};

/// Prefix of rpm's internal feature capabilities
const RPMLIB_PREFIX: &str = "rpmlib(";

pub struct Client {
    repositories: Vec<Repository>,
}

impl Client {
    pub fn new(repositories: Vec<Repository>) -> Self {
        Self { repositories }
    }

    /// Open the configured repository with the configured backends
    pub fn from_config(config: &Config, name: &str, check_for_updates: bool) -> Result<Self> {
        config.validate()?;
        let repo = Repository::open(
            name,
            &config.repo_url,
            &config.cache_dir(name),
            &config.backends,
            check_for_updates,
        )?;
        Ok(Self::new(vec![repo]))
    }

    pub fn add_repository(&mut self, repo: Repository) {
        self.repositories.push(repo);
    }

    pub fn repositories(&self) -> &[Repository] {
        &self.repositories
    }

    pub fn repository(&self, name: &str) -> Option<&Repository> {
        self.repositories.iter().find(|r| r.name() == name)
    }

    /// Run a lookup on every repository and keep the latest hit
    fn latest_across<F>(&self, miss: impl FnOnce() -> Error, lookup: F) -> Result<Package>
    where
        F: Fn(&Repository) -> Result<Package>,
    {
        let mut best: Option<Package> = None;

        for repo in &self.repositories {
            match lookup(repo) {
                Ok(pkg) => {
                    debug!("repository {} offers {}", repo.name(), pkg);
                    let newer = best
                        .as_ref()
                        .is_none_or(|b| pkg.evr().cmp(b.evr()) == Ordering::Greater);
                    if newer {
                        best = Some(pkg);
                    }
                }
                Err(e) if e.is_not_found() => {
                    debug!("repository {}: {}", repo.name(), e);
                }
                Err(e) => return Err(e),
            }
        }

        best.ok_or_else(miss)
    }

    /// Latest package named `name` across all repositories
    pub fn find_latest_matching_name(&self, name: &str, version: &str, release: &str) -> Result<Package> {
        self.latest_across(
            || Error::NoSuchPackage {
                name: name.to_string(),
                version: version.to_string(),
                release: release.to_string(),
            },
            |repo| repo.find_latest_matching_name(name, version, release),
        )
    }

    /// Latest package providing `requirement` across all repositories
    pub fn find_latest_matching_require(&self, requirement: &Requires) -> Result<Package> {
        self.latest_across(
            || crate::resolver::no_provider(requirement),
            |repo| repo.find_latest_matching_require(requirement),
        )
    }

    /// Every package of every repository, in repository order
    pub fn list_packages(&self) -> Result<Vec<Package>> {
        let mut all = Vec::new();
        for repo in &self.repositories {
            all.extend(repo.get_packages()?);
        }
        Ok(all)
    }

    /// Packages needed to install `pkg`, transitively
    ///
    /// `pkg` itself is not part of the result. rpmlib features and
    /// ignore-listed capabilities are skipped, as are requirements already
    /// met by `pkg` or by a package selected earlier. Packages come back in
    /// the order they were discovered.
    pub fn required_packages(&self, pkg: &Package) -> Result<Vec<Package>> {
        let mut selected: Vec<Package> = Vec::new();
        let mut queue: VecDeque<Package> = VecDeque::from([pkg.clone()]);

        while let Some(current) = queue.pop_front() {
            for requirement in current.requires() {
                let name = requirement.name();
                if name.starts_with(RPMLIB_PREFIX) || packages::is_ignored(name) {
                    continue;
                }

                let satisfied = std::iter::once(pkg)
                    .chain(selected.iter())
                    .any(|p| satisfies(p, requirement));
                if satisfied {
                    continue;
                }

                let provider = self.find_latest_matching_require(requirement)?;
                if provider.same_identity(pkg) || selected.iter().any(|p| p.same_identity(&provider)) {
                    continue;
                }

                debug!("{} requires {} -> {}", current, requirement, provider);
                selected.push(provider.clone());
                queue.push_back(provider);
            }
        }

        info!("{} requires {} package(s)", pkg, selected.len());
        Ok(selected)
    }

    /// Download URL of a package, through the repository it came from
    pub fn package_url(&self, pkg: &Package) -> Result<String> {
        self.repository(pkg.repository())
            .map(|repo| repo.package_url(pkg))
            .ok_or_else(|| {
                Error::NotFoundError(format!(
                    "repository {:?} of package {}",
                    pkg.repository(),
                    pkg
                ))
            })
    }

    /// Release every repository's backend
    pub fn close(&mut self) -> Result<()> {
        for repo in &mut self.repositories {
            repo.close()?;
        }
        Ok(())
    }
}

/// Whether `pkg` itself or one of its provides satisfies `requirement`
fn satisfies(pkg: &Package, requirement: &Requires) -> bool {
    crate::resolver::provide_matches(requirement, pkg)
        || pkg
            .provides()
            .iter()
            .any(|provide| crate::resolver::provide_matches(requirement, provide))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{Backend, XmlBackend};
    use crate::version::Flags;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn xml_repo(dir: &Path, name: &str, body: &str) -> Repository {
        let cache = dir.join(name);
        fs::create_dir_all(&cache).unwrap();
        fs::write(
            cache.join("primary.xml.gz"),
            format!(
                "<metadata xmlns:rpm=\"http://linux.duke.edu/metadata/rpm\">{}</metadata>",
                body
            ),
        )
        .unwrap();

        let mut backend = XmlBackend::new(name, &cache);
        backend.load_db().unwrap();
        Repository::new(name, format!("http://example.com/{}", name), cache, Box::new(backend)).unwrap()
    }

    fn pkg_xml(name: &str, ver: &str, provides: &str, requires: &str) -> String {
        format!(
            "<package><name>{name}</name><arch>noarch</arch>\
             <version epoch=\"0\" ver=\"{ver}\" rel=\"1\"/>\
             <location href=\"Packages/{name}-{ver}-1.noarch.rpm\"/>\
             <format><rpm:provides><rpm:entry name=\"{name}\" flags=\"EQ\" epoch=\"0\" ver=\"{ver}\" rel=\"1\"/>{provides}</rpm:provides><rpm:requires>{requires}</rpm:requires></format>\
             </package>"
        )
    }

    fn client(dir: &Path) -> Client {
        let base = [
            pkg_xml("app", "1.0", "", "<rpm:entry name=\"libx\"/><rpm:entry name=\"rpmlib(PayloadIsXz)\"/><rpm:entry name=\"/bin/sh\"/>"),
            pkg_xml("x", "1.0", "<rpm:entry name=\"libx\"/>", "<rpm:entry name=\"y\" flags=\"GE\" ver=\"2.0\"/>"),
            pkg_xml("y", "2.0", "", "<rpm:entry name=\"x\"/>"),
        ]
        .concat();
        let updates = [pkg_xml("y", "2.1", "", ""), pkg_xml("x", "1.0", "<rpm:entry name=\"libx\"/>", "")].concat();

        Client::new(vec![
            xml_repo(dir, "base", &base),
            xml_repo(dir, "updates", &updates),
        ])
    }

    #[test]
    fn test_latest_across_repositories() {
        let dir = tempdir().unwrap();
        let client = client(dir.path());

        let y = client.find_latest_matching_name("y", "", "").unwrap();
        assert_eq!(y.rpm_name(), "y-2.1-1");
        assert_eq!(y.repository(), "updates");

        // exact tie: the first repository wins
        let x = client.find_latest_matching_name("x", "", "").unwrap();
        assert_eq!(x.repository(), "base");

        let err = client.find_latest_matching_name("nope", "", "").unwrap_err();
        assert!(err.is_not_found());

        let err = client
            .find_latest_matching_require(&Requires::versioned("y", Flags::Gt, "3", ""))
            .unwrap_err();
        assert!(matches!(err, Error::NoProvider { .. }));
    }

    #[test]
    fn test_required_packages_closure() {
        let dir = tempdir().unwrap();
        let client = client(dir.path());

        let app = client.find_latest_matching_name("app", "", "").unwrap();
        let deps = client.required_packages(&app).unwrap();
        let names: Vec<String> = deps.iter().map(|p| p.rpm_name()).collect();
        assert_eq!(names, vec!["x-1.0-1", "y-2.1-1"]);
    }

    #[test]
    fn test_unresolvable_requirement_fails() {
        let dir = tempdir().unwrap();
        let client = Client::new(vec![xml_repo(
            dir.path(),
            "base",
            &pkg_xml("app", "1.0", "", "<rpm:entry name=\"missing\"/>"),
        )]);

        let app = client.find_latest_matching_name("app", "", "").unwrap();
        let err = client.required_packages(&app).unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_package_url_uses_owning_repository() {
        let dir = tempdir().unwrap();
        let client = client(dir.path());

        let y = client.find_latest_matching_name("y", "", "").unwrap();
        assert_eq!(
            client.package_url(&y).unwrap(),
            "http://example.com/updates/Packages/y-2.1-1.noarch.rpm"
        );
        assert_eq!(client.list_packages().unwrap().len(), 5);
    }
}
