// src/resolver.rs

//! Capability matching and latest-wins selection
//!
//! Backends gather raw candidates; this module decides which of them
//! satisfy a requirement and which one is the latest.

use crate::error::{Error, Result};
use crate::packages::{Package, Provides, Requires, Rpm};
use crate::version::{Flags, RpmVersion, rpmvercmp};
use std::cmp::Ordering;
use tracing::debug;

/// Compare a candidate's EVR against a requirement's EVR
///
/// Only the parts the requirement pins down take part: epoch when the
/// requirement names one, release when both sides carry one.
fn compare_constrained(candidate: &RpmVersion, requirement: &RpmVersion) -> Ordering {
    let epoch = match requirement.epoch {
        Some(epoch) => candidate.epoch_or_zero().cmp(&epoch),
        None => Ordering::Equal,
    };
    epoch
        .then_with(|| rpmvercmp(&candidate.version, &requirement.version))
        .then_with(|| {
            if requirement.release.is_empty() || candidate.release.is_empty() {
                Ordering::Equal
            } else {
                rpmvercmp(&candidate.release, &requirement.release)
            }
        })
}

/// Whether `candidate` satisfies `requirement`
///
/// Names must match exactly. An empty version on either side matches
/// anything; otherwise the requirement's operator (EQ when absent) is
/// applied to the candidate-vs-requirement ordering.
pub fn provide_matches<T: Rpm + ?Sized>(requirement: &Requires, candidate: &T) -> bool {
    if requirement.name() != candidate.name() {
        return false;
    }
    if requirement.version().is_empty() || candidate.version().is_empty() {
        return true;
    }
    let ordering = compare_constrained(candidate.evr(), requirement.evr());
    requirement
        .flags()
        .unwrap_or(Flags::Eq)
        .is_satisfied_by(ordering)
}

/// Pick the latest by EVR; among exact ties the last one wins
pub fn latest<T: Rpm>(candidates: Vec<T>) -> Option<T> {
    let mut sorted = candidates;
    sorted.sort_by(|a, b| a.evr().cmp(b.evr()));
    sorted.pop()
}

/// Select the latest package matching `name` at `version`/`release`
///
/// An empty version matches every candidate of that name.
pub fn latest_matching_name(
    name: &str,
    version: &str,
    release: &str,
    candidates: Vec<Package>,
) -> Result<Package> {
    let requirement = Requires::versioned(name, Flags::Eq, version, release);
    let total = candidates.len();
    let matching: Vec<Package> = candidates
        .into_iter()
        .filter(|pkg| provide_matches(&requirement, pkg))
        .collect();

    debug!(
        "{} of {} candidates match {}",
        matching.len(),
        total,
        requirement
    );

    latest(matching).ok_or_else(|| Error::NoSuchPackage {
        name: name.to_string(),
        version: version.to_string(),
        release: release.to_string(),
    })
}

/// Select the latest capability entry satisfying `requirement`
pub fn latest_matching_provide(requirement: &Requires, candidates: Vec<Provides>) -> Result<Provides> {
    let matching: Vec<Provides> = candidates
        .into_iter()
        .filter(|provide| provide_matches(requirement, provide))
        .collect();

    latest(matching).ok_or_else(|| no_provider(requirement))
}

/// Lookup error for a requirement nobody satisfies
pub fn no_provider(requirement: &Requires) -> Error {
    Error::NoProvider {
        name: requirement.name().to_string(),
        version: requirement.version().to_string(),
        release: requirement.release().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packages::{Identity, PackageBuilder, PackageKey};

    fn package(key: i64, name: &str, version: &str, release: &str) -> Package {
        let identity = Identity::from_columns(name, version, release, "", "").unwrap();
        PackageBuilder::new(PackageKey(key), identity)
            .arch("noarch")
            .build()
    }

    fn provide(name: &str, version: &str, release: &str) -> Provides {
        Provides::new(
            Identity::from_columns(name, version, release, "", "EQ").unwrap(),
            None,
        )
    }

    #[test]
    fn test_eq_matches_only_exact_pair() {
        let req = Requires::versioned("foo", Flags::Eq, "1.2", "3");
        assert!(provide_matches(&req, &package(1, "foo", "1.2", "3")));
        assert!(!provide_matches(&req, &package(2, "foo", "1.2", "4")));
        assert!(!provide_matches(&req, &package(3, "foo", "1.3", "3")));
        assert!(!provide_matches(&req, &package(4, "bar", "1.2", "3")));
    }

    #[test]
    fn test_ge_matches_newer_only() {
        let req = Requires::versioned("foo", Flags::Ge, "1.0", "");
        for v in ["1.0", "1.1", "2.0"] {
            assert!(provide_matches(&req, &provide("foo", v, "1")), "{} should match", v);
        }
        assert!(!provide_matches(&req, &provide("foo", "0.9", "1")));
    }

    #[test]
    fn test_other_operators() {
        let lt = Requires::versioned("foo", Flags::Lt, "2.0", "");
        assert!(provide_matches(&lt, &provide("foo", "1.9", "1")));
        assert!(!provide_matches(&lt, &provide("foo", "2.0", "1")));

        let le = Requires::versioned("foo", Flags::Le, "2.0", "");
        assert!(provide_matches(&le, &provide("foo", "2.0", "5")));
        assert!(!provide_matches(&le, &provide("foo", "2.0.1", "1")));

        let gt = Requires::versioned("foo", Flags::Gt, "2.0", "1");
        assert!(provide_matches(&gt, &provide("foo", "2.0", "2")));
        assert!(!provide_matches(&gt, &provide("foo", "2.0", "1")));
    }

    #[test]
    fn test_empty_version_is_unconstrained() {
        let any = Requires::named("foo");
        assert!(provide_matches(&any, &provide("foo", "0.0.1", "1")));

        // unversioned provide satisfies a versioned requirement
        let req = Requires::versioned("foo", Flags::Ge, "99", "");
        assert!(provide_matches(&req, &provide("foo", "", "")));
    }

    #[test]
    fn test_requirement_epoch_is_compared_when_present() {
        let mut identity = Identity::from_columns("foo", "1.0", "", "2", "GE").unwrap();
        let req = Requires::new(identity.clone(), false);
        assert!(!provide_matches(&req, &provide("foo", "5.0", "1")));

        identity.evr.epoch = None;
        let req = Requires::new(identity, false);
        assert!(provide_matches(&req, &provide("foo", "5.0", "1")));
    }

    #[test]
    fn test_unpinned_release_and_epoch_are_ignored() {
        let req = Requires::versioned("foo", Flags::Eq, "1.2", "3");

        // provide without a release matches on version alone
        assert!(provide_matches(&req, &provide("foo", "1.2", "")));

        // requirement without an epoch accepts any candidate epoch
        let epoch5 = Provides::new(
            Identity::from_columns("foo", "1.2", "3", "5", "EQ").unwrap(),
            None,
        );
        assert!(provide_matches(&req, &epoch5));
    }

    #[test]
    fn test_latest_matching_name_picks_highest() {
        let candidates = vec![
            package(1, "foo", "1.0", "1"),
            package(2, "foo", "1.2", "1"),
            package(3, "foo", "1.1", "3"),
        ];
        let pkg = latest_matching_name("foo", "", "", candidates).unwrap();
        assert_eq!(pkg.rpm_name(), "foo-1.2-1");
    }

    #[test]
    fn test_latest_matching_name_with_version() {
        let candidates = vec![
            package(1, "foo", "1.0", "1"),
            package(2, "foo", "1.0", "2"),
            package(3, "foo", "1.1", "1"),
        ];
        let pkg = latest_matching_name("foo", "1.0", "", candidates).unwrap();
        assert_eq!(pkg.rpm_name(), "foo-1.0-2");
    }

    #[test]
    fn test_not_found_names_request() {
        let err = latest_matching_name("doesnotexist", "1.0", "2", Vec::new()).unwrap_err();
        match err {
            Error::NoSuchPackage {
                name,
                version,
                release,
            } => {
                assert_eq!(name, "doesnotexist");
                assert_eq!(version, "1.0");
                assert_eq!(release, "2");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_latest_matching_provide() {
        let req = Requires::versioned("libfoo", Flags::Lt, "3", "");
        let candidates = vec![provide("libfoo", "1", "1"), provide("libfoo", "2", "1"), provide("libfoo", "3", "1")];
        let winner = latest_matching_provide(&req, candidates).unwrap();
        assert_eq!(winner.version(), "2");

        let err = latest_matching_provide(&req, vec![provide("libfoo", "4", "1")]).unwrap_err();
        assert!(matches!(err, Error::NoProvider { .. }));
    }

    #[test]
    fn test_exact_tie_keeps_last() {
        let a = package(1, "foo", "1.0", "1");
        let b = package(2, "foo", "1.0", "1");
        let winner = latest(vec![a, b]).unwrap();
        assert_eq!(winner.key(), PackageKey(2));
    }
}
