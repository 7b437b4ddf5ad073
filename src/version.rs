// src/version.rs

//! RPM version ordering
//!
//! Implements the rpmvercmp algorithm used to order epoch, version and
//! release strings, plus the comparison operators (flags) carried by
//! provides and requires entries.
//!
//! See https://fedoraproject.org/wiki/Archive:Tools/RPM/VersionComparison

use crate::error::{Error, Result};
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Comparison operator of a capability entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Flags {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Flags {
    pub fn as_str(&self) -> &'static str {
        match self {
            Flags::Eq => "EQ",
            Flags::Lt => "LT",
            Flags::Le => "LE",
            Flags::Gt => "GT",
            Flags::Ge => "GE",
        }
    }

    /// Operator symbol as written in RPM dependency strings (`>=`, `=`, ...)
    pub fn symbol(&self) -> &'static str {
        match self {
            Flags::Eq => "=",
            Flags::Lt => "<",
            Flags::Le => "<=",
            Flags::Gt => ">",
            Flags::Ge => ">=",
        }
    }

    /// Whether `ordering` (candidate compared to requirement) satisfies this operator
    pub fn is_satisfied_by(&self, ordering: Ordering) -> bool {
        match self {
            Flags::Eq => ordering == Ordering::Equal,
            Flags::Lt => ordering == Ordering::Less,
            Flags::Le => ordering != Ordering::Greater,
            Flags::Gt => ordering == Ordering::Greater,
            Flags::Ge => ordering != Ordering::Less,
        }
    }

    /// Parse an optional flags column; empty means "no operator"
    pub fn parse_optional(s: &str) -> Result<Option<Self>> {
        if s.is_empty() {
            Ok(None)
        } else {
            s.parse().map(Some)
        }
    }
}

impl FromStr for Flags {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "EQ" => Ok(Flags::Eq),
            "LT" => Ok(Flags::Lt),
            "LE" => Ok(Flags::Le),
            "GT" => Ok(Flags::Gt),
            "GE" => Ok(Flags::Ge),
            _ => Err(Error::ParseError(format!("Invalid flags: {:?}", s))),
        }
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Epoch, version and release of a package or capability
///
/// Ordering compares epoch (absent = 0), then version, then release, each
/// with [`rpmvercmp`]. An empty version or release is just the empty
/// string here; "unconstrained" semantics live in the resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct RpmVersion {
    pub epoch: Option<u32>,
    pub version: String,
    pub release: String,
}

impl RpmVersion {
    pub fn new(epoch: Option<u32>, version: impl Into<String>, release: impl Into<String>) -> Self {
        Self {
            epoch,
            version: version.into(),
            release: release.into(),
        }
    }

    /// Parse an `[epoch:]version[-release]` string
    pub fn parse(s: &str) -> Result<Self> {
        let (epoch, rest) = match s.split_once(':') {
            Some((e, rest)) => (parse_epoch(e)?, rest),
            None => (None, s),
        };
        let (version, release) = match rest.rsplit_once('-') {
            Some((v, r)) => (v, r),
            None => (rest, ""),
        };
        Ok(Self::new(epoch, version, release))
    }

    pub fn epoch_or_zero(&self) -> u32 {
        self.epoch.unwrap_or(0)
    }
}

impl Ord for RpmVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch_or_zero()
            .cmp(&other.epoch_or_zero())
            .then_with(|| rpmvercmp(&self.version, &other.version))
            .then_with(|| rpmvercmp(&self.release, &other.release))
    }
}

impl PartialOrd for RpmVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for RpmVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(epoch) = self.epoch {
            write!(f, "{}:", epoch)?;
        }
        f.write_str(&self.version)?;
        if !self.release.is_empty() {
            write!(f, "-{}", self.release)?;
        }
        Ok(())
    }
}

/// Parse an epoch column: empty is absent, anything else must be numeric
pub fn parse_epoch(s: &str) -> Result<Option<u32>> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }
    s.parse::<u32>()
        .map(Some)
        .map_err(|e| Error::ParseError(format!("Invalid epoch {:?}: {}", s, e)))
}

fn is_separator(b: u8) -> bool {
    !b.is_ascii_alphanumeric() && b != b'~' && b != b'^'
}

/// Compare two version (or release) strings the way rpm does
pub fn rpmvercmp(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }

    let mut one = a.as_bytes();
    let mut two = b.as_bytes();

    loop {
        while let Some((&c, rest)) = one.split_first() {
            if !is_separator(c) {
                break;
            }
            one = rest;
        }
        while let Some((&c, rest)) = two.split_first() {
            if !is_separator(c) {
                break;
            }
            two = rest;
        }

        // Tilde sorts before everything, even the end of the string
        if one.first() == Some(&b'~') || two.first() == Some(&b'~') {
            if one.first() != Some(&b'~') {
                return Ordering::Greater;
            }
            if two.first() != Some(&b'~') {
                return Ordering::Less;
            }
            one = &one[1..];
            two = &two[1..];
            continue;
        }

        // Caret sorts after the end of the string but before anything else
        if one.first() == Some(&b'^') || two.first() == Some(&b'^') {
            if one.is_empty() {
                return Ordering::Less;
            }
            if two.is_empty() {
                return Ordering::Greater;
            }
            if one.first() != Some(&b'^') {
                return Ordering::Greater;
            }
            if two.first() != Some(&b'^') {
                return Ordering::Less;
            }
            one = &one[1..];
            two = &two[1..];
            continue;
        }

        if one.is_empty() || two.is_empty() {
            break;
        }

        let numeric = one[0].is_ascii_digit();
        let segment = |s: &[u8]| -> usize {
            s.iter()
                .take_while(|c| {
                    if numeric {
                        c.is_ascii_digit()
                    } else {
                        c.is_ascii_alphabetic()
                    }
                })
                .count()
        };
        let len_one = segment(one);
        let len_two = segment(two);
        let (seg_one, rest_one) = one.split_at(len_one);
        let (seg_two, rest_two) = two.split_at(len_two);

        // Segments of different types: numeric is newer
        if seg_two.is_empty() {
            return if numeric {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }

        let ordering = if numeric {
            let trim = |s: &[u8]| -> usize { s.iter().take_while(|&&c| c == b'0').count() };
            let seg_one = &seg_one[trim(seg_one)..];
            let seg_two = &seg_two[trim(seg_two)..];
            seg_one
                .len()
                .cmp(&seg_two.len())
                .then_with(|| seg_one.cmp(seg_two))
        } else {
            seg_one.cmp(seg_two)
        };

        if ordering != Ordering::Equal {
            return ordering;
        }

        one = rest_one;
        two = rest_two;
    }

    match (one.is_empty(), two.is_empty()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, _) => Ordering::Greater,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_segments_compare_numerically() {
        assert_eq!(rpmvercmp("1.0.10", "1.0.9"), Ordering::Greater);
        assert_eq!(rpmvercmp("1.0.9", "1.0.10"), Ordering::Less);
        assert_eq!(rpmvercmp("1.001", "1.1"), Ordering::Equal);
        assert_eq!(rpmvercmp("2.0", "2.0"), Ordering::Equal);
    }

    #[test]
    fn test_tilde_marks_prerelease() {
        assert_eq!(rpmvercmp("1.0~rc1", "1.0"), Ordering::Less);
        assert_eq!(rpmvercmp("1.0~rc1", "1.0~rc2"), Ordering::Less);
        assert_eq!(rpmvercmp("1.0~rc1", "1.0~rc1"), Ordering::Equal);
        assert_eq!(rpmvercmp("1.0", "1.0~"), Ordering::Greater);
    }

    #[test]
    fn test_caret_marks_post_release() {
        assert_eq!(rpmvercmp("1.0^git1", "1.0"), Ordering::Greater);
        assert_eq!(rpmvercmp("1.0^git1", "1.0.1"), Ordering::Less);
        assert_eq!(rpmvercmp("1.0^git1", "1.0^git2"), Ordering::Less);
    }

    #[test]
    fn test_alpha_and_numeric_runs() {
        assert_eq!(rpmvercmp("1.0a", "1.0"), Ordering::Greater);
        assert_eq!(rpmvercmp("1.0", "1.0a"), Ordering::Less);
        assert_eq!(rpmvercmp("1a", "1b"), Ordering::Less);
        // numeric beats alphabetic
        assert_eq!(rpmvercmp("1.1", "1.a"), Ordering::Greater);
        assert_eq!(rpmvercmp("1.a", "1.1"), Ordering::Less);
        // separators only delimit
        assert_eq!(rpmvercmp("1_0", "1.0"), Ordering::Equal);
    }

    #[test]
    fn test_empty_string_is_lowest_for_raw_comparison() {
        assert_eq!(rpmvercmp("", "0"), Ordering::Less);
        assert_eq!(rpmvercmp("", ""), Ordering::Equal);
    }

    #[test]
    fn test_epoch_dominates() {
        let old = RpmVersion::new(Some(1), "1.0", "1");
        let new = RpmVersion::new(None, "9.9", "9");
        assert!(old > new);

        let zero = RpmVersion::new(Some(0), "1.0", "1");
        let absent = RpmVersion::new(None, "1.0", "1");
        assert_eq!(zero.cmp(&absent), Ordering::Equal);
    }

    #[test]
    fn test_release_breaks_version_tie() {
        let a = RpmVersion::new(None, "1.2", "1");
        let b = RpmVersion::new(None, "1.2", "10");
        assert!(a < b);
    }

    #[test]
    fn test_parse_evr_string() {
        let v = RpmVersion::parse("2:1.4.5-3.el9").unwrap();
        assert_eq!(v.epoch, Some(2));
        assert_eq!(v.version, "1.4.5");
        assert_eq!(v.release, "3.el9");
        assert_eq!(v.to_string(), "2:1.4.5-3.el9");

        let v = RpmVersion::parse("1.0").unwrap();
        assert_eq!(v.epoch, None);
        assert_eq!(v.release, "");

        assert!(RpmVersion::parse("x:1.0").is_err());
    }

    #[test]
    fn test_flags_parse_and_satisfy() {
        assert_eq!("GE".parse::<Flags>().unwrap(), Flags::Ge);
        assert!("ge".parse::<Flags>().is_err());
        assert_eq!(Flags::parse_optional("").unwrap(), None);

        assert!(Flags::Ge.is_satisfied_by(Ordering::Equal));
        assert!(Flags::Ge.is_satisfied_by(Ordering::Greater));
        assert!(!Flags::Ge.is_satisfied_by(Ordering::Less));
        assert!(Flags::Lt.is_satisfied_by(Ordering::Less));
        assert!(!Flags::Lt.is_satisfied_by(Ordering::Equal));
        assert!(Flags::Le.is_satisfied_by(Ordering::Equal));
        assert!(!Flags::Gt.is_satisfied_by(Ordering::Equal));
        assert!(Flags::Eq.is_satisfied_by(Ordering::Equal));
    }

    #[test]
    fn test_parse_epoch() {
        assert_eq!(parse_epoch("").unwrap(), None);
        assert_eq!(parse_epoch("0").unwrap(), Some(0));
        assert_eq!(parse_epoch("12").unwrap(), Some(12));
        assert!(parse_epoch("abc").is_err());
    }
}
