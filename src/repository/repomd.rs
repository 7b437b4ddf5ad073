// src/repository/repomd.rs

//! repomd.xml repository index
//!
//! Lists the catalog artifacts of a repository by data type ("primary",
//! "primary_db", "filelists", ...) with their location and checksum.

use crate::error::{Error, Result};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use sha2::{Digest, Sha256, Sha512};
use std::fs::File;
use std::io;
use std::path::Path;
use tracing::debug;

/// Checksum of an artifact as recorded in repomd.xml
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checksum {
    /// Algorithm name ("sha256", "sha512", "sha", ...)
    pub kind: String,
    /// Lowercase hex digest
    pub value: String,
}

impl Checksum {
    /// Verify a file against this checksum
    ///
    /// Returns `Ok(false)` when the algorithm is not supported and the file
    /// was not checked.
    pub fn verify_file(&self, path: &Path) -> Result<bool> {
        let actual = match self.kind.as_str() {
            "sha256" => hex_digest::<Sha256>(path)?,
            "sha512" => hex_digest::<Sha512>(path)?,
            other => {
                debug!("Skipping unsupported checksum type '{}' for {}", other, path.display());
                return Ok(false);
            }
        };

        if !actual.eq_ignore_ascii_case(&self.value) {
            return Err(Error::ChecksumMismatch {
                expected: self.value.clone(),
                actual,
            });
        }

        debug!("Checksum verified: {}", self.value);
        Ok(true)
    }
}

fn hex_digest<D: Digest + io::Write>(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .map_err(|e| Error::IoError(format!("Failed to open file for checksum: {}", e)))?;

    let mut hasher = D::new();
    io::copy(&mut file, &mut hasher)
        .map_err(|e| Error::IoError(format!("Failed to read file for checksum: {}", e)))?;

    Ok(hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect())
}

/// One `<data>` entry of repomd.xml
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoMdData {
    pub data_type: String,
    /// Path relative to the repository base URL
    pub location: String,
    pub checksum: Option<Checksum>,
    pub timestamp: Option<i64>,
}

/// Parsed repomd.xml
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoMd {
    pub revision: Option<String>,
    pub data: Vec<RepoMdData>,
}

#[derive(Default)]
struct DataBuilder {
    data_type: String,
    location: Option<String>,
    checksum_type: Option<String>,
    checksum: Option<String>,
    timestamp: Option<String>,
}

impl DataBuilder {
    fn build(self) -> Result<RepoMdData> {
        let location = self.location.ok_or_else(|| {
            Error::ParseError(format!("repomd.xml: data '{}' has no location", self.data_type))
        })?;

        let checksum = match (self.checksum_type, self.checksum) {
            (Some(kind), Some(value)) => Some(Checksum {
                kind,
                value: value.trim().to_ascii_lowercase(),
            }),
            _ => None,
        };

        let timestamp = match self.timestamp {
            Some(ts) => Some(ts.trim().split('.').next().unwrap_or_default().parse().map_err(
                |e| Error::ParseError(format!("repomd.xml: invalid timestamp {:?}: {}", ts, e)),
            )?),
            None => None,
        };

        Ok(RepoMdData {
            data_type: self.data_type,
            location,
            checksum,
            timestamp,
        })
    }
}

fn attribute(e: &BytesStart, name: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(|e| Error::ParseError(format!("repomd.xml: {}", e)))?;
        if attr.key.as_ref() == name {
            let value = attr
                .unescape_value()
                .map_err(|e| Error::ParseError(format!("repomd.xml: {}", e)))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    None,
    Revision,
    Checksum,
    Timestamp,
}

impl RepoMd {
    /// Parse a repomd.xml document
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(bytes);
        reader.trim_text(true);

        let mut repomd = RepoMd::default();
        let mut buf = Vec::new();
        let mut current: Option<DataBuilder> = None;
        let mut field = Field::None;
        let mut seen_root = false;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.local_name().as_ref() {
                    b"repomd" => seen_root = true,
                    b"revision" => field = Field::Revision,
                    b"data" => {
                        current = Some(DataBuilder {
                            data_type: attribute(&e, b"type")?.unwrap_or_default(),
                            ..Default::default()
                        });
                    }
                    b"checksum" if current.is_some() => {
                        if let Some(data) = current.as_mut() {
                            data.checksum_type = attribute(&e, b"type")?;
                        }
                        field = Field::Checksum;
                    }
                    b"timestamp" if current.is_some() => field = Field::Timestamp,
                    b"location" => {
                        if let Some(data) = current.as_mut() {
                            data.location = attribute(&e, b"href")?;
                        }
                    }
                    _ => field = Field::None,
                },
                Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                    b"repomd" => seen_root = true,
                    b"location" => {
                        if let Some(data) = current.as_mut() {
                            data.location = attribute(&e, b"href")?;
                        }
                    }
                    _ => {}
                },
                Ok(Event::Text(e)) => {
                    let text = e
                        .unescape()
                        .map_err(|e| Error::ParseError(format!("repomd.xml: {}", e)))?
                        .into_owned();
                    match (field, current.as_mut()) {
                        (Field::Revision, _) => repomd.revision = Some(text),
                        (Field::Checksum, Some(data)) => data.checksum = Some(text),
                        (Field::Timestamp, Some(data)) => data.timestamp = Some(text),
                        _ => {}
                    }
                }
                Ok(Event::End(e)) => {
                    field = Field::None;
                    if e.local_name().as_ref() == b"data" {
                        if let Some(data) = current.take() {
                            repomd.data.push(data.build()?);
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::ParseError(format!(
                        "Failed to parse repomd.xml: {}",
                        e
                    )));
                }
                _ => {}
            }
            buf.clear();
        }

        if !seen_root {
            return Err(Error::ParseError(
                "repomd.xml: missing <repomd> root element".to_string(),
            ));
        }

        Ok(repomd)
    }

    /// Find the entry for a data type (exact match)
    pub fn find(&self, data_type: &str) -> Option<&RepoMdData> {
        self.data.iter().find(|d| d.data_type == data_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    const REPOMD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<repomd xmlns="http://linux.duke.edu/metadata/repo" xmlns:rpm="http://linux.duke.edu/metadata/rpm">
  <revision>1700000000</revision>
  <data type="primary">
    <checksum type="sha256">ABCDEF</checksum>
    <open-checksum type="sha256">0123</open-checksum>
    <location href="repodata/abcdef-primary.xml.gz"/>
    <timestamp>1700000000</timestamp>
    <size>1234</size>
  </data>
  <data type="primary_db">
    <checksum type="sha">99</checksum>
    <location href="repodata/99-primary.sqlite.bz2"/>
    <timestamp>1700000001.5</timestamp>
    <database_version>10</database_version>
  </data>
</repomd>
"#;

    #[test]
    fn test_parse_repomd() {
        let repomd = RepoMd::parse(REPOMD.as_bytes()).unwrap();
        assert_eq!(repomd.revision.as_deref(), Some("1700000000"));
        assert_eq!(repomd.data.len(), 2);

        let primary = repomd.find("primary").unwrap();
        assert_eq!(primary.location, "repodata/abcdef-primary.xml.gz");
        let checksum = primary.checksum.as_ref().unwrap();
        assert_eq!(checksum.kind, "sha256");
        assert_eq!(checksum.value, "abcdef");
        assert_eq!(primary.timestamp, Some(1700000000));

        let db = repomd.find("primary_db").unwrap();
        assert_eq!(db.location, "repodata/99-primary.sqlite.bz2");
        assert_eq!(db.timestamp, Some(1700000001));

        assert!(repomd.find("Primary").is_none());
        assert!(repomd.find("filelists").is_none());
    }

    #[test]
    fn test_parse_rejects_non_repomd() {
        assert!(RepoMd::parse(b"<html><body/></html>").is_err());
        assert!(RepoMd::parse(b"<repomd><data type=\"primary\"></data></repomd>").is_err());
    }

    #[test]
    fn test_checksum_verification() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"abc").unwrap();

        let good = Checksum {
            kind: "sha256".to_string(),
            value: "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad".to_string(),
        };
        assert!(good.verify_file(file.path()).unwrap());

        let bad = Checksum {
            kind: "sha256".to_string(),
            value: "00".to_string(),
        };
        assert!(matches!(
            bad.verify_file(file.path()).unwrap_err(),
            Error::ChecksumMismatch { .. }
        ));

        let unsupported = Checksum {
            kind: "md5".to_string(),
            value: "00".to_string(),
        };
        assert!(!unsupported.verify_file(file.path()).unwrap());
    }
}
