// src/repository/xml.rs

//! XML catalog backend
//!
//! Consumes the `primary` artifact: a gzip-compressed primary.xml listing
//! every package with its provides and requires. The whole document is
//! parsed into an in-memory index keyed by package name and by provided
//! capability name.

use crate::compression;
use crate::error::{Error, Result};
use crate::packages::{self, Identity, Package, PackageBuilder, PackageKey, Provides, Rpm};
use crate::repository::RepositoryClient;
use crate::repository::backend::Backend;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const PRIMARY_COMPRESSED: &str = "primary.xml.gz";

/// Parsed catalog with its lookup indexes
#[derive(Debug, Default)]
struct Catalog {
    packages: Vec<Package>,
    /// Package name → positions in `packages`
    by_name: HashMap<String, Vec<usize>>,
    /// Capability name → provides, ignore-listed names excluded
    provides: HashMap<String, Vec<Provides>>,
}

impl Catalog {
    fn from_packages(packages: Vec<Package>) -> Self {
        let mut by_name: HashMap<String, Vec<usize>> = HashMap::new();
        let mut provides: HashMap<String, Vec<Provides>> = HashMap::new();

        for (idx, pkg) in packages.iter().enumerate() {
            by_name.entry(pkg.name().to_string()).or_default().push(idx);
            for provide in pkg.provides() {
                if packages::is_ignored(provide.name()) {
                    continue;
                }
                provides
                    .entry(provide.name().to_string())
                    .or_default()
                    .push(provide.clone());
            }
        }

        Self {
            packages,
            by_name,
            provides,
        }
    }

    fn get(&self, key: PackageKey) -> Option<&Package> {
        usize::try_from(key.0).ok().and_then(|idx| self.packages.get(idx))
    }
}

/// `rpm:entry` attributes
#[derive(Debug, Default)]
struct EntryAttrs {
    name: String,
    flags: String,
    epoch: String,
    ver: String,
    rel: String,
    pre: String,
}

impl EntryAttrs {
    fn identity(&self) -> Result<Identity> {
        Identity::from_columns(self.name.as_str(), &self.ver, &self.rel, &self.epoch, &self.flags)
    }
}

/// Package being assembled while its element is open
#[derive(Debug, Default)]
struct PackageState {
    name: String,
    arch: String,
    version: EntryAttrs,
    group: String,
    location: String,
    provides: Vec<EntryAttrs>,
    requires: Vec<EntryAttrs>,
}

impl PackageState {
    fn build(self, key: PackageKey, repository: &str) -> Result<Package> {
        if self.name.is_empty() {
            return Err(Error::ParseError(format!(
                "primary.xml: package #{} has no name",
                key.0 + 1
            )));
        }

        let identity = Identity::from_columns(
            self.name,
            &self.version.ver,
            &self.version.rel,
            &self.version.epoch,
            "",
        )?;

        let mut builder = PackageBuilder::new(key, identity)
            .arch(self.arch)
            .group(self.group)
            .location(self.location)
            .repository(repository);

        for entry in &self.provides {
            builder.push_provide(entry.identity()?);
        }
        for entry in &self.requires {
            builder.push_require(entry.identity()?, packages::rpm::parse_pre(&entry.pre));
        }

        Ok(builder.build())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Provides,
    Requires,
    /// conflicts, obsoletes and other entry lists
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextField {
    None,
    Name,
    Arch,
    Group,
}

fn parse_error(e: impl std::fmt::Display) -> Error {
    Error::ParseError(format!("primary.xml: {}", e))
}

fn read_attrs(e: &BytesStart, mut f: impl FnMut(&[u8], String)) -> Result<()> {
    for attr in e.attributes() {
        let attr = attr.map_err(parse_error)?;
        let value = attr.unescape_value().map_err(parse_error)?.into_owned();
        f(attr.key.as_ref(), value);
    }
    Ok(())
}

fn entry_attrs(e: &BytesStart) -> Result<EntryAttrs> {
    let mut entry = EntryAttrs::default();
    read_attrs(e, |key, value| match key {
        b"name" => entry.name = value,
        b"flags" => entry.flags = value,
        b"epoch" => entry.epoch = value,
        b"ver" => entry.ver = value,
        b"rel" => entry.rel = value,
        b"pre" => entry.pre = value,
        _ => {}
    })?;
    Ok(entry)
}

/// Handle an element that carries its data in attributes
fn handle_attr_element(
    e: &BytesStart,
    current: &mut Option<PackageState>,
    section: Section,
) -> Result<()> {
    let Some(pkg) = current.as_mut() else {
        return Ok(());
    };

    match e.local_name().as_ref() {
        b"version" if section == Section::None => pkg.version = entry_attrs(e)?,
        b"location" => read_attrs(e, |key, value| {
            if key == b"href" {
                pkg.location = value;
            }
        })?,
        b"entry" => match section {
            Section::Provides => pkg.provides.push(entry_attrs(e)?),
            Section::Requires => pkg.requires.push(entry_attrs(e)?),
            Section::None | Section::Other => {}
        },
        _ => {}
    }
    Ok(())
}

/// Parse a primary.xml document into packages, in document order
fn parse_primary<R: BufRead>(input: R, repository: &str) -> Result<Vec<Package>> {
    let mut reader = Reader::from_reader(input);
    reader.trim_text(true);

    let mut packages = Vec::new();
    let mut buf = Vec::new();
    let mut current: Option<PackageState> = None;
    let mut section = Section::None;
    let mut field = TextField::None;
    let mut seen_root = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                field = TextField::None;
                match e.local_name().as_ref() {
                    b"metadata" => seen_root = true,
                    b"package" => {
                        current = Some(PackageState::default());
                        section = Section::None;
                    }
                    b"name" if section == Section::None => field = TextField::Name,
                    b"arch" if section == Section::None => field = TextField::Arch,
                    b"group" => field = TextField::Group,
                    b"provides" => section = Section::Provides,
                    b"requires" => section = Section::Requires,
                    b"conflicts" | b"obsoletes" | b"recommends" | b"suggests"
                    | b"supplements" | b"enhances" => section = Section::Other,
                    _ => handle_attr_element(&e, &mut current, section)?,
                }
            }
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"metadata" => seen_root = true,
                _ => handle_attr_element(&e, &mut current, section)?,
            },
            Ok(Event::Text(e)) => {
                if let (Some(pkg), true) = (current.as_mut(), field != TextField::None) {
                    let text = e.unescape().map_err(parse_error)?.into_owned();
                    match field {
                        TextField::Name => pkg.name = text,
                        TextField::Arch => pkg.arch = text,
                        TextField::Group => pkg.group = text,
                        TextField::None => {}
                    }
                }
            }
            Ok(Event::End(e)) => {
                field = TextField::None;
                match e.local_name().as_ref() {
                    b"package" => {
                        if let Some(state) = current.take() {
                            let key = PackageKey(packages.len() as i64);
                            let pkg = state.build(key, repository)?;
                            debug!("(repo={}) added package: {}", repository, pkg);
                            packages.push(pkg);
                        }
                    }
                    b"provides" | b"requires" | b"conflicts" | b"obsoletes" | b"recommends"
                    | b"suggests" | b"supplements" | b"enhances" => section = Section::None,
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::ParseError(format!(
                    "Failed to parse primary.xml at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    if !seen_root {
        return Err(Error::ParseError(
            "primary.xml: missing <metadata> root element".to_string(),
        ));
    }
    if current.is_some() {
        return Err(Error::ParseError(
            "primary.xml: unterminated <package> element".to_string(),
        ));
    }

    Ok(packages)
}

/// Backend over a yum `primary` XML catalog
pub struct XmlBackend {
    repository: String,
    primary_compressed: PathBuf,
    catalog: Option<Catalog>,
}

impl XmlBackend {
    pub const KIND: &'static str = "xml";
    pub const YUM_DATA_TYPE: &'static str = "primary";

    pub fn new(repository: &str, cache_dir: &Path) -> Self {
        Self {
            repository: repository.to_string(),
            primary_compressed: cache_dir.join(PRIMARY_COMPRESSED),
            catalog: None,
        }
    }

    fn catalog(&self) -> Result<&Catalog> {
        self.catalog.as_ref().ok_or_else(|| {
            Error::NotLoaded(format!("xml catalog of repository {}", self.repository))
        })
    }
}

impl Backend for XmlBackend {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn yum_data_type(&self) -> &'static str {
        Self::YUM_DATA_TYPE
    }

    fn artifact_path(&self) -> &Path {
        &self.primary_compressed
    }

    fn get_latest_db(&mut self, url: &str) -> Result<()> {
        RepositoryClient::new()?.download_file(url, &self.primary_compressed)
    }

    fn load_db(&mut self) -> Result<()> {
        if !self.has_db() {
            return Err(Error::DatabaseNotFound(
                self.primary_compressed.display().to_string(),
            ));
        }

        debug!("start parsing metadata XML file... ({})", self.primary_compressed.display());
        let input = compression::open_gzip_or_plain(&self.primary_compressed)?;
        let packages = parse_primary(input, &self.repository)?;

        info!(
            "Loaded {} packages from {}",
            packages.len(),
            self.primary_compressed.display()
        );
        self.catalog = Some(Catalog::from_packages(packages));
        Ok(())
    }

    fn packages_by_name(&self, name: &str, version: &str) -> Result<Vec<Package>> {
        let catalog = self.catalog()?;
        let Some(positions) = catalog.by_name.get(name) else {
            debug!("could not find package {:?}", name);
            return Ok(Vec::new());
        };

        Ok(positions
            .iter()
            .map(|&idx| &catalog.packages[idx])
            .filter(|pkg| version.is_empty() || pkg.version() == version)
            .cloned()
            .collect())
    }

    fn provides_by_name(&self, name: &str) -> Result<Vec<Provides>> {
        let catalog = self.catalog()?;
        Ok(catalog.provides.get(name).cloned().unwrap_or_default())
    }

    fn packages_providing(&self, provide: &Provides) -> Result<Vec<Package>> {
        let catalog = self.catalog()?;
        let Some(entries) = catalog.provides.get(provide.name()) else {
            return Ok(Vec::new());
        };

        let mut keys: Vec<PackageKey> = entries
            .iter()
            .filter(|p| p.version() == provide.version())
            .filter(|p| provide.release().is_empty() || p.release() == provide.release())
            .filter_map(Provides::package)
            .collect();
        keys.sort();
        keys.dedup();

        Ok(keys
            .into_iter()
            .filter_map(|key| catalog.get(key))
            .cloned()
            .collect())
    }

    fn get_packages(&self) -> Result<Vec<Package>> {
        Ok(self.catalog()?.packages.clone())
    }

    fn close(&mut self) -> Result<()> {
        self.catalog = None;
        Ok(())
    }
}
