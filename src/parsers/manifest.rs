//! JAR manifest (`META-INF/MANIFEST.MF`) reading and writing.
//!
//! # Format
//! - RFC822-style `Name: value` headers
//! - Lines longer than 72 bytes continue on the next line, which starts with a
//!   single space
//! - A blank line ends the main section; every following section starts with
//!   a `Name:` header naming a JAR entry (per-entry attributes)
//!
//! Attribute names compare case-insensitively, values are kept verbatim.

use anyhow::{Context, Result};
use std::io::{Read, Seek};
use zip::ZipArchive;

pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

pub const IMPORT_PACKAGE: &str = "Import-Package";
pub const EXPORT_PACKAGE: &str = "Export-Package";
pub const BUNDLE_VERSION: &str = "Bundle-Version";
pub const BUNDLE_SYMBOLIC_NAME: &str = "Bundle-SymbolicName";
pub const IMPLEMENTATION_VERSION: &str = "Implementation-Version";
pub const SPECIFICATION_VERSION: &str = "Specification-Version";

const MAX_LINE_BYTES: usize = 72;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ManifestSection {
    pub name: String,
    pub attributes: Vec<(String, String)>,
}

impl ManifestSection {
    pub fn get(&self, key: &str) -> Option<&str> {
        find_attribute(&self.attributes, key)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JarManifest {
    pub main: Vec<(String, String)>,
    pub sections: Vec<ManifestSection>,
}

impl JarManifest {
    pub fn parse(content: &str) -> Self {
        let mut manifest = JarManifest::default();
        let mut current: Vec<(String, String)> = Vec::new();
        let mut in_main = true;

        let mut pending: Option<(String, String)> = None;

        for line in content.lines() {
            let line = line.strip_suffix('\r').unwrap_or(line);

            if let Some(continuation) = line.strip_prefix(' ') {
                // Continuation line
                if let Some((_, value)) = pending.as_mut() {
                    value.push_str(continuation);
                }
                continue;
            }

            if let Some(header) = pending.take() {
                current.push(header);
            }

            if line.trim().is_empty() {
                if !current.is_empty() || in_main {
                    manifest.close_section(&mut current, &mut in_main);
                }
                continue;
            }

            if let Some(colon_pos) = line.find(':') {
                let key = line[..colon_pos].trim().to_string();
                let value = line[colon_pos + 1..].trim_start().to_string();
                pending = Some((key, value));
            }
        }

        if let Some(header) = pending.take() {
            current.push(header);
        }
        if !current.is_empty() {
            manifest.close_section(&mut current, &mut in_main);
        }

        manifest
    }

    fn close_section(&mut self, current: &mut Vec<(String, String)>, in_main: &mut bool) {
        let attributes = std::mem::take(current);
        if *in_main {
            self.main = attributes;
            *in_main = false;
            return;
        }

        let name = find_attribute(&attributes, "Name")
            .unwrap_or_default()
            .to_string();
        let attributes = attributes
            .into_iter()
            .filter(|(key, _)| !key.eq_ignore_ascii_case("Name"))
            .collect();
        self.sections.push(ManifestSection { name, attributes });
    }

    /// Reads `META-INF/MANIFEST.MF` from an open archive, `Ok(None)` when the
    /// archive has no manifest.
    pub fn from_archive<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Option<Self>> {
        let mut entry = match archive.by_name(MANIFEST_PATH) {
            Ok(entry) => entry,
            Err(zip::result::ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e).context("Failed to open manifest entry"),
        };

        let mut bytes = Vec::new();
        entry
            .read_to_end(&mut bytes)
            .context("Failed to read manifest entry")?;
        Ok(Some(Self::parse(&String::from_utf8_lossy(&bytes))))
    }

    pub fn main_attribute(&self, key: &str) -> Option<&str> {
        find_attribute(&self.main, key)
    }

    pub fn set_main_attribute(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .main
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(key))
        {
            Some(attribute) => attribute.1 = value,
            None => self.main.push((key.to_string(), value)),
        }
    }

    /// Per-entry section, e.g. `org/example/` for the package `org.example`.
    pub fn section(&self, name: &str) -> Option<&ManifestSection> {
        self.sections.iter().find(|section| section.name == name)
    }

    /// Looks `key` up in the section of `package`'s directory entry.
    pub fn package_attribute(&self, package: &str, key: &str) -> Option<&str> {
        let entry = format!("{}/", package.replace('.', "/"));
        self.section(&entry)
            .or_else(|| self.section(entry.trim_end_matches('/')))
            .and_then(|section| section.get(key))
    }

    /// Serializes with CRLF line endings, wrapping lines at 72 bytes and
    /// writing `Manifest-Version` first.
    pub fn to_manifest_string(&self) -> String {
        let mut out = String::new();

        let version = self.main_attribute("Manifest-Version").unwrap_or("1.0");
        write_header(&mut out, "Manifest-Version", version);
        for (key, value) in &self.main {
            if !key.eq_ignore_ascii_case("Manifest-Version") {
                write_header(&mut out, key, value);
            }
        }
        out.push_str("\r\n");

        for section in &self.sections {
            write_header(&mut out, "Name", &section.name);
            for (key, value) in &section.attributes {
                write_header(&mut out, key, value);
            }
            out.push_str("\r\n");
        }

        out
    }
}

fn find_attribute<'a>(attributes: &'a [(String, String)], key: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(key))
        .map(|(_, value)| value.as_str())
}

fn write_header(out: &mut String, key: &str, value: &str) {
    let line = format!("{}: {}", key, value);
    let mut remaining = line.as_str();
    let mut limit = MAX_LINE_BYTES;

    loop {
        if remaining.len() <= limit {
            out.push_str(remaining);
            out.push_str("\r\n");
            return;
        }

        let mut split = limit;
        while !remaining.is_char_boundary(split) {
            split -= 1;
        }
        out.push_str(&remaining[..split]);
        out.push_str("\r\n ");
        remaining = &remaining[split..];
        // the leading space of a continuation line counts against the limit
        limit = MAX_LINE_BYTES - 1;
    }
}
