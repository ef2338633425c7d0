//! JAR scanning: manifest, per-entry package accounting and resources.

use anyhow::{Context, Result};
use log::debug;
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;
use zip::ZipArchive;

use crate::models::{Diagnostic, Diagnostics, PackageInfo, ParsingContext, parse_header};
use crate::parsers::class_entry::package_for_entry;
use crate::parsers::manifest::{
    BUNDLE_VERSION, EXPORT_PACKAGE, IMPLEMENTATION_VERSION, JarManifest, MANIFEST_PATH,
    SPECIFICATION_VERSION,
};
use crate::parsers::{ScanOptions, is_scannable, scan_resource};

/// Per-package version hints of one archive.
struct VersionHints {
    manifest: Option<JarManifest>,
    exports: HashMap<String, Option<String>>,
    fallback: Option<String>,
}

impl VersionHints {
    fn new(manifest: Option<JarManifest>, artifact_version: &str) -> Self {
        let mut exports = HashMap::new();
        if let Some(header) = manifest
            .as_ref()
            .and_then(|manifest| manifest.main_attribute(EXPORT_PACKAGE))
        {
            for clause in parse_header(header) {
                for path in &clause.paths {
                    exports.insert(path.clone(), clause.version().map(str::to_string));
                }
            }
        }

        let fallback = manifest
            .as_ref()
            .and_then(|manifest| {
                manifest
                    .main_attribute(IMPLEMENTATION_VERSION)
                    .or_else(|| manifest.main_attribute(BUNDLE_VERSION))
            })
            .map(str::to_string)
            .or_else(|| (!artifact_version.is_empty()).then(|| artifact_version.to_string()));

        VersionHints {
            manifest,
            exports,
            fallback,
        }
    }

    /// Export-Package version, then the package section's
    /// Implementation-Version, then the main section's, then Bundle-Version,
    /// then the artifact version.
    fn version(&self, package: &str) -> Option<String> {
        if let Some(Some(version)) = self.exports.get(package) {
            return Some(version.clone());
        }
        self.manifest
            .as_ref()
            .and_then(|manifest| manifest.package_attribute(package, IMPLEMENTATION_VERSION))
            .map(str::to_string)
            .or_else(|| self.fallback.clone())
    }

    fn specification_version(&self, package: &str) -> Option<String> {
        let manifest = self.manifest.as_ref()?;
        manifest
            .package_attribute(package, SPECIFICATION_VERSION)
            .or_else(|| manifest.main_attribute(SPECIFICATION_VERSION))
            .map(str::to_string)
    }

    fn package_exports(&self) -> Vec<PackageInfo> {
        let mut exports: Vec<PackageInfo> = self
            .exports
            .iter()
            .map(|(package, version)| PackageInfo::new(package.clone()).with_version(version.clone()))
            .collect();
        exports.sort();
        exports
    }
}

/// Scans a JAR on disk into `context`.
pub fn scan_jar_file(
    path: &Path,
    context: &mut ParsingContext,
    options: ScanOptions,
    diagnostics: &mut Diagnostics,
) -> Result<()> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let mut archive =
        ZipArchive::new(file).with_context(|| format!("Failed to read archive {:?}", path))?;
    scan_archive(&mut archive, context, options, diagnostics)
}

/// Scans an open archive. Every non-directory entry counts once for its
/// package; resources are handed to the resource scanners.
pub fn scan_archive<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    context: &mut ParsingContext,
    options: ScanOptions,
    diagnostics: &mut Diagnostics,
) -> Result<()> {
    let manifest = match JarManifest::from_archive(archive) {
        Ok(manifest) => manifest,
        Err(e) => {
            diagnostics.push(Diagnostic::ParseFailure {
                location: context.location.clone(),
                resource: MANIFEST_PATH.to_string(),
                message: format!("{:#}", e),
            });
            None
        }
    };
    let hints = VersionHints::new(manifest, &context.version);
    context.package_exports = hints.package_exports();

    let location = context.location.clone();
    for index in 0..archive.len() {
        let mut entry = match archive.by_index(index) {
            Ok(entry) => entry,
            Err(e) => {
                diagnostics.push(Diagnostic::ParseFailure {
                    location: location.clone(),
                    resource: format!("entry #{}", index),
                    message: e.to_string(),
                });
                continue;
            }
        };
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();

        if let Some(package) = package_for_entry(&name) {
            let version = hints.version(&package);
            let specification_version = hints.specification_version(&package);
            context.observe_package(
                &package,
                version.as_deref(),
                specification_version.as_deref(),
            );
        }

        if !is_scannable(&name, options) {
            continue;
        }
        let mut content = Vec::new();
        if let Err(e) = entry.read_to_end(&mut content) {
            debug!("Failed to read {} in {}: {:?}", name, location, e);
            diagnostics.push(Diagnostic::ParseFailure {
                location: location.clone(),
                resource: name,
                message: e.to_string(),
            });
            continue;
        }
        scan_resource(
            &location,
            &name,
            &content,
            &mut context.references,
            options,
            diagnostics,
        );
    }

    Ok(())
}
