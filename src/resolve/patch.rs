//! Rewrites the Import-Package header of a built bundle.

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tempfile::{NamedTempFile, TempDir};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::imports::KnownExports;
use crate::models::{
    Diagnostic, Diagnostics, ManifestValueClause, format_header, is_java_platform_package,
    parse_header,
};
use crate::parsers::manifest::{IMPORT_PACKAGE, JarManifest, MANIFEST_PATH};
use crate::utils::file::{list_files_recursive, relative_slash_path};

/// Which imports become `resolution:=optional`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ImportPolicy {
    /// Every import, making the bundle resolve whatever is installed.
    #[default]
    ForceAllOptional,
    /// Only imports no known export satisfies.
    MissingOnly,
}

impl ImportPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ForceAllOptional => "force-all-optional",
            Self::MissingOnly => "missing-only",
        }
    }
}

impl fmt::Display for ImportPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "force-all-optional" | "force_all_optional" => Ok(Self::ForceAllOptional),
            "missing-only" | "missing_only" => Ok(Self::MissingOnly),
            other => Err(format!("unknown import policy: {}", other)),
        }
    }
}

impl Serialize for ImportPolicy {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ImportPolicy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Result of rewriting one Import-Package value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PatchedHeader {
    pub value: String,
    pub modified: bool,
    pub duplicates: Vec<String>,
    /// Imports absent from the known exports; empty when no export universe
    /// was supplied.
    pub missing: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct PatchOutcome {
    pub jar: PathBuf,
    pub written: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<PatchedHeader>,
}

pub struct ManifestPatcher<'a> {
    policy: ImportPolicy,
    known: Option<&'a KnownExports>,
}

impl<'a> ManifestPatcher<'a> {
    pub fn new(policy: ImportPolicy) -> Self {
        ManifestPatcher {
            policy,
            known: None,
        }
    }

    /// Enables missing-export detection against `known`.
    pub fn with_known_exports(mut self, known: &'a KnownExports) -> Self {
        self.known = Some(known);
        self
    }

    /// Deduplicates the clauses of `header` (first occurrence wins) and
    /// applies the import policy. Multi-path clauses are split into one
    /// clause per package.
    pub fn patch_header(&self, header: &str, diagnostics: &mut Diagnostics) -> PatchedHeader {
        let mut patched = PatchedHeader::default();
        let mut seen = HashSet::new();
        let mut clauses = Vec::new();

        for clause in parse_header(header) {
            for path in &clause.paths {
                if !seen.insert(path.clone()) {
                    diagnostics.push(Diagnostic::DuplicateImport {
                        package: path.clone(),
                    });
                    patched.duplicates.push(path.clone());
                    patched.modified = true;
                    continue;
                }

                let mut single = ManifestValueClause {
                    paths: vec![path.clone()],
                    ..clause.clone()
                };
                let missing = !is_java_platform_package(path)
                    && self.known.is_some_and(|known| !known.contains(path));
                if missing {
                    patched.missing.push(path.clone());
                }

                let force = match self.policy {
                    ImportPolicy::ForceAllOptional => true,
                    ImportPolicy::MissingOnly => missing,
                };
                if force && !single.is_optional() {
                    single.make_optional();
                    patched.modified = true;
                }
                clauses.push(single);
            }
        }

        patched.value = format_header(&clauses);
        patched
    }

    /// Patches the manifest's Import-Package header in place. `None` when the
    /// manifest has no such header.
    pub fn patch_manifest(
        &self,
        manifest: &mut JarManifest,
        diagnostics: &mut Diagnostics,
    ) -> Option<PatchedHeader> {
        let header = manifest.main_attribute(IMPORT_PACKAGE)?.to_string();
        let patched = self.patch_header(&header, diagnostics);
        if patched.modified {
            manifest.set_main_attribute(IMPORT_PACKAGE, patched.value.clone());
        }
        Some(patched)
    }

    /// Patches the manifest of `jar`. The JAR is rewritten in place, or next
    /// to it as `<name>-<classifier>.jar` when a classifier is given. Nothing
    /// is written when the manifest needs no change.
    pub fn patch_jar(
        &self,
        jar: &Path,
        classifier: Option<&str>,
        diagnostics: &mut Diagnostics,
    ) -> Result<PatchOutcome> {
        let file = File::open(jar).with_context(|| format!("Failed to open {:?}", jar))?;
        let mut archive =
            ZipArchive::new(file).with_context(|| format!("Failed to read archive {:?}", jar))?;
        let Some(mut manifest) = JarManifest::from_archive(&mut archive)? else {
            info!("{:?} has no manifest, nothing to patch", jar);
            return Ok(PatchOutcome {
                jar: jar.to_path_buf(),
                ..PatchOutcome::default()
            });
        };

        let header = self.patch_manifest(&mut manifest, diagnostics);
        let target = match classifier {
            Some(classifier) => classified_path(jar, classifier),
            None => jar.to_path_buf(),
        };
        let modified = header.as_ref().is_some_and(|h| h.modified);
        if !modified {
            debug!("Manifest of {:?} is up to date", jar);
            return Ok(PatchOutcome {
                jar: jar.to_path_buf(),
                written: false,
                header,
            });
        }

        let staging = TempDir::new().context("Failed to create staging directory")?;
        archive
            .extract(staging.path())
            .with_context(|| format!("Failed to unpack {:?}", jar))?;
        drop(archive);

        let manifest_path = staging.path().join(MANIFEST_PATH);
        fs::write(&manifest_path, manifest.to_manifest_string())
            .with_context(|| format!("Failed to write {:?}", manifest_path))?;
        repack(staging.path(), &target)?;
        info!("Updated Import-Package of {:?}", target);

        Ok(PatchOutcome {
            jar: target,
            written: true,
            header,
        })
    }
}

/// `dir/name.jar` -> `dir/name-classifier.jar`
pub fn classified_path(jar: &Path, classifier: &str) -> PathBuf {
    let stem = jar
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default();
    let extension = jar
        .extension()
        .map(|ext| ext.to_string_lossy().to_string())
        .unwrap_or_else(|| "jar".to_string());
    jar.with_file_name(format!("{}-{}.{}", stem, classifier, extension))
}

/// Zips `root` into `target`, manifest first, replacing `target` atomically.
fn repack(root: &Path, target: &Path) -> Result<()> {
    let parent = target
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temporary file in {:?}", parent))?;

    {
        let mut writer = ZipWriter::new(temp.as_file_mut());
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        writer.add_directory("META-INF/", options)?;
        writer.start_file(MANIFEST_PATH, options)?;
        writer.write_all(&fs::read(root.join(MANIFEST_PATH))?)?;

        for path in list_files_recursive(root)? {
            let name = relative_slash_path(root, &path);
            if name == MANIFEST_PATH {
                continue;
            }
            writer.start_file(name.as_str(), options)?;
            let content = fs::read(&path).with_context(|| format!("Failed to read {:?}", path))?;
            writer.write_all(&content)?;
        }
        writer.finish().context("Failed to finish archive")?;
    }

    temp.persist(target)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to replace {:?}", target))?;
    Ok(())
}
