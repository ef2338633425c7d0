//! `find-package-uses`: which classes reference the requested packages.

use anyhow::{Context, Result};
use log::{debug, info};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use zip::ZipArchive;

use super::{GoalContext, GoalOutput, PackageFilter};
use crate::models::{Diagnostic, Diagnostics, Scope};
use crate::parsers::class_entry::{package_of_binary_name, parse_class_file};
use crate::scanner::{compile_exclusions, find_exclusion};
use crate::utils::file::{list_files_recursive, relative_slash_path};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PackageUse {
    pub class_name: String,
    pub location: String,
    pub references: Vec<String>,
}

struct IndexedClass {
    name: String,
    location: String,
    references: BTreeSet<String>,
}

/// Referenced classes of every compiled class seen.
#[derive(Default)]
pub struct ClassUsageIndex {
    classes: Vec<IndexedClass>,
}

impl ClassUsageIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn add_directory(&mut self, root: &Path, diagnostics: &mut Diagnostics) -> Result<()> {
        let location = root.to_string_lossy().to_string();
        for path in list_files_recursive(root)? {
            if path.extension().is_none_or(|ext| ext != "class") {
                continue;
            }
            let name = relative_slash_path(root, &path);
            match fs::read(&path) {
                Ok(bytes) => self.add_class(&location, &name, &bytes, diagnostics),
                Err(e) => diagnostics.push(Diagnostic::ParseFailure {
                    location: location.clone(),
                    resource: name,
                    message: e.to_string(),
                }),
            }
        }
        Ok(())
    }

    pub fn add_jar(&mut self, path: &Path, diagnostics: &mut Diagnostics) -> Result<()> {
        let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        let mut archive =
            ZipArchive::new(file).with_context(|| format!("Failed to read archive {:?}", path))?;
        self.add_archive(&mut archive, &path.to_string_lossy(), diagnostics);
        Ok(())
    }

    /// Indexes the classes of an archive, descending into embedded JARs.
    pub fn add_archive<R: Read + Seek>(
        &mut self,
        archive: &mut ZipArchive<R>,
        location: &str,
        diagnostics: &mut Diagnostics,
    ) {
        for index in 0..archive.len() {
            let mut entry = match archive.by_index(index) {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Skipping entry #{} of {}: {:?}", index, location, e);
                    continue;
                }
            };
            let name = entry.name().to_string();
            let is_class = name.ends_with(".class");
            let is_jar = name.ends_with(".jar");
            if entry.is_dir() || !(is_class || is_jar) {
                continue;
            }

            let mut bytes = Vec::new();
            if let Err(e) = entry.read_to_end(&mut bytes) {
                diagnostics.push(Diagnostic::ParseFailure {
                    location: location.to_string(),
                    resource: name,
                    message: e.to_string(),
                });
                continue;
            }
            drop(entry);

            if is_class {
                self.add_class(location, &name, &bytes, diagnostics);
                continue;
            }
            let nested_location = format!("{}!/{}", location, name);
            match ZipArchive::new(Cursor::new(bytes)) {
                Ok(mut nested) => self.add_archive(&mut nested, &nested_location, diagnostics),
                Err(e) => diagnostics.push(Diagnostic::ParseFailure {
                    location: location.to_string(),
                    resource: name,
                    message: e.to_string(),
                }),
            }
        }
    }

    fn add_class(
        &mut self,
        location: &str,
        resource: &str,
        bytes: &[u8],
        diagnostics: &mut Diagnostics,
    ) {
        match parse_class_file(bytes) {
            Ok(class) => self.classes.push(IndexedClass {
                name: class.name,
                location: location.to_string(),
                references: class.references,
            }),
            Err(e) => {
                debug!("Failed to parse {} in {}: {:?}", resource, location, e);
                diagnostics.push(Diagnostic::ParseFailure {
                    location: location.to_string(),
                    resource: resource.to_string(),
                    message: format!("{:#}", e),
                });
            }
        }
    }

    /// Classes referencing the requested packages. Classes inside a
    /// requested package are left out.
    pub fn uses(&self, filter: &PackageFilter) -> Vec<PackageUse> {
        let mut uses = Vec::new();
        for class in &self.classes {
            if package_of_binary_name(&class.name).is_some_and(|p| filter.matches(p)) {
                continue;
            }
            let references: Vec<String> = class
                .references
                .iter()
                .filter(|reference| {
                    package_of_binary_name(reference).is_some_and(|p| filter.matches(p))
                })
                .cloned()
                .collect();
            if !references.is_empty() {
                uses.push(PackageUse {
                    class_name: class.name.clone(),
                    location: class.location.clone(),
                    references,
                });
            }
        }
        uses
    }

    /// Names of the classes referencing `package`.
    pub fn users_of(&self, package: &str) -> Vec<String> {
        let filter = PackageFilter::new(&[package.to_string()]);
        self.uses(&filter)
            .into_iter()
            .map(|package_use| package_use.class_name)
            .collect()
    }
}

pub fn run(
    context: &GoalContext,
    packages: &[String],
    diagnostics: &mut Diagnostics,
) -> Result<GoalOutput> {
    let filter = PackageFilter::new(packages);
    let mut index = ClassUsageIndex::new();
    index.add_directory(&context.project.build_output_directory, diagnostics)?;

    let settings = &context.config.dependencies;
    let exclusions = compile_exclusions(&settings.exclusions)?;
    context
        .progress_bar
        .set_length(context.project.dependencies.len() as u64);
    for artifact in &context.project.dependencies {
        context.progress_bar.inc(1);
        if artifact.scope == Scope::Test && !settings.include_test_scope {
            continue;
        }
        if find_exclusion(&exclusions, artifact).is_some() {
            continue;
        }
        let Some(file) = artifact.file.as_deref().filter(|f| f.is_file()) else {
            continue;
        };
        if let Err(e) = index.add_jar(file, diagnostics) {
            diagnostics.push(Diagnostic::ParseFailure {
                location: file.to_string_lossy().to_string(),
                resource: artifact.coordinates(),
                message: format!("{:#}", e),
            });
        }
    }

    let uses = index.uses(&filter);
    for package_use in &uses {
        info!(
            "{} ({}) uses {}",
            package_use.class_name,
            package_use.location,
            package_use.references.join(", ")
        );
    }
    info!("{} class(es) out of {} use the requested packages", uses.len(), index.len());

    Ok(GoalOutput {
        properties: Default::default(),
        result: json!({ "packages": packages, "uses": uses }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal class file: this_class plus one referenced class.
    fn class_bytes(this_class: &str, referenced: &str) -> Vec<u8> {
        let mut bytes = vec![0xCA, 0xFE, 0xBA, 0xBE, 0, 0, 0, 52];
        bytes.extend_from_slice(&5u16.to_be_bytes());
        for (index, name) in [this_class, referenced].iter().enumerate() {
            bytes.push(1);
            bytes.extend_from_slice(&(name.len() as u16).to_be_bytes());
            bytes.extend_from_slice(name.as_bytes());
            bytes.push(7);
            bytes.extend_from_slice(&((index * 2 + 1) as u16).to_be_bytes());
        }
        bytes.extend_from_slice(&0x0021u16.to_be_bytes());
        bytes.extend_from_slice(&2u16.to_be_bytes());
        bytes
    }

    #[test]
    fn test_uses_filters_by_referenced_package() {
        let mut index = ClassUsageIndex::new();
        let mut diagnostics = Diagnostics::new();
        index.add_class(
            "app.jar",
            "org/app/Service.class",
            &class_bytes("org/app/Service", "org/slf4j/Logger"),
            &mut diagnostics,
        );
        index.add_class(
            "app.jar",
            "org/app/Other.class",
            &class_bytes("org/app/Other", "org/apache/Util"),
            &mut diagnostics,
        );
        index.add_class(
            "slf4j.jar",
            "org/slf4j/impl/Binder.class",
            &class_bytes("org/slf4j/impl/Binder", "org/slf4j/Logger"),
            &mut diagnostics,
        );
        index.add_class("app.jar", "broken.class", b"nope", &mut diagnostics);

        let uses = index.uses(&PackageFilter::new(&["org.slf4j.*".to_string()]));
        assert_eq!(
            uses,
            vec![PackageUse {
                class_name: "org.app.Service".to_string(),
                location: "app.jar".to_string(),
                references: vec!["org.slf4j.Logger".to_string()],
            }]
        );
        assert_eq!(index.users_of("org.apache"), vec!["org.app.Other"]);
        assert_eq!(index.len(), 3);
        assert_eq!(diagnostics.len(), 1);
    }
}
