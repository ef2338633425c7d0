//! WAR dependencies.
//!
//! A web application embeds its libraries under `WEB-INF/lib` and its own
//! classes under `WEB-INF/classes`. Each embedded library becomes a child
//! context; its dependency trail is found by matching the JAR file name
//! against the WAR's own dependency graph.

use anyhow::{Context, Result};
use log::debug;
use std::collections::HashMap;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;
use zip::ZipArchive;

use super::exclusion::ExclusionPattern;
use super::jar::scan_archive;
use super::trail::{find_artifact, find_trails, render_trails};
use crate::models::{Artifact, Diagnostic, Diagnostics, ParsingContext};
use crate::parsers::class_entry::package_for_entry;
use crate::parsers::{ScanOptions, is_scannable, scan_resource};

const WEB_INF_LIB: &str = "WEB-INF/lib/";
const WEB_INF_CLASSES: &str = "WEB-INF/classes/";

/// Resolves the transitive dependency graph of an artifact.
pub trait DependencyGraphResolver {
    /// Direct dependencies of `artifact`, each carrying its own
    /// dependencies.
    fn resolve(&self, artifact: &Artifact) -> Result<Vec<Artifact>>;
}

/// Uses the graph the build already wrote into the project descriptor.
#[derive(Clone, Copy, Debug, Default)]
pub struct DescriptorGraphResolver;

impl DependencyGraphResolver for DescriptorGraphResolver {
    fn resolve(&self, artifact: &Artifact) -> Result<Vec<Artifact>> {
        Ok(artifact.dependencies.clone())
    }
}

/// Memoizes resolved graphs by coordinates. Failed resolutions are recorded
/// once and remembered as empty graphs.
pub struct GraphCache<'a> {
    resolver: &'a dyn DependencyGraphResolver,
    graphs: HashMap<String, Vec<Artifact>>,
}

impl<'a> GraphCache<'a> {
    pub fn new(resolver: &'a dyn DependencyGraphResolver) -> Self {
        GraphCache {
            resolver,
            graphs: HashMap::new(),
        }
    }

    pub fn graph(&mut self, artifact: &Artifact, diagnostics: &mut Diagnostics) -> &[Artifact] {
        let coordinates = artifact.coordinates();
        if !self.graphs.contains_key(&coordinates) {
            let graph = match self.resolver.resolve(artifact) {
                Ok(graph) => graph,
                Err(e) => {
                    diagnostics.push(Diagnostic::ResolutionFailure {
                        artifact: coordinates.clone(),
                        message: format!("{:#}", e),
                    });
                    Vec::new()
                }
            };
            self.graphs.insert(coordinates.clone(), graph);
        }
        self.graphs
            .get(&coordinates)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Scans a WAR into `context`, adding one child context per embedded JAR.
pub fn scan_war_file(
    path: &Path,
    context: &mut ParsingContext,
    graph: &[Artifact],
    exclusions: &[ExclusionPattern],
    options: ScanOptions,
    diagnostics: &mut Diagnostics,
) -> Result<()> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let mut archive =
        ZipArchive::new(file).with_context(|| format!("Failed to read archive {:?}", path))?;

    let location = context.location.clone();
    let root = context.coordinates();
    let version = (!context.version.is_empty()).then(|| context.version.clone());

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

        let mut content = Vec::new();
        let wanted = is_embedded_jar(&name) || is_scannable(&name, options);
        if wanted && let Err(e) = entry.read_to_end(&mut content) {
            debug!("Failed to read {} in {}: {:?}", name, location, e);
            diagnostics.push(Diagnostic::ParseFailure {
                location: location.clone(),
                resource: name,
                message: e.to_string(),
            });
            continue;
        }
        drop(entry);

        if is_embedded_jar(&name) {
            let jar_name = &name[WEB_INF_LIB.len()..];
            let child = scan_embedded_jar(
                &location, &root, jar_name, content, graph, exclusions, options, diagnostics,
            );
            context.children.push(child);
            continue;
        }

        if let Some(class_path) = name.strip_prefix(WEB_INF_CLASSES)
            && let Some(package) = package_for_entry(class_path)
        {
            context.observe_package(&package, version.as_deref(), None);
        }

        if wanted {
            let resource = name.strip_prefix(WEB_INF_CLASSES).unwrap_or(&name);
            scan_resource(
                &location,
                resource,
                &content,
                &mut context.references,
                options,
                diagnostics,
            );
        }
    }

    Ok(())
}

fn is_embedded_jar(name: &str) -> bool {
    name.strip_prefix(WEB_INF_LIB)
        .is_some_and(|rest| !rest.contains('/') && rest.to_ascii_lowercase().ends_with(".jar"))
}

#[allow(clippy::too_many_arguments)]
fn scan_embedded_jar(
    war_location: &str,
    root: &str,
    jar_name: &str,
    content: Vec<u8>,
    graph: &[Artifact],
    exclusions: &[ExclusionPattern],
    options: ScanOptions,
    diagnostics: &mut Diagnostics,
) -> ParsingContext {
    let mut child = match find_artifact(graph, jar_name) {
        Some(artifact) => ParsingContext::for_artifact(artifact),
        None => {
            debug!("{} not found in the dependency graph of {}", jar_name, root);
            let stem = jar_name.trim_end_matches(".jar");
            let mut context = ParsingContext::new("", stem, "");
            context.artifact_type = "jar".to_string();
            context
        }
    };
    child.location = format!("{}!/{}{}", war_location, WEB_INF_LIB, jar_name);
    child.file_size = content.len() as u64;
    let trails = find_trails(root, graph, jar_name, exclusions);
    if trails.len() > 1 {
        debug!(
            "{} is reached through {} trails:\n{}",
            jar_name,
            trails.len(),
            render_trails(&trails)
        );
    }
    child.trail = trails.into_iter().min_by_key(|trail| trail.excluded);

    let mut archive = match ZipArchive::new(Cursor::new(content)) {
        Ok(archive) => archive,
        Err(e) => {
            diagnostics.push(Diagnostic::ParseFailure {
                location: war_location.to_string(),
                resource: format!("{}{}", WEB_INF_LIB, jar_name),
                message: e.to_string(),
            });
            return child;
        }
    };
    if let Err(e) = scan_archive(&mut archive, &mut child, options, diagnostics) {
        diagnostics.push(Diagnostic::ParseFailure {
            location: war_location.to_string(),
            resource: format!("{}{}", WEB_INF_LIB, jar_name),
            message: format!("{:#}", e),
        });
    }
    child
}
