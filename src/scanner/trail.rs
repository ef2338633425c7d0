//! Dependency trails: how a project ends up depending on an artifact.

use log::debug;
use std::collections::HashSet;
use std::path::Path;

use super::exclusion::{ExclusionPattern, find_exclusion};
use crate::models::{Artifact, DependencyTrail};

/// Upper bound on the trails reported for one file.
pub const MAX_TRAILS: usize = 64;

/// Paths from `root` through `graph` to an artifact whose file name is
/// `file_name`, at most [`MAX_TRAILS`] of them. Excluded artifacts are still
/// traversed; trails crossing one are flagged.
pub fn find_trails(
    root: &str,
    graph: &[Artifact],
    file_name: &str,
    exclusions: &[ExclusionPattern],
) -> Vec<DependencyTrail> {
    let mut reaching = HashSet::new();
    for artifact in graph {
        mark_reaching(artifact, file_name, &mut reaching);
    }

    let mut search = TrailSearch {
        file_name,
        exclusions,
        reaching: &reaching,
        path: vec![root.to_string()],
        trails: Vec::new(),
    };
    for artifact in graph {
        search.visit(artifact, false);
    }
    if search.trails.len() >= MAX_TRAILS {
        debug!(
            "Stopped after {} trails to {} from {}",
            MAX_TRAILS, file_name, root
        );
    }
    search.trails
}

/// Records the coordinates of every artifact with `file_name` somewhere in
/// its subtree.
fn mark_reaching(artifact: &Artifact, file_name: &str, reaching: &mut HashSet<String>) -> bool {
    let mut found = artifact_file_name(artifact) == file_name;
    for dependency in &artifact.dependencies {
        found |= mark_reaching(dependency, file_name, reaching);
    }
    if found {
        reaching.insert(artifact.coordinates());
    }
    found
}

struct TrailSearch<'a> {
    file_name: &'a str,
    exclusions: &'a [ExclusionPattern],
    reaching: &'a HashSet<String>,
    path: Vec<String>,
    trails: Vec<DependencyTrail>,
}

impl TrailSearch<'_> {
    fn visit(&mut self, artifact: &Artifact, excluded: bool) {
        if self.trails.len() >= MAX_TRAILS {
            return;
        }
        let coordinates = artifact.coordinates();
        if !self.reaching.contains(&coordinates) || self.path.contains(&coordinates) {
            return;
        }
        let excluded = excluded || find_exclusion(self.exclusions, artifact).is_some();

        self.path.push(coordinates);
        if artifact_file_name(artifact) == self.file_name {
            self.trails.push(DependencyTrail {
                nodes: self.path.clone(),
                excluded,
            });
        }
        for dependency in &artifact.dependencies {
            self.visit(dependency, excluded);
        }
        self.path.pop();
    }
}

/// The name of the resolved file when there is one, the repository layout
/// name otherwise.
pub fn artifact_file_name(artifact: &Artifact) -> String {
    artifact
        .file
        .as_deref()
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| artifact.file_name())
}

/// The artifact at the end of the first trail found for `file_name`.
pub fn find_artifact<'a>(graph: &'a [Artifact], file_name: &str) -> Option<&'a Artifact> {
    for artifact in graph {
        if artifact_file_name(artifact) == file_name {
            return Some(artifact);
        }
        if let Some(found) = find_artifact(&artifact.dependencies, file_name) {
            return Some(found);
        }
    }
    None
}

/// One trail per line, indented.
pub fn render_trails(trails: &[DependencyTrail]) -> String {
    trails
        .iter()
        .map(|trail| format!("  {}", trail))
        .collect::<Vec<_>>()
        .join("\n")
}
