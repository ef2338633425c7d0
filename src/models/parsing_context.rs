use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::artifact::{Artifact, Scope};
use super::package_info::PackageInfo;
use super::references::ResourceReferences;
use super::version_location::{PackageTable, VersionLocation};

/// Chain of artifacts leading from the project to a dependency.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyTrail {
    pub nodes: Vec<String>,
    #[serde(default)]
    pub excluded: bool,
}

impl fmt::Display for DependencyTrail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.nodes.join(" -> "))?;
        if self.excluded {
            f.write_str(" (excluded)")?;
        }
        Ok(())
    }
}

/// Scan results for one artifact (or for the project itself).
///
/// Contexts of dependencies are cached on disk, so everything a later run
/// needs to replay the scan lives here: per-package observations, exports,
/// tag libraries and content types, plus the file metadata that keys the
/// cache entry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsingContext {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    #[serde(default)]
    pub artifact_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier: Option<String>,
    #[serde(default)]
    pub scope: Scope,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub external: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub last_modified: i64,
    /// Location under which `local_packages` were recorded.
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub local_packages: BTreeMap<String, VersionLocation>,
    #[serde(default)]
    pub package_exports: Vec<PackageInfo>,
    #[serde(default)]
    pub split_packages: BTreeSet<String>,
    #[serde(default)]
    pub references: ResourceReferences,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trail: Option<DependencyTrail>,
    #[serde(default)]
    pub children: Vec<ParsingContext>,
}

impl ParsingContext {
    pub fn new(group_id: &str, artifact_id: &str, version: &str) -> Self {
        ParsingContext {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
            version: version.to_string(),
            ..ParsingContext::default()
        }
    }

    /// Context for `artifact`, located at [`Artifact::location`].
    pub fn for_artifact(artifact: &Artifact) -> Self {
        let mut context = ParsingContext::new(
            &artifact.group_id,
            &artifact.artifact_id,
            &artifact.version,
        );
        context.artifact_type = artifact.artifact_type.clone();
        context.classifier = artifact.classifier.clone();
        context.location = artifact.location();
        context.apply_dependency_flags(artifact);
        context
    }

    /// Copies scope and optionality from `artifact`. These depend on how the
    /// project declares the dependency, not on the file, so they are
    /// reapplied to contexts restored from the cache.
    pub fn apply_dependency_flags(&mut self, artifact: &Artifact) {
        self.scope = artifact.scope;
        self.optional = artifact.optional;
        self.external = artifact.is_external();
        let location = self.location.clone();
        self.references
            .mark_taglibs(&location, self.external, self.optional);
        for child in &mut self.children {
            child.scope = artifact.scope;
            child.optional = artifact.optional;
            child.external = self.external;
            let location = child.location.clone();
            child
                .references
                .mark_taglibs(&location, self.external, self.optional);
        }
    }

    /// Packages of compile and runtime dependencies end up inside the
    /// bundle.
    pub fn is_embedded(&self) -> bool {
        matches!(self.scope, Scope::Compile | Scope::Runtime) && !self.optional
    }

    pub fn coordinates(&self) -> String {
        match &self.classifier {
            Some(classifier) => format!(
                "{}:{}:{}:{}:{}",
                self.group_id, self.artifact_id, self.artifact_type, classifier, self.version
            ),
            None => format!(
                "{}:{}:{}:{}",
                self.group_id, self.artifact_id, self.artifact_type, self.version
            ),
        }
    }

    /// Records one observation of `package` in this context's location.
    pub fn observe_package(
        &mut self,
        package: &str,
        version: Option<&str>,
        specification_version: Option<&str>,
    ) {
        let location = self.location.clone();
        self.local_packages
            .entry(package.to_string())
            .or_insert_with(|| VersionLocation::new(location, None, None))
            .observe(version, specification_version, 1);
    }

    pub fn has_local_package(&self, package: &str) -> bool {
        self.local_packages.contains_key(package)
    }

    pub fn local_package_names(&self) -> BTreeSet<String> {
        self.local_packages.keys().cloned().collect()
    }

    /// Replays this context and all of its children into `table`.
    pub fn record_into(&self, table: &mut PackageTable) {
        for (package, observation) in &self.local_packages {
            table.merge(package, observation);
        }
        for child in &self.children {
            child.record_into(table);
        }
    }

    /// Removes packages this context provides itself; those can never be
    /// missing.
    pub fn without_local_packages<'a>(
        &self,
        packages: impl IntoIterator<Item = &'a String>,
    ) -> BTreeSet<String> {
        packages
            .into_iter()
            .filter(|package| !self.has_local_package(package))
            .cloned()
            .collect()
    }

    /// Depth-first iteration over this context and its descendants.
    pub fn walk(&self) -> Vec<&ParsingContext> {
        let mut contexts = vec![self];
        for child in &self.children {
            contexts.extend(child.walk());
        }
        contexts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observe_package_counts_and_freezes_version() {
        let mut context = ParsingContext::new("g", "a", "1.0");
        context.location = "a.jar".to_string();
        context.observe_package("org.a", Some("1.0"), None);
        context.observe_package("org.a", Some("2.0"), None);

        let observation = &context.local_packages["org.a"];
        assert_eq!(observation.counter, 2);
        assert_eq!(observation.version.as_deref(), Some("1.0"));
        assert_eq!(observation.location, "a.jar");
    }

    #[test]
    fn test_record_into_includes_children() {
        let mut parent = ParsingContext::new("g", "war", "1.0");
        parent.location = "app.war".to_string();
        parent.observe_package("org.web", None, None);

        let mut child = ParsingContext::new("g", "lib", "1.0");
        child.location = "app.war!/WEB-INF/lib/lib-1.0.jar".to_string();
        child.observe_package("org.lib", Some("1.0"), None);
        parent.children.push(child);

        let mut table = PackageTable::new();
        parent.record_into(&mut table);
        assert!(table.contains("org.web"));
        assert!(table.contains("org.lib"));
        assert_eq!(parent.walk().len(), 2);
    }

    #[test]
    fn test_local_packages_are_never_missing() {
        let mut context = ParsingContext::new("g", "a", "1.0");
        context.observe_package("org.own", None, None);
        let imports = vec!["org.own".to_string(), "org.other".to_string()];

        let remaining = context.without_local_packages(&imports);
        assert_eq!(remaining.into_iter().collect::<Vec<_>>(), vec!["org.other"]);
    }

    #[test]
    fn test_dependency_flags_mark_taglibs() {
        let mut artifact = Artifact::new("g", "taglib", "1.0");
        artifact.scope = Scope::Provided;
        artifact.file = Some("taglib-1.0.jar".into());

        let mut context = ParsingContext::for_artifact(&artifact);
        context.references.add_taglib_package("urn:t", "org.t");
        context.apply_dependency_flags(&artifact);

        assert!(context.external);
        assert!(!context.is_embedded());
        let taglib = &context.references.taglibs["urn:t"];
        assert!(taglib.external);
        assert_eq!(taglib.source_location.as_deref(), Some("taglib-1.0.jar"));

        artifact.scope = Scope::Compile;
        context.apply_dependency_flags(&artifact);
        assert!(context.is_embedded());
        assert!(!context.references.taglibs["urn:t"].external);
    }

    #[test]
    fn test_trail_display() {
        let trail = DependencyTrail {
            nodes: vec!["g:app:war:1".to_string(), "g:lib:jar:2".to_string()],
            excluded: true,
        };
        assert_eq!(trail.to_string(), "g:app:war:1 -> g:lib:jar:2 (excluded)");
    }
}
