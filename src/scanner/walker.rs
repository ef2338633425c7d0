//! Walks the project's resolved dependencies and scans each file once.

use indicatif::ProgressBar;
use log::{debug, info};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use super::directory::scan_directory;
use super::exclusion::{ExclusionPattern, find_exclusion};
use super::jar::scan_jar_file;
use super::war::{DependencyGraphResolver, GraphCache, scan_war_file};
use crate::cache::{ParsingContextCache, cache_key};
use crate::models::{Artifact, DependencyTrail, Diagnostic, Diagnostics, ParsingContext, Scope};
use crate::parsers::ScanOptions;
use crate::utils::file::last_modified_millis;

#[derive(Clone, Copy, Debug, Default)]
pub struct WalkOptions {
    pub include_test_scope: bool,
    pub scan: ScanOptions,
}

pub struct DependencyWalker<'a> {
    project: String,
    exclusions: &'a [ExclusionPattern],
    cache: Option<&'a mut ParsingContextCache>,
    graphs: GraphCache<'a>,
    options: WalkOptions,
    progress_bar: &'a ProgressBar,
    visited: HashSet<PathBuf>,
}

impl<'a> DependencyWalker<'a> {
    pub fn new(
        project: impl Into<String>,
        exclusions: &'a [ExclusionPattern],
        resolver: &'a dyn DependencyGraphResolver,
        options: WalkOptions,
        progress_bar: &'a ProgressBar,
    ) -> Self {
        DependencyWalker {
            project: project.into(),
            exclusions,
            cache: None,
            graphs: GraphCache::new(resolver),
            options,
            progress_bar,
            visited: HashSet::new(),
        }
    }

    pub fn with_cache(mut self, cache: &'a mut ParsingContextCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Scans every artifact, returning one context per scanned file.
    pub fn walk(
        &mut self,
        artifacts: &[Artifact],
        diagnostics: &mut Diagnostics,
    ) -> Vec<ParsingContext> {
        self.progress_bar.set_length(artifacts.len() as u64);
        let mut contexts = Vec::new();
        for artifact in artifacts {
            self.progress_bar.set_message(artifact.artifact_id.clone());
            if let Some(context) = self.visit(artifact, diagnostics) {
                contexts.push(context);
            }
            self.progress_bar.inc(1);
        }

        if let Some(cache) = &self.cache {
            info!(
                "Dependency cache: {} hit(s), {} miss(es)",
                cache.hits(),
                cache.misses()
            );
        }
        contexts
    }

    fn visit(&mut self, artifact: &Artifact, diagnostics: &mut Diagnostics) -> Option<ParsingContext> {
        if artifact.scope == Scope::Test && !self.options.include_test_scope {
            debug!("Skipping test dependency {}", artifact);
            return None;
        }
        if artifact.artifact_type == "pom" {
            return None;
        }
        if let Some(pattern) = find_exclusion(self.exclusions, artifact) {
            diagnostics.push(Diagnostic::ExcludedArtifact {
                artifact: artifact.coordinates(),
                pattern: pattern.as_str().to_string(),
            });
            return None;
        }

        let Some(file) = artifact.file.as_deref().filter(|file| file.exists()) else {
            diagnostics.push(Diagnostic::ResolutionFailure {
                artifact: artifact.coordinates(),
                message: "dependency file is not available".to_string(),
            });
            return None;
        };

        let canonical = fs::canonicalize(file).unwrap_or_else(|_| file.to_path_buf());
        if !self.visited.insert(canonical.clone()) {
            debug!("Already scanned {:?}", canonical);
            return None;
        }

        let mut context = if file.is_dir() {
            self.scan_fresh(artifact, file, &canonical, diagnostics)
        } else {
            self.scan_cached(artifact, file, &canonical, diagnostics)
        };
        context.trail = Some(DependencyTrail {
            nodes: vec![self.project.clone(), artifact.coordinates()],
            excluded: false,
        });
        Some(context)
    }

    fn scan_cached(
        &mut self,
        artifact: &Artifact,
        file: &Path,
        canonical: &Path,
        diagnostics: &mut Diagnostics,
    ) -> ParsingContext {
        let metadata = fs::metadata(file).ok();
        let file_size = metadata.as_ref().map(|m| m.len()).unwrap_or(0);
        let last_modified = metadata.as_ref().map(last_modified_millis).unwrap_or(0);
        let key = cache_key(&artifact.coordinates(), file_size, last_modified, canonical);

        if let Some(cache) = self.cache.as_deref_mut()
            && let Some(mut context) = cache.get(&key)
        {
            debug!("Using cached scan of {}", artifact);
            context.apply_dependency_flags(artifact);
            return context;
        }

        let mut context = self.scan_fresh(artifact, file, canonical, diagnostics);
        context.file_size = file_size;
        context.last_modified = last_modified;

        if let Some(cache) = self.cache.as_deref()
            && let Err(e) = cache.put(&key, &context)
        {
            diagnostics.push(Diagnostic::CacheFailure {
                key,
                message: format!("{:#}", e),
            });
        }
        context
    }

    fn scan_fresh(
        &mut self,
        artifact: &Artifact,
        file: &Path,
        canonical: &Path,
        diagnostics: &mut Diagnostics,
    ) -> ParsingContext {
        let mut context = ParsingContext::for_artifact(artifact);
        context.file_path = Some(canonical.to_string_lossy().to_string());

        let result = if file.is_dir() {
            scan_directory(
                file,
                &mut context,
                true,
                self.options.scan,
                &ProgressBar::hidden(),
                diagnostics,
            )
            .map(|_| ())
        } else if artifact.is_war() {
            let graph = self.graphs.graph(artifact, diagnostics).to_vec();
            scan_war_file(
                file,
                &mut context,
                &graph,
                self.exclusions,
                self.options.scan,
                diagnostics,
            )
        } else {
            scan_jar_file(file, &mut context, self.options.scan, diagnostics)
        };

        if let Err(e) = result {
            debug!("Failed to scan {}: {:?}", artifact, e);
            diagnostics.push(Diagnostic::ParseFailure {
                location: context.location.clone(),
                resource: artifact.coordinates(),
                message: format!("{:#}", e),
            });
        }
        // tag libraries found while scanning take the artifact's flags
        context.apply_dependency_flags(artifact);
        context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::exclusion::compile_exclusions;
    use crate::scanner::war::DescriptorGraphResolver;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::{SimpleFileOptions, ZipWriter};

    fn write_jar(path: &Path, entries: &[(&str, &str)]) {
        let file = fs::File::create(path).unwrap();
        let mut writer = ZipWriter::new(file);
        for (name, content) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    fn jar_artifact(dir: &Path, artifact_id: &str, scope: Scope) -> Artifact {
        let path = dir.join(format!("{}-1.0.jar", artifact_id));
        write_jar(
            &path,
            &[
                (
                    "META-INF/MANIFEST.MF",
                    "Manifest-Version: 1.0\r\nBundle-Version: 1.0.0\r\n\r\n",
                ),
                ("org/example/Api.class", ""),
                ("org/example/META.txt", ""),
            ],
        );
        let mut artifact = Artifact::new("org.example", artifact_id, "1.0");
        artifact.scope = scope;
        artifact.file = Some(path);
        artifact
    }

    #[test]
    fn test_walk_skips_test_excluded_and_duplicates() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let api = jar_artifact(temp_dir.path(), "api", Scope::Provided);
        let tests = jar_artifact(temp_dir.path(), "tests", Scope::Test);
        let legacy = jar_artifact(temp_dir.path(), "legacy", Scope::Compile);
        let mut missing = Artifact::new("org.example", "missing", "1.0");
        missing.file = Some(temp_dir.path().join("missing-1.0.jar"));

        let exclusions = compile_exclusions(&["*:legacy".to_string()]).unwrap();
        let progress_bar = ProgressBar::hidden();
        let mut walker = DependencyWalker::new(
            "org.example:module:bundle:1.0",
            &exclusions,
            &DescriptorGraphResolver,
            WalkOptions::default(),
            &progress_bar,
        );
        let mut diagnostics = Diagnostics::new();
        let contexts = walker.walk(
            &[api.clone(), tests, legacy, missing, api],
            &mut diagnostics,
        );

        assert_eq!(contexts.len(), 1);
        let context = &contexts[0];
        assert!(context.external);
        assert_eq!(context.local_packages["org.example"].counter, 2);
        assert_eq!(
            context.local_packages["org.example"].version.as_deref(),
            Some("1.0.0")
        );
        assert_eq!(
            context.trail.as_ref().unwrap().nodes,
            vec!["org.example:module:bundle:1.0", "org.example:api:jar:1.0"]
        );

        let kinds: Vec<_> = diagnostics
            .iter()
            .map(|d| match d {
                Diagnostic::ExcludedArtifact { .. } => "excluded",
                Diagnostic::ResolutionFailure { .. } => "resolution",
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, vec!["excluded", "resolution"]);
    }

    #[test]
    fn test_second_walk_is_served_from_cache() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let jars = temp_dir.path().join("jars");
        fs::create_dir_all(&jars).unwrap();
        let mut api = jar_artifact(&jars, "api", Scope::Compile);
        let mut cache = ParsingContextCache::open(&temp_dir.path().join("cache")).unwrap();
        let progress_bar = ProgressBar::hidden();
        let mut diagnostics = Diagnostics::new();

        let first = {
            let mut walker = DependencyWalker::new(
                "p",
                &[],
                &DescriptorGraphResolver,
                WalkOptions::default(),
                &progress_bar,
            )
            .with_cache(&mut cache);
            walker.walk(std::slice::from_ref(&api), &mut diagnostics)
        };
        assert_eq!(cache.misses(), 1);

        api.scope = Scope::Provided;
        let second = {
            let mut walker = DependencyWalker::new(
                "p",
                &[],
                &DescriptorGraphResolver,
                WalkOptions::default(),
                &progress_bar,
            )
            .with_cache(&mut cache);
            walker.walk(std::slice::from_ref(&api), &mut diagnostics)
        };
        assert_eq!(cache.hits(), 1);
        assert_eq!(first[0].local_packages, second[0].local_packages);
        assert!(!first[0].external);
        assert!(second[0].external);
        assert!(diagnostics.is_empty());
    }
}
