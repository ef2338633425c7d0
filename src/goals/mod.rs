//! Analysis goals: one entry point per build step.
//!
//! Every goal takes a [`GoalContext`] and a [`Diagnostics`] collector and
//! returns a [`GoalOutput`]: the project properties to publish plus a JSON
//! payload for the report.

pub mod check_dependencies;
pub mod dependencies;
pub mod find_package_uses;
pub mod find_packages;
pub mod framework_packages;
pub mod output;

use anyhow::Result;
use indicatif::ProgressBar;
use log::info;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use strum::{EnumIter, IntoEnumIterator};

use crate::cache::ParsingContextCache;
use crate::config::AnalyzerConfig;
use crate::error::AnalysisError;
use crate::lookup::ArtifactLookup;
use crate::models::{Diagnostics, PackageTable, ParsingContext, ProjectDescriptor};
use crate::parsers::ScanOptions;
use crate::parsers::properties::SystemPackages;
use crate::resolve::Resolution;
use crate::scanner::{
    DependencyGraphResolver, DependencyWalker, WalkOptions, compile_exclusions, scan_directory,
};

pub const PROJECT_PACKAGE_IMPORT: &str = "jahia.plugin.projectPackageImport";
pub const PROVIDED_NODE_TYPES: &str = "jahia.plugin.providedNodeTypes";
pub const REQUIRED_NODE_TYPES: &str = "jahia.plugin.requiredNodeTypes";
pub const FRAMEWORK_PACKAGE_LIST: &str = "jahiaGeneratedFrameworkPackageList";

const DEFAULT_CACHE_DIR: &str = "osgi-deps-cache";

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter)]
pub enum GoalKind {
    Dependencies,
    CheckDependencies,
    FrameworkPackages,
    FindPackages,
    FindPackageUses,
}

impl GoalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dependencies => "dependencies",
            Self::CheckDependencies => "check-dependencies",
            Self::FrameworkPackages => "framework-packages",
            Self::FindPackages => "find-packages",
            Self::FindPackageUses => "find-package-uses",
        }
    }
}

pub fn list_goals() -> Vec<&'static str> {
    GoalKind::iter().map(|goal| goal.as_str()).collect()
}

/// Everything a goal needs besides its own arguments.
pub struct GoalContext<'a> {
    pub project: &'a ProjectDescriptor,
    pub config: &'a AnalyzerConfig,
    /// `${name}` values from the configuration and `-D` flags.
    pub system_properties: HashMap<String, String>,
    pub resolver: &'a dyn DependencyGraphResolver,
    pub lookup: Option<&'a dyn ArtifactLookup>,
    pub progress_bar: &'a ProgressBar,
}

impl<'a> GoalContext<'a> {
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            class_references: self.config.dependencies.scan_class_references,
        }
    }

    pub fn cache_directory(&self) -> PathBuf {
        self.config.cache.directory.clone().unwrap_or_else(|| {
            self.project
                .build_output_directory
                .parent()
                .map(|target| target.join(DEFAULT_CACHE_DIR))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR))
        })
    }

    pub fn system_packages(&self) -> Result<SystemPackages> {
        let settings = &self.config.system_packages;
        SystemPackages::load(
            settings.properties_file.as_deref(),
            &settings.key,
            &self.system_properties,
        )
    }

    /// The project's own context: packages of the build output directory
    /// plus references found in the build output and resource directories.
    pub fn scan_project(&self, diagnostics: &mut Diagnostics) -> Result<ParsingContext> {
        let project = self.project;
        let mut context =
            ParsingContext::new(&project.group_id, &project.artifact_id, &project.version);
        context.artifact_type = project.packaging.clone();
        context.location = project.build_output_directory.to_string_lossy().to_string();

        let options = self.scan_options();
        let hidden = ProgressBar::hidden();
        scan_directory(
            &project.build_output_directory,
            &mut context,
            true,
            options,
            &hidden,
            diagnostics,
        )?;
        for directory in &project.resource_directories {
            scan_directory(directory, &mut context, false, options, &hidden, diagnostics)?;
        }
        info!(
            "Project {} contains {} package(s)",
            project.artifact_id,
            context.local_packages.len()
        );
        Ok(context)
    }

    /// Scans the project's dependencies, through the cache when enabled.
    pub fn walk_dependencies(&self, diagnostics: &mut Diagnostics) -> Result<Vec<ParsingContext>> {
        let settings = &self.config.dependencies;
        let exclusions = compile_exclusions(&settings.exclusions)?;
        let options = WalkOptions {
            include_test_scope: settings.include_test_scope,
            scan: self.scan_options(),
        };

        let mut cache = if self.config.cache.enabled {
            Some(ParsingContextCache::open(&self.cache_directory())?)
        } else {
            None
        };

        let mut walker = DependencyWalker::new(
            self.project.coordinates(),
            &exclusions,
            self.resolver,
            options,
            self.progress_bar,
        );
        if let Some(cache) = cache.as_mut() {
            walker = walker.with_cache(cache);
        }
        let contexts = walker.walk(&self.project.dependencies, diagnostics);
        info!("Scanned {} dependencies", contexts.len());
        Ok(contexts)
    }
}

/// Properties for the build plus the report payload.
#[derive(Clone, Debug, Default, Serialize)]
pub struct GoalOutput {
    pub properties: BTreeMap<String, String>,
    pub result: serde_json::Value,
}

/// Replays contexts into one package table.
pub fn package_table<'a>(contexts: impl IntoIterator<Item = &'a ParsingContext>) -> PackageTable {
    let mut table = PackageTable::new();
    for context in contexts {
        context.record_into(&mut table);
    }
    table
}

/// Raises the split-package policy error when the policy is on.
pub fn enforce_split_policy(fail_build: bool, resolution: &Resolution) -> Result<()> {
    if fail_build && !resolution.split_packages.is_empty() {
        return Err(AnalysisError::SplitPackages {
            packages: resolution.split_packages.iter().cloned().collect(),
        }
        .into());
    }
    Ok(())
}

pub fn enforce_missing_export_policy(fail_build: bool, missing: &[String]) -> Result<()> {
    if fail_build && !missing.is_empty() {
        return Err(AnalysisError::MissingPackageExports {
            packages: missing.to_vec(),
        }
        .into());
    }
    Ok(())
}

/// Requested package names: `org.a` matches exactly, `org.a.*` matches
/// `org.a` and every subpackage.
#[derive(Clone, Debug, Default)]
pub struct PackageFilter {
    exact: Vec<String>,
    prefixes: Vec<String>,
}

impl PackageFilter {
    pub fn new(patterns: &[String]) -> Self {
        let mut filter = PackageFilter::default();
        for pattern in patterns {
            let pattern = pattern.trim();
            match pattern.strip_suffix(".*") {
                Some(prefix) => filter.prefixes.push(prefix.to_string()),
                None if !pattern.is_empty() => filter.exact.push(pattern.to_string()),
                None => {}
            }
        }
        filter
    }

    pub fn matches(&self, package: &str) -> bool {
        self.exact.iter().any(|exact| exact == package)
            || self.prefixes.iter().any(|prefix| {
                package == prefix
                    || package
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| rest.starts_with('.'))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_filter() {
        let filter = PackageFilter::new(&["org.a".to_string(), "com.b.*".to_string()]);
        assert!(filter.matches("org.a"));
        assert!(!filter.matches("org.a.sub"));
        assert!(filter.matches("com.b"));
        assert!(filter.matches("com.b.c.d"));
        assert!(!filter.matches("com.bc"));
    }

    #[test]
    fn test_policies() {
        let mut resolution = Resolution::default();
        assert!(enforce_split_policy(true, &resolution).is_ok());
        resolution.split_packages.insert("org.a".to_string());
        assert!(enforce_split_policy(false, &resolution).is_ok());
        let err = enforce_split_policy(true, &resolution).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AnalysisError>(),
            Some(AnalysisError::SplitPackages { packages }) if packages == &["org.a"]
        ));

        assert!(enforce_missing_export_policy(true, &[]).is_ok());
        assert!(enforce_missing_export_policy(true, &["org.b".to_string()]).is_err());
    }

    #[test]
    fn test_goal_names() {
        assert_eq!(
            list_goals(),
            vec![
                "dependencies",
                "check-dependencies",
                "framework-packages",
                "find-packages",
                "find-package-uses"
            ]
        );
    }
}
