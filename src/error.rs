use std::path::PathBuf;
use thiserror::Error;

/// Conditions that stop an analysis run.
///
/// Data-quality problems (unparseable resources, unresolvable graphs,
/// duplicate imports) are never errors: they are recorded as
/// [`crate::models::Diagnostic`]s. Split packages and missing exports only
/// become errors when the matching `fail_build_on_*` policy is set.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("no artifact found at {path:?}; was the bundle packaged before this goal ran?")]
    MissingArtifact { path: PathBuf },

    #[error("cannot create cache directory {path:?}: {message}")]
    CacheDirectory { path: PathBuf, message: String },

    #[error("{} split package(s) detected: {}", packages.len(), packages.join(", "))]
    SplitPackages { packages: Vec<String> },

    #[error("{} imported package(s) have no matching export: {}", packages.len(), packages.join(", "))]
    MissingPackageExports { packages: Vec<String> },

    #[error("invalid exclusion pattern {pattern:?}: {message}")]
    InvalidExclusion { pattern: String, message: String },

    #[error("invalid project descriptor {path:?}: {message}")]
    InvalidDescriptor { path: PathBuf, message: String },

    #[error("invalid configuration {path:?}: {message}")]
    InvalidConfig { path: PathBuf, message: String },
}
