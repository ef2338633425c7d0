use log::{Level, log};
use serde::Serialize;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LocationCount {
    pub location: String,
    pub version: Option<String>,
    pub counter: u32,
}

/// A non-fatal finding. Every diagnostic is logged when recorded and kept for
/// the JSON report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    ParseFailure {
        location: String,
        resource: String,
        message: String,
    },
    ResolutionFailure {
        artifact: String,
        message: String,
    },
    UnresolvedTaglib {
        uri: String,
    },
    SplitPackage {
        package: String,
        winning_version: Option<String>,
        locations: Vec<LocationCount>,
    },
    VersionTie {
        package: String,
        counter: u32,
        locations: Vec<String>,
        chosen: String,
    },
    DuplicateImport {
        package: String,
    },
    MissingExport {
        package: String,
        candidates: Vec<String>,
        used_by: Vec<String>,
    },
    ExcludedArtifact {
        artifact: String,
        pattern: String,
    },
    PatchFailure {
        jar: String,
        message: String,
    },
    CacheFailure {
        key: String,
        message: String,
    },
}

impl Diagnostic {
    pub fn level(&self) -> Level {
        match self {
            Diagnostic::ExcludedArtifact { .. } => Level::Info,
            Diagnostic::PatchFailure { .. } => Level::Error,
            _ => Level::Warn,
        }
    }

    pub fn package(&self) -> Option<&str> {
        match self {
            Diagnostic::SplitPackage { package, .. }
            | Diagnostic::VersionTie { package, .. }
            | Diagnostic::DuplicateImport { package }
            | Diagnostic::MissingExport { package, .. } => Some(package),
            _ => None,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::ParseFailure {
                location,
                resource,
                message,
            } => write!(f, "Failed to parse {} in {}: {}", resource, location, message),
            Diagnostic::ResolutionFailure { artifact, message } => write!(
                f,
                "Could not resolve dependency graph of {}: {}",
                artifact, message
            ),
            Diagnostic::UnresolvedTaglib { uri } => {
                write!(f, "Couldn't resolve taglib URI {}", uri)
            }
            Diagnostic::SplitPackage {
                package,
                winning_version,
                locations,
            } => {
                write!(
                    f,
                    "Split package {} (using version {}) found in:",
                    package,
                    winning_version.as_deref().unwrap_or("<none>")
                )?;
                for location in locations {
                    write!(
                        f,
                        "\n  {} version={} count={}",
                        location.location,
                        location.version.as_deref().unwrap_or("<none>"),
                        location.counter
                    )?;
                }
                Ok(())
            }
            Diagnostic::VersionTie {
                package,
                counter,
                locations,
                chosen,
            } => write!(
                f,
                "Package {} has {} locations tied at count {}, choosing {}: {}",
                package,
                locations.len(),
                counter,
                chosen,
                locations.join(", ")
            ),
            Diagnostic::DuplicateImport { package } => {
                write!(f, "Removing duplicate import of package {}", package)
            }
            Diagnostic::MissingExport {
                package,
                candidates,
                used_by,
            } => {
                write!(f, "Package {} is imported but not exported by any dependency", package)?;
                if !used_by.is_empty() {
                    write!(f, "\n  used by: {}", used_by.join(", "))?;
                }
                if !candidates.is_empty() {
                    write!(f, "\n  found on Maven Central in: {}", candidates.join(", "))?;
                }
                Ok(())
            }
            Diagnostic::ExcludedArtifact { artifact, pattern } => {
                write!(f, "Excluding artifact {} (matches {})", artifact, pattern)
            }
            Diagnostic::PatchFailure { jar, message } => {
                write!(f, "Failed to update manifest of {}: {}", jar, message)
            }
            Diagnostic::CacheFailure { key, message } => {
                write!(f, "Cache entry {} not usable: {}", key, message)
            }
        }
    }
}

/// Collector that logs each diagnostic as it arrives.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    records: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        log!(diagnostic.level(), "{}", diagnostic);
        self.records.push(diagnostic);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn split_packages(&self) -> Vec<String> {
        self.packages_of(|d| matches!(d, Diagnostic::SplitPackage { .. }))
    }

    pub fn missing_exports(&self) -> Vec<String> {
        self.packages_of(|d| matches!(d, Diagnostic::MissingExport { .. }))
    }

    fn packages_of(&self, filter: impl Fn(&Diagnostic) -> bool) -> Vec<String> {
        self.records
            .iter()
            .filter(|&d| filter(d))
            .filter_map(|d| d.package().map(str::to_string))
            .collect()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.records
    }
}
