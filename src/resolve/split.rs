//! Split-package resolution.
//!
//! Reads the [`PackageTable`] filled during scanning and picks one version
//! per package: the version of the location with the highest counter. When
//! counters tie, the location that sorts first wins and a
//! [`Diagnostic::VersionTie`] is recorded.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::models::{Diagnostic, Diagnostics, LocationCount, PackageTable, VersionLocation};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// Winning version per package; `None` when the winner had no version.
    pub versions: BTreeMap<String, Option<String>>,
    pub split_packages: BTreeSet<String>,
}

impl Resolution {
    pub fn version(&self, package: &str) -> Option<&str> {
        self.versions.get(package).and_then(|v| v.as_deref())
    }

    pub fn contains(&self, package: &str) -> bool {
        self.versions.contains_key(package)
    }

    pub fn is_split(&self, package: &str) -> bool {
        self.split_packages.contains(package)
    }
}

/// Resolves every package of `table`.
pub fn resolve(table: &PackageTable, diagnostics: &mut Diagnostics) -> Resolution {
    let mut resolution = Resolution::default();
    for (package, locations) in table.iter() {
        let Some(winner) = select_winner(package, locations, diagnostics) else {
            continue;
        };
        let version = winner.effective_version().map(str::to_string);

        if is_split(locations) {
            diagnostics.push(Diagnostic::SplitPackage {
                package: package.clone(),
                winning_version: version.clone(),
                locations: locations
                    .values()
                    .map(|observation| LocationCount {
                        location: observation.location.clone(),
                        version: observation.effective_version().map(str::to_string),
                        counter: observation.counter,
                    })
                    .collect(),
            });
            resolution.split_packages.insert(package.clone());
        }
        resolution.versions.insert(package.clone(), version);
    }
    resolution
}

/// Highest counter wins; only a strictly greater counter replaces the current
/// winner, so the first location in key order wins ties.
fn select_winner<'a>(
    package: &str,
    locations: &'a BTreeMap<String, VersionLocation>,
    diagnostics: &mut Diagnostics,
) -> Option<&'a VersionLocation> {
    let mut winner: Option<&VersionLocation> = None;
    for observation in locations.values() {
        if winner.is_none_or(|current| observation.counter > current.counter) {
            winner = Some(observation);
        }
    }
    let winner = winner?;

    let tied: Vec<&VersionLocation> = locations
        .values()
        .filter(|observation| observation.counter == winner.counter)
        .collect();
    let versions: BTreeSet<Option<&str>> = tied.iter().map(|o| o.effective_version()).collect();
    if versions.len() > 1 {
        diagnostics.push(Diagnostic::VersionTie {
            package: package.to_string(),
            counter: winner.counter,
            locations: tied.iter().map(|o| o.location.clone()).collect(),
            chosen: winner.location.clone(),
        });
    }
    Some(winner)
}

/// A package is split when at least two of its locations disagree on the
/// version. A single location never is.
fn is_split(locations: &BTreeMap<String, VersionLocation>) -> bool {
    let mut versions = locations.values().map(VersionLocation::effective_version);
    match versions.next() {
        Some(first) => versions.any(|version| version != first),
        None => false,
    }
}
