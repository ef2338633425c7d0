//! `find-packages`: where in the dependency tree a package comes from.

use anyhow::Result;
use log::{info, warn};
use serde::{Serialize, Serializer};
use serde_json::json;

use super::{GoalContext, GoalOutput, PackageFilter};
use crate::models::{DependencyTrail, Diagnostics, ParsingContext};
use crate::scanner::trail::render_trails;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PackageLocation {
    pub package: String,
    pub artifact: String,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub counter: u32,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_trail"
    )]
    pub trail: Option<DependencyTrail>,
}

fn serialize_trail<S>(trail: &Option<DependencyTrail>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match trail {
        Some(trail) => serializer.collect_str(trail),
        None => serializer.serialize_none(),
    }
}

/// Every location below `contexts` holding a package `filter` accepts, in
/// walk order.
pub fn find_package_locations(
    contexts: &[ParsingContext],
    filter: &PackageFilter,
) -> Vec<PackageLocation> {
    let mut found = Vec::new();
    for context in contexts.iter().flat_map(|context| context.walk()) {
        for (package, location) in &context.local_packages {
            if !filter.matches(package) {
                continue;
            }
            found.push(PackageLocation {
                package: package.clone(),
                artifact: context.coordinates(),
                location: location.location.clone(),
                version: location.effective_version().map(str::to_string),
                counter: location.counter,
                trail: context.trail.clone(),
            });
        }
    }
    found
}

pub fn run(
    context: &GoalContext,
    packages: &[String],
    diagnostics: &mut Diagnostics,
) -> Result<GoalOutput> {
    let filter = PackageFilter::new(packages);
    let dependencies = context.walk_dependencies(diagnostics)?;
    let found = find_package_locations(&dependencies, &filter);

    for requested in packages {
        let requested_filter = PackageFilter::new(std::slice::from_ref(requested));
        if !found.iter().any(|f| requested_filter.matches(&f.package)) {
            warn!("Package {} was not found in any dependency", requested);
        }
    }
    for location in &found {
        info!(
            "{} found in {} (version {}, {} occurrence(s))",
            location.package,
            location.location,
            location.version.as_deref().unwrap_or("unknown"),
            location.counter
        );
        if let Some(trail) = &location.trail {
            info!("{}", render_trails(std::slice::from_ref(trail)));
        }
    }

    Ok(GoalOutput {
        properties: Default::default(),
        result: json!({ "packages": packages, "locations": found }),
    })
}
