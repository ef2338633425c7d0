//! Framework package list: the Export-Package value of the system bundle.

use glob::Pattern;
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use std::collections::BTreeMap;

use super::split::Resolution;
use crate::models::{ManifestValueClause, parse_header};

const JAHIA_PACKAGE_PREFIX: &str = "org.jahia.";

lazy_static! {
    static ref VERSION_PREFIX: Regex =
        Regex::new(r"([\d.]*\d)(.*)").expect("valid version regex");
}

/// Keeps the numeric dotted prefix of a version (`2.3.1.SNAPSHOT-build42`
/// -> `2.3.1`). Versions without any digit are dropped.
pub fn normalize_version(version: &str) -> Option<String> {
    VERSION_PREFIX
        .captures(version)
        .map(|caps| caps[1].trim_start_matches('.').to_string())
        .filter(|prefix| !prefix.is_empty())
}

/// Merges scanned packages with an existing Export-Package header.
///
/// - `org.jahia.*` clauses declared at the bundle version are kept as they are.
/// - Other clauses keep an explicit version, and stay unversioned otherwise.
/// - Packages only found by scanning get their normalized winning version.
///
/// Packages matching one of `excludes` are dropped from the result.
pub fn merge_framework_packages(
    resolution: &Resolution,
    existing_export_package: Option<&str>,
    bundle_version: &str,
    excludes: &[Pattern],
) -> BTreeMap<String, Option<String>> {
    let mut packages: BTreeMap<String, Option<String>> = resolution
        .versions
        .iter()
        .map(|(package, version)| {
            (
                package.clone(),
                version.as_deref().and_then(normalize_version),
            )
        })
        .collect();

    let bundle_version = normalize_version(bundle_version);
    for clause in existing_export_package.map(parse_header).unwrap_or_default() {
        for path in &clause.paths {
            packages.insert(path.clone(), existing_version(path, &clause, bundle_version.as_deref()));
        }
    }

    packages.retain(|package, _| {
        let excluded = excludes.iter().any(|pattern| pattern.matches(package));
        if excluded {
            debug!("Excluding framework package {}", package);
        }
        !excluded
    });
    packages
}

fn existing_version(
    package: &str,
    clause: &ManifestValueClause,
    bundle_version: Option<&str>,
) -> Option<String> {
    let declared = clause.version()?;
    if package.starts_with(JAHIA_PACKAGE_PREFIX)
        && normalize_version(declared).as_deref() == bundle_version
    {
        return Some(declared.to_string());
    }
    normalize_version(declared)
}

/// `pkg;version="1.0",other` in package order.
pub fn format_package_list(packages: &BTreeMap<String, Option<String>>) -> String {
    packages
        .iter()
        .map(|(package, version)| match version {
            Some(version) => format!("{};version=\"{}\"", package, version),
            None => package.clone(),
        })
        .collect::<Vec<_>>()
        .join(",")
}
