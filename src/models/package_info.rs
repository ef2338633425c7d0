use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// Provenance string used for packages supplied by the framework itself.
pub const SYSTEM_PACKAGES_LOCATION: &str = "System packages";

/// A single declaration of a Java package: an import, an export or a package
/// observed inside some artifact.
///
/// Two records denote the *same package* when their names match; version and
/// optionality describe one declaration of it. `Eq` and `Hash` follow that
/// identity.
///
/// `Ord` compares names only so that it agrees with `Eq`: two declarations of
/// one package at different versions compare `Equal`. Listings ordered by
/// name then version sort with [`PackageInfo::cmp_by_name_and_version`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PackageInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_locations: Vec<String>,
}

impl PackageInfo {
    pub fn new(name: impl Into<String>) -> Self {
        PackageInfo {
            name: name.into(),
            version: None,
            optional: false,
            source_locations: Vec::new(),
        }
    }

    pub fn with_version(mut self, version: Option<String>) -> Self {
        self.version = version;
        self
    }

    pub fn with_optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn with_source_location(mut self, location: impl Into<String>) -> Self {
        self.add_source_location(location);
        self
    }

    /// Appends a provenance entry, keeping first-seen order and no duplicates.
    pub fn add_source_location(&mut self, location: impl Into<String>) {
        let location = location.into();
        if !self.source_locations.contains(&location) {
            self.source_locations.push(location);
        }
    }

    /// Flags a package that no known export satisfies.
    pub fn mark_missing(&mut self) {
        self.optional = true;
        self.version = None;
    }

    pub fn is_java_platform(&self) -> bool {
        is_java_platform_package(&self.name)
    }

    /// Name first, then version; an unversioned declaration sorts first.
    pub fn cmp_by_name_and_version(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.version.cmp(&other.version))
    }
}

impl PartialEq for PackageInfo {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for PackageInfo {}

impl Hash for PackageInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl PartialOrd for PackageInfo {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PackageInfo {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}

/// `java.*` packages always come from the JVM boot class path and are never
/// imported through OSGi.
pub fn is_java_platform_package(name: &str) -> bool {
    name == "java" || name.starts_with("java.")
}

/// Derives the package of a dotted class reference.
///
/// Segments are taken up to the first one that looks like a type name
/// (leading uppercase) or a wildcard. When no segment looks like a type, the
/// last segment is assumed to be the class.
///
/// - `"a.b.C"` -> `"a.b"`
/// - `"a.b.C.Inner"` -> `"a.b"`
/// - `"a.b.*"` -> `"a.b"`
/// - `"a.b.c"` -> `"a.b"`
pub fn package_of_class_name(class_name: &str) -> Option<String> {
    let class_name = class_name.trim().trim_end_matches(';').trim();
    if class_name.is_empty() {
        return None;
    }

    let segments: Vec<&str> = class_name.split('.').collect();
    let type_position = segments.iter().position(|segment| {
        *segment == "*"
            || segment
                .chars()
                .next()
                .is_some_and(|first| first.is_ascii_uppercase())
    });

    let package_segments = match type_position {
        Some(position) => &segments[..position],
        None => &segments[..segments.len() - 1],
    };

    if package_segments.is_empty() || package_segments.iter().any(|s| !is_identifier(s)) {
        return None;
    }

    Some(package_segments.join("."))
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' || first == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}
