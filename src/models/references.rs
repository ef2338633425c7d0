use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::package_info::{is_java_platform_package, package_of_class_name};

/// Packages that implement the tags and functions of one tag library.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaglibInfo {
    pub uri: String,
    pub packages: BTreeSet<String>,
    /// The TLD lives in a JAR that is not embedded in the bundle (provided,
    /// system or optional dependency).
    #[serde(default)]
    pub external: bool,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_location: Option<String>,
}

/// Accumulator shared by the resource scanners.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceReferences {
    #[serde(default)]
    pub packages: BTreeSet<String>,
    #[serde(default)]
    pub taglib_uris: BTreeSet<String>,
    #[serde(default)]
    pub taglibs: BTreeMap<String, TaglibInfo>,
    #[serde(default)]
    pub content_type_definitions: BTreeSet<String>,
    #[serde(default)]
    pub content_type_references: BTreeSet<String>,
}

impl ResourceReferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a referenced package; empty names and `java.*` are ignored.
    pub fn add_package(&mut self, package: &str) {
        let package = package.trim();
        if package.is_empty() || is_java_platform_package(package) {
            return;
        }
        self.packages.insert(package.to_string());
    }

    /// Adds the package of a referenced class name, see
    /// [`package_of_class_name`].
    pub fn add_class_reference(&mut self, class_name: &str) {
        if let Some(package) = package_of_class_name(class_name) {
            self.add_package(&package);
        }
    }

    pub fn add_taglib_package(&mut self, uri: &str, package: &str) {
        if is_java_platform_package(package) {
            return;
        }
        self.taglibs
            .entry(uri.to_string())
            .or_insert_with(|| TaglibInfo {
                uri: uri.to_string(),
                ..TaglibInfo::default()
            })
            .packages
            .insert(package.to_string());
    }

    /// Flags every tag library collected so far with the nature of the JAR
    /// it came from.
    pub fn mark_taglibs(&mut self, location: &str, external: bool, optional: bool) {
        for taglib in self.taglibs.values_mut() {
            taglib.external = external;
            taglib.optional = optional;
            taglib.source_location = Some(location.to_string());
        }
    }

    pub fn merge(&mut self, other: &ResourceReferences) {
        self.packages.extend(other.packages.iter().cloned());
        self.taglib_uris.extend(other.taglib_uris.iter().cloned());
        for (uri, taglib) in &other.taglibs {
            let entry = self
                .taglibs
                .entry(uri.clone())
                .or_insert_with(|| taglib.clone());
            entry.packages.extend(taglib.packages.iter().cloned());
        }
        self.content_type_definitions
            .extend(other.content_type_definitions.iter().cloned());
        self.content_type_references
            .extend(other.content_type_references.iter().cloned());
    }

    /// Content types referenced but not defined here.
    pub fn required_content_types(&self) -> BTreeSet<String> {
        self.content_type_references
            .difference(&self.content_type_definitions)
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
            && self.taglib_uris.is_empty()
            && self.taglibs.is_empty()
            && self.content_type_definitions.is_empty()
            && self.content_type_references.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_java_packages_are_never_added() {
        let mut refs = ResourceReferences::new();
        refs.add_class_reference("java.util.List");
        refs.add_package("java.io");
        refs.add_class_reference("javax.servlet.Servlet");

        assert_eq!(refs.packages.len(), 1);
        assert!(refs.packages.contains("javax.servlet"));
    }

    #[test]
    fn test_merge_unions_taglib_packages() {
        let mut left = ResourceReferences::new();
        left.add_taglib_package("uri", "org.a");
        let mut right = ResourceReferences::new();
        right.add_taglib_package("uri", "org.b");
        right.content_type_references.insert("jnt:page".to_string());

        left.merge(&right);
        assert_eq!(left.taglibs["uri"].packages.len(), 2);
        assert!(left.content_type_references.contains("jnt:page"));
    }

    #[test]
    fn test_required_content_types_skip_definitions() {
        let mut refs = ResourceReferences::new();
        refs.content_type_definitions.insert("my:type".to_string());
        refs.content_type_references.insert("my:type".to_string());
        refs.content_type_references.insert("nt:base".to_string());

        let required: Vec<_> = refs.required_content_types().into_iter().collect();
        assert_eq!(required, vec!["nt:base"]);
    }
}
