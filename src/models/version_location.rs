use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Occurrences of one package inside one location (a JAR, a directory or a
/// JAR nested in a WAR).
///
/// A `Some` version is frozen once recorded; later observations only bump the
/// counter. A `None` version may still be filled by a later observation that
/// carries one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionLocation {
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specification_version: Option<String>,
    pub counter: u32,
}

impl VersionLocation {
    pub fn new(
        location: impl Into<String>,
        version: Option<String>,
        specification_version: Option<String>,
    ) -> Self {
        VersionLocation {
            location: location.into(),
            version,
            specification_version,
            counter: 0,
        }
    }

    /// The version used for comparisons: the implementation version, or the
    /// specification version when no implementation version is known.
    pub fn effective_version(&self) -> Option<&str> {
        self.version
            .as_deref()
            .or(self.specification_version.as_deref())
    }

    /// Counts `occurrences` more observations, filling versions still unset.
    pub fn observe(
        &mut self,
        version: Option<&str>,
        specification_version: Option<&str>,
        occurrences: u32,
    ) {
        if self.version.is_none() {
            self.version = version.map(str::to_string);
        }
        if self.specification_version.is_none() {
            self.specification_version = specification_version.map(str::to_string);
        }
        self.counter += occurrences;
    }
}

/// Package name -> location -> [`VersionLocation`].
///
/// This is the write side of split-package detection: scanners record
/// observations here, [`crate::resolve::split`] reads it afterwards. Both
/// levels are ordered maps so resolution never depends on hash order.
#[derive(Clone, Debug, Default, Serialize)]
pub struct PackageTable {
    packages: BTreeMap<String, BTreeMap<String, VersionLocation>>,
}

impl PackageTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one class or resource file seen under `package` in `location`.
    pub fn record(
        &mut self,
        package: &str,
        location: &str,
        version: Option<&str>,
        specification_version: Option<&str>,
    ) {
        self.record_many(package, location, version, specification_version, 1);
    }

    pub fn record_many(
        &mut self,
        package: &str,
        location: &str,
        version: Option<&str>,
        specification_version: Option<&str>,
        occurrences: u32,
    ) {
        if occurrences == 0 {
            return;
        }
        self.packages
            .entry(package.to_string())
            .or_default()
            .entry(location.to_string())
            .or_insert_with(|| VersionLocation::new(location, None, None))
            .observe(version, specification_version, occurrences);
    }

    /// Replays a previously computed observation, e.g. one restored from the
    /// cache.
    pub fn merge(&mut self, package: &str, observation: &VersionLocation) {
        self.record_many(
            package,
            &observation.location,
            observation.version.as_deref(),
            observation.specification_version.as_deref(),
            observation.counter,
        );
    }

    pub fn locations(&self, package: &str) -> Option<&BTreeMap<String, VersionLocation>> {
        self.packages.get(package)
    }

    pub fn contains(&self, package: &str) -> bool {
        self.packages.contains_key(package)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeMap<String, VersionLocation>)> {
        self.packages.iter()
    }

    pub fn package_names(&self) -> impl Iterator<Item = &String> {
        self.packages.keys()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_counts_per_location() {
        let mut table = PackageTable::new();
        table.record("org.a", "one.jar", Some("1.0"), None);
        table.record("org.a", "one.jar", Some("1.0"), None);
        table.record("org.a", "two.jar", Some("2.0"), None);

        let locations = table.locations("org.a").unwrap();
        assert_eq!(locations["one.jar"].counter, 2);
        assert_eq!(locations["two.jar"].counter, 1);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_version_is_frozen_once_set() {
        let mut table = PackageTable::new();
        table.record("org.a", "one.jar", Some("1.0"), None);
        table.record("org.a", "one.jar", Some("9.9"), Some("9"));

        let observation = &table.locations("org.a").unwrap()["one.jar"];
        assert_eq!(observation.version.as_deref(), Some("1.0"));
        assert_eq!(observation.specification_version.as_deref(), Some("9"));
        assert_eq!(observation.counter, 2);
    }

    #[test]
    fn test_missing_version_is_filled_later() {
        let mut table = PackageTable::new();
        table.record("org.a", "one.jar", None, None);
        table.record("org.a", "one.jar", Some("1.0"), None);

        let observation = &table.locations("org.a").unwrap()["one.jar"];
        assert_eq!(observation.version.as_deref(), Some("1.0"));
    }

    #[test]
    fn test_merge_replays_counter() {
        let mut source = VersionLocation::new("one.jar", Some("1.0".to_string()), None);
        source.counter = 7;

        let mut table = PackageTable::new();
        table.merge("org.a", &source);
        assert_eq!(table.locations("org.a").unwrap()["one.jar"], source);
    }

    #[test]
    fn test_effective_version_falls_back_to_specification() {
        let location = VersionLocation::new("x", None, Some("2.5".to_string()));
        assert_eq!(location.effective_version(), Some("2.5"));
    }
}
