//! Analyzer configuration.
//!
//! Read from an optional TOML file; every field has a default so an empty or
//! missing file behaves like the stock settings:
//!
//! ```toml
//! [dependencies]
//! exclusions = ["org.apache.tomcat:*", "*:servlet-api"]
//! scan_class_references = false
//! fail_build_on_split_packages = false
//!
//! [missing_exports]
//! enabled = true
//! search_maven_central = true
//!
//! [system_packages]
//! properties_file = "src/main/resources/dependencies.properties"
//!
//! [framework]
//! extra_jar_directories = ["target/lib"]
//! exclude_packages = ["org.apache.jsp.*"]
//!
//! [properties]
//! "jahia.version" = "8.1.0"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::AnalysisError;
use crate::parsers::properties::DEFAULT_SYSTEM_PACKAGES_KEY;
use crate::resolve::ImportPolicy;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub dependencies: DependenciesConfig,
    pub missing_exports: MissingExportsConfig,
    pub system_packages: SystemPackagesConfig,
    pub cache: CacheConfig,
    pub framework: FrameworkConfig,
    /// Extra properties for `${name}` substitution; `-D` flags override them.
    pub properties: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DependenciesConfig {
    /// `groupId:artifactId` globs of artifacts to skip.
    pub exclusions: Vec<String>,
    pub include_test_scope: bool,
    pub embed_compile_dependencies: bool,
    pub scan_class_references: bool,
    pub import_versions: bool,
    pub fail_build_on_split_packages: bool,
}

impl Default for DependenciesConfig {
    fn default() -> Self {
        DependenciesConfig {
            exclusions: Vec::new(),
            include_test_scope: false,
            embed_compile_dependencies: true,
            scan_class_references: false,
            import_versions: false,
            fail_build_on_split_packages: false,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissingExportsConfig {
    pub enabled: bool,
    pub fail_build_on_missing_package_exports: bool,
    pub search_maven_central: bool,
    pub import_policy: ImportPolicy,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemPackagesConfig {
    /// Properties file holding the list; the bundled default when unset.
    pub properties_file: Option<PathBuf>,
    pub key: String,
}

impl Default for SystemPackagesConfig {
    fn default() -> Self {
        SystemPackagesConfig {
            properties_file: None,
            key: DEFAULT_SYSTEM_PACKAGES_KEY.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Defaults to `<build output>/../osgi-deps-cache`.
    pub directory: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            enabled: true,
            directory: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameworkConfig {
    pub extra_jar_directories: Vec<PathBuf>,
    pub include_dependencies: bool,
    pub exclude_packages: Vec<String>,
    /// Export-Package value to merge the scanned packages into.
    pub existing_export_package: Option<String>,
}

impl AnalyzerConfig {
    /// Loads `path`; relative paths inside are resolved against the file's
    /// directory.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration {:?}", path))?;
        let mut config: AnalyzerConfig =
            toml::from_str(&content).map_err(|e| AnalysisError::InvalidConfig {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        if let Some(base) = path.parent() {
            config.rebase(base);
        }
        Ok(config)
    }

    /// `path` when given, the defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    fn rebase(&mut self, base: &Path) {
        let rebase = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        if let Some(path) = self.system_packages.properties_file.as_mut() {
            rebase(path);
        }
        if let Some(path) = self.cache.directory.as_mut() {
            rebase(path);
        }
        self.framework.extra_jar_directories.iter_mut().for_each(rebase);
    }

    /// Configured properties overlaid with `overrides` (`-D` flags).
    pub fn system_properties(&self, overrides: &[(String, String)]) -> HashMap<String, String> {
        let mut properties: HashMap<String, String> = self
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        properties.extend(overrides.iter().cloned());
        properties
    }
}
