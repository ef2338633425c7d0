//! Project and dependency artifacts as handed over by the build.
//!
//! The build tool resolves the project's dependency graph and writes it out as
//! a JSON project descriptor:
//!
//! ```json
//! {
//!   "groupId": "org.example",
//!   "artifactId": "my-module",
//!   "version": "1.0.0",
//!   "packaging": "bundle",
//!   "buildOutputDirectory": "target/classes",
//!   "resourceDirectories": ["src/main/resources"],
//!   "dependencies": [
//!     { "groupId": "org.slf4j", "artifactId": "slf4j-api", "version": "1.7.36",
//!       "scope": "provided", "file": "/m2/org/slf4j/slf4j-api-1.7.36.jar" }
//!   ]
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::AnalysisError;

/// Maven dependency scope.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Scope {
    #[default]
    Compile,
    Provided,
    Runtime,
    Test,
    System,
    Import,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compile => "compile",
            Self::Provided => "provided",
            Self::Runtime => "runtime",
            Self::Test => "test",
            Self::System => "system",
            Self::Import => "import",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "compile" | "" => Ok(Scope::Compile),
            "provided" => Ok(Scope::Provided),
            "runtime" => Ok(Scope::Runtime),
            "test" => Ok(Scope::Test),
            "system" => Ok(Scope::System),
            "import" => Ok(Scope::Import),
            other => Err(format!("unknown dependency scope: {}", other)),
        }
    }
}

impl Serialize for Scope {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Scope {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

fn default_type() -> String {
    "jar".to_string()
}

/// A resolved dependency. `dependencies` holds the artifact's own resolved
/// graph when the build supplied one (used for WAR dependencies).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    #[serde(rename = "type", default = "default_type")]
    pub artifact_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier: Option<String>,
    #[serde(default)]
    pub scope: Scope,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Artifact>,
}

impl Artifact {
    pub fn new(group_id: &str, artifact_id: &str, version: &str) -> Self {
        Artifact {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
            version: version.to_string(),
            artifact_type: default_type(),
            ..Artifact::default()
        }
    }

    /// `groupId:artifactId`, the form exclusion patterns are matched against.
    pub fn key(&self) -> String {
        format!("{}:{}", self.group_id, self.artifact_id)
    }

    /// `groupId:artifactId:type[:classifier]:version`
    pub fn coordinates(&self) -> String {
        match &self.classifier {
            Some(classifier) => format!(
                "{}:{}:{}:{}:{}",
                self.group_id, self.artifact_id, self.artifact_type, classifier, self.version
            ),
            None => format!(
                "{}:{}:{}:{}",
                self.group_id, self.artifact_id, self.artifact_type, self.version
            ),
        }
    }

    /// Name the artifact gets when copied into a `WEB-INF/lib` directory.
    pub fn file_name(&self) -> String {
        let extension = if self.artifact_type == "bundle" {
            "jar"
        } else {
            self.artifact_type.as_str()
        };
        match &self.classifier {
            Some(classifier) => format!(
                "{}-{}-{}.{}",
                self.artifact_id, self.version, classifier, extension
            ),
            None => format!("{}-{}.{}", self.artifact_id, self.version, extension),
        }
    }

    pub fn is_war(&self) -> bool {
        self.artifact_type == "war"
    }

    /// Not embedded in the bundle: the runtime has to provide it.
    pub fn is_external(&self) -> bool {
        self.optional || matches!(self.scope, Scope::Provided | Scope::System)
    }

    /// Location string used in package tables and diagnostics.
    pub fn location(&self) -> String {
        match &self.file {
            Some(file) => file.to_string_lossy().to_string(),
            None => self.coordinates(),
        }
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.coordinates())
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDescriptor {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    #[serde(default = "default_packaging")]
    pub packaging: String,
    pub build_output_directory: PathBuf,
    #[serde(default)]
    pub resource_directories: Vec<PathBuf>,
    #[serde(default)]
    pub dependencies: Vec<Artifact>,
}

fn default_packaging() -> String {
    "bundle".to_string()
}

impl ProjectDescriptor {
    /// Loads a descriptor; relative directories are resolved against the
    /// descriptor's own directory.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read project descriptor {:?}", path))?;
        let mut descriptor: ProjectDescriptor =
            serde_json::from_str(&content).map_err(|e| AnalysisError::InvalidDescriptor {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        if let Some(base) = path.parent() {
            descriptor.rebase(base);
        }
        Ok(descriptor)
    }

    fn rebase(&mut self, base: &Path) {
        if self.build_output_directory.is_relative() {
            self.build_output_directory = base.join(&self.build_output_directory);
        }
        for directory in &mut self.resource_directories {
            if directory.is_relative() {
                *directory = base.join(&*directory);
            }
        }
        rebase_artifacts(&mut self.dependencies, base);
    }

    pub fn coordinates(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.group_id, self.artifact_id, self.packaging, self.version
        )
    }

    /// Where the packaged bundle lands by default: next to the build output
    /// directory, named `<artifactId>-<version>.jar`.
    pub fn default_bundle_path(&self) -> PathBuf {
        let target = self
            .build_output_directory
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        target.join(format!("{}-{}.jar", self.artifact_id, self.version))
    }
}

fn rebase_artifacts(artifacts: &mut [Artifact], base: &Path) {
    for artifact in artifacts {
        if let Some(file) = &artifact.file
            && file.is_relative()
        {
            artifact.file = Some(base.join(file));
        }
        rebase_artifacts(&mut artifact.dependencies, base);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_coordinates_and_file_name() {
        let mut artifact = Artifact::new("org.example", "lib", "1.0");
        assert_eq!(artifact.coordinates(), "org.example:lib:jar:1.0");
        assert_eq!(artifact.file_name(), "lib-1.0.jar");
        assert_eq!(artifact.key(), "org.example:lib");

        artifact.classifier = Some("tests".to_string());
        assert_eq!(artifact.coordinates(), "org.example:lib:jar:tests:1.0");
        assert_eq!(artifact.file_name(), "lib-1.0-tests.jar");
    }

    #[test]
    fn test_external_artifacts() {
        let mut artifact = Artifact::new("g", "a", "1");
        assert!(!artifact.is_external());
        artifact.scope = Scope::Provided;
        assert!(artifact.is_external());
        artifact.scope = Scope::Compile;
        artifact.optional = true;
        assert!(artifact.is_external());
    }

    #[test]
    fn test_load_descriptor_rebases_paths() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("project.json");
        fs::write(
            &path,
            r#"{
                "groupId": "org.example",
                "artifactId": "module",
                "version": "1.0",
                "buildOutputDirectory": "target/classes",
                "dependencies": [
                    {"groupId": "g", "artifactId": "a", "version": "2", "scope": "provided",
                     "file": "libs/a-2.jar"}
                ]
            }"#,
        )
        .expect("Failed to write descriptor");

        let descriptor = ProjectDescriptor::load(&path).unwrap();
        assert_eq!(descriptor.packaging, "bundle");
        assert_eq!(
            descriptor.build_output_directory,
            temp_dir.path().join("target/classes")
        );
        assert_eq!(descriptor.dependencies[0].scope, Scope::Provided);
        assert_eq!(descriptor.dependencies[0].artifact_type, "jar");
        assert_eq!(
            descriptor.dependencies[0].file,
            Some(temp_dir.path().join("libs/a-2.jar"))
        );
        assert_eq!(
            descriptor.default_bundle_path(),
            temp_dir.path().join("target/module-1.0.jar")
        );
    }

    #[test]
    fn test_invalid_descriptor_is_typed_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("project.json");
        fs::write(&path, "{ not json").expect("Failed to write descriptor");

        let err = ProjectDescriptor::load(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AnalysisError>(),
            Some(AnalysisError::InvalidDescriptor { .. })
        ));
    }

    #[test]
    fn test_unknown_scope_is_rejected() {
        let result: Result<Artifact, _> = serde_json::from_str(
            r#"{"groupId": "g", "artifactId": "a", "version": "1", "scope": "bogus"}"#,
        );
        assert!(result.is_err());
    }
}
