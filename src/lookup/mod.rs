//! Remediation hints from outside the build.

mod maven_central;

pub use self::maven_central::{HttpClient, MavenCentralSearch, ReqwestClient};

/// Finds artifacts that contain a package.
pub trait ArtifactLookup {
    /// Candidate coordinates (`groupId:artifactId:version`), best first.
    fn find_artifacts_for_package(&self, package: &str) -> Vec<String>;
}
