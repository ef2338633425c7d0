mod artifact;
mod diagnostics;
mod manifest_clause;
mod output;
mod package_info;
mod parsing_context;
mod references;
mod version_location;

pub use artifact::{Artifact, ProjectDescriptor, Scope};
pub use diagnostics::{Diagnostic, Diagnostics, LocationCount};
pub use manifest_clause::{
    ManifestValueClause, RESOLUTION_DIRECTIVE, RESOLUTION_OPTIONAL, VERSION_ATTRIBUTE,
    format_header, parse_header, split_osgi_list,
};
pub use output::{Header, REPORT_FORMAT_VERSION, Report};
pub use package_info::{
    PackageInfo, SYSTEM_PACKAGES_LOCATION, is_java_platform_package, package_of_class_name,
};
pub use parsing_context::{DependencyTrail, ParsingContext};
pub use references::{ResourceReferences, TaglibInfo};
pub use version_location::{PackageTable, VersionLocation};
