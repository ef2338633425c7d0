//! Known exports and the bundle's generated Import-Package list.

use log::debug;
use std::collections::{BTreeMap, BTreeSet};

use super::split::Resolution;
use crate::lookup::ArtifactLookup;
use crate::models::{
    Diagnostic, Diagnostics, ManifestValueClause, PackageInfo, ParsingContext, TaglibInfo,
    VERSION_ATTRIBUTE, format_header,
};
use crate::parsers::properties::SystemPackages;

/// Every package some party provides at runtime: the framework, the
/// dependencies and the project itself.
#[derive(Clone, Debug, Default)]
pub struct KnownExports {
    packages: BTreeMap<String, PackageInfo>,
}

impl KnownExports {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(
        system: &SystemPackages,
        project: &ParsingContext,
        dependencies: &[ParsingContext],
        resolution: &Resolution,
    ) -> Self {
        let mut known = KnownExports::new();
        for package in system.iter() {
            known.add(package.clone());
        }
        for context in dependencies.iter().flat_map(|context| context.walk()) {
            for export in &context.package_exports {
                known.add(export.clone().with_source_location(context.location.clone()));
            }
            for package in context.local_packages.keys() {
                known.add(
                    PackageInfo::new(package.clone())
                        .with_version(resolution.version(package).map(str::to_string))
                        .with_source_location(context.location.clone()),
                );
            }
        }
        for package in project.local_packages.keys() {
            known.add(
                PackageInfo::new(package.clone())
                    .with_source_location(project.location.clone()),
            );
        }
        known
    }

    /// Adds a declaration. The first version seen for a package is kept;
    /// provenance accumulates.
    pub fn add(&mut self, package: PackageInfo) {
        match self.packages.get_mut(&package.name) {
            Some(existing) => {
                if existing.version.is_none() {
                    existing.version = package.version.clone();
                }
                for location in package.source_locations {
                    existing.add_source_location(location);
                }
            }
            None => {
                self.packages.insert(package.name.clone(), package);
            }
        }
    }

    pub fn get(&self, package: &str) -> Option<&PackageInfo> {
        self.packages.get(package)
    }

    pub fn contains(&self, package: &str) -> bool {
        self.packages.contains_key(package)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ImportOptions {
    /// Packages inside compile/runtime dependencies are part of the bundle.
    pub embed_compile_dependencies: bool,
    /// Adds the known export version to each import.
    pub import_versions: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        ImportOptions {
            embed_compile_dependencies: true,
            import_versions: false,
        }
    }
}

/// Packages the bundle has to import: everything the project references plus
/// the packages of tag libraries it uses from external JARs, minus what the
/// bundle contains itself and `java.*`.
pub fn compute_imports(
    project: &ParsingContext,
    dependencies: &[ParsingContext],
    known: &KnownExports,
    options: ImportOptions,
    diagnostics: &mut Diagnostics,
) -> Vec<PackageInfo> {
    let mut imports: BTreeMap<String, PackageInfo> = BTreeMap::new();
    let mut add = |name: &str, optional: bool, location: &str| {
        let entry = imports
            .entry(name.to_string())
            .or_insert_with(|| PackageInfo::new(name).with_optional(optional));
        entry.optional &= optional;
        entry.add_source_location(location);
    };

    for package in &project.references.packages {
        add(package, false, &project.location);
    }

    let taglibs = collect_taglibs(project, dependencies);
    for uri in &project.references.taglib_uris {
        match taglibs.get(uri.as_str()) {
            Some(taglib) if taglib.external => {
                let location = taglib.source_location.as_deref().unwrap_or(uri);
                for package in &taglib.packages {
                    add(package, taglib.optional, location);
                }
            }
            Some(_) => debug!("Taglib {} is embedded in the bundle", uri),
            None => diagnostics.push(Diagnostic::UnresolvedTaglib { uri: uri.clone() }),
        }
    }

    let external = project.without_local_packages(imports.keys());
    let embedded = embedded_packages(dependencies, options);
    imports
        .into_values()
        .filter(|package| {
            !package.is_java_platform()
                && external.contains(&package.name)
                && !embedded.contains(&package.name)
        })
        .map(|mut package| {
            if options.import_versions {
                package.version = known.get(&package.name).and_then(|k| k.version.clone());
            }
            package
        })
        .collect()
}

/// Tag libraries by URI; the project's own TLDs take precedence.
fn collect_taglibs<'a>(
    project: &'a ParsingContext,
    dependencies: &'a [ParsingContext],
) -> BTreeMap<&'a str, &'a TaglibInfo> {
    let mut taglibs = BTreeMap::new();
    let contexts = std::iter::once(project).chain(dependencies.iter().flat_map(|c| c.walk()));
    for context in contexts {
        for (uri, taglib) in &context.references.taglibs {
            taglibs.entry(uri.as_str()).or_insert(taglib);
        }
    }
    taglibs
}

/// Packages of dependencies embedded in the bundle.
fn embedded_packages(dependencies: &[ParsingContext], options: ImportOptions) -> BTreeSet<String> {
    let mut bundled = BTreeSet::new();
    if options.embed_compile_dependencies {
        for context in dependencies.iter().flat_map(|context| context.walk()) {
            if context.is_embedded() {
                bundled.extend(context.local_packages.keys().cloned());
            }
        }
    }
    bundled
}

/// Flags imports no known export satisfies. Each one becomes optional and
/// unversioned and yields a [`Diagnostic::MissingExport`]. Returns the
/// missing package names.
pub fn detect_missing_exports(
    imports: &mut [PackageInfo],
    known: &KnownExports,
    lookup: Option<&dyn ArtifactLookup>,
    used_by: impl Fn(&str) -> Vec<String>,
    diagnostics: &mut Diagnostics,
) -> Vec<String> {
    let mut missing = Vec::new();
    for import in imports.iter_mut() {
        if known.contains(&import.name) {
            continue;
        }
        import.mark_missing();
        diagnostics.push(missing_export(&import.name, lookup, &used_by));
        missing.push(import.name.clone());
    }
    missing
}

pub fn missing_export(
    package: &str,
    lookup: Option<&dyn ArtifactLookup>,
    used_by: impl Fn(&str) -> Vec<String>,
) -> Diagnostic {
    Diagnostic::MissingExport {
        package: package.to_string(),
        candidates: lookup
            .map(|lookup| lookup.find_artifacts_for_package(package))
            .unwrap_or_default(),
        used_by: used_by(package),
    }
}

/// Formats imports as an Import-Package value.
pub fn format_imports(imports: &[PackageInfo]) -> String {
    let clauses: Vec<ManifestValueClause> = imports
        .iter()
        .map(|package| {
            let mut clause = ManifestValueClause::new(package.name.clone());
            if let Some(version) = &package.version {
                clause.set_attribute(VERSION_ATTRIBUTE, version.clone());
            }
            if package.optional {
                clause.make_optional();
            }
            clause
        })
        .collect();
    format_header(&clauses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Artifact, Scope};

    fn dependency(artifact_id: &str, scope: Scope, packages: &[&str]) -> ParsingContext {
        let mut artifact = Artifact::new("g", artifact_id, "1.0");
        artifact.scope = scope;
        artifact.file = Some(format!("{}-1.0.jar", artifact_id).into());
        let mut context = ParsingContext::for_artifact(&artifact);
        for package in packages {
            context.observe_package(package, Some("1.0"), None);
        }
        context
    }

    fn project() -> ParsingContext {
        let mut project = ParsingContext::new("g", "module", "1.0");
        project.location = "target/classes".to_string();
        project.observe_package("org.module", None, None);
        for package in ["org.module", "org.provided", "org.embedded", "java.util", "org.nowhere"] {
            project.references.packages.insert(package.to_string());
        }
        project
    }

    struct FixedLookup;

    impl ArtifactLookup for FixedLookup {
        fn find_artifacts_for_package(&self, _package: &str) -> Vec<String> {
            vec!["g:candidate:1.0".to_string()]
        }
    }

    #[test]
    fn test_project_and_embedded_packages_are_not_imported() {
        let project = project();
        let dependencies = vec![
            dependency("provided", Scope::Provided, &["org.provided", "org.module"]),
            dependency("embedded", Scope::Compile, &["org.embedded"]),
        ];
        let known = KnownExports::build(
            &SystemPackages::default(),
            &project,
            &dependencies,
            &Resolution::default(),
        );
        let mut diagnostics = Diagnostics::new();

        let imports = compute_imports(
            &project,
            &dependencies,
            &known,
            ImportOptions::default(),
            &mut diagnostics,
        );
        let names: Vec<_> = imports.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["org.nowhere", "org.provided"]);

        let imports = compute_imports(
            &project,
            &dependencies,
            &known,
            ImportOptions {
                embed_compile_dependencies: false,
                import_versions: false,
            },
            &mut diagnostics,
        );
        assert_eq!(imports.len(), 3);
    }

    #[test]
    fn test_external_taglibs_become_imports() {
        let mut project = ParsingContext::new("g", "module", "1.0");
        project.references.taglib_uris.insert("urn:ext".to_string());
        project.references.taglib_uris.insert("urn:unknown".to_string());

        let mut taglib = dependency("tags", Scope::Provided, &[]);
        taglib.references.add_taglib_package("urn:ext", "org.tags");
        let mut artifact = Artifact::new("g", "tags", "1.0");
        artifact.scope = Scope::Provided;
        artifact.optional = true;
        taglib.apply_dependency_flags(&artifact);

        let mut diagnostics = Diagnostics::new();
        let imports = compute_imports(
            &project,
            &[taglib],
            &KnownExports::new(),
            ImportOptions::default(),
            &mut diagnostics,
        );

        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].name, "org.tags");
        assert!(imports[0].optional);
        assert!(matches!(
            diagnostics.iter().next(),
            Some(Diagnostic::UnresolvedTaglib { uri }) if uri == "urn:unknown"
        ));
    }

    #[test]
    fn test_missing_exports_are_flagged_with_candidates() {
        let mut known = KnownExports::new();
        known.add(PackageInfo::new("org.known").with_version(Some("2.0".to_string())));
        let mut imports = vec![
            PackageInfo::new("org.known"),
            PackageInfo::new("org.missing").with_version(Some("1.0".to_string())),
        ];
        let mut diagnostics = Diagnostics::new();

        let missing = detect_missing_exports(
            &mut imports,
            &known,
            Some(&FixedLookup),
            |_| vec!["org.module.Service".to_string()],
            &mut diagnostics,
        );

        assert_eq!(missing, vec!["org.missing"]);
        assert!(imports[1].optional);
        assert_eq!(imports[1].version, None);
        assert_eq!(
            diagnostics.iter().next(),
            Some(&Diagnostic::MissingExport {
                package: "org.missing".to_string(),
                candidates: vec!["g:candidate:1.0".to_string()],
                used_by: vec!["org.module.Service".to_string()],
            })
        );
        assert_eq!(
            format_imports(&imports),
            "org.known,org.missing;resolution:=optional"
        );
    }

    #[test]
    fn test_import_versions_come_from_known_exports() {
        let project = project();
        let mut known = KnownExports::new();
        known.add(PackageInfo::new("org.provided").with_version(Some("3.1".to_string())));

        let imports = compute_imports(
            &project,
            &[],
            &known,
            ImportOptions {
                embed_compile_dependencies: true,
                import_versions: true,
            },
            &mut Diagnostics::new(),
        );
        let formatted = format_imports(&imports);
        assert!(formatted.contains("org.provided;version=\"3.1\""));
        assert!(formatted.contains("org.nowhere"));
    }
}
