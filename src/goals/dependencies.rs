//! `dependencies`: generates the bundle's Import-Package list.

use anyhow::Result;
use log::{info, warn};
use serde_json::json;
use std::collections::BTreeSet;

use super::find_package_uses::ClassUsageIndex;
use super::{
    GoalContext, GoalOutput, PROJECT_PACKAGE_IMPORT, PROVIDED_NODE_TYPES, REQUIRED_NODE_TYPES,
    enforce_missing_export_policy, enforce_split_policy, package_table,
};
use crate::models::Diagnostics;
use crate::resolve::{
    ImportOptions, KnownExports, compute_imports, detect_missing_exports, format_imports, resolve,
};

pub fn run(context: &GoalContext, diagnostics: &mut Diagnostics) -> Result<GoalOutput> {
    let settings = &context.config.dependencies;
    let mut project = context.scan_project(diagnostics)?;
    let dependencies = context.walk_dependencies(diagnostics)?;

    let table = package_table(std::iter::once(&project).chain(dependencies.iter()));
    let resolution = resolve(&table, diagnostics);
    project.split_packages = resolution.split_packages.clone();

    let system_packages = context.system_packages()?;
    let known = KnownExports::build(&system_packages, &project, &dependencies, &resolution);
    let options = ImportOptions {
        embed_compile_dependencies: settings.embed_compile_dependencies,
        import_versions: settings.import_versions,
    };
    let mut imports = compute_imports(&project, &dependencies, &known, options, diagnostics);

    let mut missing = Vec::new();
    if context.config.missing_exports.enabled {
        let mut usages = ClassUsageIndex::new();
        usages.add_directory(&context.project.build_output_directory, diagnostics)?;
        let lookup = if context.config.missing_exports.search_maven_central {
            context.lookup
        } else {
            None
        };
        missing = detect_missing_exports(
            &mut imports,
            &known,
            lookup,
            |package| usages.users_of(package),
            diagnostics,
        );
        if !missing.is_empty() {
            warn!(
                "{} imported package(s) are not exported by any known party: {}",
                missing.len(),
                missing.join(", ")
            );
        }
    }

    let import_header = format_imports(&imports);
    info!("Generated {} import(s)", imports.len());

    let references = &project.references;
    let provided = join_sorted(&references.content_type_definitions);
    let required = join_sorted(&references.required_content_types());

    let mut output = GoalOutput::default();
    output
        .properties
        .insert(PROJECT_PACKAGE_IMPORT.to_string(), import_header.clone());
    output
        .properties
        .insert(PROVIDED_NODE_TYPES.to_string(), provided);
    output
        .properties
        .insert(REQUIRED_NODE_TYPES.to_string(), required);
    output.result = json!({
        "imports": imports,
        "import_package": import_header,
        "split_packages": resolution.split_packages,
        "missing_exports": missing,
        "local_packages": project.local_package_names(),
        "dependencies": dependencies.iter().map(|c| c.coordinates()).collect::<Vec<_>>(),
    });

    enforce_split_policy(settings.fail_build_on_split_packages, &resolution)?;
    enforce_missing_export_policy(
        context
            .config
            .missing_exports
            .fail_build_on_missing_package_exports,
        &missing,
    )?;
    Ok(output)
}

fn join_sorted(values: &BTreeSet<String>) -> String {
    values.iter().cloned().collect::<Vec<_>>().join(",")
}
