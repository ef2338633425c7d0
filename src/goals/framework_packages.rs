//! `framework-packages`: the package list exported by the framework bundle.

use anyhow::{Context, Result};
use glob::Pattern;
use log::{info, warn};
use serde_json::json;
use std::path::{Path, PathBuf};

use super::{FRAMEWORK_PACKAGE_LIST, GoalContext, GoalOutput, enforce_split_policy, package_table};
use crate::models::{Diagnostic, Diagnostics, ParsingContext};
use crate::resolve::{format_package_list, merge_framework_packages, resolve};
use crate::scanner::scan_jar_file;

/// Every `*.jar` below `directory`, sorted.
fn find_jars(directory: &Path) -> Result<Vec<PathBuf>> {
    let pattern = directory.join("**").join("*.jar");
    let pattern = pattern.to_string_lossy();
    let mut jars: Vec<PathBuf> = glob::glob(&pattern)
        .with_context(|| format!("Invalid JAR directory {:?}", directory))?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Skipping unreadable path: {}", e);
                None
            }
        })
        .filter(|path| path.is_file())
        .collect();
    jars.sort();
    Ok(jars)
}

fn scan_extra_jar(
    path: &Path,
    context: &GoalContext,
    diagnostics: &mut Diagnostics,
) -> Option<ParsingContext> {
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default();
    let mut jar_context = ParsingContext::new("", &name, "");
    jar_context.location = path.to_string_lossy().to_string();
    jar_context.file_path = Some(jar_context.location.clone());
    match scan_jar_file(path, &mut jar_context, context.scan_options(), diagnostics) {
        Ok(()) => Some(jar_context),
        Err(e) => {
            diagnostics.push(Diagnostic::ParseFailure {
                location: jar_context.location,
                resource: name,
                message: format!("{:#}", e),
            });
            None
        }
    }
}

pub fn run(context: &GoalContext, diagnostics: &mut Diagnostics) -> Result<GoalOutput> {
    let settings = &context.config.framework;
    let excludes = settings
        .exclude_packages
        .iter()
        .map(|pattern| {
            Pattern::new(pattern)
                .with_context(|| format!("Invalid package exclusion pattern {:?}", pattern))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut contexts = vec![context.scan_project(diagnostics)?];
    if settings.include_dependencies {
        contexts.extend(context.walk_dependencies(diagnostics)?);
    }
    for directory in &settings.extra_jar_directories {
        let jars = find_jars(directory)?;
        info!("Found {} JAR(s) in {:?}", jars.len(), directory);
        for jar in jars {
            if let Some(jar_context) = scan_extra_jar(&jar, context, diagnostics) {
                contexts.push(jar_context);
            }
        }
    }

    let table = package_table(contexts.iter());
    let resolution = resolve(&table, diagnostics);
    let packages = merge_framework_packages(
        &resolution,
        settings.existing_export_package.as_deref(),
        &context.project.version,
        &excludes,
    );
    let package_list = format_package_list(&packages);
    info!("Framework exports {} package(s)", packages.len());

    let mut output = GoalOutput::default();
    output
        .properties
        .insert(FRAMEWORK_PACKAGE_LIST.to_string(), package_list);
    output.result = json!({
        "packages": packages,
        "split_packages": resolution.split_packages,
    });

    enforce_split_policy(
        context.config.dependencies.fail_build_on_split_packages,
        &resolution,
    )?;
    Ok(output)
}
