//! `check-dependencies`: patches the Import-Package header of the built bundle.

use anyhow::Result;
use log::{info, warn};
use serde_json::json;
use std::path::PathBuf;

use super::find_package_uses::ClassUsageIndex;
use super::{GoalContext, GoalOutput, enforce_missing_export_policy, package_table};
use crate::error::AnalysisError;
use crate::models::{Diagnostic, Diagnostics};
use crate::resolve::{ImportPolicy, KnownExports, ManifestPatcher, missing_export, resolve};

pub struct CheckOptions {
    /// Bundle to patch; the project's default bundle path when unset.
    pub jar: Option<PathBuf>,
    /// Writes `<name>-<classifier>.jar` instead of patching in place.
    pub classifier: Option<String>,
}

/// Every package the framework, the dependencies and the project provide.
fn known_exports(context: &GoalContext, diagnostics: &mut Diagnostics) -> Result<KnownExports> {
    let project = context.scan_project(diagnostics)?;
    let dependencies = context.walk_dependencies(diagnostics)?;
    let table = package_table(std::iter::once(&project).chain(dependencies.iter()));
    let resolution = resolve(&table, diagnostics);
    let system_packages = context.system_packages()?;
    Ok(KnownExports::build(
        &system_packages,
        &project,
        &dependencies,
        &resolution,
    ))
}

pub fn run(
    context: &GoalContext,
    options: CheckOptions,
    diagnostics: &mut Diagnostics,
) -> Result<GoalOutput> {
    let jar = options
        .jar
        .unwrap_or_else(|| context.project.default_bundle_path());
    if !jar.is_file() {
        return Err(AnalysisError::MissingArtifact { path: jar }.into());
    }

    let settings = &context.config.missing_exports;
    let known = if settings.enabled {
        Some(known_exports(context, diagnostics)?)
    } else {
        if settings.import_policy == ImportPolicy::MissingOnly {
            warn!(
                "Import policy {} needs missing-export detection; no import will be made optional",
                settings.import_policy
            );
        }
        None
    };

    let mut patcher = ManifestPatcher::new(settings.import_policy);
    if let Some(known) = known.as_ref() {
        patcher = patcher.with_known_exports(known);
    }

    let outcome = match patcher.patch_jar(&jar, options.classifier.as_deref(), diagnostics) {
        Ok(outcome) => outcome,
        Err(e) => {
            diagnostics.push(Diagnostic::PatchFailure {
                jar: jar.to_string_lossy().to_string(),
                message: format!("{:#}", e),
            });
            return Ok(GoalOutput {
                properties: Default::default(),
                result: json!({ "jar": jar, "written": false }),
            });
        }
    };

    let missing = outcome
        .header
        .as_ref()
        .map(|header| header.missing.clone())
        .unwrap_or_default();
    if !missing.is_empty() {
        let mut usages = ClassUsageIndex::new();
        usages.add_directory(&context.project.build_output_directory, diagnostics)?;
        let lookup = if settings.search_maven_central {
            context.lookup
        } else {
            None
        };
        for package in &missing {
            diagnostics.push(missing_export(package, lookup, |p| usages.users_of(p)));
        }
    }

    if outcome.written {
        info!("Bundle manifest written to {:?}", outcome.jar);
    } else {
        info!("Bundle manifest of {:?} left unchanged", jar);
    }

    let result = json!({
        "jar": outcome.jar,
        "written": outcome.written,
        "header": outcome.header,
    });
    enforce_missing_export_policy(settings.fail_build_on_missing_package_exports, &missing)?;
    Ok(GoalOutput {
        properties: Default::default(),
        result,
    })
}
