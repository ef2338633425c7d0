//! Project directories: the build output directory and resource
//! directories.

use anyhow::Result;
use indicatif::ProgressBar;
use log::{debug, warn};
use std::fs;
use std::path::Path;

use crate::models::{Diagnostic, Diagnostics, ParsingContext};
use crate::parsers::class_entry::package_for_entry;
use crate::parsers::{ScanOptions, is_scannable, scan_resource};
use crate::utils::file::{list_files_recursive, relative_slash_path};

/// Scans every file below `root`. Packages are recorded only when
/// `record_packages` is set: resource directories end up in the build output
/// anyway and would count twice.
pub fn scan_directory(
    root: &Path,
    context: &mut ParsingContext,
    record_packages: bool,
    options: ScanOptions,
    progress_bar: &ProgressBar,
    diagnostics: &mut Diagnostics,
) -> Result<usize> {
    if !root.is_dir() {
        warn!("Skipping missing directory {:?}", root);
        return Ok(0);
    }

    let files = list_files_recursive(root)?;
    let location = root.to_string_lossy().to_string();
    let version = (!context.version.is_empty()).then(|| context.version.clone());

    for path in &files {
        let name = relative_slash_path(root, path);

        if record_packages && let Some(package) = package_for_entry(&name) {
            context.observe_package(&package, version.as_deref(), None);
        }

        if is_scannable(&name, options) {
            match fs::read(path) {
                Ok(content) => {
                    scan_resource(
                        &location,
                        &name,
                        &content,
                        &mut context.references,
                        options,
                        diagnostics,
                    );
                }
                Err(e) => {
                    debug!("Failed to read {:?}: {:?}", path, e);
                    diagnostics.push(Diagnostic::ParseFailure {
                        location: location.clone(),
                        resource: name,
                        message: e.to_string(),
                    });
                }
            }
        }
        progress_bar.inc(1);
    }

    Ok(files.len())
}
