pub mod class_entry;
#[cfg(test)]
mod class_entry_test;
pub mod cnd;
mod drools;
mod groovy;
mod jcr_import;
mod jsp;
#[cfg(test)]
mod jsp_test;
pub mod manifest;
#[cfg(test)]
mod manifest_test;
pub mod properties;
mod spring;
#[cfg(test)]
mod spring_test;
mod tld;
pub mod xml;

use anyhow::Result;
use log::debug;
use std::fmt;
use strum::{EnumIter, IntoEnumIterator};

use crate::models::{Diagnostic, Diagnostics, ResourceReferences};

pub use self::class_entry::ClassScanner;
pub use self::cnd::CndScanner;
pub use self::drools::DroolsScanner;
pub use self::groovy::GroovyScanner;
pub use self::jcr_import::JcrImportScanner;
pub use self::jsp::JspScanner;
pub use self::spring::SpringScanner;
pub use self::tld::TldScanner;

/// Resource formats the scanners understand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter)]
pub enum ResourceKind {
    Jsp,
    Tld,
    Cnd,
    Drools,
    Groovy,
    Spring,
    JcrImport,
    Class,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jsp => "jsp",
            Self::Tld => "tld",
            Self::Cnd => "cnd",
            Self::Drools => "drools",
            Self::Groovy => "groovy",
            Self::Spring => "spring",
            Self::JcrImport => "jcr_import",
            Self::Class => "class",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource scanner for one file format.
///
/// Each implementation extracts what a single resource references: packages,
/// tag library URIs and packages, or node type names, into a shared
/// [`ResourceReferences`] accumulator.
///
/// # Error Handling
///
/// `scan` returns an error for content it cannot parse. The caller records a
/// [`Diagnostic::ParseFailure`] and moves on to the next resource, so one
/// broken file never aborts a scan.
pub trait ResourceScanner {
    const KIND: ResourceKind;

    /// Checks the resource path (archive entry or relative file path).
    fn is_match(name: &str) -> bool;

    /// Content sniffing for formats that share an extension.
    fn accepts(_content: &[u8]) -> bool {
        true
    }

    fn scan(name: &str, content: &[u8], refs: &mut ResourceReferences) -> Result<()>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanOptions {
    /// Also mine compiled classes for referenced packages.
    pub class_references: bool,
}

/// Runs every matching scanner over one resource. Returns the number of
/// scanners that accepted it.
pub fn scan_resource(
    location: &str,
    name: &str,
    content: &[u8],
    refs: &mut ResourceReferences,
    options: ScanOptions,
    diagnostics: &mut Diagnostics,
) -> usize {
    let mut matched = 0;
    matched += try_scan::<JspScanner>(location, name, content, refs, diagnostics);
    matched += try_scan::<TldScanner>(location, name, content, refs, diagnostics);
    matched += try_scan::<CndScanner>(location, name, content, refs, diagnostics);
    matched += try_scan::<DroolsScanner>(location, name, content, refs, diagnostics);
    matched += try_scan::<GroovyScanner>(location, name, content, refs, diagnostics);
    matched += try_scan::<SpringScanner>(location, name, content, refs, diagnostics);
    matched += try_scan::<JcrImportScanner>(location, name, content, refs, diagnostics);
    if options.class_references {
        matched += try_scan::<ClassScanner>(location, name, content, refs, diagnostics);
    }
    matched
}

/// Whether any scanner could be interested in `name`; lets callers skip
/// reading entries nobody wants.
pub fn is_scannable(name: &str, options: ScanOptions) -> bool {
    JspScanner::is_match(name)
        || TldScanner::is_match(name)
        || CndScanner::is_match(name)
        || DroolsScanner::is_match(name)
        || GroovyScanner::is_match(name)
        || SpringScanner::is_match(name)
        || JcrImportScanner::is_match(name)
        || (options.class_references && ClassScanner::is_match(name))
}

fn try_scan<S: ResourceScanner>(
    location: &str,
    name: &str,
    content: &[u8],
    refs: &mut ResourceReferences,
    diagnostics: &mut Diagnostics,
) -> usize {
    if !S::is_match(name) || !S::accepts(content) {
        return 0;
    }

    if let Err(e) = S::scan(name, content, refs) {
        debug!("{} scanner failed on {} in {}: {:?}", S::KIND, name, location, e);
        diagnostics.push(Diagnostic::ParseFailure {
            location: location.to_string(),
            resource: name.to_string(),
            message: format!("{:#}", e),
        });
    }
    1
}

/// Lists all resource formats with a scanner.
pub fn list_resource_kinds() -> Vec<&'static str> {
    ResourceKind::iter().map(|kind| kind.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broken_resource_is_recorded_and_skipped() {
        let mut refs = ResourceReferences::new();
        let mut diagnostics = Diagnostics::new();

        let matched = scan_resource(
            "module.jar",
            "META-INF/broken.tld",
            b"<taglib><uri>x</taglib>",
            &mut refs,
            ScanOptions::default(),
            &mut diagnostics,
        );
        assert_eq!(matched, 1);
        assert_eq!(diagnostics.len(), 1);
        assert!(matches!(
            diagnostics.iter().next(),
            Some(Diagnostic::ParseFailure { resource, .. }) if resource == "META-INF/broken.tld"
        ));

        scan_resource(
            "module.jar",
            "view.jsp",
            br#"<%@ page import="org.a.B" %>"#,
            &mut refs,
            ScanOptions::default(),
            &mut diagnostics,
        );
        assert!(refs.packages.contains("org.a"));
    }

    #[test]
    fn test_xml_is_routed_by_content() {
        let mut refs = ResourceReferences::new();
        let mut diagnostics = Diagnostics::new();
        let matched = scan_resource(
            "dir",
            "pom.xml",
            b"<project><version>1</version></project>",
            &mut refs,
            ScanOptions::default(),
            &mut diagnostics,
        );
        assert_eq!(matched, 0);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_class_scanning_is_opt_in() {
        assert!(!is_scannable("org/a/B.class", ScanOptions::default()));
        assert!(is_scannable(
            "org/a/B.class",
            ScanOptions {
                class_references: true
            }
        ));
        assert_eq!(list_resource_kinds().len(), 8);
    }
}
