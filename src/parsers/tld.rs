//! Tag library descriptors (`*.tld`).
//!
//! The URI of the library is read from `<uri>`; its implementation packages
//! come from tag, tag extra info, function, listener and validator classes.
//! Descriptors may use the J2EE, Java EE or Jakarta EE namespace, or none at
//! all. Any other default namespace is ignored and elements are matched by
//! local name.

use anyhow::Result;
use log::debug;

use super::xml::{XPath, XmlDocument};
use super::{ResourceKind, ResourceScanner};
use crate::models::{ResourceReferences, TaglibInfo, package_of_class_name};

const TAGLIB_NAMESPACES: &[(&str, &str)] = &[
    ("j2ee", "http://java.sun.com/xml/ns/j2ee"),
    ("javaee", "http://java.sun.com/xml/ns/javaee"),
    ("jakartaee", "https://jakarta.ee/xml/ns/jakartaee"),
];

const CLASS_ELEMENTS: &[&str] = &[
    "tag/tag-class",
    "tag/tei-class",
    "function/function-class",
    "listener/listener-class",
    "validator/validator-class",
];

pub struct TldScanner;

impl ResourceScanner for TldScanner {
    const KIND: ResourceKind = ResourceKind::Tld;

    fn is_match(name: &str) -> bool {
        name.to_ascii_lowercase().ends_with(".tld")
    }

    fn scan(name: &str, content: &[u8], refs: &mut ResourceReferences) -> Result<()> {
        let mut document = XmlDocument::parse(&String::from_utf8_lossy(content))?;
        if let Some(namespace) = document.root.namespace.as_deref()
            && !TAGLIB_NAMESPACES.iter().any(|(_, uri)| *uri == namespace)
        {
            debug!(
                "{}: unknown taglib namespace {}, matching elements by local name",
                name, namespace
            );
            document.clear_element_namespaces();
        }

        let uri = select_first(&document, "uri")?
            .filter(|uri| !uri.is_empty())
            .unwrap_or_else(|| name.to_string());

        for path in CLASS_ELEMENTS {
            for class_name in select_all(&document, path)? {
                if let Some(package) = package_of_class_name(&class_name) {
                    refs.add_taglib_package(&uri, &package);
                }
            }
        }

        // a library without classes (tag files only) still resolves its URI
        refs.taglibs
            .entry(uri.clone())
            .or_insert_with(|| TaglibInfo {
                uri,
                ..TaglibInfo::default()
            });
        Ok(())
    }
}

/// Runs `//taglib/<path>` with each known namespace, falling back to the
/// non-namespaced form when the document declares none of them.
fn select_all(document: &XmlDocument, path: &str) -> Result<Vec<String>> {
    for (prefix, _) in TAGLIB_NAMESPACES {
        let prefixed = path
            .split('/')
            .map(|step| format!("{}:{}", prefix, step))
            .collect::<Vec<_>>()
            .join("/");
        let query = XPath::parse(&format!("//{}:taglib/{}", prefix, prefixed))?;
        if let Some(values) = document.select(&query, TAGLIB_NAMESPACES) {
            return Ok(values);
        }
    }

    let query = XPath::parse(&format!("//taglib/{}", path))?;
    Ok(document
        .select(&query, TAGLIB_NAMESPACES)
        .unwrap_or_default())
}

fn select_first(document: &XmlDocument, path: &str) -> Result<Option<String>> {
    Ok(select_all(document, path)?.into_iter().next())
}
