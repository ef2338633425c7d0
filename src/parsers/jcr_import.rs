//! JCR content imports (`repository.xml`, `*.xml` document views): node
//! types used by imported content.

use anyhow::Result;
use lazy_static::lazy_static;

use super::spring::contains;
use super::xml::{XPath, XmlDocument};
use super::{ResourceKind, ResourceScanner};
use crate::models::ResourceReferences;

const JCR_NAMESPACE: &str = "http://www.jcp.org/jcr/1.0";
const JCR_NAMESPACES: &[(&str, &str)] = &[("jcr", JCR_NAMESPACE)];

lazy_static! {
    static ref TYPE_QUERIES: Vec<XPath> = ["//@jcr:primaryType", "//@jcr:mixinTypes"]
        .iter()
        .filter_map(|query| XPath::parse(query).ok())
        .collect();
}

pub struct JcrImportScanner;

impl ResourceScanner for JcrImportScanner {
    const KIND: ResourceKind = ResourceKind::JcrImport;

    fn is_match(name: &str) -> bool {
        name.to_ascii_lowercase().ends_with(".xml")
    }

    fn accepts(content: &[u8]) -> bool {
        contains(content, JCR_NAMESPACE.as_bytes())
    }

    fn scan(_name: &str, content: &[u8], refs: &mut ResourceReferences) -> Result<()> {
        let document = XmlDocument::parse(&String::from_utf8_lossy(content))?;

        for query in TYPE_QUERIES.iter() {
            for value in document.select(query, JCR_NAMESPACES).unwrap_or_default() {
                refs.content_type_references
                    .extend(value.split_whitespace().map(str::to_string));
            }
        }
        Ok(())
    }
}
