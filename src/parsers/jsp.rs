//! JSP pages and tag files: `page import` and `taglib uri` directives.

use anyhow::Result;
use lazy_static::lazy_static;
use regex::Regex;

use super::{ResourceKind, ResourceScanner};
use crate::models::ResourceReferences;

lazy_static! {
    static ref PAGE_DIRECTIVE: Regex =
        Regex::new(r#"(?s)<%@\s*page\b(.*?)%>"#).expect("valid page directive regex");
    static ref XML_PAGE_DIRECTIVE: Regex =
        Regex::new(r#"(?s)<jsp:directive\.page\b(.*?)/?>"#).expect("valid jsp:directive regex");
    static ref TAGLIB_DIRECTIVE: Regex =
        Regex::new(r#"(?s)<%@\s*taglib\b(.*?)%>"#).expect("valid taglib directive regex");
    static ref IMPORT_ATTRIBUTE: Regex =
        Regex::new(r#"\bimport\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid import regex");
    static ref URI_ATTRIBUTE: Regex =
        Regex::new(r#"\buri\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid uri regex");
}

pub struct JspScanner;

impl ResourceScanner for JspScanner {
    const KIND: ResourceKind = ResourceKind::Jsp;

    fn is_match(name: &str) -> bool {
        let lower = name.to_ascii_lowercase();
        [".jsp", ".jspf", ".jspx", ".tag", ".tagf"]
            .iter()
            .any(|extension| lower.ends_with(extension))
    }

    fn scan(_name: &str, content: &[u8], refs: &mut ResourceReferences) -> Result<()> {
        let text = String::from_utf8_lossy(content);

        for directive in PAGE_DIRECTIVE
            .captures_iter(&text)
            .chain(XML_PAGE_DIRECTIVE.captures_iter(&text))
        {
            for import in attribute_values(&IMPORT_ATTRIBUTE, &directive[1]) {
                for class_name in import.split(',') {
                    refs.add_class_reference(class_name.trim());
                }
            }
        }

        for directive in TAGLIB_DIRECTIVE.captures_iter(&text) {
            for uri in attribute_values(&URI_ATTRIBUTE, &directive[1]) {
                let uri = uri.trim();
                if !uri.is_empty() {
                    refs.taglib_uris.insert(uri.to_string());
                }
            }
        }

        Ok(())
    }
}

fn attribute_values<'a>(pattern: &Regex, directive: &'a str) -> Vec<&'a str> {
    pattern
        .captures_iter(directive)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str())
        .collect()
}
