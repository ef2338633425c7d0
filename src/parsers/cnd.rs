//! Compact node type definitions (`*.cnd`).
//!
//! ```text
//! <jnt = 'http://www.jahia.org/jahia/nt/1.0'>
//! [jnt:news] > jnt:content, mix:title
//!  - desc (string, richtext)
//!  + image (jnt:file)
//! ```
//!
//! Bracketed names are definitions. Every other `prefix:Name` token is a
//! reference to a node type, except the names of declared properties (`-`)
//! and child nodes (`+`).

use anyhow::Result;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;

use super::{ResourceKind, ResourceScanner};
use crate::models::ResourceReferences;

lazy_static! {
    static ref NAMESPACE: Regex =
        Regex::new(r"<\s*[\w-]+\s*=\s*'[^']*'\s*>").expect("valid namespace regex");
    static ref BLOCK_COMMENT: Regex = Regex::new(r"(?s)/\*.*?\*/").expect("valid comment regex");
    static ref LINE_COMMENT: Regex = Regex::new(r"(?m)(^|\s)//.*$").expect("valid comment regex");
    static ref DEFINITION: Regex =
        Regex::new(r"\[\s*([A-Za-z][\w-]*:[A-Za-z][\w-]*)\s*\]").expect("valid definition regex");
    static ref ITEM_NAME: Regex = Regex::new(r"(?m)^\s*[-+]\s*([A-Za-z][\w-]*:[A-Za-z][\w-]*)")
        .expect("valid item regex");
    static ref QUALIFIED_NAME: Regex =
        Regex::new(r"\b[A-Za-z][\w-]*:[A-Za-z][\w-]*").expect("valid name regex");
}

/// Definitions and references found in one CND file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeTypeNames {
    pub definitions: BTreeSet<String>,
    pub references: BTreeSet<String>,
}

pub fn parse_node_type_names(content: &str) -> NodeTypeNames {
    let without_blocks = BLOCK_COMMENT.replace_all(content, " ");
    let without_comments = LINE_COMMENT.replace_all(&without_blocks, "$1");
    let text = NAMESPACE.replace_all(&without_comments, " ");

    let definitions: BTreeSet<String> = DEFINITION
        .captures_iter(&text)
        .map(|caps| caps[1].to_string())
        .collect();
    let item_names: BTreeSet<&str> = ITEM_NAME
        .captures_iter(&text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .collect();

    let references = QUALIFIED_NAME
        .find_iter(&text)
        .map(|m| m.as_str())
        .filter(|name| !item_names.contains(name) && !definitions.contains(*name))
        .map(str::to_string)
        .collect();

    NodeTypeNames {
        definitions,
        references,
    }
}

pub struct CndScanner;

impl ResourceScanner for CndScanner {
    const KIND: ResourceKind = ResourceKind::Cnd;

    fn is_match(name: &str) -> bool {
        name.to_ascii_lowercase().ends_with(".cnd")
    }

    fn scan(_name: &str, content: &[u8], refs: &mut ResourceReferences) -> Result<()> {
        let names = parse_node_type_names(&String::from_utf8_lossy(content));
        refs.content_type_definitions.extend(names.definitions);
        refs.content_type_references.extend(names.references);
        Ok(())
    }
}
