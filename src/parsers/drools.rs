//! Drools rule files (`*.drl`): `import`, `import function` and `global`
//! declarations.

use anyhow::Result;
use lazy_static::lazy_static;
use regex::Regex;

use super::{ResourceKind, ResourceScanner};
use crate::models::ResourceReferences;

lazy_static! {
    static ref IMPORT: Regex = Regex::new(r"(?m)^\s*import\s+(?:function\s+)?([\w.$*]+)\s*;?")
        .expect("valid drools import regex");
    static ref GLOBAL: Regex =
        Regex::new(r"(?m)^\s*global\s+([\w.$]+)\s+\w+").expect("valid drools global regex");
}

pub struct DroolsScanner;

impl ResourceScanner for DroolsScanner {
    const KIND: ResourceKind = ResourceKind::Drools;

    fn is_match(name: &str) -> bool {
        name.to_ascii_lowercase().ends_with(".drl")
    }

    fn scan(_name: &str, content: &[u8], refs: &mut ResourceReferences) -> Result<()> {
        let text = String::from_utf8_lossy(content);
        for caps in IMPORT.captures_iter(&text).chain(GLOBAL.captures_iter(&text)) {
            refs.add_class_reference(&caps[1]);
        }
        Ok(())
    }
}
