//! Groovy scripts: `import`, `import static` and aliased imports.

use anyhow::Result;
use lazy_static::lazy_static;
use regex::Regex;

use super::{ResourceKind, ResourceScanner};
use crate::models::ResourceReferences;

lazy_static! {
    static ref IMPORT: Regex =
        Regex::new(r"(?m)^\s*import\s+(?:static\s+)?([\w.$*]+)(?:\s+as\s+\w+)?\s*;?")
            .expect("valid groovy import regex");
}

pub struct GroovyScanner;

impl ResourceScanner for GroovyScanner {
    const KIND: ResourceKind = ResourceKind::Groovy;

    fn is_match(name: &str) -> bool {
        name.to_ascii_lowercase().ends_with(".groovy")
    }

    fn scan(_name: &str, content: &[u8], refs: &mut ResourceReferences) -> Result<()> {
        let text = String::from_utf8_lossy(content);
        for caps in IMPORT.captures_iter(&text) {
            refs.add_class_reference(&caps[1]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_forms() {
        let mut refs = ResourceReferences::new();
        GroovyScanner::scan(
            "scripts/migrate.groovy",
            b"import org.apache.commons.io.FileUtils\n\
              import static org.jahia.api.Constants.EDIT_WORKSPACE\n\
              import groovy.json.*\n\
              import org.slf4j.Logger as Log;\n\
              import java.nio.file.Path\n\
              \n\
              def important = 'import not.a.Statement'\n",
            &mut refs,
        )
        .unwrap();

        let packages: Vec<_> = refs.packages.into_iter().collect();
        assert_eq!(
            packages,
            vec!["groovy.json", "org.apache.commons.io", "org.jahia.api", "org.slf4j"]
        );
    }
}
