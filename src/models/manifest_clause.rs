//! OSGi manifest header clauses.
//!
//! An OSGi header such as `Import-Package` is a comma-separated list of
//! clauses. Each clause holds one or more paths followed by attributes
//! (`key=value`) and directives (`key:=value`):
//!
//! ```text
//! org.a;org.b;version="[1.0,2)";resolution:=optional,org.c
//! ```
//!
//! Commas and semicolons inside double quotes are part of the value.

use serde::Serialize;

pub const RESOLUTION_DIRECTIVE: &str = "resolution";
pub const RESOLUTION_OPTIONAL: &str = "optional";
pub const VERSION_ATTRIBUTE: &str = "version";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ManifestValueClause {
    pub paths: Vec<String>,
    pub attributes: Vec<(String, String)>,
    pub directives: Vec<(String, String)>,
}

impl ManifestValueClause {
    pub fn new(path: impl Into<String>) -> Self {
        ManifestValueClause {
            paths: vec![path.into()],
            attributes: Vec::new(),
            directives: Vec::new(),
        }
    }

    pub fn parse(clause: &str) -> Option<Self> {
        let mut parsed = ManifestValueClause::default();

        for part in split_outside_quotes(clause, ';') {
            if let Some(pos) = part.find(":=") {
                let key = part[..pos].trim().to_string();
                let value = unquote(part[pos + 2..].trim());
                parsed.directives.push((key, value));
            } else if let Some(pos) = part.find('=') {
                let key = part[..pos].trim().to_string();
                let value = unquote(part[pos + 1..].trim());
                parsed.attributes.push((key, value));
            } else {
                parsed.paths.push(part);
            }
        }

        if parsed.paths.is_empty() {
            None
        } else {
            Some(parsed)
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        lookup(&self.attributes, name)
    }

    pub fn directive(&self, name: &str) -> Option<&str> {
        lookup(&self.directives, name)
    }

    pub fn version(&self) -> Option<&str> {
        self.attribute(VERSION_ATTRIBUTE)
    }

    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        upsert(&mut self.attributes, name, value.into());
    }

    pub fn set_directive(&mut self, name: &str, value: impl Into<String>) {
        upsert(&mut self.directives, name, value.into());
    }

    pub fn is_optional(&self) -> bool {
        self.directive(RESOLUTION_DIRECTIVE) == Some(RESOLUTION_OPTIONAL)
    }

    pub fn make_optional(&mut self) {
        self.set_directive(RESOLUTION_DIRECTIVE, RESOLUTION_OPTIONAL);
    }
}

impl std::fmt::Display for ManifestValueClause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.paths.join(";"))?;
        for (key, value) in &self.attributes {
            write!(f, ";{}={}", key, quote_if_needed(key, value))?;
        }
        for (key, value) in &self.directives {
            write!(f, ";{}:={}", key, quote_if_needed(key, value))?;
        }
        Ok(())
    }
}

/// Parses a complete header value into clauses, skipping empty ones.
pub fn parse_header(header: &str) -> Vec<ManifestValueClause> {
    split_osgi_list(header)
        .iter()
        .filter_map(|clause| ManifestValueClause::parse(clause))
        .collect()
}

pub fn format_header(clauses: &[ManifestValueClause]) -> String {
    clauses
        .iter()
        .map(|clause| clause.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Split OSGi comma-separated list, respecting quoted strings.
///
/// OSGi headers can contain commas within quoted strings:
/// "foo;version=\"[1.0,2.0)\",bar;version=\"3.0\""
pub fn split_osgi_list(list: &str) -> Vec<String> {
    split_outside_quotes(list, ',')
}

fn split_outside_quotes(list: &str, separator: char) -> Vec<String> {
    let mut result = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in list.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            c if c == separator && !in_quotes => {
                if !current.trim().is_empty() {
                    result.push(current.trim().to_string());
                }
                current.clear();
            }
            _ => {
                current.push(ch);
            }
        }
    }

    if !current.trim().is_empty() {
        result.push(current.trim().to_string());
    }

    result
}

fn unquote(value: &str) -> String {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
        .to_string()
}

fn quote_if_needed(key: &str, value: &str) -> String {
    let needs_quotes = key == VERSION_ATTRIBUTE
        || value.is_empty()
        || value
            .chars()
            .any(|c| matches!(c, ',' | ';' | ':' | '=' | ' ' | '[' | '(' | '"'));
    if needs_quotes {
        format!("\"{}\"", value)
    } else {
        value.to_string()
    }
}

fn lookup<'a>(pairs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

fn upsert(pairs: &mut Vec<(String, String)>, name: &str, value: String) {
    match pairs.iter_mut().find(|(key, _)| key == name) {
        Some(pair) => pair.1 = value,
        None => pairs.push((name.to_string(), value)),
    }
}
