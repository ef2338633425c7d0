//! Java `.properties` files and the framework system-package list.
//!
//! # Supported syntax
//! - `key=value`, `key: value` and `key value` separators
//! - `#` and `!` comment lines
//! - Backslash line continuations (leading whitespace of the next line is dropped)
//! - `\t`, `\n`, `\r`, `\f`, `\\` and `\uXXXX` escapes
//!
//! Values may reference other keys as `${name}`. Lookups go to the same file
//! first, then to the system properties given on the command line, then to
//! environment variables.

use anyhow::{Context, Result};
use log::warn;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use crate::models::{PackageInfo, SYSTEM_PACKAGES_LOCATION, parse_header};
use crate::utils::file::read_file_to_string;

/// Bundled default framework package list.
pub const DEFAULT_DEPENDENCIES_PROPERTIES: &str =
    include_str!("../../resources/dependencies.properties");

pub const DEFAULT_SYSTEM_PACKAGES_KEY: &str = "org.osgi.framework.system.packages";

/// Parses properties text into an ordered key/value map. Later duplicates win.
pub fn parse_properties(content: &str) -> BTreeMap<String, String> {
    let mut properties = BTreeMap::new();
    let mut logical = String::new();
    let mut continuing = false;

    for raw_line in content.lines() {
        let line = if continuing {
            raw_line.trim_start()
        } else {
            let trimmed = raw_line.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
                continue;
            }
            trimmed
        };

        if ends_with_continuation(line) {
            logical.push_str(&line[..line.len() - 1]);
            continuing = true;
            continue;
        }

        logical.push_str(line);
        continuing = false;
        let (key, value) = split_key_value(&logical);
        properties.insert(unescape(&key), unescape(&value));
        logical.clear();
    }

    if !logical.is_empty() {
        let (key, value) = split_key_value(&logical);
        properties.insert(unescape(&key), unescape(&value));
    }

    properties
}

/// An odd number of trailing backslashes continues the line.
fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

fn split_key_value(line: &str) -> (String, String) {
    let chars: Vec<char> = line.chars().collect();
    let mut index = 0;
    let mut key = String::new();

    while index < chars.len() {
        let c = chars[index];
        if c == '\\' && index + 1 < chars.len() {
            key.push(c);
            key.push(chars[index + 1]);
            index += 2;
            continue;
        }
        if c == '=' || c == ':' || c.is_whitespace() {
            break;
        }
        key.push(c);
        index += 1;
    }

    // skip whitespace, at most one separator, whitespace again
    while index < chars.len() && chars[index].is_whitespace() {
        index += 1;
    }
    if index < chars.len() && (chars[index] == '=' || chars[index] == ':') {
        index += 1;
    }
    while index < chars.len() && chars[index].is_whitespace() {
        index += 1;
    }

    (key, chars[index..].iter().collect())
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some('u') => {
                let hex: String = (0..4).filter_map(|_| chars.next()).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }

    out
}

/// Resolves `${property.name}` placeholders with cycle and DoS protection.
///
/// Nested placeholders (`${outer.${inner}}`) are supported. Unresolvable
/// placeholders stay verbatim and are reported once per key.
pub struct PropertyResolver<'a> {
    properties: &'a BTreeMap<String, String>,
    system: &'a HashMap<String, String>,
    cache: HashMap<String, String>,
    resolving_set: HashSet<String>,
    resolving_stack: Vec<String>,
    max_depth: usize,
    max_output_len: usize,
    max_substitutions: usize,
    warned_keys: HashSet<String>,
}

impl<'a> PropertyResolver<'a> {
    pub fn new(
        properties: &'a BTreeMap<String, String>,
        system: &'a HashMap<String, String>,
    ) -> Self {
        Self {
            properties,
            system,
            cache: HashMap::new(),
            resolving_set: HashSet::new(),
            resolving_stack: Vec::new(),
            max_depth: 10,
            max_output_len: 1_000_000,
            max_substitutions: 10_000,
            warned_keys: HashSet::new(),
        }
    }

    pub fn resolve(&mut self, text: &str) -> String {
        self.resolve_text(text, 0)
    }

    fn lookup(&self, key: &str) -> Option<String> {
        self.properties
            .get(key)
            .or_else(|| self.system.get(key))
            .cloned()
            .or_else(|| std::env::var(key).ok())
    }

    fn resolve_key(&mut self, key: &str, depth: usize) -> Option<String> {
        if let Some(value) = self.cache.get(key) {
            return Some(value.clone());
        }

        if depth >= self.max_depth {
            self.warn_once(
                "depth",
                key,
                format!("Property depth limit hit resolving {key}"),
            );
            return None;
        }

        if self.resolving_set.contains(key) {
            self.warn_once(
                "cycle",
                key,
                format!(
                    "Property cycle detected at {key}: {:?}",
                    self.resolving_stack
                ),
            );
            return None;
        }

        let Some(raw_val) = self.lookup(key) else {
            self.warn_once("missing", key, format!("Property {key} is not defined"));
            return None;
        };

        self.resolving_set.insert(key.to_string());
        self.resolving_stack.push(key.to_string());

        let resolved = self.resolve_text(&raw_val, depth + 1);

        self.resolving_stack.pop();
        self.resolving_set.remove(key);

        self.cache.insert(key.to_string(), resolved.clone());
        Some(resolved)
    }

    fn resolve_text(&mut self, text: &str, depth: usize) -> String {
        if !text.contains("${") {
            return text.to_string();
        }

        if depth >= self.max_depth {
            warn!("Property depth limit hit resolving text");
            return text.to_string();
        }

        let bytes = text.as_bytes();
        let mut output: Vec<u8> = Vec::with_capacity(bytes.len());
        let mut index = 0;
        let mut substitutions = 0;

        while index < bytes.len() {
            if bytes[index] == b'$' && index + 1 < bytes.len() && bytes[index + 1] == b'{' {
                if substitutions >= self.max_substitutions {
                    warn!("Property substitution limit hit resolving {text}");
                    return text.to_string();
                }

                let placeholder_start = index;
                let Some((content, closing_index)) = parse_placeholder_content(text, index + 2)
                else {
                    warn!("Malformed property placeholder in {text}");
                    return text.to_string();
                };

                substitutions += 1;
                let resolved_key = if content.contains("${") {
                    self.resolve_text(content, depth + 1)
                } else {
                    content.to_string()
                };

                let replacement = match self.resolve_key(&resolved_key, depth) {
                    Some(resolved) => resolved.into_bytes(),
                    None => bytes[placeholder_start..=closing_index].to_vec(),
                };
                if output.len() + replacement.len() > self.max_output_len {
                    warn!("Property output length limit hit resolving {text}");
                    return text.to_string();
                }
                output.extend_from_slice(&replacement);

                index = closing_index + 1;
                continue;
            }

            output.push(bytes[index]);
            index += 1;
        }

        String::from_utf8(output).unwrap_or_else(|_| text.to_string())
    }

    fn warn_once(&mut self, kind: &str, key: &str, message: String) {
        let token = format!("{kind}:{key}");
        if self.warned_keys.insert(token) {
            warn!("{message}");
        }
    }
}

fn parse_placeholder_content(text: &str, start_index: usize) -> Option<(&str, usize)> {
    let bytes = text.as_bytes();
    let mut index = start_index;
    let mut depth = 0;

    while index < bytes.len() {
        if bytes[index] == b'$' && index + 1 < bytes.len() && bytes[index + 1] == b'{' {
            depth += 1;
            index += 2;
            continue;
        }

        if bytes[index] == b'}' {
            if depth == 0 {
                return Some((&text[start_index..index], index));
            }
            depth -= 1;
        }

        index += 1;
    }

    None
}

/// Packages the OSGi framework exports on its own.
#[derive(Clone, Debug, Default)]
pub struct SystemPackages {
    packages: BTreeMap<String, PackageInfo>,
}

impl SystemPackages {
    /// Loads the list from `path`, or from the bundled default when `path` is
    /// `None`.
    pub fn load(
        path: Option<&Path>,
        key: &str,
        system_properties: &HashMap<String, String>,
    ) -> Result<Self> {
        let content = match path {
            Some(path) => read_file_to_string(path)
                .with_context(|| format!("Failed to read system packages from {:?}", path))?,
            None => DEFAULT_DEPENDENCIES_PROPERTIES.to_string(),
        };
        Ok(Self::from_properties(&content, key, system_properties))
    }

    pub fn from_properties(
        content: &str,
        key: &str,
        system_properties: &HashMap<String, String>,
    ) -> Self {
        let properties = parse_properties(content);
        let Some(raw) = properties.get(key) else {
            warn!("No {} entry found in system package properties", key);
            return Self::default();
        };

        let mut resolver = PropertyResolver::new(&properties, system_properties);
        let header = resolver.resolve(raw);
        Self::from_header(&header)
    }

    pub fn from_header(header: &str) -> Self {
        let mut packages = BTreeMap::new();
        for clause in parse_header(header) {
            for path in &clause.paths {
                let info = PackageInfo::new(path.clone())
                    .with_version(clause.version().map(str::to_string))
                    .with_source_location(SYSTEM_PACKAGES_LOCATION);
                packages.insert(path.clone(), info);
            }
        }
        SystemPackages { packages }
    }

    pub fn get(&self, package: &str) -> Option<&PackageInfo> {
        self.packages.get(package)
    }

    pub fn contains(&self, package: &str) -> bool {
        self.packages.contains_key(package)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PackageInfo> {
        self.packages.values()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}
