//! Spring XML application contexts.
//!
//! Class names are taken from a fixed list of attributes and elements of
//! the Spring namespaces. Queries for namespaces a file does not declare are
//! skipped.

use anyhow::Result;
use lazy_static::lazy_static;

use super::xml::{XPath, XmlDocument};
use super::{ResourceKind, ResourceScanner};
use crate::models::ResourceReferences;

const SPRING_NAMESPACES: &[(&str, &str)] = &[
    ("beans", "http://www.springframework.org/schema/beans"),
    ("aop", "http://www.springframework.org/schema/aop"),
    ("context", "http://www.springframework.org/schema/context"),
    ("jee", "http://www.springframework.org/schema/jee"),
    ("jms", "http://www.springframework.org/schema/jms"),
    ("lang", "http://www.springframework.org/schema/lang"),
    ("oxm", "http://www.springframework.org/schema/oxm"),
    ("osgi", "http://www.springframework.org/schema/osgi"),
    ("util", "http://www.springframework.org/schema/util"),
    ("webflow", "http://www.springframework.org/schema/webflow-config"),
];

const CLASS_QUERIES: &[&str] = &[
    "//beans:bean/@class",
    "//bean/@class",
    "//aop:declare-parents/@implement-interface",
    "//aop:declare-parents/@default-impl",
    "//context:load-time-weaver/@weaver-class",
    "//context:component-scan/@name-generator",
    "//context:component-scan/@scope-resolver",
    "//jee:jndi-lookup/@expected-type",
    "//jee:jndi-lookup/@proxy-interface",
    "//jee:remote-slsb/@home-interface",
    "//jee:remote-slsb/@business-interface",
    "//jee:local-slsb/@business-interface",
    "//jms:listener-container/@container-class",
    "//lang:jruby/@script-interfaces",
    "//lang:bsh/@script-interfaces",
    "//oxm:class-to-be-bound/@name",
    "//oxm:jibx-marshaller/@target-class",
    "//osgi:reference/@interface",
    "//osgi:service/@interface",
    "//osgi:reference/osgi:interfaces/beans:value",
    "//osgi:service/osgi:interfaces/beans:value",
    "//util:list/@list-class",
    "//util:map/@map-class",
    "//util:set/@set-class",
    "//webflow:flow-builder/@class",
    "//webflow:attribute/@type",
];

const PACKAGE_QUERIES: &[&str] = &["//context:component-scan/@base-package"];

lazy_static! {
    static ref COMPILED_CLASS_QUERIES: Vec<XPath> = compile(CLASS_QUERIES);
    static ref COMPILED_PACKAGE_QUERIES: Vec<XPath> = compile(PACKAGE_QUERIES);
}

fn compile(queries: &[&str]) -> Vec<XPath> {
    queries
        .iter()
        .filter_map(|query| XPath::parse(query).ok())
        .collect()
}

pub struct SpringScanner;

impl ResourceScanner for SpringScanner {
    const KIND: ResourceKind = ResourceKind::Spring;

    fn is_match(name: &str) -> bool {
        name.to_ascii_lowercase().ends_with(".xml")
    }

    fn accepts(content: &[u8]) -> bool {
        contains(content, b"springframework.org/schema") || contains(content, b"<beans")
    }

    fn scan(_name: &str, content: &[u8], refs: &mut ResourceReferences) -> Result<()> {
        let document = XmlDocument::parse(&String::from_utf8_lossy(content))?;

        for query in COMPILED_CLASS_QUERIES.iter() {
            for value in document.select(query, SPRING_NAMESPACES).unwrap_or_default() {
                for class_name in split_values(&value) {
                    refs.add_class_reference(class_name);
                }
            }
        }

        for query in COMPILED_PACKAGE_QUERIES.iter() {
            for value in document.select(query, SPRING_NAMESPACES).unwrap_or_default() {
                for package in split_values(&value) {
                    refs.add_package(package.trim_end_matches(".*"));
                }
            }
        }

        Ok(())
    }
}

/// Comma or whitespace separated values, skipping placeholders and
/// expressions that are only known at runtime.
fn split_values(value: &str) -> Vec<&str> {
    if value.contains("${") || value.contains("#{") {
        return Vec::new();
    }
    value
        .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect()
}

pub(crate) fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack
        .windows(needle.len())
        .any(|window| window == needle)
}
