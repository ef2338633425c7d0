//! Minimal namespace-aware XML tree and the XPath subset the resource
//! scanners need.
//!
//! Supported expressions:
//! - `//a/b/@attr`: attribute `attr` of every `b` child of an `a` element
//! - `//a/b`: text content of every `b` child of an `a` element
//! - `//@attr`: attribute `attr` of any element
//!
//! Steps may carry a prefix (`beans:bean`), resolved through a fixed
//! prefix table supplied by the caller, not through the document's own
//! prefixes. Unprefixed steps only match elements without a namespace.

use anyhow::{Context, Result, anyhow, bail};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::{BTreeSet, HashMap};

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct XmlAttribute {
    pub namespace: Option<String>,
    pub local_name: String,
    pub value: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct XmlElement {
    pub namespace: Option<String>,
    pub local_name: String,
    pub attributes: Vec<XmlAttribute>,
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    fn matches(&self, step: &ResolvedStep) -> bool {
        self.local_name == step.local_name && self.namespace == step.namespace
    }

    fn attribute(&self, step: &ResolvedStep) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.local_name == step.local_name && attr.namespace == step.namespace)
            .map(|attr| attr.value.as_str())
    }

    fn clear_namespaces(&mut self) {
        self.namespace = None;
        for child in &mut self.children {
            child.clear_namespaces();
        }
    }

    fn descendants<'a>(&'a self, out: &mut Vec<&'a XmlElement>) {
        out.push(self);
        for child in &self.children {
            child.descendants(out);
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XmlDocument {
    pub root: XmlElement,
    /// Every namespace URI declared anywhere in the document.
    pub namespaces: BTreeSet<String>,
}

impl XmlDocument {
    pub fn parse(content: &str) -> Result<Self> {
        let mut reader = Reader::from_str(content);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        let mut namespaces = BTreeSet::new();
        let mut stack: Vec<(XmlElement, HashMap<String, String>)> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    let scope = stack.last().map(|(_, scope)| scope);
                    let (element, scope) = open_element(&e, scope, &mut namespaces)?;
                    stack.push((element, scope));
                }
                Ok(Event::Empty(e)) => {
                    let scope = stack.last().map(|(_, scope)| scope);
                    let (element, _) = open_element(&e, scope, &mut namespaces)?;
                    attach(&mut stack, &mut root, element);
                }
                Ok(Event::Text(e)) => {
                    if let Some((element, _)) = stack.last_mut() {
                        let text = e.decode().unwrap_or_default();
                        element.text.push_str(&text);
                    }
                }
                Ok(Event::CData(e)) => {
                    if let Some((element, _)) = stack.last_mut() {
                        element.text.push_str(&String::from_utf8_lossy(&e));
                    }
                }
                Ok(Event::End(_)) => {
                    let (element, _) = stack
                        .pop()
                        .ok_or_else(|| anyhow!("Unbalanced closing tag"))?;
                    attach(&mut stack, &mut root, element);
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("XML error at position {}", reader.buffer_position())
                    });
                }
                _ => {}
            }
            buf.clear();
        }

        if !stack.is_empty() {
            bail!("Unexpected end of document, {} element(s) left open", stack.len());
        }
        let root = root.ok_or_else(|| anyhow!("Document has no root element"))?;
        Ok(XmlDocument { root, namespaces })
    }

    /// Drops the namespace of every element so unprefixed steps match them
    /// by local name. Attributes keep theirs.
    pub fn clear_element_namespaces(&mut self) {
        self.root.clear_namespaces();
    }

    pub fn declares(&self, uri: &str) -> bool {
        self.namespaces.contains(uri)
    }

    /// Evaluates `query`. Returns `None` when the query uses a prefix whose
    /// namespace the document never declares, so the query does not apply.
    pub fn select(&self, query: &XPath, prefixes: &[(&str, &str)]) -> Option<Vec<String>> {
        let steps = query.resolve(prefixes, self)?;
        let (target, path) = match &query.attribute {
            Some(_) => (steps.last(), &steps[..steps.len() - 1]),
            None => (None, &steps[..]),
        };

        let mut all = Vec::new();
        self.root.descendants(&mut all);

        let mut results = Vec::new();
        for element in all {
            if path.is_empty() {
                // `//@attr`
                if let Some(value) = target.and_then(|step| element.attribute(step)) {
                    results.push(value.to_string());
                }
                continue;
            }

            for matched in match_path(element, path) {
                match target {
                    Some(step) => {
                        if let Some(value) = matched.attribute(step) {
                            results.push(value.to_string());
                        }
                    }
                    None => results.push(matched.text.trim().to_string()),
                }
            }
        }
        Some(results)
    }
}

/// Elements reached by walking `path` down from `start`, `start` matching
/// the first step.
fn match_path<'a>(start: &'a XmlElement, path: &[ResolvedStep]) -> Vec<&'a XmlElement> {
    let Some((first, rest)) = path.split_first() else {
        return Vec::new();
    };
    if !start.matches(first) {
        return Vec::new();
    }

    let mut current = vec![start];
    for step in rest {
        current = current
            .into_iter()
            .flat_map(|element| element.children.iter().filter(|child| child.matches(step)))
            .collect();
    }
    current
}

fn attach(
    stack: &mut [(XmlElement, HashMap<String, String>)],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) {
    match stack.last_mut() {
        Some((parent, _)) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

fn open_element(
    e: &BytesStart<'_>,
    parent_scope: Option<&HashMap<String, String>>,
    namespaces: &mut BTreeSet<String>,
) -> Result<(XmlElement, HashMap<String, String>)> {
    let mut scope = parent_scope.cloned().unwrap_or_default();
    let mut raw_attributes = Vec::new();

    for attr in e.attributes() {
        let attr = attr.context("Malformed attribute")?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = String::from_utf8_lossy(&attr.value).to_string();

        if key == "xmlns" {
            namespaces.insert(value.clone());
            scope.insert(String::new(), value);
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            namespaces.insert(value.clone());
            scope.insert(prefix.to_string(), value);
        } else {
            raw_attributes.push((key, value));
        }
    }

    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
    let (prefix, local_name) = split_qname(&name);
    let namespace = match prefix {
        Some(prefix) => Some(resolve_prefix(prefix, &scope)?),
        None => scope.get("").filter(|uri| !uri.is_empty()).cloned(),
    };

    let mut attributes = Vec::with_capacity(raw_attributes.len());
    for (key, value) in raw_attributes {
        let (prefix, local_name) = split_qname(&key);
        // unprefixed attributes never take the default namespace
        let namespace = match prefix {
            Some(prefix) => Some(resolve_prefix(prefix, &scope)?),
            None => None,
        };
        attributes.push(XmlAttribute {
            namespace,
            local_name: local_name.to_string(),
            value,
        });
    }

    Ok((
        XmlElement {
            namespace,
            local_name: local_name.to_string(),
            attributes,
            text: String::new(),
            children: Vec::new(),
        },
        scope,
    ))
}

fn resolve_prefix(prefix: &str, scope: &HashMap<String, String>) -> Result<String> {
    if prefix == "xml" {
        return Ok(XML_NAMESPACE.to_string());
    }
    scope
        .get(prefix)
        .cloned()
        .ok_or_else(|| anyhow!("Undeclared namespace prefix '{}'", prefix))
}

fn split_qname(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Step {
    prefix: Option<String>,
    local_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct ResolvedStep {
    namespace: Option<String>,
    local_name: String,
}

/// A parsed query of the supported subset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XPath {
    expression: String,
    steps: Vec<Step>,
    attribute: Option<Step>,
}

impl XPath {
    pub fn parse(expression: &str) -> Result<Self> {
        let body = expression
            .strip_prefix("//")
            .ok_or_else(|| anyhow!("Unsupported XPath '{}': must start with //", expression))?;

        let mut steps = Vec::new();
        let mut attribute = None;
        let parts: Vec<&str> = body.split('/').collect();
        for (index, part) in parts.iter().enumerate() {
            if part.is_empty() {
                bail!("Unsupported XPath '{}': empty step", expression);
            }
            if let Some(name) = part.strip_prefix('@') {
                if index != parts.len() - 1 {
                    bail!("Unsupported XPath '{}': attribute must be last", expression);
                }
                attribute = Some(parse_step(name));
            } else {
                steps.push(parse_step(part));
            }
        }

        if steps.is_empty() && attribute.is_none() {
            bail!("Unsupported XPath '{}'", expression);
        }

        Ok(XPath {
            expression: expression.to_string(),
            steps,
            attribute,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.expression
    }

    /// Resolves every prefix; `None` when one of them is unknown or its
    /// namespace is not declared in `document`.
    fn resolve(&self, prefixes: &[(&str, &str)], document: &XmlDocument) -> Option<Vec<ResolvedStep>> {
        self.steps
            .iter()
            .chain(self.attribute.iter())
            .map(|step| {
                let namespace = match &step.prefix {
                    Some(prefix) => {
                        let uri = prefixes
                            .iter()
                            .find(|(known, _)| known == prefix)
                            .map(|(_, uri)| *uri)?;
                        if uri != XML_NAMESPACE && !document.declares(uri) {
                            return None;
                        }
                        Some(uri.to_string())
                    }
                    None => None,
                };
                Some(ResolvedStep {
                    namespace,
                    local_name: step.local_name.clone(),
                })
            })
            .collect()
    }
}

fn parse_step(name: &str) -> Step {
    match name.split_once(':') {
        Some((prefix, local)) => Step {
            prefix: Some(prefix.to_string()),
            local_name: local.to_string(),
        },
        None => Step {
            prefix: None,
            local_name: name.to_string(),
        },
    }
}
