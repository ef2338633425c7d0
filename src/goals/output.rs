//! Writers for goal results: Java-style properties and the JSON report.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde_json::to_string_pretty;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use super::{GoalKind, GoalOutput};
use crate::models::{Diagnostics, Header, REPORT_FORMAT_VERSION, Report};

/// Escapes a key or value for a `.properties` file. Non-ASCII characters
/// become `\uXXXX` escapes.
fn escape_property(text: &str, is_key: bool) -> String {
    let mut escaped = String::with_capacity(text.len());
    for (index, c) in text.chars().enumerate() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\t' => escaped.push_str("\\t"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\x0c' => escaped.push_str("\\f"),
            '=' | ':' | '#' | '!' => {
                escaped.push('\\');
                escaped.push(c);
            }
            ' ' if is_key || index == 0 => escaped.push_str("\\ "),
            c if (c as u32) < 0x20 || (c as u32) > 0x7e => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    escaped.push_str(&format!("\\u{:04X}", unit));
                }
            }
            c => escaped.push(c),
        }
    }
    escaped
}

pub fn format_properties(properties: &BTreeMap<String, String>) -> String {
    properties
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}\n",
                escape_property(key, true),
                escape_property(value, false)
            )
        })
        .collect()
}

/// Writes `properties` to `path`, or to stdout when no path is given.
pub fn write_properties(path: Option<&Path>, properties: &BTreeMap<String, String>) -> Result<()> {
    let content = format_properties(properties);
    match path {
        Some(path) => {
            let mut file =
                File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
            file.write_all(content.as_bytes())
                .with_context(|| format!("Failed to write {:?}", path))?;
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(content.as_bytes())?;
        }
    }
    Ok(())
}

pub fn create_report(
    goal: GoalKind,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    diagnostics: Diagnostics,
    output: Option<GoalOutput>,
    errors: Vec<String>,
) -> Report {
    let duration = (end_time - start_time).num_nanoseconds().unwrap_or(0) as f64 / 1_000_000_000.0;
    Report {
        headers: vec![Header {
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            goal: goal.as_str().to_string(),
            start_timestamp: start_time.to_rfc3339(),
            end_timestamp: end_time.to_rfc3339(),
            duration,
            errors,
            output_format_version: REPORT_FORMAT_VERSION.to_string(),
        }],
        diagnostics: diagnostics.into_vec(),
        result: output.map(|output| output.result).unwrap_or_default(),
    }
}

pub fn write_report(path: &Path, report: &Report) -> Result<()> {
    let json = to_string_pretty(report).context("Failed to serialize report")?;
    let mut file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    file.write_all(json.as_bytes())
        .with_context(|| format!("Failed to write {:?}", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Diagnostic;
    use tempfile::TempDir;

    #[test]
    fn test_format_properties_escapes() {
        let mut properties = BTreeMap::new();
        properties.insert(
            "jahia.plugin.projectPackageImport".to_string(),
            "org.a;version=\"1.0\",org.b;resolution:=optional".to_string(),
        );
        properties.insert("odd key".to_string(), " caf\u{e9}\n".to_string());

        assert_eq!(
            format_properties(&properties),
            "jahia.plugin.projectPackageImport=org.a;version\\=\"1.0\",org.b;resolution\\:\\=optional\n\
             odd\\ key=\\ caf\\u00E9\\n\n"
        );
    }

    #[test]
    fn test_report_round_trips_through_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("report.json");
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(Diagnostic::UnresolvedTaglib {
            uri: "http://example.com/tags".to_string(),
        });
        let start = Utc::now();
        let report = create_report(
            GoalKind::Dependencies,
            start,
            start + chrono::Duration::milliseconds(1500),
            diagnostics,
            Some(GoalOutput {
                properties: BTreeMap::new(),
                result: serde_json::json!({ "imports": [] }),
            }),
            Vec::new(),
        );
        write_report(&path, &report).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["headers"][0]["goal"], "dependencies");
        assert_eq!(written["headers"][0]["duration"], 1.5);
        assert_eq!(written["headers"][0]["output_format_version"], REPORT_FORMAT_VERSION);
        assert_eq!(written["diagnostics"].as_array().map(Vec::len), Some(1));
        assert!(written["result"]["imports"].is_array());
    }
}
