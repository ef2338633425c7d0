use serde::Serialize;

use super::Diagnostic;

pub const REPORT_FORMAT_VERSION: &str = "1.0.0";

#[derive(Serialize, Debug)]
pub struct Report {
    pub headers: Vec<Header>,
    pub diagnostics: Vec<Diagnostic>,
    pub result: serde_json::Value,
}

#[derive(Serialize, Debug)]
pub struct Header {
    pub tool_version: String,
    pub goal: String,
    pub start_timestamp: String,
    pub end_timestamp: String,
    pub duration: f64,
    pub errors: Vec<String>,
    pub output_format_version: String,
}
