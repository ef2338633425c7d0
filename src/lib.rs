pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod goals;
pub mod lookup;
pub mod models;
pub mod parsers;
pub mod resolve;
pub mod scanner;
pub mod utils;

pub use config::AnalyzerConfig;
pub use error::AnalysisError;
pub use goals::{GoalContext, GoalKind, GoalOutput};
pub use models::{Artifact, Diagnostic, Diagnostics, ParsingContext, ProjectDescriptor};
