use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::goals::GoalKind;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Project descriptor (JSON) listing the project and its resolved dependencies
    #[arg(short, long, global = true, default_value = "osgi-deps-project.json")]
    pub project: PathBuf,

    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Write the generated properties to this file instead of stdout
    #[arg(short, long, global = true)]
    pub output_properties: Option<PathBuf>,

    /// Write a JSON report with diagnostics to this file
    #[arg(short, long, global = true)]
    pub report: Option<PathBuf>,

    /// Property for ${name} substitution, as key=value
    #[arg(short = 'D', value_parser = parse_key_value, global = true)]
    pub define: Vec<(String, String)>,

    /// Disable the dependency scan cache
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Fail when split packages are found
    #[arg(long, global = true)]
    pub fail_on_split_packages: bool,

    /// Fail when imported packages are not exported by anything known
    #[arg(long, global = true)]
    pub fail_on_missing_exports: bool,

    /// Do not query Maven Central for missing packages
    #[arg(long, global = true)]
    pub offline: bool,

    /// More log output (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate the bundle's Import-Package list
    Dependencies,

    /// Patch the Import-Package header of the built bundle
    CheckDependencies {
        /// Bundle JAR; defaults to <build output>/../<artifactId>-<version>.jar
        #[arg(long)]
        jar: Option<PathBuf>,

        /// Write <name>-<classifier>.jar next to the bundle instead of patching it in place
        #[arg(long)]
        classifier: Option<String>,
    },

    /// Build the framework's exported package list
    FrameworkPackages,

    /// Show which dependencies contain the given packages (`org.a` or `org.a.*`)
    FindPackages {
        #[arg(required = true, value_delimiter = ',')]
        packages: Vec<String>,
    },

    /// Show which classes use the given packages (`org.a` or `org.a.*`)
    FindPackageUses {
        #[arg(required = true, value_delimiter = ',')]
        packages: Vec<String>,
    },
}

impl Commands {
    pub fn goal(&self) -> GoalKind {
        match self {
            Commands::Dependencies => GoalKind::Dependencies,
            Commands::CheckDependencies { .. } => GoalKind::CheckDependencies,
            Commands::FrameworkPackages => GoalKind::FrameworkPackages,
            Commands::FindPackages { .. } => GoalKind::FindPackages,
            Commands::FindPackageUses { .. } => GoalKind::FindPackageUses,
        }
    }
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {:?}", s))?;
    if key.is_empty() {
        return Err(format!("empty property name in {:?}", s));
    }
    Ok((key.to_string(), value.to_string()))
}
