use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use indicatif_log_bridge::LogWrapper;
use log::{info, warn};

use osgi_deps::cli::{Cli, Commands, GlobalArgs};
use osgi_deps::config::AnalyzerConfig;
use osgi_deps::goals::check_dependencies::CheckOptions;
use osgi_deps::goals::output::{create_report, write_properties, write_report};
use osgi_deps::goals::{
    GoalContext, GoalOutput, check_dependencies, dependencies, find_package_uses, find_packages,
    framework_packages,
};
use osgi_deps::lookup::{ArtifactLookup, MavenCentralSearch};
use osgi_deps::models::{Diagnostics, ProjectDescriptor};
use osgi_deps::scanner::DescriptorGraphResolver;

fn main() {
    let cli = Cli::parse();
    let multi = MultiProgress::new();
    init_logging(&cli.global, &multi);

    if let Err(err) = run(cli, &multi) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn init_logging(args: &GlobalArgs, multi: &MultiProgress) {
    let default_filter = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
            .build();
    let level = logger.filter();
    if LogWrapper::new(multi.clone(), logger).try_init().is_ok() {
        log::set_max_level(level);
    }
}

fn run(cli: Cli, multi: &MultiProgress) -> Result<()> {
    let start_time = Utc::now();
    let goal = cli.command.goal();
    let args = &cli.global;

    let project = ProjectDescriptor::load(&args.project)?;
    let mut config = AnalyzerConfig::load_or_default(args.config.as_deref())?;
    apply_overrides(&mut config, args);
    let system_properties = config.system_properties(&args.define);

    let search = if config.missing_exports.enabled && config.missing_exports.search_maven_central {
        match MavenCentralSearch::with_default_client() {
            Ok(search) => Some(search),
            Err(e) => {
                warn!("Maven Central lookups disabled: {:#}", e);
                None
            }
        }
    } else {
        None
    };
    let resolver = DescriptorGraphResolver;
    let progress_bar = multi.add(create_progress_bar());

    let context = GoalContext {
        project: &project,
        config: &config,
        system_properties,
        resolver: &resolver,
        lookup: search.as_ref().map(|search| search as &dyn ArtifactLookup),
        progress_bar: &progress_bar,
    };

    info!("Running {} for {}", goal.as_str(), project.coordinates());
    let mut diagnostics = Diagnostics::new();
    let result = run_goal(cli.command, &context, &mut diagnostics);
    progress_bar.finish_and_clear();
    let end_time = Utc::now();
    info!(
        "{} finished with {} diagnostic(s)",
        goal.as_str(),
        diagnostics.len()
    );

    let properties = result
        .as_ref()
        .map(|output| output.properties.clone())
        .unwrap_or_default();
    if let Some(path) = &args.report {
        let errors = match &result {
            Ok(_) => Vec::new(),
            Err(err) => vec![format!("{err:#}")],
        };
        let output = result.as_ref().ok().cloned();
        let report = create_report(goal, start_time, end_time, diagnostics, output, errors);
        write_report(path, &report)?;
        info!("Report written to {:?}", path);
    }

    result?;
    if !properties.is_empty() {
        write_properties(args.output_properties.as_deref(), &properties)?;
    }
    Ok(())
}

fn run_goal(
    command: Commands,
    context: &GoalContext,
    diagnostics: &mut Diagnostics,
) -> Result<GoalOutput> {
    match command {
        Commands::Dependencies => dependencies::run(context, diagnostics),
        Commands::CheckDependencies { jar, classifier } => {
            check_dependencies::run(context, CheckOptions { jar, classifier }, diagnostics)
        }
        Commands::FrameworkPackages => framework_packages::run(context, diagnostics),
        Commands::FindPackages { packages } => find_packages::run(context, &packages, diagnostics),
        Commands::FindPackageUses { packages } => {
            find_package_uses::run(context, &packages, diagnostics)
        }
    }
}

/// CLI flags win over the configuration file.
fn apply_overrides(config: &mut AnalyzerConfig, args: &GlobalArgs) {
    if args.no_cache {
        config.cache.enabled = false;
    }
    if args.fail_on_split_packages {
        config.dependencies.fail_build_on_split_packages = true;
    }
    if args.fail_on_missing_exports {
        config.missing_exports.enabled = true;
        config.missing_exports.fail_build_on_missing_package_exports = true;
    }
    if args.offline {
        config.missing_exports.search_maven_central = false;
    }
}

fn create_progress_bar() -> ProgressBar {
    let progress_bar = ProgressBar::new(0);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} dependencies scanned ({eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    progress_bar
}
