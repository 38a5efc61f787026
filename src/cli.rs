//! Command-line interface for vpscan.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::{self, Config};
use crate::detect::Runner;
use crate::report::{self, VisualizationGraph};

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Variability analysis of Java codebases.
///
/// vpscan finds variation points and their variants (inheritance,
/// overloading, composition), tags design patterns, flags hotspots, and
/// writes a visualization graph and a statistics summary as JSON.
#[derive(Parser)]
#[command(name = "vpscan")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Show debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only show warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a source tree and write the graph and statistics files
    Analyze(AnalyzeArgs),
    /// Write a default configuration file
    Init(InitArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Json,
}

/// Arguments for the analyze command.
#[derive(Parser)]
pub struct AnalyzeArgs {
    /// Root directory of the Java sources
    pub source: PathBuf,

    /// Path of the visualization graph JSON file
    pub output: PathBuf,

    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Variants or overloads making a hotspot (overrides the config file)
    #[arg(long)]
    pub singularity_threshold: Option<usize>,

    /// Composition subgraph size making an aggregation hotspot (overrides
    /// the config file)
    #[arg(long)]
    pub aggregation_threshold: Option<usize>,

    /// Terminal output format
    #[arg(short, long, value_enum, default_value = "pretty")]
    pub format: OutputFormat,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "vpscan.yaml")]
    pub output: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

const CONFIG_TEMPLATE: &str = include_str!("templates/vpscan.yaml");

/// Configuration for `args`: the file, then the command-line overrides.
fn load_config(args: &AnalyzeArgs) -> anyhow::Result<Config> {
    let cwd = std::env::current_dir()?;
    let (mut config, path) = Config::load(args.config.as_deref(), &cwd)?;
    if let Some(path) = path {
        info!("Using config {}", path.display());
    }
    if let Some(n) = args.singularity_threshold {
        config.hotspots.nb_variants_threshold = n;
    }
    if let Some(n) = args.aggregation_threshold {
        config.hotspots.nb_aggregations_threshold = n;
    }
    config::validate(&config)?;
    Ok(config)
}

/// Run the analyze command.
pub fn run_analyze(args: &AnalyzeArgs) -> anyhow::Result<i32> {
    let config = match load_config(args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return Ok(EXIT_ERROR);
        }
    };

    if !args.source.is_dir() {
        eprintln!("Error: not a directory: {}", args.source.display());
        return Ok(EXIT_ERROR);
    }

    let runner = Runner::new(&config);
    let (graph, summary) = runner.run(&args.source)?;
    let vis = VisualizationGraph::build(&graph)?;
    let outputs = report::write_outputs(&vis, &summary.statistics, &args.output);

    match args.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&summary.statistics)?);
        }
        OutputFormat::Pretty => {
            report::write_pretty(&args.source.to_string_lossy(), &summary, &outputs);
        }
    }

    if outputs.is_ok() {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_FAILED)
    }
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    if args.output.exists() && !args.force {
        eprintln!("Error: file already exists: {}", args.output.display());
        eprintln!("Use --force to overwrite it or --output to pick another path");
        return Ok(EXIT_ERROR);
    }

    // Create output directory if needed
    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() && parent != Path::new(".") {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("Error: failed to create directory: {}", e);
                return Ok(EXIT_ERROR);
            }
        }
    }

    if let Err(e) = std::fs::write(&args.output, CONFIG_TEMPLATE) {
        eprintln!("Error: failed to write config: {}", e);
        return Ok(EXIT_ERROR);
    }

    println!("Created {}", args.output.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to adjust the hotspot thresholds", args.output.display());
    println!(
        "  2. Run: vpscan analyze <SOURCE_DIR> <OUTPUT_JSON> --config {}",
        args.output.display()
    );

    Ok(EXIT_SUCCESS)
}
