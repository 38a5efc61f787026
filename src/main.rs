//! vpscan CLI entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;
use vpscan::cli::{self, Cli, Commands, EXIT_ERROR};

fn init_logging(cli: &Cli) {
    let default = if cli.verbose {
        "vpscan=debug"
    } else if cli.quiet {
        "vpscan=warn"
    } else {
        "vpscan=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    let result = match &cli.command {
        Commands::Analyze(args) => cli::run_analyze(args),
        Commands::Init(args) => cli::run_init(args),
    };
    let exit_code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            EXIT_ERROR
        }
    };

    std::process::exit(exit_code);
}
