// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! ddtrace-gen main entry point.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use colored::Colorize;

use ddtrace_gen::codegen::{defaults, init_defaults, GeneratorDefaults};
use ddtrace_gen::config::{find_config, init_config, load_config, DEFAULT_OUTPUT};
use ddtrace_gen::generate::{run, run_single, GenerateOptions};
use ddtrace_gen::telemetry::{init_telemetry, TelemetryConfig, GLOBAL_METRICS};
use ddtrace_gen::{RunReport, VERSION};

/// Generate Datadog tracing decorators for Go interfaces.
#[derive(Parser)]
#[command(name = "ddtrace-gen")]
#[command(author, version, about = "Generate Datadog tracing decorators for Go interfaces", long_about = None)]
struct Cli {
    /// Show debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only show warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate decorators
    Gen(GenArgs),

    /// Write an example .ddtrace.yaml in the current directory
    Init {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show version information
    Version,
}

#[derive(Args)]
struct GenArgs {
    /// Package to generate for (import path or directory); skips the config
    #[arg(short = 'p', long = "package")]
    package: Option<String>,

    /// Output directory, relative to the package
    #[arg(short = 'o', long = "output")]
    output: Option<String>,

    /// Do not write a //go:generate directive
    #[arg(short = 'g', long = "no-generate")]
    no_generate: bool,

    /// Config file (default: nearest .ddtrace.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Regenerate packages whose output looks current
    #[arg(long)]
    force: bool,

    /// Pipe generated code through gofmt
    #[arg(long)]
    gofmt: bool,

    /// Import path of the tracing helper package
    #[arg(long, env = "DDTRACE_TRACING_PACKAGE")]
    tracing_package: Option<String>,

    /// Maximum number of packages processed in parallel
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    /// Print operation timings after the run
    #[arg(long)]
    stats: bool,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let telemetry = if cli.verbose {
        TelemetryConfig::verbose()
    } else if cli.quiet {
        TelemetryConfig::quiet()
    } else {
        TelemetryConfig::default()
    };
    let _guard = init_telemetry(&telemetry)?;

    match cli.command {
        Commands::Gen(args) => handle_gen(args, cli.quiet).await,
        Commands::Init { force } => {
            let cwd = std::env::current_dir()?;
            let path = init_config(&cwd, force)?;
            println!("{} {}", "Created".green(), path.display());
            Ok(())
        }
        Commands::Version => {
            println!("ddtrace-gen {}", VERSION);
            println!("tracing package: {}", defaults().tracing_import);
            Ok(())
        }
    }
}

async fn handle_gen(args: GenArgs, quiet: bool) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;

    let config_path = match (&args.package, &args.config) {
        (Some(_), _) => None,
        (None, Some(path)) => Some(path.clone()),
        (None, None) => find_config(&cwd),
    };
    let config = config_path.as_deref().map(load_config).transpose()?;

    let tracing_package = args
        .tracing_package
        .clone()
        .or_else(|| config.as_ref().and_then(|c| c.tracing_package.clone()));
    if let Some(tracing_import) = tracing_package.clone() {
        let _ = init_defaults(GeneratorDefaults {
            tracing_import,
            ..GeneratorDefaults::default()
        });
    }

    let options = GenerateOptions {
        force: args.force,
        no_generate: args.no_generate,
        gofmt: args.gofmt,
        tracing_package,
        jobs: args.jobs,
    };

    let result = match (config, config_path) {
        (Some(config), Some(path)) => {
            tracing::info!("using config {}", path.display());
            run(&config, &path, &options).await
        }
        _ => {
            let package = args.package.as_deref().unwrap_or(".");
            let output = args
                .output
                .clone()
                .unwrap_or_else(|| format!("./{DEFAULT_OUTPUT}"));
            run_single(&cwd, package, &output, &options).await
        }
    };

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            print_stats(args.stats);
            std::process::exit(1);
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !quiet {
        print_report(&report, &cwd);
    }
    print_stats(args.stats);
    Ok(())
}

fn print_report(report: &RunReport, cwd: &Path) {
    if report.interfaces_generated == 0 && report.packages_up_to_date == 0 {
        println!("{} no interfaces to decorate under {}", "•".dimmed(), cwd.display());
        return;
    }
    println!("{} {}", "✓".green(), report.summary());
}

fn print_stats(enabled: bool) {
    if enabled {
        eprintln!("{}", GLOBAL_METRICS.snapshot().format_report());
    }
}
