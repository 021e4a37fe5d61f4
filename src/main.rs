//! Loopscan CLI - repository topology defect detection.

use std::io::{stdout, Write};
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use loopscan::cli::{AnalyzeArgs, Cli, Command, GraphArgs};
use loopscan::config::Config;
use loopscan::core::Error;
use loopscan::graph::{dot, GraphBuilder, ResolutionOptions};
use loopscan::output::Format;
use loopscan::pipeline::analyze_snapshot;
use loopscan::source::Snapshot;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so report output stays machine-readable.
    let default_level = if cli.verbose { "loopscan=debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(Error::FindingsPresent { count }) => {
            eprintln!("{count} finding(s) reported");
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> loopscan::core::Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load_default(".")?,
    };
    if let Some(format) = cli.format {
        config.output.format = format.into();
    }
    if cli.no_color {
        config.output.color = false;
    }
    let format = Format::from(config.output.format);

    match cli.command {
        Command::Analyze(args) => run_analyze(args, config, format),
        Command::Graph(args) => run_graph(args, config, format),
        Command::Rules => run_rules(&config, format),
        Command::Init => {
            stdout().write_all(Config::default_toml().as_bytes())?;
            Ok(())
        }
    }
}

fn run_analyze(args: AnalyzeArgs, mut config: Config, format: Format) -> loopscan::core::Result<()> {
    if args.cross_instance {
        config.resolution.cross_instance = true;
    }
    if let Some(max) = args.max_chain_length {
        if max == 0 {
            return Err(Error::InvalidArgument(
                "--max-chain-length must be at least 1".to_string(),
            ));
        }
        config.rules.max_chain_length = max;
    }

    let snapshot = Snapshot::from_file(&args.snapshot)?;
    let analysis = analyze_snapshot(snapshot, &config);

    let mut out = stdout();
    format.write_report(&analysis.report, &mut out, config.output.color)?;

    let count = analysis.report.summary.total_findings;
    if args.fail_on_findings && count > 0 {
        return Err(Error::FindingsPresent { count });
    }
    Ok(())
}

fn run_graph(args: GraphArgs, mut config: Config, format: Format) -> loopscan::core::Result<()> {
    if args.cross_instance {
        config.resolution.cross_instance = true;
    }

    let records = Snapshot::from_file(&args.snapshot)?.into_records();
    let output = GraphBuilder::with_options(ResolutionOptions::from(&config.resolution))
        .build_raw(records.descriptors);
    for finding in records.rejected.iter().chain(&output.findings) {
        tracing::warn!("{}", finding.message);
    }

    let mut out = stdout();
    if args.dot {
        out.write_all(dot::to_dot(&output.graph).as_bytes())?;
    } else {
        format.format(&output.graph, &mut out)?;
    }
    Ok(())
}

#[derive(Serialize)]
struct RuleInfo {
    name: &'static str,
    description: &'static str,
}

fn run_rules(config: &Config, format: Format) -> loopscan::core::Result<()> {
    let rules: Vec<RuleInfo> = loopscan::rules::all(&config.rules)
        .iter()
        .map(|rule| RuleInfo {
            name: rule.name(),
            description: rule.description(),
        })
        .collect();
    format.format(&rules, &mut stdout())?;
    Ok(())
}
