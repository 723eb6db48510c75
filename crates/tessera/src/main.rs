use std::{
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use log::LevelFilter;
use tessera::{
    config::{CONFIG_FILE_NAME, Config},
    orchestrator::BundlePlanner,
    source_provider::OsSourceProvider,
    stats::BuildStats,
};

/// Plan the entry bundles of a web component app
#[derive(Parser, Debug)]
#[command(name = "tessera")]
#[command(version)]
#[command(about, long_about = None)]
struct Cli {
    /// Project config file
    #[arg(short, long, value_name = "FILE", default_value = CONFIG_FILE_NAME)]
    config: PathBuf,

    /// Write a JSON build stats manifest to this file
    #[arg(long, value_name = "FILE")]
    stats: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    // RUST_LOG wins over -v
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load(&cli.config)?;
    let planner = BundlePlanner::new(Arc::new(OsSourceProvider::new()));
    let plan = planner
        .plan(config.to_planner_config())
        .with_context(|| format!("Failed to plan bundles for {}", cli.config.display()))?;

    let mut stdout = io::stdout().lock();
    for entry_module in &plan.entry_modules {
        writeln!(
            stdout,
            "{} modes={} encapsulation={}",
            entry_module.entry_key,
            entry_module.mode_names.join(","),
            entry_module
                .encapsulations
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",")
        )?;
    }

    if let Some(stats_path) = &cli.stats {
        match BuildStats::for_plan(&plan, Some(&config.root_dir)) {
            Some(stats) => {
                stats.write(stats_path)?;
                log::info!("Wrote build stats to {}", stats_path.display());
            }
            None => log::warn!("Skipping build stats, the plan reported errors"),
        }
    }

    Ok(if plan.has_errors() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
