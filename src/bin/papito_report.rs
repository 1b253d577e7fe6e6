//! Reads a benchmark results directory and writes the derived-metrics table and its summaries as CSV.
//!
//! Set `RUST_LOG=debug` for per-stage details.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use env_logger::Env;
use papito_metrics::{
    parse_rename, prepare_results, AggregateCfg, CounterBlockParser, PairingPolicy, Report,
    ReportCfg, BASELINE_SUFFIX,
};
use std::{fs, path::PathBuf, process::ExitCode};

#[derive(Parser)]
#[command(name = "papito_report")]
#[command(about = "Derive and summarize hardware-counter metrics from benchmark runs")]
#[command(version)]
struct Cli {
    /// Directory holding runs.csv and the run logs
    #[arg(short, long, default_value = "results")]
    results_dir: PathBuf,

    /// Output directory (default: <results-dir>/plots)
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Keep only these matrix sizes
    #[arg(long, num_args = 1..)]
    sizes: Vec<u64>,

    /// Rename a mode, as old:new
    #[arg(long, num_args = 1..)]
    rename: Vec<String>,

    /// Keep only these original mode identifiers
    #[arg(long, num_args = 1..)]
    filter: Vec<String>,

    /// Drop these display labels, e.g. "avx (unroll4)"
    #[arg(long, num_args = 1..)]
    blacklist: Vec<String>,

    /// Columns to summarize per mode, N and BS
    #[arg(long, num_args = 1.., default_values_t = [String::from("elapsed_s"), String::from("IPC")])]
    metric: Vec<String>,

    /// How to pair counter names and values of different lengths
    #[arg(long, value_enum, default_value_t = Pairing::Strict)]
    pairing: Pairing,

    /// Mode suffix marking baseline runs
    #[arg(long, default_value = BASELINE_SUFFIX)]
    baseline_suffix: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum Pairing {
    Strict,
    Truncate,
}

impl From<Pairing> for PairingPolicy {
    fn from(value: Pairing) -> Self {
        match value {
            Pairing::Strict => PairingPolicy::Strict,
            Pairing::Truncate => PairingPolicy::Truncate,
        }
    }
}

fn report_cfg(cli: &Cli) -> anyhow::Result<ReportCfg> {
    let mut aggregate = AggregateCfg::default().with_baseline_suffix(&cli.baseline_suffix);
    if !cli.rename.is_empty() {
        let renames = cli
            .rename
            .iter()
            .map(|s| parse_rename(s))
            .collect::<Result<Vec<_>, _>>()?;
        aggregate = aggregate.with_renames(renames);
    }
    if !cli.filter.is_empty() {
        aggregate = aggregate.with_include_modes(cli.filter.iter().cloned());
    }
    if !cli.blacklist.is_empty() {
        aggregate = aggregate.with_exclude_labels(cli.blacklist.iter().cloned());
    }
    if !cli.sizes.is_empty() {
        aggregate = aggregate.with_sizes(cli.sizes.iter().copied());
    }

    Ok(ReportCfg::default()
        .with_parser(CounterBlockParser::default().with_pairing(cli.pairing.into()))
        .with_aggregate(aggregate)
        .with_summary_metrics(cli.metric.iter().cloned()))
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cfg = report_cfg(&cli)?;
    let out_dir = cli
        .out_dir
        .clone()
        .unwrap_or_else(|| cli.results_dir.join("plots"));

    let table = prepare_results(&cli.results_dir, &cfg)
        .with_context(|| format!("cannot process {}", cli.results_dir.display()))?;
    if table.is_empty() {
        log::warn!("no runs left after filtering");
    }
    let report = Report::new(table, &cfg);

    fs::create_dir_all(&out_dir)
        .with_context(|| format!("cannot create output directory {}", out_dir.display()))?;
    let written = report
        .write_to(&out_dir)
        .with_context(|| format!("cannot write report to {}", out_dir.display()))?;

    for path in written {
        println!("{}", path.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
