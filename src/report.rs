//! End-to-end pipeline configuration and the report files produced from a results directory.

use crate::{
    apply_filters, best_worst_vs_baseline, block_size_views, derive_metrics, group_stats,
    grouped_elapsed_summary, join_records, load_catalog, write_aggregates_csv, AggregateCfg,
    AggregatedRow, CounterBlockParser, DeriveCfg, ElapsedSummary, GroupKey, GroupValues,
    MetricsTable, ReportError, Wrapper, ELAPSED_COLUMN, IPC,
};
use csv::Writer;
use std::{
    collections::BTreeMap,
    fs::File,
    io,
    path::{Path, PathBuf},
};

pub const METRICS_FILE: &str = "metrics.csv";
pub const BEST_WORST_FILE: &str = "best_worst.csv";
pub const ELAPSED_DISTRIBUTION_FILE: &str = "elapsed_distribution.csv";

/// Grouping used by the per-metric summaries and the elapsed-time distribution.
pub const SUMMARY_KEYS: [GroupKey; 3] = [GroupKey::Display, GroupKey::N, GroupKey::Bs];

//=================
// ReportCfg

/// Configuration of the whole pipeline: parsing, derivation, filtering and the metrics summarized.
#[derive(Debug, Clone)]
pub struct ReportCfg {
    parser: CounterBlockParser,
    derive: DeriveCfg,
    aggregate: AggregateCfg,
    summary_metrics: Vec<String>,
}

impl Default for ReportCfg {
    /// Default parser, descriptor table and filters; summaries of `elapsed_s` and `IPC`.
    fn default() -> Self {
        Self {
            parser: CounterBlockParser::default(),
            derive: DeriveCfg::default(),
            aggregate: AggregateCfg::default(),
            summary_metrics: vec![ELAPSED_COLUMN.to_owned(), IPC.to_owned()],
        }
    }
}

impl ReportCfg {
    /// Creates a new [`ReportCfg`] the same as `self` but with the given `parser`.
    pub fn with_parser(&self, parser: CounterBlockParser) -> Self {
        Self {
            parser,
            ..self.clone()
        }
    }

    /// Creates a new [`ReportCfg`] the same as `self` but with the given `derive` configuration.
    pub fn with_derive(&self, derive: DeriveCfg) -> Self {
        Self {
            derive,
            ..self.clone()
        }
    }

    /// Creates a new [`ReportCfg`] the same as `self` but with the given `aggregate` configuration.
    pub fn with_aggregate(&self, aggregate: AggregateCfg) -> Self {
        Self {
            aggregate,
            ..self.clone()
        }
    }

    /// Creates a new [`ReportCfg`] the same as `self` but summarizing the given columns.
    pub fn with_summary_metrics(&self, metrics: impl IntoIterator<Item = String>) -> Self {
        Self {
            summary_metrics: metrics.into_iter().collect(),
            ..self.clone()
        }
    }

    pub fn parser(&self) -> &CounterBlockParser {
        &self.parser
    }

    pub fn derive(&self) -> &DeriveCfg {
        &self.derive
    }

    pub fn aggregate(&self) -> &AggregateCfg {
        &self.aggregate
    }

    pub fn summary_metrics(&self) -> &[String] {
        &self.summary_metrics
    }
}

//=================
// Pipeline

/// Loads the manifest of `results_dir`, parses every log and returns the unfiltered table with derived
/// metrics.
pub fn load_results(results_dir: &Path, cfg: &ReportCfg) -> Result<MetricsTable, ReportError> {
    let catalog = load_catalog(results_dir)?;
    let parsed = catalog.parse_logs(&cfg.parser);
    let joined = join_records(&catalog, parsed);
    Ok(derive_metrics(&joined, &cfg.derive))
}

/// Same as [`load_results`] followed by [`apply_filters`].
pub fn prepare_results(results_dir: &Path, cfg: &ReportCfg) -> Result<MetricsTable, ReportError> {
    let table = load_results(results_dir, cfg)?;
    Ok(apply_filters(&table, &cfg.aggregate))
}

//=================
// Report

/// Every output derived from one filtered table, computed up front so that no file is written unless all
/// of them could be produced.
#[derive(Debug, Clone)]
pub struct Report {
    pub table: MetricsTable,
    /// Per-metric summaries grouped by [`SUMMARY_KEYS`]; metrics absent from the table are skipped.
    pub summaries: Vec<(String, Vec<AggregatedRow>)>,
    pub best_worst: MetricsTable,
    pub block_size_views: BTreeMap<u64, MetricsTable>,
    pub elapsed_distribution: Wrapper<BTreeMap<GroupValues, ElapsedSummary>>,
}

impl Report {
    /// Computes all report parts from an already filtered `table`.
    pub fn new(table: MetricsTable, cfg: &ReportCfg) -> Self {
        let suffix = cfg.aggregate.baseline_suffix();

        let summaries = cfg
            .summary_metrics
            .iter()
            .filter_map(|metric| {
                if !table.has_column(metric) {
                    log::warn!("no `{metric}` column, summary skipped");
                    return None;
                }
                Some((metric.clone(), group_stats(&table, &SUMMARY_KEYS, metric)))
            })
            .collect();

        let elapsed_distribution =
            grouped_elapsed_summary(&table, &SUMMARY_KEYS).unwrap_or_else(|err| {
                log::warn!("elapsed-time distribution unavailable: {err}");
                Wrapper::default()
            });

        Self {
            summaries,
            best_worst: best_worst_vs_baseline(&table, suffix),
            block_size_views: block_size_views(&table, suffix),
            elapsed_distribution,
            table,
        }
    }

    /// Writes every part into `out_dir`, which must exist. Returns the paths written.
    pub fn write_to(&self, out_dir: &Path) -> Result<Vec<PathBuf>, ReportError> {
        let mut written = Vec::new();

        let path = out_dir.join(METRICS_FILE);
        self.table.write_csv_file(&path)?;
        written.push(path);

        for (metric, rows) in &self.summaries {
            let path = out_dir.join(summary_file_name(metric));
            write_aggregates_csv(File::create(&path)?, &SUMMARY_KEYS, rows)?;
            written.push(path);
        }

        if !self.best_worst.is_empty() {
            let path = out_dir.join(BEST_WORST_FILE);
            self.best_worst.write_csv_file(&path)?;
            written.push(path);
        }

        for (bs, view) in &self.block_size_views {
            let path = out_dir.join(format!("BS{bs}_metrics.csv"));
            view.write_csv_file(&path)?;
            written.push(path);
        }

        if !self.elapsed_distribution.is_empty() {
            let path = out_dir.join(ELAPSED_DISTRIBUTION_FILE);
            write_elapsed_distribution_csv(File::create(&path)?, &self.elapsed_distribution)?;
            written.push(path);
        }

        log::info!("wrote {} files to {}", written.len(), out_dir.display());
        Ok(written)
    }
}

/// File name of the summary of `metric`, with characters unsafe in file names replaced by `_`.
pub fn summary_file_name(metric: &str) -> String {
    let safe: String = metric
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
    format!("summary_{safe}.csv")
}

/// Writes elapsed-time distributions (microseconds) as CSV, one row per group.
pub fn write_elapsed_distribution_csv<W: io::Write>(
    writer: W,
    summaries: &BTreeMap<GroupValues, ElapsedSummary>,
) -> Result<(), ReportError> {
    let mut wtr = Writer::from_writer(writer);
    let header = SUMMARY_KEYS.iter().map(|k| k.column()).chain([
        "count", "mean_us", "stdev_us", "min_us", "p25_us", "median_us", "p75_us", "p90_us",
        "max_us",
    ]);
    wtr.write_record(header)?;

    for (key, s) in summaries {
        let cells = key.iter().map(|v| v.to_string()).chain([
            s.count.to_string(),
            s.mean.to_string(),
            s.stdev.to_string(),
            s.min.to_string(),
            s.p25.to_string(),
            s.median.to_string(),
            s.p75.to_string(),
            s.p90.to_string(),
            s.max.to_string(),
        ]);
        wtr.write_record(cells)?;
    }
    wtr.flush()?;
    Ok(())
}
