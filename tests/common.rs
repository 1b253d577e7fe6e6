#![allow(dead_code)]

use papito_metrics::{CounterBlockParser, MetricsTable, RunCatalog};
use std::{fs, path::Path};
use tempfile::TempDir;

pub const MANIFEST_HEADER: &str = "timestamp,mode,N,BS,repeat,elapsed_s,logfile,tuning";

pub fn are_close(left: f64, right: f64, pct: f64) -> bool {
    let avg_abs = (left.abs() + right.abs()) / 2.0;
    (left - right).abs() <= avg_abs * pct
}

/// Log text with a single counter block.
pub fn counter_log(names: &[&str], values: &[&str]) -> String {
    format!(
        "starting run\nPAPITO_COUNTERS\t{}\nPAPITO_VALUES\t{}\ndone\n",
        names.join("\t"),
        values.join("\t")
    )
}

/// One manifest row.
#[derive(Debug, Clone)]
pub struct RunSpec {
    pub mode: &'static str,
    pub n: u64,
    pub bs: u64,
    pub repeat: u64,
    pub elapsed_s: &'static str,
    pub tuning: &'static str,
    /// Log file contents; `None` leaves the log file absent.
    pub log: Option<String>,
}

impl RunSpec {
    pub fn new(mode: &'static str, n: u64, bs: u64, elapsed_s: &'static str) -> Self {
        Self {
            mode,
            n,
            bs,
            repeat: 0,
            elapsed_s,
            tuning: "",
            log: None,
        }
    }

    pub fn repeat(self, repeat: u64) -> Self {
        Self { repeat, ..self }
    }

    pub fn tuning(self, tuning: &'static str) -> Self {
        Self { tuning, ..self }
    }

    pub fn log(self, log: String) -> Self {
        Self {
            log: Some(log),
            ..self
        }
    }

    pub fn counters(self, names: &[&str], values: &[&str]) -> Self {
        self.log(counter_log(names, values))
    }

    fn logfile(&self, idx: usize) -> String {
        format!("logs/{}_N{}_BS{}_r{}_{idx}.log", self.mode, self.n, self.bs, self.repeat)
    }
}

/// Results directory with a `runs.csv` built from `runs`; each run with a log gets its own file under
/// `logs/`.
pub struct ResultsFixture {
    pub dir: TempDir,
}

impl ResultsFixture {
    pub fn new(runs: &[RunSpec]) -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::create_dir_all(dir.path().join("logs")).expect("logs dir");

        let mut manifest = String::from(MANIFEST_HEADER);
        manifest.push('\n');
        for (idx, run) in runs.iter().enumerate() {
            let logfile = run.logfile(idx);
            if let Some(log) = &run.log {
                fs::write(dir.path().join(&logfile), log).expect("log written");
            }
            manifest.push_str(&format!(
                "2024-05-01T10:00:{idx:02},{},{},{},{},{},{logfile},{}\n",
                run.mode, run.n, run.bs, run.repeat, run.elapsed_s, run.tuning
            ));
        }
        Self::with_manifest(dir, &manifest)
    }

    /// Fixture whose manifest is exactly `manifest`.
    pub fn with_raw_manifest(manifest: &str) -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        Self::with_manifest(dir, manifest)
    }

    fn with_manifest(dir: TempDir, manifest: &str) -> Self {
        fs::write(dir.path().join("runs.csv"), manifest).expect("manifest written");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_file(&self, rel: &str, contents: &str) {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("parent dir");
        }
        fs::write(path, contents).expect("file written");
    }

    pub fn catalog(&self) -> RunCatalog {
        papito_metrics::load_catalog(self.path()).expect("manifest loads")
    }

    /// Joined table without derived metrics.
    pub fn joined(&self) -> MetricsTable {
        let catalog = self.catalog();
        let parsed = catalog.parse_logs(&CounterBlockParser::default());
        papito_metrics::join_records(&catalog, parsed)
    }

    /// Joined table with the default derived metrics.
    pub fn derived(&self) -> MetricsTable {
        papito_metrics::derive_metrics(&self.joined(), &Default::default())
    }
}

/// Display labels of `table`, in row order.
pub fn labels(table: &MetricsTable) -> Vec<&str> {
    table.rows().iter().map(|r| r.display_mode()).collect()
}

/// Elapsed times of `table`, in row order.
pub fn elapsed(table: &MetricsTable) -> Vec<Option<f64>> {
    table.numeric_column("elapsed_s")
}
