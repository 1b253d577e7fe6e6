//! Loading of the run manifest and resolution of each run's log file.

use crate::{CounterBlockParser, ParsedLog, ReportError};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::path::{Path, PathBuf};

/// Name of the manifest file inside a results directory.
pub const MANIFEST_FILE: &str = "runs.csv";

pub const TIMESTAMP_COLUMN: &str = "timestamp";
pub const MODE_COLUMN: &str = "mode";
pub const N_COLUMN: &str = "N";
pub const BS_COLUMN: &str = "BS";
pub const REPEAT_COLUMN: &str = "repeat";
pub const ELAPSED_COLUMN: &str = "elapsed_s";
pub const LOGFILE_COLUMN: &str = "logfile";
pub const TUNING_COLUMN: &str = "tuning";

/// Columns every manifest must carry.
pub const REQUIRED_COLUMNS: [&str; 7] = [
    TIMESTAMP_COLUMN,
    MODE_COLUMN,
    N_COLUMN,
    BS_COLUMN,
    REPEAT_COLUMN,
    ELAPSED_COLUMN,
    LOGFILE_COLUMN,
];

/// Tuning values that mean "no tuning".
const NO_TUNING: [&str; 6] = ["", "NA", "NaN", "nan", "none", "None"];

//=================
// RunRecord

/// One row of the manifest.
///
/// Numeric cells that fail to parse are `None`; the row itself is always kept.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub timestamp: String,
    pub mode: String,
    pub n: Option<u64>,
    pub bs: Option<u64>,
    pub repeat: Option<u64>,
    pub elapsed_s: Option<f64>,
    pub tuning: Option<String>,
    /// Log-file reference exactly as stored in the manifest.
    pub logfile: String,
    /// Resolved location of the log, `None` if no candidate path exists.
    pub log_path: Option<PathBuf>,
    /// Values of the manifest's additional columns, verbatim, aligned with [`RunCatalog::extra_columns`].
    pub extra: Vec<String>,
}

impl RunRecord {
    /// Creates a record with the given identity and no timing, tuning or log.
    pub fn new(mode: &str, n: u64, bs: u64, repeat: u64) -> Self {
        Self {
            timestamp: String::new(),
            mode: mode.to_owned(),
            n: Some(n),
            bs: Some(bs),
            repeat: Some(repeat),
            elapsed_s: None,
            tuning: None,
            logfile: String::new(),
            log_path: None,
            extra: Vec::new(),
        }
    }

    pub fn with_elapsed(self, elapsed_s: f64) -> Self {
        Self {
            elapsed_s: Some(elapsed_s),
            ..self
        }
    }
}

//=================
// RunCatalog

/// Ordered manifest rows of one results directory.
#[derive(Debug, Clone, PartialEq)]
pub struct RunCatalog {
    results_dir: PathBuf,
    extra_columns: Vec<String>,
    records: Vec<RunRecord>,
}

impl RunCatalog {
    pub fn new(results_dir: &Path, extra_columns: Vec<String>, records: Vec<RunRecord>) -> Self {
        Self {
            results_dir: results_dir.to_path_buf(),
            extra_columns,
            records,
        }
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Names of the manifest columns passed through untouched, in header order.
    pub fn extra_columns(&self) -> &[String] {
        &self.extra_columns
    }

    pub fn records(&self) -> &[RunRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Parses the log of every record, in manifest order. Records without a resolved log get an empty
    /// [`ParsedLog`], so the result always has one entry per record.
    pub fn parse_logs(&self, parser: &CounterBlockParser) -> Vec<ParsedLog> {
        self.records
            .iter()
            .map(|record| match &record.log_path {
                Some(path) => parser.parse_file(path),
                None => ParsedLog::default(),
            })
            .collect()
    }
}

//=================
// Loading

/// Loads `<results_dir>/runs.csv`.
pub fn load_catalog(results_dir: &Path) -> Result<RunCatalog, ReportError> {
    load_catalog_from(&results_dir.join(MANIFEST_FILE), results_dir)
}

/// Loads the manifest at `manifest`, resolving log references against `results_dir`.
///
/// # Errors
/// - [`ReportError::ManifestNotFound`] if `manifest` is not an existing file.
/// - [`ReportError::ManifestRead`] if the file cannot be read as CSV.
/// - [`ReportError::MissingColumn`] if one of the [`REQUIRED_COLUMNS`] is absent from the header.
pub fn load_catalog_from(manifest: &Path, results_dir: &Path) -> Result<RunCatalog, ReportError> {
    if !manifest.is_file() {
        return Err(ReportError::ManifestNotFound(manifest.to_path_buf()));
    }
    let read_err = |source| ReportError::ManifestRead {
        path: manifest.to_path_buf(),
        source,
    };

    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::Headers)
        .from_path(manifest)
        .map_err(read_err)?;
    let headers = reader.headers().map_err(read_err)?.clone();
    let layout = ColumnLayout::new(&headers, manifest)?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(read_err)?;
        records.push(layout.record(&row, results_dir));
    }

    let unresolved = records.iter().filter(|r| r.log_path.is_none()).count();
    log::info!(
        "loaded {} runs from {} ({} without a log file)",
        records.len(),
        manifest.display(),
        unresolved
    );

    Ok(RunCatalog::new(results_dir, layout.extra_names, records))
}

/// Header positions of the known columns plus the names and positions of the extra ones.
struct ColumnLayout {
    required: [usize; 7],
    tuning: Option<usize>,
    extra_idx: Vec<usize>,
    extra_names: Vec<String>,
}

impl ColumnLayout {
    fn new(headers: &StringRecord, manifest: &Path) -> Result<Self, ReportError> {
        let position = |name: &str| headers.iter().position(|h| h == name);

        let mut required = [0; 7];
        for (slot, column) in required.iter_mut().zip(REQUIRED_COLUMNS) {
            *slot = position(column).ok_or_else(|| ReportError::MissingColumn {
                path: manifest.to_path_buf(),
                column,
            })?;
        }
        let tuning = position(TUNING_COLUMN);

        let (extra_idx, extra_names) = headers
            .iter()
            .enumerate()
            .filter(|(_, h)| !REQUIRED_COLUMNS.iter().any(|c| c == h) && *h != TUNING_COLUMN)
            .map(|(i, h)| (i, h.to_owned()))
            .unzip();

        Ok(Self {
            required,
            tuning,
            extra_idx,
            extra_names,
        })
    }

    fn record(&self, row: &StringRecord, results_dir: &Path) -> RunRecord {
        let raw = |i: usize| row.get(i).unwrap_or("");
        let cell = |i: usize| raw(i).trim();
        let [timestamp, mode, n, bs, repeat, elapsed_s, logfile] = self.required.map(cell);

        RunRecord {
            timestamp: timestamp.to_owned(),
            mode: mode.to_owned(),
            n: parse_count(n),
            bs: parse_count(bs),
            repeat: parse_count(repeat),
            elapsed_s: parse_seconds(elapsed_s),
            tuning: self.tuning.map(cell).and_then(tuning_label),
            logfile: logfile.to_owned(),
            log_path: resolve_log_path(results_dir, logfile),
            extra: self.extra_idx.iter().map(|i| raw(*i).to_owned()).collect(),
        }
    }
}

/// Resolves a manifest log reference. Candidates, in order: the reference relative to `results_dir`,
/// its bare file name inside `results_dir`, the reference as given (absolute or relative to the current
/// directory). Returns the first candidate that is an existing file.
pub fn resolve_log_path(results_dir: &Path, reference: &str) -> Option<PathBuf> {
    if reference.is_empty() {
        return None;
    }
    let reference = Path::new(reference);
    let mut candidates = vec![results_dir.join(reference)];
    if let Some(name) = reference.file_name() {
        candidates.push(results_dir.join(name));
    }
    candidates.push(reference.to_path_buf());

    let found = candidates.into_iter().find(|p| p.is_file());
    if found.is_none() {
        log::warn!(
            "log file `{}` not found under {}",
            reference.display(),
            results_dir.display()
        );
    }
    found
}

/// Normalizes a raw tuning cell, mapping the "no tuning" sentinels to `None`.
pub fn tuning_label(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if NO_TUNING.iter().any(|s| *s == raw) {
        None
    } else {
        Some(raw.to_owned())
    }
}

/// Parses a non-negative integer cell; integral floats such as `1024.0` are accepted.
fn parse_count(s: &str) -> Option<u64> {
    if let Ok(v) = s.parse::<u64>() {
        return Some(v);
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 => Some(v as u64),
        _ => None,
    }
}

fn parse_seconds(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}
