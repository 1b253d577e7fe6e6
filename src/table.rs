//! The tidy per-run table shared by the joiner, the deriver and the aggregator.

use crate::{
    CounterSet, ReportError, RunRecord, BS_COLUMN, ELAPSED_COLUMN, LOGFILE_COLUMN, MODE_COLUMN,
    N_COLUMN, REPEAT_COLUMN, TIMESTAMP_COLUMN, TUNING_COLUMN,
};
use csv::Writer;
use std::{collections::BTreeMap, fs::File, io, path::Path};

pub const ORIGINAL_MODE_COLUMN: &str = "original_mode";
pub const DISPLAY_MODE_COLUMN: &str = "display_mode";
pub const CHECKSUM_COLUMN: &str = "checksum";
/// Whether the run's log file was found.
pub const LOG_FOUND_COLUMN: &str = "log_found";

//=================
// DerivedRow

/// One run: its manifest record, its parsed counters and the secondary metrics derived from them.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedRow {
    pub(crate) record: RunRecord,
    pub(crate) original_mode: String,
    pub(crate) display_mode: String,
    pub(crate) checksum: Option<f64>,
    pub(crate) counters: CounterSet,
    pub(crate) metrics: BTreeMap<&'static str, Option<f64>>,
}

impl DerivedRow {
    /// Manifest record, with `mode` reflecting any rename applied so far.
    pub fn record(&self) -> &RunRecord {
        &self.record
    }

    /// Current mode identifier (renamed if a rename applied).
    pub fn mode(&self) -> &str {
        &self.record.mode
    }

    /// Mode identifier as it appears in the manifest.
    pub fn original_mode(&self) -> &str {
        &self.original_mode
    }

    /// Composite legend label, see [`display_label`](crate::display_label).
    pub fn display_mode(&self) -> &str {
        &self.display_mode
    }

    pub fn n(&self) -> Option<u64> {
        self.record.n
    }

    pub fn bs(&self) -> Option<u64> {
        self.record.bs
    }

    pub fn tuning(&self) -> Option<&str> {
        self.record.tuning.as_deref()
    }

    pub fn elapsed_s(&self) -> Option<f64> {
        self.record.elapsed_s
    }

    pub fn checksum(&self) -> Option<f64> {
        self.checksum
    }

    pub fn counters(&self) -> &CounterSet {
        &self.counters
    }

    /// Value of derived metric `name`; `None` if the metric is missing for this row or was not derived.
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied().flatten()
    }

    /// Numeric value of `column`, looked up among the manifest's numeric columns, the checksum, the
    /// derived metrics, the raw counters and finally the extra columns of `table`.
    pub fn numeric(&self, table: &MetricsTable, column: &str) -> Option<f64> {
        match column {
            N_COLUMN => self.record.n.map(|v| v as f64),
            BS_COLUMN => self.record.bs.map(|v| v as f64),
            REPEAT_COLUMN => self.record.repeat.map(|v| v as f64),
            ELAPSED_COLUMN => self.record.elapsed_s,
            CHECKSUM_COLUMN => self.checksum,
            _ if self.metrics.contains_key(column) => self.metric(column),
            _ if self.counters.contains_key(column) => self.counters.value_of(column),
            _ => table
                .extra_columns
                .iter()
                .position(|c| c == column)
                .and_then(|i| self.record.extra.get(i))
                .and_then(|v| v.parse::<f64>().ok())
                .filter(|v| v.is_finite()),
        }
    }
}

//=================
// MetricsTable

/// Ordered collection of [`DerivedRow`]s plus the column schema shared by all rows.
///
/// A derived metric column is either present for the whole table (possibly with per-row missing values)
/// or absent altogether; check [`Self::has_column`] before reading one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetricsTable {
    pub(crate) extra_columns: Vec<String>,
    pub(crate) counter_columns: Vec<String>,
    pub(crate) metric_columns: Vec<&'static str>,
    pub(crate) rows: Vec<DerivedRow>,
}

const CORE_COLUMNS: [&str; 12] = [
    TIMESTAMP_COLUMN,
    MODE_COLUMN,
    N_COLUMN,
    BS_COLUMN,
    REPEAT_COLUMN,
    ELAPSED_COLUMN,
    TUNING_COLUMN,
    LOGFILE_COLUMN,
    ORIGINAL_MODE_COLUMN,
    DISPLAY_MODE_COLUMN,
    CHECKSUM_COLUMN,
    LOG_FOUND_COLUMN,
];

impl MetricsTable {
    pub fn rows(&self) -> &[DerivedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn extra_columns(&self) -> &[String] {
        &self.extra_columns
    }

    /// Counter names found in at least one log, sorted by name.
    pub fn counter_columns(&self) -> &[String] {
        &self.counter_columns
    }

    /// Derived metrics present in this table, in descriptor order.
    pub fn metric_columns(&self) -> &[&'static str] {
        &self.metric_columns
    }

    /// Whether `column` names a core, extra, counter or derived-metric column of this table.
    pub fn has_column(&self, column: &str) -> bool {
        CORE_COLUMNS.iter().any(|c| *c == column)
            || self.extra_columns.iter().any(|c| c == column)
            || self.counter_columns.iter().any(|c| c == column)
            || self.metric_columns.iter().any(|c| *c == column)
    }

    /// Values of numeric `column` for every row, in row order.
    pub fn numeric_column(&self, column: &str) -> Vec<Option<f64>> {
        self.rows.iter().map(|r| r.numeric(self, column)).collect()
    }

    /// New table with the same schema as `self` and the given rows.
    pub(crate) fn with_rows(&self, rows: Vec<DerivedRow>) -> Self {
        Self {
            extra_columns: self.extra_columns.clone(),
            counter_columns: self.counter_columns.clone(),
            metric_columns: self.metric_columns.clone(),
            rows,
        }
    }

    /// New table with the same schema as `self` and the rows for which `pred` holds.
    pub(crate) fn filtered(&self, pred: impl Fn(&DerivedRow) -> bool) -> Self {
        self.with_rows(self.rows.iter().filter(|r| pred(r)).cloned().collect())
    }

    /// Header written by [`Self::write_csv`].
    pub fn header(&self) -> Vec<String> {
        CORE_COLUMNS
            .iter()
            .map(|c| (*c).to_owned())
            .chain(self.extra_columns.iter().cloned())
            .chain(self.counter_columns.iter().cloned())
            .chain(self.metric_columns.iter().map(|c| (*c).to_owned()))
            .collect()
    }

    /// Writes the table as CSV, one row per run. Missing values are written as empty cells.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), ReportError> {
        let mut wtr = Writer::from_writer(writer);
        wtr.write_record(self.header())?;

        for row in &self.rows {
            let RunRecord {
                timestamp,
                mode,
                n,
                bs,
                repeat,
                elapsed_s,
                tuning,
                logfile,
                log_path,
                extra,
            } = &row.record;

            let mut cells: Vec<String> = vec![
                timestamp.clone(),
                mode.clone(),
                fmt_opt(n),
                fmt_opt(bs),
                fmt_opt(repeat),
                fmt_opt(elapsed_s),
                tuning.clone().unwrap_or_default(),
                logfile.clone(),
                row.original_mode.clone(),
                row.display_mode.clone(),
                fmt_opt(&row.checksum),
                log_path.is_some().to_string(),
            ];
            cells.extend(extra.iter().cloned());
            cells.extend(
                self.counter_columns
                    .iter()
                    .map(|c| fmt_opt(&row.counters.value_of(c))),
            );
            cells.extend(self.metric_columns.iter().map(|m| fmt_opt(&row.metric(m))));

            wtr.write_record(&cells)?;
        }

        wtr.flush()?;
        Ok(())
    }

    /// Writes the table as CSV to a new file at `path`.
    pub fn write_csv_file(&self, path: &Path) -> Result<(), ReportError> {
        let file = File::create(path)?;
        self.write_csv(file)
    }
}

pub(crate) fn fmt_opt<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(T::to_string).unwrap_or_default()
}
