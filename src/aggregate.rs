//! Renaming, filtering, grouping and baseline handling of a [`MetricsTable`].
//!
//! Every function here takes a table by reference and returns a new one; none mutates its input.
//!
//! Note the asymmetry between the two mode filters when run through [`apply_filters`]:
//! - the inclusion filter ([`include_modes`]) matches the **original** mode identifier, so it is unaffected
//!   by renames;
//! - the exclusion filter ([`exclude_labels`]) matches the **display label**, which is rebuilt from the
//!   renamed mode, so blacklist entries must use the new names.

use crate::{
    display_label, new_elapsed_histogram, record_seconds, table::fmt_opt, DerivedRow, ElapsedSummary,
    GroupStats, MetricsTable, ReportError, Wrapper,
};
use hdrhistogram::{CreationError, Histogram};
use std::collections::{BTreeMap, BTreeSet};

/// Suffix of the original mode identifiers of unblocked ("whole-matrix") baseline runs.
pub const BASELINE_SUFFIX: &str = "_whole";

pub const BEST_LABEL: &str = "best";
pub const WORST_LABEL: &str = "worst";

//=================
// AggregateCfg

/// Parameters of [`apply_filters`] and of the baseline handling functions.
///
/// The default applies no rename and no filter and uses [`BASELINE_SUFFIX`].
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateCfg {
    sizes: Option<BTreeSet<u64>>,
    renames: BTreeMap<String, String>,
    include_modes: Option<BTreeSet<String>>,
    exclude_labels: BTreeSet<String>,
    baseline_suffix: String,
}

impl Default for AggregateCfg {
    fn default() -> Self {
        Self {
            sizes: None,
            renames: BTreeMap::new(),
            include_modes: None,
            exclude_labels: BTreeSet::new(),
            baseline_suffix: BASELINE_SUFFIX.to_owned(),
        }
    }
}

impl AggregateCfg {
    /// Creates a new [`AggregateCfg`] the same as `self` but keeping only rows whose N is in `sizes`.
    pub fn with_sizes(&self, sizes: impl IntoIterator<Item = u64>) -> Self {
        Self {
            sizes: Some(sizes.into_iter().collect()),
            ..self.clone()
        }
    }

    /// Creates a new [`AggregateCfg`] the same as `self` but with the given `old -> new` mode renames.
    pub fn with_renames(&self, renames: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            renames: renames.into_iter().collect(),
            ..self.clone()
        }
    }

    /// Creates a new [`AggregateCfg`] the same as `self` but keeping only rows whose original mode is in
    /// `modes`.
    pub fn with_include_modes(&self, modes: impl IntoIterator<Item = String>) -> Self {
        Self {
            include_modes: Some(modes.into_iter().collect()),
            ..self.clone()
        }
    }

    /// Creates a new [`AggregateCfg`] the same as `self` but dropping rows whose display label is in
    /// `labels`.
    pub fn with_exclude_labels(&self, labels: impl IntoIterator<Item = String>) -> Self {
        Self {
            exclude_labels: labels.into_iter().collect(),
            ..self.clone()
        }
    }

    /// Creates a new [`AggregateCfg`] the same as `self` but with the given baseline mode suffix.
    pub fn with_baseline_suffix(&self, suffix: &str) -> Self {
        Self {
            baseline_suffix: suffix.to_owned(),
            ..self.clone()
        }
    }

    pub fn baseline_suffix(&self) -> &str {
        &self.baseline_suffix
    }
}

/// Parses a rename of the form `old:new`.
pub fn parse_rename(s: &str) -> Result<(String, String), ReportError> {
    match s.split_once(':') {
        Some((old, new)) if !old.trim().is_empty() && !new.trim().is_empty() => {
            Ok((old.trim().to_owned(), new.trim().to_owned()))
        }
        _ => Err(ReportError::InvalidRename(s.to_owned())),
    }
}

//=================
// Renaming and filters

/// Replaces the mode of each row found in `renames` and rebuilds its display label. The original
/// identifier stays available through [`DerivedRow::original_mode`].
pub fn rename_modes(table: &MetricsTable, renames: &BTreeMap<String, String>) -> MetricsTable {
    let rows = table
        .rows
        .iter()
        .map(|row| match renames.get(&row.record.mode) {
            Some(new) => {
                let mut row = row.clone();
                row.record.mode = new.clone();
                row.display_mode = display_label(new, row.record.tuning.as_deref());
                row
            }
            None => row.clone(),
        })
        .collect();
    table.with_rows(rows)
}

/// Keeps rows whose **original** mode identifier is in `modes`.
pub fn include_modes(table: &MetricsTable, modes: &BTreeSet<String>) -> MetricsTable {
    table.filtered(|r| modes.contains(&r.original_mode))
}

/// Drops rows whose display label is in `labels`.
pub fn exclude_labels(table: &MetricsTable, labels: &BTreeSet<String>) -> MetricsTable {
    table.filtered(|r| !labels.contains(&r.display_mode))
}

/// Keeps rows whose N is in `sizes`; rows with a missing N are dropped.
pub fn filter_sizes(table: &MetricsTable, sizes: &BTreeSet<u64>) -> MetricsTable {
    table.filtered(|r| r.record.n.is_some_and(|n| sizes.contains(&n)))
}

/// Applies, in order: renames, inclusion filter, exclusion filter, size filter.
pub fn apply_filters(table: &MetricsTable, cfg: &AggregateCfg) -> MetricsTable {
    let mut out = rename_modes(table, &cfg.renames);
    if let Some(modes) = &cfg.include_modes {
        out = include_modes(&out, modes);
    }
    if !cfg.exclude_labels.is_empty() {
        out = exclude_labels(&out, &cfg.exclude_labels);
    }
    if let Some(sizes) = &cfg.sizes {
        out = filter_sizes(&out, sizes);
    }
    log::info!("{} of {} rows kept after filtering", out.len(), table.len());
    out
}

//=================
// Grouping

/// Dimension a table can be grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupKey {
    Mode,
    Display,
    N,
    Bs,
}

/// Value of one [`GroupKey`] for a row.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyValue {
    Text(String),
    Size(Option<u64>),
}

impl KeyValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Size(_) => None,
        }
    }

    pub fn as_size(&self) -> Option<u64> {
        match self {
            Self::Text(_) => None,
            Self::Size(n) => *n,
        }
    }
}

impl std::fmt::Display for KeyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Size(Some(n)) => write!(f, "{n}"),
            Self::Size(None) => Ok(()),
        }
    }
}

impl GroupKey {
    pub fn column(&self) -> &'static str {
        match self {
            Self::Mode => crate::MODE_COLUMN,
            Self::Display => crate::DISPLAY_MODE_COLUMN,
            Self::N => crate::N_COLUMN,
            Self::Bs => crate::BS_COLUMN,
        }
    }

    fn value_of(&self, row: &DerivedRow) -> KeyValue {
        match self {
            Self::Mode => KeyValue::Text(row.record.mode.clone()),
            Self::Display => KeyValue::Text(row.display_mode.clone()),
            Self::N => KeyValue::Size(row.record.n),
            Self::Bs => KeyValue::Size(row.record.bs),
        }
    }
}

/// Values of the grouping dimensions of one group, aligned with the requested [`GroupKey`]s.
pub type GroupValues = Vec<KeyValue>;

/// One group of a [`group_stats`] reduction.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedRow {
    pub key: GroupValues,
    pub metric: String,
    pub stats: GroupStats,
}

fn group_values(row: &DerivedRow, keys: &[GroupKey]) -> GroupValues {
    keys.iter().map(|k| k.value_of(row)).collect()
}

/// Groups the rows of `table` by `keys` and reduces numeric column `metric` of each group to
/// [`GroupStats`]. Missing values are skipped; a group whose values are all missing has a count of 0.
///
/// Groups are returned in ascending key order. If `metric` is not a column of `table`, the result is
/// empty.
pub fn group_stats(table: &MetricsTable, keys: &[GroupKey], metric: &str) -> Vec<AggregatedRow> {
    if !table.has_column(metric) {
        log::debug!("no `{metric}` column to group");
        return Vec::new();
    }

    let mut groups: BTreeMap<GroupValues, Vec<f64>> = BTreeMap::new();
    for row in &table.rows {
        let values = groups.entry(group_values(row, keys)).or_default();
        if let Some(v) = row.numeric(table, metric) {
            values.push(v);
        }
    }

    groups
        .into_iter()
        .map(|(key, values)| AggregatedRow {
            key,
            metric: metric.to_owned(),
            stats: GroupStats::new(&values),
        })
        .collect()
}

/// Elapsed-time distribution of each group of `table` by `keys`; rows without elapsed time are skipped.
pub fn grouped_elapsed_summary(
    table: &MetricsTable,
    keys: &[GroupKey],
) -> Result<Wrapper<BTreeMap<GroupValues, ElapsedSummary>>, CreationError> {
    let mut hists: Wrapper<BTreeMap<GroupValues, Histogram<u64>>> = Wrapper::default();
    for row in &table.rows {
        let Some(elapsed) = row.record.elapsed_s else {
            continue;
        };
        let key = group_values(row, keys);
        if !hists.contains_key(&key) {
            hists.insert(key.clone(), new_elapsed_histogram()?);
        }
        if let Some(hist) = hists.get_mut(&key) {
            record_seconds(hist, elapsed);
        }
    }
    Ok(hists.map_values(ElapsedSummary::new))
}

/// Writes grouped statistics as CSV: one column per key, then `metric,count,mean,stdev`.
pub fn write_aggregates_csv<W: std::io::Write>(
    writer: W,
    keys: &[GroupKey],
    rows: &[AggregatedRow],
) -> Result<(), ReportError> {
    let mut wtr = csv::Writer::from_writer(writer);
    let header = keys
        .iter()
        .map(|k| k.column())
        .chain(["metric", "count", "mean", "stdev"]);
    wtr.write_record(header)?;

    for row in rows {
        let cells = row
            .key
            .iter()
            .map(|v| v.to_string())
            .chain([
                row.metric.clone(),
                row.stats.count.to_string(),
                fmt_opt(&row.stats.mean),
                fmt_opt(&row.stats.stdev),
            ]);
        wtr.write_record(cells)?;
    }
    wtr.flush()?;
    Ok(())
}

//=================
// Baseline handling

/// Whether the row's original mode follows the baseline naming convention.
pub fn is_baseline(row: &DerivedRow, suffix: &str) -> bool {
    row.original_mode.ends_with(suffix)
}

/// Splits `table` into `(baseline, blocked)` rows, preserving order within each part.
pub fn split_baseline(table: &MetricsTable, suffix: &str) -> (MetricsTable, MetricsTable) {
    let (baseline, blocked): (Vec<DerivedRow>, Vec<DerivedRow>) = table
        .rows
        .iter()
        .cloned()
        .partition(|r| is_baseline(r, suffix));
    (table.with_rows(baseline), table.with_rows(blocked))
}

/// For each distinct block size `BS > 0` among non-baseline rows, a table with those rows followed by all
/// baseline rows, so every block-size comparison also shows the unblocked reference.
pub fn block_size_views(table: &MetricsTable, suffix: &str) -> BTreeMap<u64, MetricsTable> {
    let (baseline, blocked) = split_baseline(table, suffix);
    let block_sizes: BTreeSet<u64> = blocked
        .rows
        .iter()
        .filter_map(|r| r.record.bs)
        .filter(|bs| *bs > 0)
        .collect();

    block_sizes
        .into_iter()
        .map(|bs| {
            let rows = blocked
                .rows
                .iter()
                .filter(|r| r.record.bs == Some(bs))
                .chain(&baseline.rows)
                .cloned()
                .collect();
            (bs, table.with_rows(rows))
        })
        .collect()
}

/// For each distinct N (ascending), the fastest and the slowest non-baseline run, relabelled
/// [`BEST_LABEL`] and [`WORST_LABEL`], followed by the baseline rows unchanged.
///
/// Rows with a missing N or elapsed time are not candidates. Ties go to the earliest row.
pub fn best_worst_vs_baseline(table: &MetricsTable, suffix: &str) -> MetricsTable {
    let (baseline, blocked) = split_baseline(table, suffix);

    let mut extremes: BTreeMap<u64, (&DerivedRow, f64, &DerivedRow, f64)> = BTreeMap::new();
    for row in &blocked.rows {
        let (Some(n), Some(t)) = (row.record.n, row.record.elapsed_s) else {
            continue;
        };
        extremes
            .entry(n)
            .and_modify(|(best, best_t, worst, worst_t)| {
                if t < *best_t {
                    *best = row;
                    *best_t = t;
                }
                if t > *worst_t {
                    *worst = row;
                    *worst_t = t;
                }
            })
            .or_insert((row, t, row, t));
    }

    let rows = extremes
        .values()
        .flat_map(|&(best, _, worst, _)| [relabel(best, BEST_LABEL), relabel(worst, WORST_LABEL)])
        .chain(baseline.rows.iter().cloned())
        .collect();
    table.with_rows(rows)
}

fn relabel(row: &DerivedRow, label: &str) -> DerivedRow {
    DerivedRow {
        display_mode: label.to_owned(),
        ..row.clone()
    }
}
