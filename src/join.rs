//! Positional join of manifest records with their parsed logs.

use crate::{display_label, DerivedRow, MetricsTable, ParsedLog, RunCatalog};
use std::{collections::BTreeSet, iter};

/// Builds one [`DerivedRow`] per record of `catalog`, aligning record `i` with `parsed[i]`.
///
/// Row order is the manifest order and no row is dropped or duplicated: if `parsed` is shorter than the
/// catalog, the remaining records get an empty [`ParsedLog`]; surplus entries are ignored.
///
/// When a record has no elapsed time but its log carries an execution summary, the summary's seconds are
/// used instead. The summary checksum becomes the row's `checksum`.
pub fn join_records(catalog: &RunCatalog, parsed: Vec<ParsedLog>) -> MetricsTable {
    if parsed.len() != catalog.len() {
        log::warn!(
            "{} parsed logs for {} manifest records",
            parsed.len(),
            catalog.len()
        );
    }

    let parsed = parsed.into_iter().chain(iter::repeat_with(ParsedLog::default));
    let rows: Vec<DerivedRow> = catalog
        .records()
        .iter()
        .zip(parsed)
        .map(|(record, log)| {
            let ParsedLog { counters, summary } = log;
            let mut record = record.clone();
            if record.elapsed_s.is_none() {
                record.elapsed_s = summary.and_then(|s| s.seconds);
            }
            DerivedRow {
                original_mode: record.mode.clone(),
                display_mode: display_label(&record.mode, record.tuning.as_deref()),
                checksum: summary.and_then(|s| s.checksum),
                counters,
                metrics: Default::default(),
                record,
            }
        })
        .collect();

    let counter_columns: BTreeSet<&String> = rows.iter().flat_map(|r| r.counters.keys()).collect();
    let counter_columns = counter_columns.into_iter().cloned().collect();

    log::debug!("joined {} rows", rows.len());

    MetricsTable {
        extra_columns: catalog.extra_columns().to_vec(),
        counter_columns,
        metric_columns: Vec::new(),
        rows,
    }
}
