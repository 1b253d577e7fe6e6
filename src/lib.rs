//! This library turns the raw output of hardware-counter benchmark runs into a tidy table of derived
//! performance metrics that can be compared across experimental configurations.
//!
//! The input is a results directory holding a run manifest (`runs.csv`) and one log file per run. Each
//! log may carry a counter block emitted by the PAPITO wrapper around [PAPI](https://icl.utk.edu/papi/):
//!
//! ```text
//! PAPITO_COUNTERS	PAPI_TOT_INS	PAPI_TOT_CYC
//! PAPITO_VALUES	123456	654321
//! ```
//!
//! The pipeline runs strictly left to right, each stage producing a fresh table:
//! - [`load_catalog`] reads the manifest into [`RunRecord`]s and resolves each run's log file;
//! - [`RunCatalog::parse_logs`] extracts a [`CounterSet`] (and an optional [`ExecSummary`]) per run with a
//!   [`CounterBlockParser`];
//! - [`join_records`] aligns runs with their parsed logs into a [`MetricsTable`];
//! - [`derive_metrics`] adds the secondary metrics declared in [`METRIC_DESCRIPTORS`];
//! - [`apply_filters`], [`group_stats`], [`block_size_views`] and [`best_worst_vs_baseline`] reshape the
//!   table for presentation;
//! - [`Report`] computes every output of a filtered table and writes them as CSV files.
//!
//! Partial data (missing logs, absent marker lines, unparsable tokens, absent counters) never aborts the
//! pipeline; it degrades to missing values. The only fatal conditions are an absent or unreadable manifest
//! and a manifest lacking one of the required columns (see [`ReportError`]).
//!
//! ```no_run
//! use papito_metrics::{load_results, ReportCfg};
//! use std::path::Path;
//!
//! let table = load_results(Path::new("results"), &ReportCfg::default()).unwrap();
//! println!("{} runs, metrics: {:?}", table.len(), table.metric_columns());
//! ```

#![deny(clippy::unwrap_used)]

mod error;
pub use error::*;

mod wrapper;
pub use wrapper::*;

mod counters;
pub use counters::*;

mod catalog;
pub use catalog::*;

mod table;
pub use table::*;

mod join;
pub use join::*;

mod metrics;
pub use metrics::*;

mod summary_stats;
pub use summary_stats::*;

mod aggregate;
pub use aggregate::*;

mod report;
pub use report::*;
