//! Derivation of secondary metrics from raw counters.
//!
//! Each metric is declared by a [`MetricDescriptor`] in [`METRIC_DESCRIPTORS`]: its output column, the
//! counters it reads, how a zero denominator is resolved and whether the column requires a nonzero
//! dataset-wide denominator. The deriver walks the table once per descriptor and emits the column only when
//! every source counter exists somewhere in the dataset.
//!
//! Zero-denominator conventions differ between metrics on purpose; they can be overridden per metric with
//! [`DeriveCfg::with_zero_policy`].

use crate::{DerivedRow, MetricsTable};

pub const TOT_INS: &str = "PAPI_TOT_INS";
pub const TOT_CYC: &str = "PAPI_TOT_CYC";
pub const L3_TCM: &str = "PAPI_L3_TCM";
pub const LD_INS: &str = "PAPI_LD_INS";
pub const BR_MSP: &str = "PAPI_BR_MSP";
pub const BR_INS: &str = "PAPI_BR_INS";
pub const L1_DCA: &str = "PAPI_L1_DCA";
pub const L1_DCM: &str = "PAPI_L1_DCM";
pub const L2_DCH: &str = "PAPI_L2_DCH";
pub const L2_DCM: &str = "PAPI_L2_DCM";
pub const VEC_INS: &str = "PAPI_VEC_INS";
pub const FP_INS: &str = "PAPI_FP_INS";
pub const FP_OPS: &str = "PAPI_FP_OPS";

/// Substring (case-insensitive) identifying energy counters, e.g. `rapl:::PACKAGE_ENERGY:PACKAGE0`.
pub const ENERGY_MARK: &str = "ENERGY";

/// RAPL energy counters report nanojoules.
const NANOJOULES_PER_JOULE: f64 = 1e9;

//=================
// Descriptor types

/// Outcome for a row whose denominator is zero or whose quotient is not finite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZeroPolicy {
    Zero,
    Hundred,
    Missing,
}

impl ZeroPolicy {
    fn resolve(self) -> Option<f64> {
        match self {
            Self::Zero => Some(0.0),
            Self::Hundred => Some(100.0),
            Self::Missing => None,
        }
    }
}

/// Dataset-wide condition for emitting a metric column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnGuard {
    /// Emit whenever the source counters exist.
    Always,
    /// Additionally require the denominator counter to sum to a positive total over all rows.
    NonzeroTotal,
}

/// Counter a formula reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Counter with exactly this name.
    Named(&'static str),
    /// First of these names present in the dataset.
    FirstOf(&'static [&'static str]),
    /// First counter (in name order) whose upper-cased name contains this upper-case substring.
    NameContains(&'static str),
}

impl Source {
    /// Resolves `self` against the dataset's counter names (sorted).
    fn resolve<'a>(&self, columns: &'a [String]) -> Option<&'a str> {
        let find = |name: &str| columns.iter().find(|c| *c == name).map(String::as_str);
        match *self {
            Self::Named(name) => find(name),
            Self::FirstOf(names) => names.iter().copied().find_map(find),
            Self::NameContains(mark) => columns
                .iter()
                .find(|c| c.to_uppercase().contains(mark))
                .map(String::as_str),
        }
    }
}

/// Shape of a metric's computation. Every formula reduces to `numerator / denominator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Formula {
    /// `num / den`
    Ratio { num: Source, den: Source },
    /// `(accesses - misses) / accesses`
    HitFromMisses { accesses: Source, misses: Source },
    /// `hits / (hits + misses)`
    HitShare { hits: Source, misses: Source },
    /// `src`, unchanged apart from the descriptor's scale.
    Value { src: Source },
}

impl Formula {
    fn sources(&self) -> Vec<Source> {
        match *self {
            Self::Ratio { num, den } => vec![num, den],
            Self::HitFromMisses { accesses, misses } => vec![accesses, misses],
            Self::HitShare { hits, misses } => vec![hits, misses],
            Self::Value { src } => vec![src],
        }
    }

    /// Index into [`Self::sources`] of the counter whose dataset total the [`ColumnGuard::NonzeroTotal`]
    /// guard checks.
    fn guarded_source(&self) -> usize {
        match self {
            Self::Ratio { .. } => 1,
            _ => 0,
        }
    }

    /// `(numerator, denominator)` from source values given in [`Self::sources`] order.
    fn terms(&self, v: &[f64]) -> (f64, f64) {
        match self {
            Self::Ratio { .. } => (v[0], v[1]),
            Self::HitFromMisses { .. } => (v[0] - v[1], v[0]),
            Self::HitShare { .. } => (v[0], v[0] + v[1]),
            Self::Value { .. } => (v[0], 1.0),
        }
    }
}

/// Declaration of one derived metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricDescriptor {
    /// Output column name.
    pub name: &'static str,
    pub formula: Formula,
    /// Multiplier applied to the quotient, e.g. `100.0` for percentages.
    pub scale: f64,
    pub on_zero: ZeroPolicy,
    pub guard: ColumnGuard,
    /// Metric whose column, once emitted, suppresses this one. Must come earlier in the table.
    pub unless_metric: Option<&'static str>,
}

pub const IPC: &str = "IPC";
pub const L3_MISS_RATE: &str = "L3_MISS_RATE";
pub const BR_MISP_RATE: &str = "BR_MISP_RATE";
pub const BR_MISP_COUNT: &str = "BR_MISP_COUNT";
pub const L1_HIT_RATE: &str = "L1_HIT_RATE";
pub const L2_HIT_RATE: &str = "L2_HIT_RATE";
pub const VEC_INS_PCT: &str = "VEC_INS_PCT";
pub const VEC_FP_PCT: &str = "VEC_FP_PCT";
pub const ENERGY_J: &str = "ENERGY_J";

/// Default metric table, in output column order.
pub const METRIC_DESCRIPTORS: [MetricDescriptor; 9] = [
    MetricDescriptor {
        name: IPC,
        formula: Formula::Ratio {
            num: Source::Named(TOT_INS),
            den: Source::Named(TOT_CYC),
        },
        scale: 1.0,
        on_zero: ZeroPolicy::Zero,
        guard: ColumnGuard::Always,
        unless_metric: None,
    },
    MetricDescriptor {
        name: L3_MISS_RATE,
        formula: Formula::Ratio {
            num: Source::Named(L3_TCM),
            den: Source::Named(LD_INS),
        },
        scale: 1.0,
        on_zero: ZeroPolicy::Missing,
        guard: ColumnGuard::NonzeroTotal,
        unless_metric: None,
    },
    MetricDescriptor {
        name: BR_MISP_RATE,
        formula: Formula::Ratio {
            num: Source::Named(BR_MSP),
            den: Source::Named(BR_INS),
        },
        scale: 1.0,
        on_zero: ZeroPolicy::Missing,
        guard: ColumnGuard::NonzeroTotal,
        unless_metric: None,
    },
    MetricDescriptor {
        name: BR_MISP_COUNT,
        formula: Formula::Value {
            src: Source::Named(BR_MSP),
        },
        scale: 1.0,
        on_zero: ZeroPolicy::Missing,
        guard: ColumnGuard::Always,
        unless_metric: Some(BR_MISP_RATE),
    },
    MetricDescriptor {
        name: L1_HIT_RATE,
        formula: Formula::HitFromMisses {
            accesses: Source::Named(L1_DCA),
            misses: Source::Named(L1_DCM),
        },
        scale: 100.0,
        on_zero: ZeroPolicy::Hundred,
        guard: ColumnGuard::Always,
        unless_metric: None,
    },
    MetricDescriptor {
        name: L2_HIT_RATE,
        formula: Formula::HitShare {
            hits: Source::Named(L2_DCH),
            misses: Source::Named(L2_DCM),
        },
        scale: 100.0,
        on_zero: ZeroPolicy::Hundred,
        guard: ColumnGuard::Always,
        unless_metric: None,
    },
    MetricDescriptor {
        name: VEC_INS_PCT,
        formula: Formula::Ratio {
            num: Source::Named(VEC_INS),
            den: Source::Named(TOT_INS),
        },
        scale: 100.0,
        on_zero: ZeroPolicy::Zero,
        guard: ColumnGuard::Always,
        unless_metric: None,
    },
    MetricDescriptor {
        name: VEC_FP_PCT,
        formula: Formula::Ratio {
            num: Source::Named(VEC_INS),
            den: Source::FirstOf(&[FP_INS, FP_OPS]),
        },
        scale: 100.0,
        on_zero: ZeroPolicy::Zero,
        guard: ColumnGuard::Always,
        unless_metric: None,
    },
    MetricDescriptor {
        name: ENERGY_J,
        formula: Formula::Value {
            src: Source::NameContains(ENERGY_MARK),
        },
        scale: 1.0 / NANOJOULES_PER_JOULE,
        on_zero: ZeroPolicy::Missing,
        guard: ColumnGuard::Always,
        unless_metric: None,
    },
];

//=================
// DeriveCfg

/// Configuration of [`derive_metrics`]: the descriptor table to apply.
#[derive(Debug, Clone, PartialEq)]
pub struct DeriveCfg {
    descriptors: Vec<MetricDescriptor>,
}

impl Default for DeriveCfg {
    /// Uses [`METRIC_DESCRIPTORS`] unchanged.
    fn default() -> Self {
        Self {
            descriptors: METRIC_DESCRIPTORS.to_vec(),
        }
    }
}

impl DeriveCfg {
    pub fn descriptors(&self) -> &[MetricDescriptor] {
        &self.descriptors
    }

    /// Creates a new [`DeriveCfg`] with the given descriptor table.
    pub fn with_descriptors(&self, descriptors: Vec<MetricDescriptor>) -> Self {
        Self { descriptors }
    }

    /// Creates a new [`DeriveCfg`] the same as `self` but with metric `name` resolving zero denominators
    /// with `policy`. Unknown names leave the configuration unchanged.
    pub fn with_zero_policy(&self, name: &str, policy: ZeroPolicy) -> Self {
        let descriptors = self
            .descriptors
            .iter()
            .map(|d| {
                if d.name == name {
                    MetricDescriptor {
                        on_zero: policy,
                        ..*d
                    }
                } else {
                    *d
                }
            })
            .collect();
        Self { descriptors }
    }
}

//=================
// Derivation

/// Composite label combining `mode` with `tuning` when a tuning is present, e.g. `avx (unroll4)`.
pub fn display_label(mode: &str, tuning: Option<&str>) -> String {
    match tuning {
        Some(t) if !t.is_empty() && !t.eq_ignore_ascii_case("none") && t != "NA" => {
            format!("{mode} ({t})")
        }
        _ => mode.to_owned(),
    }
}

/// Returns a new table with the derived metric columns of `cfg` computed for every row of `table`.
///
/// A metric whose source counters do not all exist in the dataset is omitted entirely. A metric computable
/// for some rows only keeps `None` for the others. No value produced is infinite or NaN.
pub fn derive_metrics(table: &MetricsTable, cfg: &DeriveCfg) -> MetricsTable {
    let mut rows: Vec<DerivedRow> = table.rows.clone();
    for row in rows.iter_mut() {
        row.metrics.clear();
    }

    let mut metric_columns = Vec::new();
    for desc in cfg.descriptors() {
        let Some(sources) = resolve_sources(desc, table, &metric_columns) else {
            continue;
        };
        for row in rows.iter_mut() {
            let value = compute(desc, &sources, row);
            row.metrics.insert(desc.name, value);
        }
        metric_columns.push(desc.name);
    }

    log::info!("derived metrics: {:?}", metric_columns);

    MetricsTable {
        extra_columns: table.extra_columns.clone(),
        counter_columns: table.counter_columns.clone(),
        metric_columns,
        rows,
    }
}

/// Concrete counter names for the sources of `desc`, or `None` if the metric must be omitted. `emitted`
/// holds the metric columns already derived.
fn resolve_sources<'a>(
    desc: &MetricDescriptor,
    table: &'a MetricsTable,
    emitted: &[&str],
) -> Option<Vec<&'a str>> {
    let columns = &table.counter_columns;

    if let Some(metric) = desc.unless_metric {
        if emitted.contains(&metric) {
            log::debug!("{} omitted: {metric} is present", desc.name);
            return None;
        }
    }

    let resolved: Option<Vec<&str>> = desc
        .formula
        .sources()
        .iter()
        .map(|s| s.resolve(columns))
        .collect();
    let Some(sources) = resolved else {
        log::info!("{} omitted: source counters absent", desc.name);
        return None;
    };

    if desc.guard == ColumnGuard::NonzeroTotal {
        let guarded = sources[desc.formula.guarded_source()];
        let total: f64 = table
            .rows
            .iter()
            .filter_map(|r| r.counters.value_of(guarded))
            .sum();
        if total <= 0.0 {
            log::info!("{} omitted: {guarded} totals zero", desc.name);
            return None;
        }
    }

    Some(sources)
}

fn compute(desc: &MetricDescriptor, sources: &[&str], row: &DerivedRow) -> Option<f64> {
    let values: Option<Vec<f64>> = sources
        .iter()
        .map(|s| row.counters.value_of(s))
        .collect();
    let values = values?;

    let (num, den) = desc.formula.terms(&values);
    if den == 0.0 {
        return desc.on_zero.resolve();
    }
    let value = num / den * desc.scale;
    if value.is_finite() {
        Some(value)
    } else {
        desc.on_zero.resolve()
    }
}

