use hdrhistogram::{CreationError, Histogram};

/// Mean, sample standard deviation and count of the non-missing values of one metric within a group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupStats {
    pub count: usize,
    /// `None` when the group has no non-missing value.
    pub mean: Option<f64>,
    /// Sample (n - 1) standard deviation; `0.0` for a single value, `None` for none.
    pub stdev: Option<f64>,
}

impl GroupStats {
    /// Computes the statistics of `values`.
    ///
    /// Values are summed in ascending order, so the result does not depend on the order of `values`.
    pub fn new(values: &[f64]) -> Self {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        if count == 0 {
            return Self {
                count,
                mean: None,
                stdev: None,
            };
        }

        let mean = sorted.iter().sum::<f64>() / count as f64;
        let stdev = if count == 1 {
            0.0
        } else {
            let sq_dev: f64 = sorted.iter().map(|v| (v - mean).powi(2)).sum();
            (sq_dev / (count - 1) as f64).sqrt()
        };

        Self {
            count,
            mean: Some(mean),
            stdev: Some(stdev),
        }
    }
}

/// Distribution of elapsed times in **microseconds**, computed from a [`Histogram`].
#[derive(Debug, Clone, PartialEq)]
pub struct ElapsedSummary {
    pub count: u64,
    pub mean: f64,
    pub stdev: f64,
    pub min: u64,
    pub p25: u64,
    pub median: u64,
    pub p75: u64,
    pub p90: u64,
    pub max: u64,
}

impl ElapsedSummary {
    /// Computes the summary from the given histogram.
    pub fn new(hist: &Histogram<u64>) -> Self {
        Self {
            count: hist.len(),
            mean: hist.mean(),
            stdev: hist.stdev(),
            min: hist.min(),
            p25: hist.value_at_quantile(0.25),
            median: hist.value_at_quantile(0.50),
            p75: hist.value_at_quantile(0.75),
            p90: hist.value_at_quantile(0.90),
            max: hist.max(),
        }
    }
}

/// Creates an empty auto-resizing histogram for elapsed times in microseconds, initially sized for
/// one minute with 2 significant figures.
pub fn new_elapsed_histogram() -> Result<Histogram<u64>, CreationError> {
    let mut hist = Histogram::<u64>::new_with_bounds(1, 60 * 1000 * 1000, 2)?;
    hist.auto(true);
    Ok(hist)
}

/// Records `seconds` into `hist` as microseconds. Negative values are clamped to zero and non-finite ones
/// ignored.
pub fn record_seconds(hist: &mut Histogram<u64>, seconds: f64) {
    if seconds.is_finite() {
        hist.saturating_record((seconds.max(0.0) * 1e6).round() as u64);
    }
}
