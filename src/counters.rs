//! Extraction of hardware-counter blocks and execution summaries from benchmark log text.
//!
//! A counter block is a pair of marker lines:
//! - a line starting with the counters marker (default [`COUNTERS_MARKER`]) followed by whitespace-separated
//!   counter names;
//! - a line starting with the values marker (default [`VALUES_MARKER`]) followed by whitespace-separated
//!   raw values, positionally aligned with the names.
//!
//! A values line pairs with the most recent counters line before it. If a log carries several complete
//! blocks, the last one wins and the [`PairingPolicy`] is applied to that pair only. A values line with no
//! counters line before it is ignored, as is a trailing counters line with no values line after it.

use crate::Wrapper;
use once_cell::sync::Lazy;
use regex::Regex;
use std::{collections::BTreeMap, fs, io, path::Path, str};

pub const COUNTERS_MARKER: &str = "PAPITO_COUNTERS";
pub const VALUES_MARKER: &str = "PAPITO_VALUES";
pub const SUMMARY_MARKER: &str = "SUMMARY";

static SUMMARY_FIELD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w+)=(\S*)").expect("summary field regex must compile"));

//=================
// CounterValue

/// Value of a single counter as read from a values line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CounterValue {
    Int(i64),
    Float(f64),
    Missing,
}

impl CounterValue {
    /// Coerces a raw token: integer first, then floating point, otherwise [`CounterValue::Missing`].
    /// NaN and infinities are treated as missing.
    pub fn parse(token: &str) -> Self {
        if let Ok(v) = token.parse::<i64>() {
            return Self::Int(v);
        }
        match token.parse::<f64>() {
            Ok(v) if v.is_finite() => Self::Float(v),
            _ => Self::Missing,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Int(v) => Some(v as f64),
            Self::Float(v) => Some(v),
            Self::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

//=================
// CounterSet

/// Mapping of counter names to values for one run; inherits all [`BTreeMap`] methods.
///
/// An empty set means the run's log was missing or carried no usable counter block.
pub type CounterSet = Wrapper<BTreeMap<String, CounterValue>>;

impl CounterSet {
    /// Numeric value of counter `name`, `None` if the counter is absent or its value is missing.
    pub fn value_of(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(CounterValue::as_f64)
    }
}

//=================
// ExecSummary

/// Timing data from the one-line execution summary printed by the benchmark driver, e.g.
/// `SUMMARY	N=512	BS=64	mode=avx	seed=1	seconds=0.0421	checksum=3.1e+07`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ExecSummary {
    pub seconds: Option<f64>,
    pub checksum: Option<f64>,
}

impl ExecSummary {
    fn parse(fields: &str) -> Self {
        let mut summary = ExecSummary::default();
        for cap in SUMMARY_FIELD_RE.captures_iter(fields) {
            let value = || cap[2].parse::<f64>().ok().filter(|v| v.is_finite());
            match &cap[1] {
                "seconds" => summary.seconds = value(),
                "checksum" => summary.checksum = value(),
                _ => {}
            }
        }
        summary
    }
}

//=================
// ParsedLog

/// Everything extracted from one log.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedLog {
    pub counters: CounterSet,
    pub summary: Option<ExecSummary>,
}

//=================
// CounterBlockParser

/// How counter names and values are paired when the two lines have different lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PairingPolicy {
    /// Both lines must have the same number of tokens, otherwise the block is discarded.
    #[default]
    Strict,
    /// Names and values are paired up to the shorter line; the tail of the longer one is dropped.
    Truncate,
}

/// Line-oriented scanner for counter blocks and execution summaries.
///
/// The default configuration recognizes the PAPITO markers with [`PairingPolicy::Strict`]. It can be
/// modified with the `with_*` methods.
#[derive(Debug, Clone)]
pub struct CounterBlockParser {
    counters_marker: String,
    values_marker: String,
    pairing: PairingPolicy,
}

impl Default for CounterBlockParser {
    fn default() -> Self {
        Self {
            counters_marker: COUNTERS_MARKER.to_owned(),
            values_marker: VALUES_MARKER.to_owned(),
            pairing: PairingPolicy::default(),
        }
    }
}

impl CounterBlockParser {
    /// Creates a new [`CounterBlockParser`] configured the same as `self` but with the given `pairing`.
    pub fn with_pairing(&self, pairing: PairingPolicy) -> Self {
        Self {
            pairing,
            ..self.clone()
        }
    }

    /// Creates a new [`CounterBlockParser`] configured the same as `self` but with the given marker tokens.
    pub fn with_markers(&self, counters_marker: &str, values_marker: &str) -> Self {
        Self {
            counters_marker: counters_marker.to_owned(),
            values_marker: values_marker.to_owned(),
            pairing: self.pairing,
        }
    }

    pub fn pairing(&self) -> PairingPolicy {
        self.pairing
    }

    /// Parses log text. Never fails: a text without a usable block yields an empty [`CounterSet`].
    pub fn parse_text(&self, text: &str) -> ParsedLog {
        let mut names: Option<Vec<&str>> = None;
        let mut block: Option<(Vec<&str>, Vec<&str>)> = None;
        let mut summary = None;

        for line in text.lines() {
            if let Some(rest) = marker_rest(line, &self.counters_marker) {
                names = Some(rest.split_whitespace().collect());
            } else if let Some(rest) = marker_rest(line, &self.values_marker) {
                match &names {
                    Some(names) => {
                        block = Some((names.clone(), rest.split_whitespace().collect()));
                    }
                    None => log::debug!("ignoring values line with no counters line before it"),
                }
            } else if let Some(rest) = marker_rest(line, SUMMARY_MARKER) {
                summary = Some(ExecSummary::parse(rest));
            }
        }

        let counters = match block {
            Some((names, tokens)) => self.pair(&names, &tokens),
            None => CounterSet::default(),
        };

        ParsedLog { counters, summary }
    }

    /// Parses raw log bytes, dropping any byte sequences that are not valid UTF-8. Valid characters,
    /// including a literal U+FFFD, are kept.
    pub fn parse_bytes(&self, bytes: &[u8]) -> ParsedLog {
        match str::from_utf8(bytes) {
            Ok(text) => self.parse_text(text),
            Err(_) => self.parse_text(&skip_invalid_utf8(bytes)),
        }
    }

    /// Reads and parses the log at `path`. A missing or unreadable file yields an empty [`ParsedLog`].
    pub fn parse_file(&self, path: &Path) -> ParsedLog {
        match fs::read(path) {
            Ok(bytes) => self.parse_bytes(&bytes),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::warn!("log file not found at {}", path.display());
                ParsedLog::default()
            }
            Err(err) => {
                log::warn!("could not read log file {}: {err}", path.display());
                ParsedLog::default()
            }
        }
    }

    fn pair(&self, names: &[&str], tokens: &[&str]) -> CounterSet {
        if names.is_empty() || tokens.is_empty() {
            return CounterSet::default();
        }
        if names.len() != tokens.len() {
            match self.pairing {
                PairingPolicy::Strict => {
                    log::warn!(
                        "discarding counter block: {} names but {} values",
                        names.len(),
                        tokens.len()
                    );
                    return CounterSet::default();
                }
                PairingPolicy::Truncate => {
                    log::debug!(
                        "truncating counter block to {} pairs",
                        names.len().min(tokens.len())
                    );
                }
            }
        }
        names
            .iter()
            .zip(tokens)
            .map(|(name, token)| ((*name).to_owned(), CounterValue::parse(token)))
            .collect()
    }
}

/// Concatenates the valid UTF-8 runs of `bytes`.
fn skip_invalid_utf8(mut bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    loop {
        match str::from_utf8(bytes) {
            Ok(valid) => {
                text.push_str(valid);
                return text;
            }
            Err(err) => {
                let (valid, rest) = bytes.split_at(err.valid_up_to());
                text.push_str(str::from_utf8(valid).unwrap_or_default());
                match err.error_len() {
                    Some(len) => bytes = &rest[len..],
                    // Truncated sequence at the end of input.
                    None => return text,
                }
            }
        }
    }
}

/// Returns the remainder of `line` if it starts with `marker` followed by whitespace or end of line.
fn marker_rest<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(marker)?;
    match rest.chars().next() {
        None => Some(rest),
        Some(c) if c.is_whitespace() => Some(rest),
        Some(_) => None,
    }
}
