// 📦 Canonical Record
// The six-field unit of the persisted surveillance dataset

use std::fmt;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

// ============================================================================
// ISO WEEKS
// ============================================================================

static ISO_WEEK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-W\d{2}$").expect("valid regex"));

/// True when `week` looks like `YYYY-Www`.
pub fn is_iso_week(week: &str) -> bool {
    ISO_WEEK_RE.is_match(week)
}

/// ISO week label (`YYYY-Www`) of a calendar date.
pub fn format_iso_week(date: NaiveDate) -> String {
    let week = date.iso_week();
    format!("{}-W{:02}", week.year(), week.week())
}

// ============================================================================
// CLOSED VOCABULARIES
// ============================================================================

/// Publisher of the feed. Only one is ingested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Source {
    #[default]
    #[serde(rename = "ECDC")]
    Ecdc,
}

/// Country scope. Everything outside Italy is filtered at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Country {
    #[default]
    #[serde(rename = "IT")]
    It,
}

/// Pathogen label.
///
/// `Other` carries an unrecognised upstream label verbatim. Such records are
/// allowed through the builder and rejected by the dataset validator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Pathogen {
    Influenza,
    Rsv,
    SarsCov2,
    Other(String),
}

impl Pathogen {
    pub fn as_str(&self) -> &str {
        match self {
            Pathogen::Influenza => "influenza",
            Pathogen::Rsv => "RSV",
            Pathogen::SarsCov2 => "SARS-CoV-2",
            Pathogen::Other(raw) => raw,
        }
    }

    /// Whether the label belongs to the closed vocabulary.
    pub fn is_known(&self) -> bool {
        !matches!(self, Pathogen::Other(_))
    }
}

impl From<String> for Pathogen {
    fn from(label: String) -> Self {
        match label.as_str() {
            "influenza" => Pathogen::Influenza,
            "RSV" => Pathogen::Rsv,
            "SARS-CoV-2" => Pathogen::SarsCov2,
            _ => Pathogen::Other(label),
        }
    }
}

impl From<Pathogen> for String {
    fn from(pathogen: Pathogen) -> Self {
        match pathogen {
            Pathogen::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Pathogen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of measurement carried by `value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    PositivityRate,
    Cases,
    Tests,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::PositivityRate => "positivity_rate",
            Metric::Cases => "cases",
            Metric::Tests => "tests",
        }
    }

    /// Upper bound for values of this metric, if any.
    pub fn max_value(&self) -> Option<f64> {
        match self {
            Metric::PositivityRate => Some(100.0),
            Metric::Cases | Metric::Tests => None,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// RECORD
// ============================================================================

/// One normalised weekly data point. Field order is the on-disk key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveillanceRecord {
    pub source: Source,
    pub iso_week: String,
    pub country: Country,
    pub pathogen: Pathogen,
    pub metric: Metric,
    pub value: f64,
}

impl SurveillanceRecord {
    /// Italian ECDC record; source and country are fixed for this feed.
    pub fn new(iso_week: impl Into<String>, pathogen: Pathogen, metric: Metric, value: f64) -> Self {
        SurveillanceRecord {
            source: Source::Ecdc,
            iso_week: iso_week.into(),
            country: Country::It,
            pathogen,
            metric,
            value,
        }
    }
}
