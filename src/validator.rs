// 📐 Dataset Validator - Publish Gate
// Re-reads the persisted JSONL and checks every record against the canonical schema
//
// Shares no filtering code with the builder; vocabularies and patterns are its own.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::LazyLock;

use chrono::{Datelike, Duration, NaiveDate};
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::config::ValidationConfig;
use crate::error::{EtlError, Result, Violation};

const REQUIRED_FIELDS: [&str; 6] = ["source", "iso_week", "country", "pathogen", "metric", "value"];
const VALID_SOURCES: [&str; 1] = ["ECDC"];
const VALID_COUNTRIES: [&str; 1] = ["IT"];
const VALID_PATHOGENS: [&str; 3] = ["influenza", "RSV", "SARS-CoV-2"];
const VALID_METRICS: [&str; 3] = ["positivity_rate", "cases", "tests"];
const POSITIVITY_METRIC: &str = "positivity_rate";
const POSITIVITY_MAX: f64 = 100.0;

static WEEK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-W\d{2}$").expect("valid regex"));

pub type ValidationResult = std::result::Result<(), Vec<Violation>>;

// ============================================================================
// LOADING
// ============================================================================

/// A parsed dataset line with its 1-based line number.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetLine {
    pub line: usize,
    pub value: Value,
}

/// Read at most `max_lines` physical lines, skipping blanks.
///
/// A missing file or a line that is not JSON is reported as a violation.
pub fn load_jsonl(path: &Path, max_lines: usize) -> Result<Vec<DatasetLine>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(EtlError::Validation(vec![Violation::new(
                0,
                "file",
                format!("Data file not found: {}", path.display()),
            )]))
        }
        Err(err) => return Err(EtlError::persistence(path, err)),
    };

    let mut lines = Vec::new();
    let mut violations = Vec::new();

    for (index, line) in BufReader::new(file).lines().take(max_lines).enumerate() {
        let line = line.map_err(|e| EtlError::persistence(path, e))?;
        let line_num = index + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match serde_json::from_str::<Value>(trimmed) {
            Ok(value) => lines.push(DatasetLine {
                line: line_num,
                value,
            }),
            Err(err) => violations.push(Violation::new(line_num, "json", format!("Invalid JSON: {err}"))),
        }
    }

    if violations.is_empty() {
        Ok(lines)
    } else {
        Err(EtlError::Validation(violations))
    }
}

// ============================================================================
// REPORTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationSummary {
    pub records_checked: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageReport {
    pub pathogens: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreshnessReport {
    pub current_week: String,
    /// Weeks considered recent, newest first
    pub recent_weeks: Vec<String>,
    pub has_recent: bool,
}

// ============================================================================
// VALIDATOR
// ============================================================================

pub struct DatasetValidator {
    config: ValidationConfig,
}

impl DatasetValidator {
    pub fn new(config: ValidationConfig) -> Self {
        DatasetValidator { config }
    }

    /// Schema-check the first `max_records` lines of the dataset at `path`.
    pub fn validate_file(&self, path: &Path) -> Result<ValidationSummary> {
        let lines = load_jsonl(path, self.config.max_records)?;

        if lines.is_empty() && self.config.require_records {
            return Err(EtlError::Validation(vec![Violation::new(
                0,
                "records",
                "ECDC weekly file is empty",
            )]));
        }

        let violations: Vec<Violation> = lines
            .iter()
            .filter_map(|l| self.validate_record(&l.value, l.line).err())
            .flatten()
            .collect();

        if !violations.is_empty() {
            return Err(EtlError::Validation(violations));
        }

        info!(records = lines.len(), path = %path.display(), "validated dataset records");
        Ok(ValidationSummary {
            records_checked: lines.len(),
        })
    }

    /// Check one parsed record; every violated constraint is reported.
    pub fn validate_record(&self, value: &Value, line: usize) -> ValidationResult {
        let Some(record) = value.as_object() else {
            return Err(vec![Violation::new(line, "record", "Record is not a JSON object")]);
        };

        let mut errors: Vec<Violation> = REQUIRED_FIELDS
            .iter()
            .filter(|field| !record.contains_key(**field))
            .map(|field| Violation::new(line, *field, format!("Missing required field '{field}'")))
            .collect();

        check_enum(record, "source", &VALID_SOURCES, line, &mut errors);

        if let Some(week) = record.get("iso_week") {
            match week.as_str() {
                Some(w) if WEEK_RE.is_match(w) => {}
                _ => errors.push(Violation::new(
                    line,
                    "iso_week",
                    format!("Invalid iso_week format {}, expected YYYY-Www", display_value(week)),
                )),
            }
        }

        check_enum(record, "country", &VALID_COUNTRIES, line, &mut errors);
        check_enum(record, "pathogen", &VALID_PATHOGENS, line, &mut errors);
        check_enum(record, "metric", &VALID_METRICS, line, &mut errors);

        if let Some(raw) = record.get("value") {
            match raw.as_f64() {
                None => errors.push(Violation::new(
                    line,
                    "value",
                    format!("Value must be numeric, got {}", json_type(raw)),
                )),
                Some(v) if v.is_nan() => {
                    errors.push(Violation::new(line, "value", "Value cannot be NaN"));
                }
                Some(v) if v.is_infinite() => {
                    errors.push(Violation::new(line, "value", "Value cannot be infinite"));
                }
                Some(v) => {
                    if v < 0.0 {
                        errors.push(Violation::new(
                            line,
                            "value",
                            format!("Value must be non-negative, got {v}"),
                        ));
                    }
                    let is_positivity =
                        record.get("metric").and_then(Value::as_str) == Some(POSITIVITY_METRIC);
                    if is_positivity && v > POSITIVITY_MAX {
                        errors.push(Violation::new(
                            line,
                            "value",
                            format!("Positivity rate cannot exceed 100%, got {v}"),
                        ));
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// The dataset carries at least one pathogen and only known ones.
    pub fn check_coverage(&self, path: &Path) -> Result<CoverageReport> {
        let lines = load_jsonl(path, self.config.coverage_max_records)?;

        let pathogens: BTreeSet<String> = lines
            .iter()
            .filter_map(|l| l.value.get("pathogen"))
            .map(|p| p.as_str().map(str::to_string).unwrap_or_else(|| p.to_string()))
            .collect();

        if pathogens.is_empty() {
            return Err(EtlError::Validation(vec![Violation::new(
                0,
                "pathogen",
                "No pathogens found in ECDC data",
            )]));
        }

        let unknown: Vec<&String> = pathogens
            .iter()
            .filter(|p| !VALID_PATHOGENS.contains(&p.as_str()))
            .collect();
        if !unknown.is_empty() {
            return Err(EtlError::Validation(vec![Violation::new(
                0,
                "pathogen",
                format!("Invalid pathogens found: {unknown:?}"),
            )]));
        }

        info!(pathogens = ?pathogens, "dataset pathogen coverage");
        Ok(CoverageReport { pathogens })
    }

    /// Whether any record falls within the last `freshness_weeks` ISO weeks.
    ///
    /// Stale data is only a warning: mock datasets are often old.
    pub fn check_freshness(&self, path: &Path, today: NaiveDate) -> Result<FreshnessReport> {
        let lines = load_jsonl(path, self.config.coverage_max_records)?;

        let weeks: BTreeSet<&str> = lines
            .iter()
            .filter_map(|l| l.value.get("iso_week").and_then(Value::as_str))
            .collect();

        let recent_weeks: Vec<String> = (0..self.config.freshness_weeks)
            .map(|i| week_label(today - Duration::weeks(i64::from(i))))
            .collect();
        let has_recent = recent_weeks.iter().any(|w| weeks.contains(w.as_str()));
        let current_week = week_label(today);

        if has_recent {
            info!(current_week = %current_week, "dataset includes recent weeks");
        } else {
            warn!(
                current_week = %current_week,
                window = self.config.freshness_weeks,
                "no data from recent weeks found (may be mock data)"
            );
        }

        Ok(FreshnessReport {
            current_week,
            recent_weeks,
            has_recent,
        })
    }
}

impl Default for DatasetValidator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn check_enum(
    record: &Map<String, Value>,
    field: &str,
    allowed: &[&str],
    line: usize,
    errors: &mut Vec<Violation>,
) {
    let Some(value) = record.get(field) else {
        return;
    };
    let ok = value.as_str().is_some_and(|v| allowed.contains(&v));
    if !ok {
        let expected = if allowed.len() == 1 {
            format!("'{}'", allowed[0])
        } else {
            format!("one of {allowed:?}")
        };
        errors.push(Violation::new(
            line,
            field,
            format!("Invalid {field} {}, expected {expected}", display_value(value)),
        ));
    }
}

fn display_value(value: &Value) -> String {
    match value.as_str() {
        Some(s) => format!("'{s}'"),
        None => value.to_string(),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn week_label(date: NaiveDate) -> String {
    let week = date.iso_week();
    format!("{}-W{:02}", week.year(), week.week())
}

// ============================================================================
// TESTS
// ============================================================================
