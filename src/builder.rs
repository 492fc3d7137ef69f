// 🏗️ Record Builder
// Raw ERVISS rows → canonical Italian weekly records
//
// Per-row problems are skips, never errors. Only a missing header row or an
// unresolvable column role stops the build.

use std::collections::{BTreeMap, BTreeSet};

use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, warn};

use crate::columns::{resolve_columns, AliasTable, ColumnMap, ColumnRole};
use crate::error::{EtlError, Result, SkipReason};
use crate::normalize::CategoryNormalizer;
use crate::record::{is_iso_week, SurveillanceRecord};

/// Country tokens accepted as Italy (compared upper-cased).
const ITALY_TOKENS: &[&str] = &["IT", "ITA", "ITALY"];

/// Value tokens meaning "no data".
const MISSING_VALUE_TOKENS: &[&str] = &["", "NA", "N/A", "null", "None"];

// ============================================================================
// ROW VIEW
// ============================================================================

/// One input row seen through the resolved column map.
pub struct Row<'a> {
    columns: &'a ColumnMap,
    record: &'a StringRecord,
}

impl<'a> Row<'a> {
    pub fn new(columns: &'a ColumnMap, record: &'a StringRecord) -> Self {
        Row { columns, record }
    }

    /// Trimmed cell for `role`; short rows read as empty.
    pub fn get(&self, role: ColumnRole) -> &'a str {
        self.record
            .get(self.columns.position(role))
            .unwrap_or("")
            .trim()
    }
}

// ============================================================================
// BUILD REPORT
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    /// Canonical records in input order
    pub records: Vec<SurveillanceRecord>,

    /// Data rows seen (header excluded)
    pub rows_read: usize,

    pub skipped: BTreeMap<SkipReason, usize>,

    /// Pathogen labels that fell through to verbatim passthrough
    pub unrecognized_pathogens: BTreeSet<String>,
}

impl BuildReport {
    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }

    pub fn skipped_for(&self, reason: SkipReason) -> usize {
        self.skipped.get(&reason).copied().unwrap_or(0)
    }

    fn record_skip(&mut self, reason: SkipReason) {
        *self.skipped.entry(reason).or_insert(0) += 1;
    }
}

// ============================================================================
// RECORD BUILDER
// ============================================================================

pub struct RecordBuilder {
    aliases: AliasTable,
    normalizer: CategoryNormalizer,
}

impl RecordBuilder {
    pub fn new(aliases: AliasTable, normalizer: CategoryNormalizer) -> Self {
        RecordBuilder {
            aliases,
            normalizer,
        }
    }

    /// Parse a whole CSV document and build its records.
    pub fn build(&self, csv_text: &str) -> Result<BuildReport> {
        let csv_text = csv_text.strip_prefix('\u{feff}').unwrap_or(csv_text);

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(csv_text.as_bytes());

        let headers = reader.headers()?.clone();
        if headers.is_empty() {
            return Err(EtlError::NoHeaders);
        }

        let header_names: Vec<&str> = headers.iter().collect();
        let columns = resolve_columns(&header_names, &self.aliases)?;
        debug!(
            country = columns.header(ColumnRole::Country),
            pathogen = columns.header(ColumnRole::Pathogen),
            yearweek = columns.header(ColumnRole::YearWeek),
            indicator = columns.header(ColumnRole::Indicator),
            value = columns.header(ColumnRole::Value),
            "resolved input columns"
        );

        let mut report = BuildReport::default();

        for result in reader.records() {
            let record = result?;
            report.rows_read += 1;

            match self.build_row(&Row::new(&columns, &record)) {
                Ok(built) => {
                    if !built.pathogen.is_known() {
                        report
                            .unrecognized_pathogens
                            .insert(built.pathogen.as_str().to_string());
                    }
                    report.records.push(built);
                }
                Err(reason) => report.record_skip(reason),
            }
        }

        if report.records.is_empty() {
            warn!(rows = report.rows_read, "No ECDC records extracted for Italy");
        }
        if !report.unrecognized_pathogens.is_empty() {
            warn!(
                labels = ?report.unrecognized_pathogens,
                "unrecognized pathogen labels passed through verbatim"
            );
        }
        debug!(
            rows = report.rows_read,
            records = report.records.len(),
            skipped = ?report.skipped,
            "build finished"
        );

        Ok(report)
    }

    /// Build one record or say why the row is left out.
    pub fn build_row(&self, row: &Row<'_>) -> std::result::Result<SurveillanceRecord, SkipReason> {
        let country = row.get(ColumnRole::Country).to_uppercase();
        if !ITALY_TOKENS.contains(&country.as_str()) {
            return Err(SkipReason::OutOfScopeCountry);
        }

        let pathogen = self.normalizer.pathogen(row.get(ColumnRole::Pathogen));

        let iso_week = row.get(ColumnRole::YearWeek);
        if !is_iso_week(iso_week) {
            return Err(SkipReason::MalformedWeek);
        }

        let metric = self
            .normalizer
            .metric(row.get(ColumnRole::Indicator))
            .ok_or(SkipReason::UnknownIndicator)?;

        let raw_value = row.get(ColumnRole::Value);
        if MISSING_VALUE_TOKENS.contains(&raw_value) {
            return Err(SkipReason::MissingValue);
        }
        let value: f64 = raw_value
            .parse()
            .map_err(|_| SkipReason::UnparseableValue)?;
        if !value.is_finite() {
            return Err(SkipReason::NonFiniteValue);
        }
        if value < 0.0 || metric.max_value().is_some_and(|max| value > max) {
            return Err(SkipReason::OutOfRangeValue);
        }

        Ok(SurveillanceRecord::new(iso_week, pathogen, metric, value))
    }
}

impl Default for RecordBuilder {
    fn default() -> Self {
        RecordBuilder::new(AliasTable::default(), CategoryNormalizer::default())
    }
}

// ============================================================================
// TESTS
// ============================================================================
