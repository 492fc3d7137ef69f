// 🚨 Error Taxonomy
// Structural failures abort the run, row-level problems are skip reasons

use std::fmt;
use std::path::PathBuf;

use crate::columns::ColumnRole;

// ============================================================================
// FATAL ERRORS
// ============================================================================

/// Every way a pipeline run can fail as a whole.
#[derive(Debug, thiserror::Error)]
pub enum EtlError {
    /// A required column role has no matching header.
    #[error("schema error: missing {role} column (tried {aliases:?}). Headers: {headers:?}")]
    MissingColumn {
        role: ColumnRole,
        aliases: Vec<String>,
        headers: Vec<String>,
    },

    /// The document has no header row at all.
    #[error("schema error: CSV document has no header row")]
    NoHeaders,

    /// The CSV document could not be tokenised.
    #[error("schema error: unreadable CSV document: {0}")]
    Csv(#[from] csv::Error),

    /// The feed could not be retrieved.
    #[error("transport error fetching {url}: {message}")]
    Transport { url: String, message: String },

    /// The dataset could not be read or replaced on disk.
    #[error("persistence error at {path:?}: {source}")]
    Persistence {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A record could not be serialised for writing or hashing.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The persisted dataset violates the canonical schema.
    #[error("validation failed with {} violation(s); first: {}", .0.len(), first_violation(.0))]
    Validation(Vec<Violation>),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EtlError>;

impl EtlError {
    pub fn transport(url: impl Into<String>, message: impl fmt::Display) -> Self {
        EtlError::Transport {
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EtlError::Persistence {
            path: path.into(),
            source,
        }
    }

    /// True for failures raised by the schema validator.
    pub fn is_validation(&self) -> bool {
        matches!(self, EtlError::Validation(_))
    }
}

fn first_violation(violations: &[Violation]) -> String {
    violations
        .first()
        .map(ToString::to_string)
        .unwrap_or_else(|| "<none>".to_string())
}

// ============================================================================
// VALIDATION VIOLATIONS
// ============================================================================

/// One violated constraint in a persisted record.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    /// 1-based line in the dataset file (0 for dataset-level problems)
    pub line: usize,
    pub field: String,
    pub message: String,
}

impl Violation {
    pub fn new(line: usize, field: impl Into<String>, message: impl Into<String>) -> Self {
        Violation {
            line,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 {
            write!(f, "dataset: {}: {}", self.field, self.message)
        } else {
            write!(f, "Line {}: {}: {}", self.line, self.field, self.message)
        }
    }
}

// ============================================================================
// ROW SKIPS
// ============================================================================

/// Why a single input row was left out of the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SkipReason {
    OutOfScopeCountry,
    MalformedWeek,
    UnknownIndicator,
    MissingValue,
    UnparseableValue,
    NonFiniteValue,
    OutOfRangeValue,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::OutOfScopeCountry => "out_of_scope_country",
            SkipReason::MalformedWeek => "malformed_week",
            SkipReason::UnknownIndicator => "unknown_indicator",
            SkipReason::MissingValue => "missing_value",
            SkipReason::UnparseableValue => "unparseable_value",
            SkipReason::NonFiniteValue => "non_finite_value",
            SkipReason::OutOfRangeValue => "out_of_range_value",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_column_message_lists_headers() {
        let err = EtlError::MissingColumn {
            role: ColumnRole::Value,
            aliases: vec!["value".to_string()],
            headers: vec!["countryname".to_string(), "pathogen".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("missing value column"));
        assert!(msg.contains("countryname"));
        assert!(msg.contains("pathogen"));
    }

    #[test]
    fn test_validation_message_names_first_line() {
        let err = EtlError::Validation(vec![
            Violation::new(3, "value", "Value must be non-negative, got -1"),
            Violation::new(7, "country", "Invalid country 'FR', expected 'IT'"),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("2 violation(s)"));
        assert!(msg.contains("Line 3: value"));
        assert!(err.is_validation());
    }
}
