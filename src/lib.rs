// Surveillance ETL - Core Library
// Exposes the pipeline stages for the ETL binary, the validator binary and tests

pub mod error;
pub mod config;
pub mod columns;    // Column Resolver
pub mod normalize;  // Category Normalizer
pub mod record;     // Canonical Record
pub mod builder;    // Record Builder
pub mod writer;     // Content-Addressed Writer
pub mod validator;  // Schema Validator (publish gate)
pub mod fetch;
pub mod mock;
pub mod pipeline;
pub mod logging;

// Re-export commonly used types
pub use error::{EtlError, Result, SkipReason, Violation};
pub use config::{PipelineConfig, ValidationConfig, DEFAULT_ECDC_URL, ECDC_URL_ENV};
pub use columns::{resolve_columns, AliasTable, ColumnMap, ColumnRole};
pub use normalize::{CategoryNormalizer, MatchKind, NormalizationRule, RuleSet};
pub use record::{Country, Metric, Pathogen, Source, SurveillanceRecord};
pub use builder::{BuildReport, RecordBuilder, Row};
pub use writer::{dataset_digest, persist_atomically, write_jsonl, WriteOutcome};
pub use validator::{
    CoverageReport, DatasetValidator, FreshnessReport, ValidationSummary,
};
pub use fetch::{FeedSource, HttpFeedSource};
pub use mock::generate_mock_records;
pub use pipeline::{run, PipelineOutcome, RunMode};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
