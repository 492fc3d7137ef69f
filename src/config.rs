// ⚙️ Pipeline Configuration
// Everything a run needs, passed explicitly to each component

use std::path::PathBuf;
use std::time::Duration;

use crate::columns::AliasTable;

/// Upstream ERVISS sentinel surveillance export.
pub const DEFAULT_ECDC_URL: &str = "https://raw.githubusercontent.com/EU-ECDC/Respiratory_viruses_weekly_data/main/data/sentinelTestsDetectionsPositivity.csv";

/// Environment variable overriding the feed location in real mode.
pub const ECDC_URL_ENV: &str = "ECDC_CSV_URL";

pub const DEFAULT_OUTPUT_PATH: &str = "data/ecdc_weekly.jsonl";

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Where the JSONL dataset lives
    pub output_path: PathBuf,

    pub feed_url: String,

    pub fetch_timeout: Duration,

    pub aliases: AliasTable,

    pub validation: ValidationConfig,
}

/// Bounds for the read-back checks on a persisted dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationConfig {
    /// Maximum lines checked by the schema validator
    pub max_records: usize,

    /// Maximum lines read for coverage and freshness reporting
    pub coverage_max_records: usize,

    /// How many ISO weeks back (including the current one) count as fresh
    pub freshness_weeks: u32,

    /// An empty dataset is not publishable
    pub require_records: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        ValidationConfig {
            max_records: 100,
            coverage_max_records: 500,
            freshness_weeks: 12,
            require_records: true,
        }
    }
}

impl PipelineConfig {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        PipelineConfig {
            output_path: output_path.into(),
            ..Self::default()
        }
    }

    /// Defaults with the feed URL taken from `ECDC_CSV_URL` when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(url) = Self::url_override(std::env::var(ECDC_URL_ENV).ok()) {
            config.feed_url = url;
        }
        config
    }

    fn url_override(raw: Option<String>) -> Option<String> {
        raw.map(|url| url.trim().to_string()).filter(|url| !url.is_empty())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_feed_url(mut self, url: impl Into<String>) -> Self {
        self.feed_url = url.into();
        self
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            feed_url: DEFAULT_ECDC_URL.to_string(),
            fetch_timeout: Duration::from_secs(30),
            aliases: AliasTable::default(),
            validation: ValidationConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();

        assert_eq!(config.output_path, PathBuf::from("data/ecdc_weekly.jsonl"));
        assert_eq!(config.feed_url, DEFAULT_ECDC_URL);
        assert_eq!(config.fetch_timeout, Duration::from_secs(30));
        assert_eq!(config.validation.max_records, 100);
        assert_eq!(config.validation.coverage_max_records, 500);
    }

    #[test]
    fn test_url_override_ignores_blank() {
        assert_eq!(PipelineConfig::url_override(None), None);
        assert_eq!(PipelineConfig::url_override(Some("  ".to_string())), None);
        assert_eq!(
            PipelineConfig::url_override(Some(" https://example.org/feed.csv ".to_string())),
            Some("https://example.org/feed.csv".to_string())
        );
    }

    #[test]
    fn test_builders() {
        let config = PipelineConfig::new("/tmp/out.jsonl")
            .with_timeout(Duration::from_secs(5))
            .with_feed_url("http://localhost/feed.csv");

        assert_eq!(config.output_path, PathBuf::from("/tmp/out.jsonl"));
        assert_eq!(config.fetch_timeout, Duration::from_secs(5));
        assert_eq!(config.feed_url, "http://localhost/feed.csv");
    }
}
