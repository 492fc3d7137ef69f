// 🔄 Pipeline Orchestration
// feed text → records → change-aware write

use chrono::NaiveDate;
use tracing::info;

use crate::builder::{BuildReport, RecordBuilder};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::fetch::FeedSource;
use crate::mock::generate_mock_records;
use crate::normalize::CategoryNormalizer;
use crate::record::SurveillanceRecord;
use crate::writer::{write_jsonl, WriteOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Synthetic data, no network
    Mock,
    /// Download and normalise the real feed
    Real,
}

#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub mode: RunMode,
    /// Present for real runs only
    pub build: Option<BuildReport>,
    pub write: WriteOutcome,
}

impl PipelineOutcome {
    pub fn changed(&self) -> bool {
        self.write.changed()
    }
}

/// Fetch the configured feed and turn it into canonical records.
pub fn fetch_and_build(config: &PipelineConfig, source: &dyn FeedSource) -> Result<BuildReport> {
    let csv_text = source.fetch(&config.feed_url, config.fetch_timeout)?;
    let builder = RecordBuilder::new(config.aliases.clone(), CategoryNormalizer::default());
    builder.build(&csv_text)
}

/// One full run. `today` anchors the synthetic weeks in mock mode.
pub fn run(
    config: &PipelineConfig,
    mode: RunMode,
    source: &dyn FeedSource,
    today: NaiveDate,
) -> Result<PipelineOutcome> {
    let (records, build): (Vec<SurveillanceRecord>, Option<BuildReport>) = match mode {
        RunMode::Mock => {
            info!("generating mock data");
            (generate_mock_records(today), None)
        }
        RunMode::Real => {
            let report = fetch_and_build(config, source)?;
            info!(
                rows = report.rows_read,
                records = report.records.len(),
                skipped = report.skipped_total(),
                "built ECDC records"
            );
            (report.records.clone(), Some(report))
        }
    };

    let write = write_jsonl(&config.output_path, &records)?;
    if write.changed() {
        info!("data files updated successfully");
    } else {
        info!("no changes detected in data");
    }

    Ok(PipelineOutcome { mode, build, write })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EtlError;
    use std::time::Duration;
    use tempfile::TempDir;

    struct FailingSource;

    impl FeedSource for FailingSource {
        fn fetch(&self, url: &str, _timeout: Duration) -> Result<String> {
            Err(EtlError::transport(url, "connection refused"))
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 7).unwrap()
    }

    #[test]
    fn test_mock_run_writes_once() {
        let dir = TempDir::new().unwrap();
        let config = PipelineConfig::new(dir.path().join("ecdc_weekly.jsonl"));

        let first = run(&config, RunMode::Mock, &FailingSource, today()).unwrap();
        assert!(first.changed());
        assert!(first.build.is_none());

        let second = run(&config, RunMode::Mock, &FailingSource, today()).unwrap();
        assert!(!second.changed());
    }

    #[test]
    fn test_transport_failure_leaves_no_file() {
        let dir = TempDir::new().unwrap();
        let config = PipelineConfig::new(dir.path().join("ecdc_weekly.jsonl"));

        let err = run(&config, RunMode::Real, &FailingSource, today()).unwrap_err();
        assert!(matches!(err, EtlError::Transport { .. }));
        assert!(!config.output_path.exists());
    }
}
