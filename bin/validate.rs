// Dataset publish gate: schema, coverage and freshness checks on the persisted JSONL

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use tracing::{error, info, warn};

use surveillance_etl::config::DEFAULT_OUTPUT_PATH;
use surveillance_etl::logging::init_logging;
use surveillance_etl::{DatasetValidator, EtlError, ValidationConfig};

#[derive(Parser, Debug)]
#[command(name = "validate-dataset")]
#[command(version, about = "Validate the ECDC weekly dataset before publication")]
struct Cli {
    /// Dataset to check
    #[arg(default_value = DEFAULT_OUTPUT_PATH)]
    path: PathBuf,

    /// Maximum lines checked against the schema
    #[arg(long, default_value_t = ValidationConfig::default().max_records)]
    max_records: usize,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn report_failure(check: &str, err: &EtlError) {
    match err {
        EtlError::Validation(violations) => {
            for violation in violations {
                error!(check, "{violation}");
            }
        }
        other => error!(check, error = %other, "check could not run"),
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let validator = DatasetValidator::new(ValidationConfig {
        max_records: cli.max_records,
        ..ValidationConfig::default()
    });

    let mut failed = Vec::new();

    match validator.validate_file(&cli.path) {
        Ok(summary) => info!(records = summary.records_checked, "[OK] schema"),
        Err(err) => {
            report_failure("schema", &err);
            failed.push("schema");
        }
    }

    match validator.check_coverage(&cli.path) {
        Ok(report) => info!(pathogens = ?report.pathogens, "[OK] coverage"),
        Err(err) => {
            report_failure("coverage", &err);
            failed.push("coverage");
        }
    }

    match validator.check_freshness(&cli.path, Local::now().date_naive()) {
        Ok(report) if report.has_recent => info!(current_week = %report.current_week, "[OK] freshness"),
        Ok(report) => warn!(current_week = %report.current_week, "[WARN] freshness"),
        Err(err) => {
            report_failure("freshness", &err);
            failed.push("freshness");
        }
    }

    if failed.is_empty() {
        info!("SUCCESS: all checks passed");
        Ok(ExitCode::SUCCESS)
    } else {
        error!(failed = ?failed, "FAILED: {} check(s) failed", failed.len());
        Ok(ExitCode::FAILURE)
    }
}
