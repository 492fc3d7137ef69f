use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use chrono::Local;
use clap::{ArgGroup, Parser};
use tracing::{error, info};

use surveillance_etl::logging::init_logging;
use surveillance_etl::{run, HttpFeedSource, PipelineConfig, RunMode};

#[derive(Parser, Debug)]
#[command(name = "surveillance-etl")]
#[command(version, about = "Fetch and process respiratory virus surveillance data")]
#[command(group(ArgGroup::new("mode").required(true).args(["mock", "real"])))]
struct Cli {
    /// Generate mock data instead of fetching real sources
    #[arg(long)]
    mock: bool,

    /// Fetch real data from ECDC (ECDC_CSV_URL overrides the default feed)
    #[arg(long)]
    real: bool,

    /// Output JSONL dataset
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Fetch timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let mode = if cli.mock { RunMode::Mock } else { RunMode::Real };

    let mut config = match mode {
        RunMode::Real => PipelineConfig::from_env(),
        RunMode::Mock => PipelineConfig::default(),
    };
    if let Some(output) = cli.output {
        config.output_path = output;
    }
    if let Some(secs) = cli.timeout {
        config = config.with_timeout(Duration::from_secs(secs));
    }

    match run(&config, mode, &HttpFeedSource, Local::now().date_naive()) {
        Ok(outcome) => {
            info!(
                changed = outcome.changed(),
                digest = outcome.write.digest(),
                path = %config.output_path.display(),
                "ETL run finished"
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            error!(error = %err, "ETL pipeline failed");
            Ok(ExitCode::FAILURE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_mode_is_required_and_exclusive() {
        assert!(Cli::try_parse_from(["surveillance-etl"]).is_err());
        assert!(Cli::try_parse_from(["surveillance-etl", "--mock", "--real"]).is_err());

        let cli = Cli::try_parse_from(["surveillance-etl", "--real", "--timeout", "5"]).unwrap();
        assert!(cli.real);
        assert_eq!(cli.timeout, Some(5));
    }
}
