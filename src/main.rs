//! Madrid district open-data collector
//!
//! Gathers district-level open data for the 21 districts of Madrid and
//! writes it as CSV under the configured data directory.
//!
//! # Collector groups
//!
//! - **ine**: INE census workbooks (electricity consumption, income,
//!   demography, education), cached in `raw/` and filtered to Madrid
//! - **esios**: REE grid indicators (demand, prices, generation), needs
//!   `ESIOS_API_KEY`
//! - **data_integration**: weather, electricity prices, air quality and
//!   mobility per district, their metrics and the composite indices
//!
//! Every live source falls back to a seeded simulation when it can't be
//! reached, so the integration group always produces a full dataset.

mod air_quality;
mod config;
mod district;
mod electricity;
mod error;
mod esios;
mod http;
mod ine;
mod integration;
mod mobility;
mod model;
mod rate_limit;
mod runner;
mod stats;
mod storage;
mod synthetic;
mod weather;

#[cfg(test)]
mod test_utils;

use crate::error::Result;
use crate::runner::{selected_tasks, RunSummary, Runner, Task};
use clap::Parser;
use std::sync::Arc;
use tokio::signal::ctrl_c;
use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinError;

#[derive(Parser, Debug)]
#[command(version, about = "Collects open data for the districts of Madrid")]
struct Cli {
    /// Run only these collector groups
    #[arg(long, value_enum, num_args = 1..)]
    only: Vec<Task>,

    /// Skip the data integration group
    #[arg(long)]
    skip_integration: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let app_config = config::load_app_config()?;
    tracing_subscriber::fmt()
        .with_max_level(app_config.log_level())
        .init();

    let collector_config = config::load_collector_config()?;
    collector_config.validate()?;
    let output_config = config::load_output_config()?;
    let api_keys = config::load_api_key_config()?;
    let endpoints = config::load_endpoint_config()?;
    let client = Arc::new(http::Client::new(collector_config.request_timeout_sec)?);

    if api_keys.openweather().is_none() {
        tracing::warn!("OPENWEATHER_API_KEY not set, weather will be simulated");
    }

    let tasks = selected_tasks(&cli.only, cli.skip_integration);
    if tasks.is_empty() {
        tracing::warn!("No collector groups selected");
        return Ok(());
    }

    let runner = Runner::new(client, collector_config, output_config, api_keys, endpoints);
    let mut run_task = tokio::spawn(async move { runner.run_all(&tasks).await });

    let mut sig_term = signal(SignalKind::terminate()).map_err(anyhow::Error::from)?;
    tracing::info!("Running... Press Ctrl-C or send SIGTERM to terminate.");
    let summary = tokio::select! {
        _ = sig_term.recv() => {
            tracing::info!("Received SIGTERM. Exiting...");
            run_task.abort();
            None
        }
        _ = ctrl_c() => {
            tracing::info!("Received SIGINT. Exiting...");
            run_task.abort();
            None
        }
        result = &mut run_task => handle_task_result("collectors", result),
    };

    match summary {
        Some(summary) if summary.all_succeeded() => Ok(()),
        _ => std::process::exit(1),
    }
}

/// Logs the outcome of the spawned run and hands back its summary.
///
/// A panicked or cancelled run yields `None`.
fn handle_task_result(
    task_name: &str,
    result: std::result::Result<RunSummary, JoinError>,
) -> Option<RunSummary> {
    match result {
        Ok(summary) => {
            tracing::debug!("Task {} completed.", task_name);
            summary.log();
            Some(summary)
        }
        Err(e) => {
            tracing::error!("Task {} failed: {:?}", task_name, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::Outcome;
    use std::time::Duration;

    mod cli {
        use super::*;

        #[test]
        fn succeeds() {
            let cli = Cli::try_parse_from(["madrid-district-data", "--only", "ine", "data_integration"]).unwrap();
            assert_eq!(cli.only, vec![Task::Ine, Task::DataIntegration]);
            assert!(!cli.skip_integration);

            let cli = Cli::try_parse_from(["madrid-district-data", "--skip-integration"]).unwrap();
            assert!(cli.only.is_empty());
            assert!(cli.skip_integration);
        }

        #[test]
        fn fails() {
            assert!(Cli::try_parse_from(["madrid-district-data", "--only", "weather"]).is_err());
        }
    }

    mod handle_task_result {
        use super::*;

        #[test]
        fn succeeds() {
            let summary = RunSummary {
                results: vec![(Task::Ine, Outcome::Success { files: vec![] })],
                duration: Duration::from_millis(5),
            };
            let summary = handle_task_result("test_task", Ok(summary)).unwrap();
            assert!(summary.all_succeeded());
        }

        #[tokio::test]
        async fn fails() {
            let handle = tokio::spawn(async {
                panic!("Task panicked");
            });

            let result: std::result::Result<RunSummary, JoinError> = handle.await;

            assert!(handle_task_result("test_task", result).is_none());
        }
    }
}
