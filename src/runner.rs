//! Runs the collection groups in order and summarises what they produced.

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{ApiKeyConfig, CollectorConfig, EndpointConfig, OutputConfig};
use crate::error::CollectorError;
use crate::esios::EsiosCollector;
use crate::http::Client;
use crate::ine::IneCollector;
use crate::integration::DataIntegration;
use crate::storage::{file_size_kb, CsvStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Task {
    Ine,
    Esios,
    #[value(name = "data_integration")]
    DataIntegration,
}

impl Task {
    pub const ALL: [Task; 3] = [Task::Ine, Task::Esios, Task::DataIntegration];
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Task::Ine => write!(f, "ine"),
            Task::Esios => write!(f, "esios"),
            Task::DataIntegration => write!(f, "data_integration"),
        }
    }
}

/// Tasks to run, always in `ine, esios, data_integration` order.
///
/// An empty `only` selects every task.
pub fn selected_tasks(only: &[Task], skip_integration: bool) -> Vec<Task> {
    Task::ALL
        .into_iter()
        .filter(|t| only.is_empty() || only.contains(t))
        .filter(|t| !(skip_integration && *t == Task::DataIntegration))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success { files: Vec<PathBuf> },
    Failed { reason: String },
    Error { message: String },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    fn from_files(files: Vec<PathBuf>, reason: &str) -> Self {
        if files.is_empty() {
            Outcome::Failed {
                reason: reason.to_string(),
            }
        } else {
            Outcome::Success { files }
        }
    }

    fn from_error(err: CollectorError) -> Self {
        match err {
            CollectorError::MissingApiKey { .. } => Outcome::Failed {
                reason: "API key not configured".to_string(),
            },
            other => Outcome::Error {
                message: other.to_string(),
            },
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Outcome::Success { .. } => write!(f, "success"),
            Outcome::Failed { reason } => write!(f, "failed: {}", reason),
            Outcome::Error { message } => write!(f, "error: {}", message),
        }
    }
}

/// Awaits `future`, turning an elapsed `timeout` into [`Outcome::Error`].
pub async fn with_timeout<F>(task: Task, future: F, timeout: Duration) -> Outcome
where
    F: Future<Output = Outcome>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(outcome) => outcome,
        Err(_) => {
            tracing::error!("Task {} timed out.", task);
            Outcome::Error {
                message: CollectorError::timeout(task.to_string(), timeout.as_secs()).to_string(),
            }
        }
    }
}

#[derive(Debug)]
pub struct RunSummary {
    pub results: Vec<(Task, Outcome)>,
    pub duration: Duration,
}

impl RunSummary {
    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|(_, o)| o.is_success()).count()
    }

    pub fn all_succeeded(&self) -> bool {
        self.success_count() == self.results.len()
    }

    pub fn log(&self) {
        tracing::info!(
            "Collectors succeeded: {}/{} in {:.1}s",
            self.success_count(),
            self.results.len(),
            self.duration.as_secs_f64()
        );
        for (task, outcome) in &self.results {
            tracing::info!(task = %task, "{}", outcome);
            if let Outcome::Success { files } = outcome {
                for file in files {
                    let name = file.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
                    match file_size_kb(file) {
                        Some(kb) => tracing::info!(task = %task, "  {} ({:.2} KB)", name, kb),
                        None => tracing::info!(task = %task, "  {}", name),
                    }
                }
            }
        }
    }
}

pub struct Runner {
    client: Arc<Client>,
    collector: CollectorConfig,
    output: OutputConfig,
    keys: ApiKeyConfig,
    endpoints: EndpointConfig,
}

impl Runner {
    pub fn new(
        client: Arc<Client>,
        collector: CollectorConfig,
        output: OutputConfig,
        keys: ApiKeyConfig,
        endpoints: EndpointConfig,
    ) -> Self {
        Self {
            client,
            collector,
            output,
            keys,
            endpoints,
        }
    }

    fn store(&self) -> CsvStore {
        CsvStore::new(self.output.data_dir.clone())
    }

    async fn run_ine(&self) -> Outcome {
        let collector = IneCollector::new(self.client.clone(), self.endpoints.ine_base.clone(), self.store());
        Outcome::from_files(collector.collect_all().await, "No data obtained")
    }

    async fn run_esios(&self) -> Outcome {
        let collector = match EsiosCollector::from_config(
            self.client.clone(),
            &self.endpoints,
            &self.keys,
            Duration::from_millis(self.collector.esios_min_interval_ms),
            self.store(),
        ) {
            Ok(collector) => collector,
            Err(e) => {
                tracing::error!("ESIOS not configured: {}", e);
                return Outcome::from_error(e);
            }
        };
        match collector.collect_all(self.collector.days_back).await {
            Ok(files) => Outcome::from_files(files, "No files generated"),
            Err(e) => Outcome::from_error(e),
        }
    }

    async fn run_integration(&self) -> Outcome {
        let integration = DataIntegration::from_config(
            self.client.clone(),
            &self.collector,
            &self.endpoints,
            &self.keys,
            self.store(),
        );
        match integration.run().await {
            Ok(files) => Outcome::from_files(files, "No data obtained"),
            Err(e) => Outcome::from_error(e),
        }
    }

    pub async fn run_task(&self, task: Task) -> Outcome {
        tracing::info!(task = %task, "Starting");
        let timeout = Duration::from_secs(self.collector.task_timeout_seconds);
        let outcome = match task {
            Task::Ine => with_timeout(task, self.run_ine(), timeout).await,
            Task::Esios => with_timeout(task, self.run_esios(), timeout).await,
            Task::DataIntegration => with_timeout(task, self.run_integration(), timeout).await,
        };
        match &outcome {
            Outcome::Success { files } => tracing::info!(task = %task, files = files.len(), "Finished"),
            other => tracing::error!(task = %task, "{}", other),
        }
        outcome
    }

    pub async fn run_all(&self, tasks: &[Task]) -> RunSummary {
        let started = Instant::now();
        tracing::info!(
            raw = %self.output.raw_dir().display(),
            processed = %self.output.processed_dir().display(),
            "Running {} collector groups",
            tasks.len()
        );
        let mut results = Vec::with_capacity(tasks.len());
        for &task in tasks {
            results.push((task, self.run_task(task).await));
        }
        RunSummary {
            results,
            duration: started.elapsed(),
        }
    }
}
