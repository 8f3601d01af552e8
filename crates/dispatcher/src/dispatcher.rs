//! Dispatcher - routes jobs to the configured backend

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, error, info, instrument, warn};

use contracts::{
    BackendKind, CommandLine, ContractError, DispatchConfig, DrainReport, EnvSnapshot, Job,
    JobBackend, JobDefaults, JobTicket,
};

use crate::backends::{
    AnyBackend, BatchQueueBackend, DistributedRanksBackend, LocalBackend, ThreadPoolBackend,
};
use crate::error::DispatcherError;
use crate::metrics::{DispatchMetrics, MetricsSnapshot};
use crate::toolkit::{locate_mpirun, Toolkit};

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder {
    config: DispatchConfig,
    env: Option<EnvSnapshot>,
}

impl DispatcherBuilder {
    /// Create a new DispatcherBuilder
    pub fn new(config: DispatchConfig) -> Self {
        Self { config, env: None }
    }

    /// Use an explicit environment snapshot instead of capturing one
    pub fn env(mut self, env: EnvSnapshot) -> Self {
        self.env = Some(env);
        self
    }

    /// Resolve the backend and start it
    ///
    /// Every configuration check happens here, before any job is launched.
    #[instrument(
        name = "dispatcher_builder_build",
        skip(self),
        fields(backend = self.config.backend.label())
    )]
    pub async fn build(self) -> Result<Dispatcher, DispatcherError> {
        let env = self.env.unwrap_or_else(EnvSnapshot::capture);
        let working_dir = resolve_working_dir(self.config.working_dir.as_deref())?;
        let backend = create_backend(&self.config, &working_dir, env)?;

        info!(
            backend = backend.label(),
            working_dir = %working_dir.display(),
            "Dispatcher ready"
        );

        Ok(Dispatcher::new(backend, self.config.defaults))
    }
}

/// Existing, absolute working directory
fn resolve_working_dir(dir: Option<&Path>) -> Result<PathBuf, ContractError> {
    match dir {
        Some(dir) => {
            if !dir.exists() {
                return Err(ContractError::missing_input(dir));
            }
            Ok(dir.canonicalize()?)
        }
        None => Ok(std::env::current_dir()?),
    }
}

/// Create the backend selected by the configuration
#[instrument(
    name = "dispatcher_create_backend",
    skip(config, env),
    fields(backend = config.backend.label())
)]
fn create_backend(
    config: &DispatchConfig,
    working_dir: &Path,
    env: EnvSnapshot,
) -> Result<AnyBackend, ContractError> {
    match &config.backend {
        BackendKind::Local => Ok(LocalBackend::new(working_dir, env).into()),
        BackendKind::ThreadPool(spec) => {
            let shim = Toolkit::locate(config.toolkit_dir.as_deref())?.thread_shim()?;
            Ok(ThreadPoolBackend::spawn(&shim, spec, working_dir, &env)?.into())
        }
        BackendKind::DistributedRanks(spec) => {
            let shim = Toolkit::locate(config.toolkit_dir.as_deref())?.mpi_shim()?;
            let mpirun = locate_mpirun(spec.mpi_dir.as_deref())?;
            Ok(DistributedRanksBackend::spawn(&mpirun, &shim, spec, working_dir, &env)?.into())
        }
        BackendKind::BatchQueue(spec) => {
            Ok(BatchQueueBackend::new(spec.clone(), working_dir, env).into())
        }
    }
}

/// Front door for job submission
///
/// Accepts any number of `run` calls, then exactly one effective `wait`.
pub struct Dispatcher<B: JobBackend = AnyBackend> {
    backend: B,
    defaults: JobDefaults,
    metrics: DispatchMetrics,
    /// Set by the first `wait`; the dispatcher is spent afterwards
    outcome: Option<DrainOutcome>,
}

/// Cached result of the one effective drain
#[derive(Debug, Clone)]
enum DrainOutcome {
    Drained(DrainReport),
    Failed(String),
}

impl Dispatcher<AnyBackend> {
    /// Resolve the configured backend with an explicit environment snapshot
    pub async fn from_config(
        config: &DispatchConfig,
        env: EnvSnapshot,
    ) -> Result<Self, DispatcherError> {
        DispatcherBuilder::new(config.clone()).env(env).build().await
    }
}

impl<B: JobBackend> Dispatcher<B> {
    fn new(backend: B, defaults: JobDefaults) -> Self {
        Self {
            backend,
            defaults,
            metrics: DispatchMetrics::new(),
            outcome: None,
        }
    }

    /// Create a dispatcher around a custom backend (for testing)
    pub fn with_backend(backend: B) -> Self {
        Self::new(backend, JobDefaults::default())
    }

    pub fn backend_label(&self) -> &str {
        self.backend.label()
    }

    pub fn defaults(&self) -> &JobDefaults {
        &self.defaults
    }

    /// Whether `wait` has already been called
    pub fn is_spent(&self) -> bool {
        self.outcome.is_some()
    }

    /// Get dispatcher metrics
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Hand one job to the backend
    ///
    /// Returns once the backend accepted the job: after completion for the
    /// local backend, after the line is flushed for the worker backends,
    /// after submission for the batch backend.
    #[instrument(
        name = "dispatcher_run",
        skip(self, job),
        fields(backend = %self.backend.label(), job = %job.name())
    )]
    pub async fn run(&mut self, job: &Job) -> Result<JobTicket, DispatcherError> {
        if self.is_spent() {
            return Err(DispatcherError::spent(job.name()));
        }

        let started = Instant::now();
        let result = self.backend.submit(job).await;
        let label = self.backend.label().to_string();

        match result {
            Ok(ticket) => {
                self.metrics.inc_submitted();
                observability::record_job_submitted(&label);
                observability::record_submit_latency_ms(
                    &label,
                    started.elapsed().as_secs_f64() * 1000.0,
                );
                debug!(batch_id = ?ticket.batch_id, "Job accepted");
                Ok(ticket)
            }
            Err(e) => {
                match &e {
                    ContractError::JobExecution { .. } => {
                        self.metrics.inc_job_failures();
                        observability::record_job_failed(&label);
                    }
                    _ => {
                        self.metrics.inc_launch_failures();
                        observability::record_launch_failure(&label);
                    }
                }
                Err(e.into())
            }
        }
    }

    /// Build a job from the configured defaults and run it
    pub async fn run_command(&mut self, command: CommandLine) -> Result<JobTicket, DispatcherError> {
        let job = self.defaults.job(command);
        self.run(&job).await
    }

    /// Block until every submitted job has been joined
    ///
    /// Only the first call drains the backend; later calls return the same
    /// report, or the same drain failure, without touching it.
    #[instrument(name = "dispatcher_wait", skip(self), fields(backend = %self.backend.label()))]
    pub async fn wait(&mut self) -> Result<DrainReport, DispatcherError> {
        match &self.outcome {
            Some(DrainOutcome::Drained(report)) => {
                debug!("Dispatcher already spent");
                return Ok(*report);
            }
            Some(DrainOutcome::Failed(reason)) => {
                debug!("Dispatcher already spent after a failed drain");
                return Err(DispatcherError::drain_failed(reason.clone()));
            }
            None => {}
        }

        let started = Instant::now();
        let report = match self.backend.drain().await {
            Ok(report) => report,
            Err(e) => {
                self.outcome = Some(DrainOutcome::Failed(e.to_string()));
                error!(error = %e, "Drain failed");
                return Err(e.into());
            }
        };
        self.outcome = Some(DrainOutcome::Drained(report));

        self.metrics.add_drain(&report);
        observability::record_drain(
            self.backend.label(),
            &report,
            started.elapsed().as_secs_f64(),
        );

        if report.failed > 0 {
            warn!(
                joined = report.joined,
                failed = report.failed,
                "Some workers or submissions ended unsuccessfully"
            );
        } else {
            info!(joined = report.joined, "Dispatcher drained");
        }
        Ok(report)
    }
}

impl<B: JobBackend> Drop for Dispatcher<B> {
    fn drop(&mut self) {
        if self.outcome.is_none() {
            warn!(
                backend = self.backend.label(),
                submitted = self.metrics.submitted(),
                "Dispatcher dropped without wait"
            );
        }
    }
}

/// Convenience function to create a dispatcher from a config, capturing
/// the current environment
#[instrument(name = "dispatcher_create", skip(config))]
pub async fn create_dispatcher(config: DispatchConfig) -> Result<Dispatcher, DispatcherError> {
    DispatcherBuilder::new(config).build().await
}
