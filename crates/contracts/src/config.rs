//! DispatchConfig - Config Loader output
//!
//! Describes which backend to use, where the toolkit lives, and the
//! defaults applied to every job built from a bare command line.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use validator::Validate;

use crate::{CommandLine, Job, DEFAULT_JOB_NAME};

/// Full dispatcher configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct DispatchConfig {
    /// Execution backend
    #[serde(default)]
    pub backend: BackendKind,

    /// Toolkit root holding the worker shims (`thrsh`, `mpish`)
    #[serde(default)]
    pub toolkit_dir: Option<PathBuf>,

    /// Working directory for jobs (defaults to the current directory)
    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    /// Per-job defaults
    #[serde(default)]
    #[validate(nested)]
    pub defaults: JobDefaults,
}

/// Backend selection, resolved once at startup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendKind {
    /// Run each job synchronously as a child process
    #[default]
    Local,
    /// Feed jobs to one long-lived thread-pool worker
    ThreadPool(PoolSpec),
    /// Feed jobs to one worker launched across MPI ranks
    DistributedRanks(RankSpec),
    /// Submit each job as a PBS batch script
    BatchQueue(BatchSpec),
}

impl BackendKind {
    /// Short name used in logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::ThreadPool(_) => "thread_pool",
            Self::DistributedRanks(_) => "distributed_ranks",
            Self::BatchQueue(_) => "batch_queue",
        }
    }
}

/// Thread-pool worker settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PoolSpec {
    /// Maximum concurrently running jobs
    #[serde(default = "default_pool_threads")]
    #[validate(range(min = 1))]
    pub threads: u32,
}

impl Default for PoolSpec {
    fn default() -> Self {
        Self {
            threads: default_pool_threads(),
        }
    }
}

fn default_pool_threads() -> u32 {
    2
}

/// MPI launch settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankSpec {
    /// Process count (`--np`); 0 leaves it to mpirun
    #[serde(default)]
    pub processes: u32,

    /// Explicit host list (`--host`)
    #[serde(default)]
    pub hosts: Vec<String>,

    /// Host file (`--hostfile`); exclusive with `hosts`
    #[serde(default)]
    pub hosts_file: Option<PathBuf>,

    /// MPI installation prefix containing `mpirun`
    #[serde(default)]
    pub mpi_dir: Option<PathBuf>,
}

/// PBS submission settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSpec {
    /// Target queue (`#PBS -q`)
    #[serde(default)]
    pub queue: Option<String>,

    /// Emit `#PBS -W block=true` so each submitter returns only when its job
    /// finishes; submitters then run in the background until `wait`.
    #[serde(default = "default_block")]
    pub block_until_complete: bool,

    /// Submission command
    #[serde(default = "default_submit_program")]
    pub submit_program: String,

    /// Shell passed to the submitter via `-S`
    #[serde(default = "default_batch_shell")]
    pub shell: String,
}

impl Default for BatchSpec {
    fn default() -> Self {
        Self {
            queue: None,
            block_until_complete: default_block(),
            submit_program: default_submit_program(),
            shell: default_batch_shell(),
        }
    }
}

fn default_block() -> bool {
    true
}

fn default_submit_program() -> String {
    "qsub".to_string()
}

fn default_batch_shell() -> String {
    "/bin/sh".to_string()
}

/// Defaults applied to jobs built from bare command lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct JobDefaults {
    /// Job name (`#PBS -N`)
    #[serde(default = "default_job_name")]
    #[validate(length(min = 1))]
    pub name: String,

    /// Cores requested per job
    #[serde(default = "default_job_threads")]
    #[validate(range(min = 1))]
    pub threads: u32,

    /// Memory ceiling in GB (0 = no memory clause)
    #[serde(default = "default_max_malloc")]
    #[validate(range(min = 0.0))]
    pub max_malloc_gb: f64,

    /// Stderr destination for each job
    #[serde(default)]
    pub logfile: Option<PathBuf>,

    /// Batch dependency: run after this job id
    #[serde(default)]
    pub after: Option<String>,

    /// Batch dependency: run before this job id
    #[serde(default)]
    pub before: Option<String>,
}

impl Default for JobDefaults {
    fn default() -> Self {
        Self {
            name: default_job_name(),
            threads: default_job_threads(),
            max_malloc_gb: default_max_malloc(),
            logfile: None,
            after: None,
            before: None,
        }
    }
}

impl JobDefaults {
    /// Build a job for `command` carrying these defaults
    pub fn job(&self, command: CommandLine) -> Job {
        let mut job = Job::new(command)
            .with_name(self.name.clone())
            .with_threads(self.threads)
            .with_memory_gb(self.max_malloc_gb);
        if let Some(ref log) = self.logfile {
            job = job.with_logfile(log.clone());
        }
        if let Some(ref id) = self.after {
            job = job.after(id.clone());
        }
        if let Some(ref id) = self.before {
            job = job.before(id.clone());
        }
        job
    }
}

fn default_job_name() -> String {
    DEFAULT_JOB_NAME.to_string()
}

fn default_job_threads() -> u32 {
    1
}

fn default_max_malloc() -> f64 {
    4.0
}
