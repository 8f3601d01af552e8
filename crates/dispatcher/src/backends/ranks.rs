//! DistributedRanksBackend - one `mpish` worker launched across MPI ranks
//!
//! Same line protocol as the thread pool; the worker itself is started
//! through `mpirun`, which forwards the snapshot variables to every rank.

use std::path::{Path, PathBuf};

use contracts::{
    CommandLine, ContractError, DrainReport, EnvSnapshot, Job, JobBackend, JobTicket, RankSpec,
};
use tracing::{info, instrument};

use crate::worker::WorkerHandle;

const LABEL: &str = "distributed_ranks";

/// Where the ranks run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RankPlacement {
    /// Let mpirun decide
    Default,
    /// `--host a,b,c`
    Hosts(Vec<String>),
    /// `--hostfile <path>` (absolute)
    HostFile(PathBuf),
}

impl RankPlacement {
    /// Resolve the placement options of `spec`
    ///
    /// # Errors
    /// - `ConfigValidation` if both hosts and a host file are given
    /// - `MissingInput` if the host file does not exist
    pub fn resolve(spec: &RankSpec) -> Result<Self, ContractError> {
        match (&spec.hosts[..], &spec.hosts_file) {
            ([], None) => Ok(Self::Default),
            ([], Some(file)) => {
                if !file.exists() {
                    return Err(ContractError::missing_input(file));
                }
                Ok(Self::HostFile(file.canonicalize()?))
            }
            (hosts, None) => Ok(Self::Hosts(hosts.to_vec())),
            (_, Some(_)) => Err(ContractError::config_validation(
                "backend.hosts / backend.hosts_file",
                "hosts and hosts_file are mutually exclusive",
            )),
        }
    }
}

/// Persistent MPI backend
pub struct DistributedRanksBackend {
    worker: Option<WorkerHandle>,
}

impl DistributedRanksBackend {
    /// `<mpirun> [--np N] [--host ..|--hostfile ..] [-x VAR]... <mpish> --debug`
    pub fn launch_command(
        mpirun: &Path,
        processes: u32,
        placement: &RankPlacement,
        shim: &Path,
        env: &EnvSnapshot,
    ) -> CommandLine {
        let mut cmd = CommandLine::new(mpirun.display().to_string());

        if processes > 0 {
            cmd = cmd.flag("np", processes);
        }

        cmd = match placement {
            RankPlacement::Default => cmd,
            RankPlacement::Hosts(hosts) => cmd.flag("host", hosts.join(",")),
            RankPlacement::HostFile(file) => cmd.flag("hostfile", file.display()),
        };

        for name in env.names() {
            cmd = cmd.arg("-x").arg(name);
        }

        cmd.arg(shim.display().to_string()).switch("debug")
    }

    /// Start mpirun with the worker shim
    #[instrument(name = "distributed_ranks_spawn", skip(env))]
    pub fn spawn(
        mpirun: &Path,
        shim: &Path,
        spec: &RankSpec,
        working_dir: &Path,
        env: &EnvSnapshot,
    ) -> Result<Self, ContractError> {
        let placement = RankPlacement::resolve(spec)?;
        let command = Self::launch_command(mpirun, spec.processes, &placement, shim, env);
        info!(command = %command, "Launching ranks");

        let worker = WorkerHandle::spawn(LABEL, &command, working_dir, env)?;
        Ok(Self {
            worker: Some(worker),
        })
    }
}

impl JobBackend for DistributedRanksBackend {
    fn label(&self) -> &str {
        LABEL
    }

    async fn submit(&mut self, job: &Job) -> Result<JobTicket, ContractError> {
        let worker = self
            .worker
            .as_mut()
            .ok_or_else(|| ContractError::launch(LABEL, "worker already shut down"))?;
        worker.send_line(&job.shell_line()).await?;
        Ok(JobTicket::new(job.name()))
    }

    async fn drain(&mut self) -> Result<DrainReport, ContractError> {
        let Some(mut worker) = self.worker.take() else {
            return Ok(DrainReport::default());
        };
        let status = worker.shutdown().await?;
        Ok(DrainReport {
            joined: 1,
            failed: usize::from(!status.success()),
        })
    }
}
