//! ThreadPoolBackend - one `thrsh` worker executing lines with bounded concurrency

use std::path::Path;

use contracts::{
    CommandLine, ContractError, DrainReport, EnvSnapshot, Job, JobBackend, JobTicket, PoolSpec,
};
use tracing::instrument;

use crate::worker::WorkerHandle;

const LABEL: &str = "thread_pool";

/// Persistent thread-pool backend
pub struct ThreadPoolBackend {
    worker: Option<WorkerHandle>,
    threads: u32,
}

impl ThreadPoolBackend {
    /// `<shim> --threads <n> --debug`
    pub fn launch_command(shim: &Path, spec: &PoolSpec) -> CommandLine {
        CommandLine::new(shim.display().to_string())
            .flag("threads", spec.threads)
            .switch("debug")
    }

    /// Start the worker
    #[instrument(name = "thread_pool_spawn", skip(env), fields(threads = spec.threads))]
    pub fn spawn(
        shim: &Path,
        spec: &PoolSpec,
        working_dir: &Path,
        env: &EnvSnapshot,
    ) -> Result<Self, ContractError> {
        let command = Self::launch_command(shim, spec);
        let worker = WorkerHandle::spawn(LABEL, &command, working_dir, env)?;
        Ok(Self {
            worker: Some(worker),
            threads: spec.threads,
        })
    }

    pub fn threads(&self) -> u32 {
        self.threads
    }
}

impl JobBackend for ThreadPoolBackend {
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

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::testutil::{read_lines, write_script, LINE_WORKER};

    #[test]
    fn test_launch_command() {
        let cmd = ThreadPoolBackend::launch_command(
            Path::new("/opt/mt/bin/thrsh"),
            &PoolSpec { threads: 6 },
        );
        assert_eq!(
            cmd.to_shell_string(),
            "/opt/mt/bin/thrsh --threads 6 --debug"
        );
    }

    #[tokio::test]
    async fn test_run_then_wait_does_not_lose_line() {
        let dir = tempfile::tempdir().unwrap();
        let shim = write_script(dir.path(), "thrsh", LINE_WORKER);

        let mut pool = ThreadPoolBackend::spawn(
            &shim,
            &PoolSpec { threads: 2 },
            dir.path(),
            &EnvSnapshot::empty(),
        )
        .unwrap();

        pool.submit(&Job::new(CommandLine::shell("echo hi >> out.txt")))
            .await
            .unwrap();
        let report = pool.drain().await.unwrap();

        assert_eq!(report, DrainReport { joined: 1, failed: 0 });
        assert_eq!(read_lines(&dir.path().join("out.txt")), vec!["hi"]);
    }

    #[tokio::test]
    async fn test_second_drain_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let shim = write_script(dir.path(), "thrsh", LINE_WORKER);
        let mut pool = ThreadPoolBackend::spawn(
            &shim,
            &PoolSpec::default(),
            dir.path(),
            &EnvSnapshot::empty(),
        )
        .unwrap();

        pool.drain().await.unwrap();
        assert_eq!(pool.drain().await.unwrap(), DrainReport::default());

        let err = pool
            .submit(&Job::new(CommandLine::shell("true")))
            .await
            .unwrap_err();
        assert!(matches!(err, ContractError::Launch { .. }));
    }

    #[tokio::test]
    async fn test_worker_failure_is_reported_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        let shim = write_script(dir.path(), "thrsh", "cat > /dev/null; exit 2");
        let mut pool = ThreadPoolBackend::spawn(
            &shim,
            &PoolSpec::default(),
            dir.path(),
            &EnvSnapshot::empty(),
        )
        .unwrap();

        let report = pool.drain().await.unwrap();
        assert_eq!(report.failed, 1);
    }
}
