//! LocalBackend - runs each job to completion as a direct child process

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use contracts::{ContractError, DrainReport, EnvSnapshot, Job, JobBackend, JobTicket};
use tracing::{debug, info, instrument};

use crate::worker::to_command;

/// Synchronous backend: `submit` returns once the job has exited
pub struct LocalBackend {
    working_dir: PathBuf,
    env: EnvSnapshot,
    completed: usize,
}

impl LocalBackend {
    pub fn new(working_dir: impl Into<PathBuf>, env: EnvSnapshot) -> Self {
        Self {
            working_dir: working_dir.into(),
            env,
            completed: 0,
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    fn open_logfile(&self, job: &Job) -> Result<Option<File>, ContractError> {
        let Some(log) = job.logfile() else {
            return Ok(None);
        };
        let path = self.working_dir.join(log);
        File::create(&path).map(Some).map_err(|e| {
            ContractError::launch(
                "local",
                format!("cannot open logfile {}: {e}", path.display()),
            )
        })
    }
}

impl JobBackend for LocalBackend {
    fn label(&self) -> &str {
        "local"
    }

    #[instrument(
        name = "local_submit",
        skip(self, job),
        fields(job = %job.name(), command = %job.command())
    )]
    async fn submit(&mut self, job: &Job) -> Result<JobTicket, ContractError> {
        let mut cmd = to_command(job.command());
        cmd.current_dir(&self.working_dir)
            .envs(self.env.iter())
            .stdin(Stdio::null());

        if let Some(log) = self.open_logfile(job)? {
            cmd.stderr(Stdio::from(log));
        }

        let status = cmd.status().await.map_err(|e| {
            ContractError::launch("local", format!("failed to start '{}': {e}", job.name()))
        })?;

        if !status.success() {
            return Err(ContractError::job_execution(job.name(), status.to_string()));
        }

        self.completed += 1;
        debug!(status = %status, "Job completed");
        Ok(JobTicket::new(job.name()))
    }

    async fn drain(&mut self) -> Result<DrainReport, ContractError> {
        // Every job already finished inside submit
        info!(completed = self.completed, "Local backend drained");
        Ok(DrainReport {
            joined: self.completed,
            failed: 0,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::testutil::read_lines;
    use contracts::CommandLine;

    fn backend(dir: &Path) -> LocalBackend {
        LocalBackend::new(dir, EnvSnapshot::empty())
    }

    #[tokio::test]
    async fn test_success_returns_normally() {
        let dir = tempfile::tempdir().unwrap();
        let mut local = backend(dir.path());

        let ticket = local
            .submit(&Job::new(CommandLine::shell("echo ok > out.txt")).with_name("ok"))
            .await
            .unwrap();

        assert_eq!(ticket.name, "ok");
        assert!(ticket.batch_id.is_none());
        assert_eq!(read_lines(&dir.path().join("out.txt")), vec!["ok"]);
    }

    #[tokio::test]
    async fn test_killed_by_signal_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut local = backend(dir.path());

        let err = local
            .submit(&Job::new(CommandLine::shell("kill -9 $$")).with_name("doomed"))
            .await
            .unwrap_err();

        match err {
            ContractError::JobExecution { job, status } => {
                assert_eq!(job, "doomed");
                assert!(status.contains("signal"), "got: {status}");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut local = backend(dir.path());

        let err = local
            .submit(&Job::new(CommandLine::shell("exit 3")))
            .await
            .unwrap_err();
        assert!(matches!(err, ContractError::JobExecution { .. }));

        let report = local.drain().await.unwrap();
        assert_eq!(report.joined, 0);
    }

    #[tokio::test]
    async fn test_structured_command_runs_without_shell() {
        let dir = tempfile::tempdir().unwrap();
        let mut local = backend(dir.path());

        let cmd = CommandLine::new("touch").arg("file with spaces");
        local.submit(&Job::new(cmd)).await.unwrap();

        assert!(dir.path().join("file with spaces").exists());
    }

    #[tokio::test]
    async fn test_logfile_captures_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let mut local = backend(dir.path());

        let job = Job::new(CommandLine::shell("echo oops >&2")).with_logfile("job.log");
        local.submit(&job).await.unwrap();

        assert_eq!(read_lines(&dir.path().join("job.log")), vec!["oops"]);
    }

    #[tokio::test]
    async fn test_env_snapshot_applied() {
        let dir = tempfile::tempdir().unwrap();
        let mut local = LocalBackend::new(
            dir.path(),
            EnvSnapshot::from_pairs([("TMPDIR_SPEC", "/scratch/x")]),
        );

        local
            .submit(&Job::new(CommandLine::shell("echo $TMPDIR_SPEC > env.txt")))
            .await
            .unwrap();
        assert_eq!(read_lines(&dir.path().join("env.txt")), vec!["/scratch/x"]);

        let report = local.drain().await.unwrap();
        assert_eq!(report.joined, 1);
    }

    #[tokio::test]
    async fn test_missing_program_is_launch_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut local = backend(dir.path());

        let err = local
            .submit(&Job::new(CommandLine::new("/nonexistent/extractor")))
            .await
            .unwrap_err();
        assert!(matches!(err, ContractError::Launch { .. }));
    }
}
