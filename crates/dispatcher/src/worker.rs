//! WorkerHandle - a long-lived worker process fed through its stdin
//!
//! Shared by the thread-pool and distributed-rank backends. The worker
//! reads one shell command per line and reports nothing back except its
//! exit status once stdin is closed.

use std::path::Path;
use std::process::{ExitStatus, Stdio};

use contracts::{CommandLine, ContractError, EnvSnapshot};
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tracing::{debug, info, instrument, warn};

/// Handle to a running worker process
pub struct WorkerHandle {
    /// Backend label
    label: String,
    /// Worker process
    child: Child,
    /// Command channel; `None` once closed
    stdin: Option<ChildStdin>,
    /// Lines written so far
    lines_sent: u64,
}

impl WorkerHandle {
    /// Spawn the worker with a piped stdin
    ///
    /// Must be called from within a tokio runtime.
    #[instrument(name = "worker_spawn", skip(command, env), fields(command = %command))]
    pub fn spawn(
        label: &str,
        command: &CommandLine,
        working_dir: &Path,
        env: &EnvSnapshot,
    ) -> Result<Self, ContractError> {
        let mut cmd = to_command(command);
        cmd.current_dir(working_dir)
            .envs(env.iter())
            .stdin(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| {
            ContractError::launch(label, format!("failed to spawn worker '{command}': {e}"))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ContractError::launch(label, "worker stdin unavailable"))?;

        info!(backend = label, pid = ?child.id(), "Worker started");

        Ok(Self {
            label: label.to_string(),
            child,
            stdin: Some(stdin),
            lines_sent: 0,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn lines_sent(&self) -> u64 {
        self.lines_sent
    }

    /// Write one command line and flush it
    ///
    /// # Errors
    /// - `ConfigValidation` if `line` spans several lines
    /// - `Launch` if the worker has gone away or stdin is closed
    pub async fn send_line(&mut self, line: &str) -> Result<(), ContractError> {
        if line.contains('\n') || line.contains('\r') {
            return Err(ContractError::config_validation(
                "command",
                "worker commands must fit on a single line",
            ));
        }

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| ContractError::launch(&self.label, "worker input already closed"))?;

        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');

        stdin
            .write_all(buf.as_bytes())
            .await
            .map_err(|e| ContractError::launch(&self.label, format!("worker write failed: {e}")))?;
        stdin
            .flush()
            .await
            .map_err(|e| ContractError::launch(&self.label, format!("worker flush failed: {e}")))?;

        self.lines_sent += 1;
        debug!(backend = %self.label, line, "Command sent to worker");
        Ok(())
    }

    /// Close stdin and wait for the worker to exit
    ///
    /// The exit status is returned for reporting only.
    #[instrument(name = "worker_shutdown", skip(self), fields(backend = %self.label))]
    pub async fn shutdown(&mut self) -> Result<ExitStatus, ContractError> {
        // Dropping the pipe is the end-of-input signal
        drop(self.stdin.take());

        let status = self.child.wait().await?;
        if status.success() {
            info!(lines = self.lines_sent, "Worker finished");
        } else {
            warn!(lines = self.lines_sent, status = %status, "Worker exited unsuccessfully");
        }
        Ok(status)
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        if self.stdin.is_some() {
            warn!(backend = %self.label, "Worker handle dropped without shutdown");
        }
    }
}

/// Build a process command from a `CommandLine`
pub(crate) fn to_command(command: &CommandLine) -> Command {
    match command {
        CommandLine::Argv { program, args } => {
            let mut cmd = Command::new(program);
            cmd.args(args);
            cmd
        }
        CommandLine::Shell(line) => {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(line);
            cmd
        }
    }
}
