//! BatchQueueBackend - one PBS submission per job
//!
//! Each job becomes a small shell script handed to the submitter on its
//! stdin. With `block_until_complete` the submitter only exits when the job
//! does, so it keeps running in the background until `drain`.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use contracts::{
    shell_quote, BatchSpec, CommandLine, ContractError, DrainReport, EnvSnapshot, Job, JobBackend,
    JobTicket, DEFAULT_JOB_NAME,
};
use tokio::io::AsyncWriteExt;
use tokio::process::Child;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::worker::to_command;

const LABEL: &str = "batch_queue";

/// Job name as it may appear after `#PBS -N`
///
/// Whitespace and control characters become `_`; an empty name falls back
/// to the default.
pub fn batch_job_name(name: &str) -> String {
    let name: String = name
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() || c.is_control() { '_' } else { c })
        .collect();
    if name.is_empty() {
        DEFAULT_JOB_NAME.to_string()
    } else {
        name
    }
}

/// Render the PBS script submitted for `job`
pub fn render_script(
    job: &Job,
    spec: &BatchSpec,
    working_dir: &Path,
    env: &EnvSnapshot,
) -> String {
    let mut lines = vec![
        "#!/bin/sh".to_string(),
        format!("#PBS -N {}", batch_job_name(job.name())),
        // Stderr goes through the redirect in the body instead
        "#PBS -e /dev/null".to_string(),
        "#PBS -o /dev/null".to_string(),
    ];

    if spec.block_until_complete {
        lines.push("#PBS -W block=true".to_string());
    }
    if let Some(id) = job.after_id() {
        lines.push(format!("#PBS -W depend=after:{id}"));
    }
    if let Some(id) = job.before_id() {
        lines.push(format!("#PBS -W depend=before:{id}"));
    }
    if let Some(queue) = spec.queue.as_deref().filter(|q| !q.is_empty()) {
        lines.push(format!("#PBS -q {queue}"));
    }

    lines.push(format!("#PBS -l {}", job.resources()));
    lines.extend(env.export_lines());
    lines.push(format!("cd {}", shell_quote(&working_dir.to_string_lossy())));
    lines.push(job.shell_line());

    let mut script = lines.join("\n");
    script.push('\n');
    script
}

/// PBS backend
pub struct BatchQueueBackend {
    spec: BatchSpec,
    working_dir: PathBuf,
    env: EnvSnapshot,
    /// Background submitters; each resolves to whether it exited cleanly
    submissions: Vec<JoinHandle<bool>>,
}

impl BatchQueueBackend {
    pub fn new(spec: BatchSpec, working_dir: impl Into<PathBuf>, env: EnvSnapshot) -> Self {
        Self {
            spec,
            working_dir: working_dir.into(),
            env,
            submissions: Vec::new(),
        }
    }

    /// Submissions not yet joined
    pub fn pending(&self) -> usize {
        self.submissions.len()
    }

    /// `<submit_program> -S <shell>`
    pub fn submit_command(spec: &BatchSpec) -> CommandLine {
        CommandLine::new(spec.submit_program.clone())
            .arg("-S")
            .arg(spec.shell.clone())
    }

    /// Start the submitter and hand it the script on stdin
    async fn start_submitter(&self, script: &str) -> Result<Child, ContractError> {
        let command = Self::submit_command(&self.spec);
        let mut cmd = to_command(&command);
        cmd.current_dir(&self.working_dir)
            .envs(self.env.iter())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| {
            ContractError::launch(LABEL, format!("failed to start '{command}': {e}"))
        })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ContractError::launch(LABEL, "submitter stdin unavailable"))?;
        stdin
            .write_all(script.as_bytes())
            .await
            .map_err(|e| ContractError::launch(LABEL, format!("script write failed: {e}")))?;
        stdin
            .flush()
            .await
            .map_err(|e| ContractError::launch(LABEL, format!("script flush failed: {e}")))?;
        // Closing stdin ends the script
        drop(stdin);

        Ok(child)
    }
}

impl JobBackend for BatchQueueBackend {
    fn label(&self) -> &str {
        LABEL
    }

    #[instrument(
        name = "batch_submit",
        skip(self, job),
        fields(job = %job.name(), blocking = self.spec.block_until_complete)
    )]
    async fn submit(&mut self, job: &Job) -> Result<JobTicket, ContractError> {
        let script = render_script(job, &self.spec, &self.working_dir, &self.env);
        debug!(script = %script, "Rendered batch script");

        let child = self.start_submitter(&script).await?;

        if self.spec.block_until_complete {
            let name = job.name().to_string();
            self.submissions.push(tokio::spawn(async move {
                match child.wait_with_output().await {
                    Ok(output) if output.status.success() => true,
                    Ok(output) => {
                        warn!(job = %name, status = %output.status, "Batch job ended unsuccessfully");
                        false
                    }
                    Err(e) => {
                        warn!(job = %name, error = %e, "Lost track of batch submitter");
                        false
                    }
                }
            }));
            return Ok(JobTicket::new(job.name()));
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(ContractError::launch(
                LABEL,
                format!("submitter exited with {}", output.status),
            ));
        }

        let id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        info!(batch_id = %id, "Job queued");
        let ticket = JobTicket::new(job.name());
        Ok(if id.is_empty() {
            ticket
        } else {
            ticket.with_batch_id(id)
        })
    }

    async fn drain(&mut self) -> Result<DrainReport, ContractError> {
        let mut report = DrainReport::default();
        for handle in self.submissions.drain(..) {
            report.joined += 1;
            match handle.await {
                Ok(true) => {}
                Ok(false) => report.failed += 1,
                Err(e) => {
                    warn!(error = %e, "Submitter task panicked");
                    report.failed += 1;
                }
            }
        }
        info!(joined = report.joined, failed = report.failed, "Batch submissions joined");
        Ok(report)
    }
}
