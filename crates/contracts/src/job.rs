//! Job - one unit of work plus its resource and naming metadata

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{CommandLine, ResourceRequest};

/// Name used when a job is not given one
pub const DEFAULT_JOB_NAME: &str = "mtsh";

/// A single submitted command
///
/// Built once through the `with_*` methods and then handed to a dispatcher
/// by value; backends only ever see `&Job`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    name: String,
    command: CommandLine,
    threads: u32,
    memory_gb: f64,
    logfile: Option<PathBuf>,
    after: Option<String>,
    before: Option<String>,
}

impl Job {
    pub fn new(command: CommandLine) -> Self {
        Self {
            name: DEFAULT_JOB_NAME.to_string(),
            command,
            threads: 1,
            memory_gb: 0.0,
            logfile: None,
            after: None,
            before: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Requested cores; clamped to at least one
    pub fn with_threads(mut self, threads: u32) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Memory ceiling in GB; zero means no memory clause
    pub fn with_memory_gb(mut self, memory_gb: f64) -> Self {
        self.memory_gb = memory_gb;
        self
    }

    pub fn with_logfile(mut self, logfile: impl Into<PathBuf>) -> Self {
        self.logfile = Some(logfile.into());
        self
    }

    /// Start only after the batch job `id`
    pub fn after(mut self, id: impl Into<String>) -> Self {
        self.after = Some(id.into()).filter(|s: &String| !s.is_empty());
        self
    }

    /// Start only before the batch job `id`
    pub fn before(mut self, id: impl Into<String>) -> Self {
        self.before = Some(id.into()).filter(|s: &String| !s.is_empty());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn command(&self) -> &CommandLine {
        &self.command
    }

    pub fn threads(&self) -> u32 {
        self.threads
    }

    pub fn memory_gb(&self) -> f64 {
        self.memory_gb
    }

    pub fn logfile(&self) -> Option<&Path> {
        self.logfile.as_deref()
    }

    pub fn after_id(&self) -> Option<&str> {
        self.after.as_deref()
    }

    pub fn before_id(&self) -> Option<&str> {
        self.before.as_deref()
    }

    pub fn resources(&self) -> ResourceRequest {
        ResourceRequest::new(self.threads, self.memory_gb)
    }

    /// Shell line with stderr redirected to the logfile, if any
    pub fn shell_line(&self) -> String {
        let line = self.command.to_shell_string();
        match &self.logfile {
            Some(log) => format!(
                "{} 2> {}",
                line,
                crate::command::shell_quote(&log.to_string_lossy())
            ),
            None => line,
        }
    }
}

/// Result of handing a job to a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobTicket {
    /// Job name
    pub name: String,
    /// Identifier reported by the batch scheduler, when it reports one
    pub batch_id: Option<String>,
}

impl JobTicket {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            batch_id: None,
        }
    }

    pub fn with_batch_id(mut self, id: impl Into<String>) -> Self {
        self.batch_id = Some(id.into());
        self
    }
}

/// Outcome of draining a backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Handles joined (workers or submissions)
    pub joined: usize,
    /// Handles that ended unsuccessfully
    pub failed: usize,
}
