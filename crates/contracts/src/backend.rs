//! JobBackend trait - Dispatcher execution interface
//!
//! Defines the abstract interface for execution backends.

use crate::{ContractError, DrainReport, Job, JobTicket};

/// Job execution trait
///
/// All backend implementations must implement this trait. Calls arrive
/// sequentially from a single owner; implementations need no locking.
#[trait_variant::make(JobBackend: Send)]
pub trait LocalJobBackend {
    /// Backend label (used for logging/metrics)
    fn label(&self) -> &str;

    /// Hand one job to the backend
    ///
    /// # Errors
    /// Returns a launch error if the backend refuses the job, or a job
    /// execution error for backends that run the job to completion.
    async fn submit(&mut self, job: &Job) -> Result<JobTicket, ContractError>;

    /// Block until everything submitted so far has finished
    async fn drain(&mut self) -> Result<DrainReport, ContractError>;
}
