//! Backend implementations

mod batch;
mod local;
mod pool;
mod ranks;

pub use batch::{render_script, BatchQueueBackend};
pub use local::LocalBackend;
pub use pool::ThreadPoolBackend;
pub use ranks::{DistributedRanksBackend, RankPlacement};

use contracts::{ContractError, DrainReport, Job, JobBackend, JobTicket};

/// The backend chosen at construction
pub enum AnyBackend {
    Local(LocalBackend),
    ThreadPool(ThreadPoolBackend),
    DistributedRanks(DistributedRanksBackend),
    BatchQueue(BatchQueueBackend),
}

impl From<LocalBackend> for AnyBackend {
    fn from(b: LocalBackend) -> Self {
        Self::Local(b)
    }
}

impl From<ThreadPoolBackend> for AnyBackend {
    fn from(b: ThreadPoolBackend) -> Self {
        Self::ThreadPool(b)
    }
}

impl From<DistributedRanksBackend> for AnyBackend {
    fn from(b: DistributedRanksBackend) -> Self {
        Self::DistributedRanks(b)
    }
}

impl From<BatchQueueBackend> for AnyBackend {
    fn from(b: BatchQueueBackend) -> Self {
        Self::BatchQueue(b)
    }
}

impl JobBackend for AnyBackend {
    fn label(&self) -> &str {
        match self {
            Self::Local(b) => b.label(),
            Self::ThreadPool(b) => b.label(),
            Self::DistributedRanks(b) => b.label(),
            Self::BatchQueue(b) => b.label(),
        }
    }

    async fn submit(&mut self, job: &Job) -> Result<JobTicket, ContractError> {
        match self {
            Self::Local(b) => b.submit(job).await,
            Self::ThreadPool(b) => b.submit(job).await,
            Self::DistributedRanks(b) => b.submit(job).await,
            Self::BatchQueue(b) => b.submit(job).await,
        }
    }

    async fn drain(&mut self) -> Result<DrainReport, ContractError> {
        match self {
            Self::Local(b) => b.drain().await,
            Self::ThreadPool(b) => b.drain().await,
            Self::DistributedRanks(b) => b.drain().await,
            Self::BatchQueue(b) => b.drain().await,
        }
    }
}
